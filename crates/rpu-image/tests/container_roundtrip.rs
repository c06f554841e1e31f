// Author: Lukas Bower
// Purpose: Exercise the container codec against randomised image payloads.

use rand::{Rng, RngCore};
use rpu_image::{
    encode, parse, Expectations, FeatureFlags, FirmwareImageSet, FwVersion, ImageError, ImageKind,
    HEADER_LEN,
};

const VERSION: FwVersion = FwVersion::new(1, 2, 8, 1);

fn random_payloads() -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    ImageKind::PATCHES
        .iter()
        .map(|_| {
            let mut data = vec![0u8; rng.gen_range(1..2048)];
            rng.fill_bytes(&mut data);
            data
        })
        .collect()
}

#[test]
fn parse_of_encoded_set_is_identity() {
    let payloads = random_payloads();
    let mut set = FirmwareImageSet::new();
    for (kind, data) in ImageKind::PATCHES.iter().zip(&payloads) {
        set = set.with(*kind, data);
    }
    let bytes = encode(VERSION, FeatureFlags::SYSTEM_MODE, &set).unwrap();
    let parsed = parse(
        &bytes,
        &Expectations::new(VERSION, FeatureFlags::SYSTEM_MODE),
    )
    .unwrap();
    assert_eq!(parsed.images, set);
    assert_eq!(parsed.header.version, VERSION);
    assert!(parsed.images.missing(&ImageKind::PATCHES).is_empty());
}

#[test]
fn truncated_final_record_is_rejected() {
    let payloads = random_payloads();
    let mut set = FirmwareImageSet::new();
    for (kind, data) in ImageKind::PATCHES.iter().zip(&payloads) {
        set = set.with(*kind, data);
    }
    let mut bytes = encode(VERSION, FeatureFlags::SYSTEM_MODE, &set).unwrap();
    let full = bytes.len();
    bytes.truncate(full - 1);
    let err = parse(
        &bytes,
        &Expectations::new(VERSION, FeatureFlags::SYSTEM_MODE),
    )
    .unwrap_err();
    match err {
        ImageError::Truncated { offset, size, .. } => {
            assert_eq!(size, full - 1);
            assert!(offset > HEADER_LEN);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn version_mismatch_in_any_field_is_rejected() {
    let set = FirmwareImageSet::new().with(ImageKind::LmacPatchPri, b"p");
    for found in [
        FwVersion::new(2, 2, 8, 1),
        FwVersion::new(1, 3, 8, 1),
        FwVersion::new(1, 2, 9, 1),
        FwVersion::new(1, 2, 8, 2),
    ] {
        let mut bytes = encode(found, FeatureFlags::SYSTEM_MODE, &set).unwrap();
        // Pad the count up to four so only the version differs.
        bytes[0] = 4;
        let err = parse(
            &bytes,
            &Expectations::new(VERSION, FeatureFlags::SYSTEM_MODE),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ImageError::IncompatibleVersion {
                expected: VERSION,
                found
            }
        );
    }
}
