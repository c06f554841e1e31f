// CLASSIFICATION: COMMUNITY
// Filename: container_parse.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rpu_image::{encode, parse, Expectations, FeatureFlags, FirmwareImageSet, FwVersion, ImageKind};

fn bench_parse(c: &mut Criterion) {
    let version = FwVersion::new(1, 2, 8, 1);
    let payloads: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 64 * 1024]).collect();
    let mut set = FirmwareImageSet::new();
    for (kind, data) in ImageKind::PATCHES.iter().zip(&payloads) {
        set = set.with(*kind, data);
    }
    let bytes = encode(version, FeatureFlags::SYSTEM_MODE, &set).unwrap();
    let expect = Expectations::new(version, FeatureFlags::SYSTEM_MODE);
    c.bench_function("parse_patch_container", |b| {
        b.iter(|| {
            let parsed = parse(black_box(&bytes), &expect).unwrap();
            black_box(parsed.images.len());
        })
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
