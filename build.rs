// CLASSIFICATION: COMMUNITY
// Filename: build.rs v0.6
// Author: Lukas Bower
// Date Modified: 2027-09-02

const DEFAULT_FW_VERSION: &str = "1.2.8.1";
// Highest priority first; a non-default mode overrides the default one.
const DELIVERY_FEATURES: [(&str, &str); 3] = [
    ("HEX_LOAD", "hex"),
    ("RAM_LOAD", "ram"),
    ("ROM_PATCH_LOAD", "rom-patch"),
];

fn main() {
    use std::env;

    println!("cargo:rerun-if-env-changed=RPU_FW_VERSION");

    let enabled: Vec<&str> = DELIVERY_FEATURES
        .iter()
        .filter(|(feature, _)| env::var(format!("CARGO_FEATURE_{feature}")).is_ok())
        .map(|(_, mode)| *mode)
        .collect();
    let Some(mode) = enabled.first() else {
        panic!("a firmware delivery feature must be enabled (rom-patch-load, ram-load, hex-load)");
    };
    if enabled.len() > 1 {
        println!("cargo:warning=several delivery features enabled ({enabled:?}); using {mode}");
    }
    println!("cargo:rustc-env=RPU_DELIVERY_MODE={mode}");

    let version = env::var("RPU_FW_VERSION").unwrap_or_else(|_| DEFAULT_FW_VERSION.into());
    let word = match pack_version(&version) {
        Some(word) => word,
        None => {
            println!(
                "cargo:warning=RPU_FW_VERSION={version} is not family.major.minor.patch; \
                 using {DEFAULT_FW_VERSION}"
            );
            pack_version(DEFAULT_FW_VERSION).unwrap_or_default()
        }
    };
    println!("cargo:rustc-env=RPU_EXPECTED_FW_WORD={word}");
}

fn pack_version(text: &str) -> Option<u32> {
    let fields: Vec<u8> = text
        .trim()
        .split('.')
        .map(|part| part.parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    if fields.len() != 4 {
        return None;
    }
    Some(
        (u32::from(fields[0]) << 24)
            | (u32::from(fields[1]) << 16)
            | (u32::from(fields[2]) << 8)
            | u32::from(fields[3]),
    )
}
