// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI to inspect and assemble RPU single-container firmware files.
// Author: Lukas Bower

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rpu_image::{
    encode, parse, read_header, Expectations, FeatureFlags, FirmwareImage, FirmwareImageSet, FwVersion,
    ImageKind,
};
use sha2::{Digest, Sha256};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the header and image digests of a container.
    Inspect {
        /// Container file to read.
        file: PathBuf,
        /// Validate against this exact firmware version.
        #[arg(long)]
        expect_version: Option<FwVersion>,
        /// Operating mode whose feature bit must be present.
        #[arg(long, value_enum, default_value_t = Mode::Unspecified)]
        mode: Mode,
    },
    /// Assemble a container from four patch images.
    Pack {
        /// LMAC primary patch.
        #[arg(long)]
        lmac_pri: PathBuf,
        /// LMAC secondary patch.
        #[arg(long)]
        lmac_sec: PathBuf,
        /// UMAC primary patch.
        #[arg(long)]
        umac_pri: PathBuf,
        /// UMAC secondary patch.
        #[arg(long)]
        umac_sec: PathBuf,
        /// Firmware version stamped into the header.
        #[arg(long)]
        version: FwVersion,
        /// Feature flags advertised by the container.
        #[arg(long, value_enum, value_delimiter = ',', default_value = "system")]
        features: Vec<Feature>,
        /// Output path.
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    System,
    ScanOnly,
    RadioTest,
    Unspecified,
}

impl Mode {
    fn required_features(self) -> FeatureFlags {
        match self {
            Self::System => FeatureFlags::SYSTEM_MODE,
            Self::ScanOnly => FeatureFlags::SCAN_ONLY,
            Self::RadioTest => FeatureFlags::RADIO_TEST,
            Self::Unspecified => FeatureFlags::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Feature {
    System,
    RadioTest,
    ScanOnly,
    RawModes,
    OffloadedRawTx,
}

impl Feature {
    fn flag(self) -> FeatureFlags {
        match self {
            Self::System => FeatureFlags::SYSTEM_MODE,
            Self::RadioTest => FeatureFlags::RADIO_TEST,
            Self::ScanOnly => FeatureFlags::SCAN_ONLY,
            Self::RawModes => FeatureFlags::SYSTEM_WITH_RAW_MODES,
            Self::OffloadedRawTx => FeatureFlags::OFFLOADED_RAW_TX,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Command::Inspect {
            file,
            expect_version,
            mode,
        } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            print!("{}", inspect(&bytes, expect_version, mode)?);
        }
        Command::Pack {
            lmac_pri,
            lmac_sec,
            umac_pri,
            umac_sec,
            version,
            features,
            out,
        } => {
            let sources = [
                (ImageKind::LmacPatchPri, lmac_pri),
                (ImageKind::LmacPatchSec, lmac_sec),
                (ImageKind::UmacPatchPri, umac_pri),
                (ImageKind::UmacPatchSec, umac_sec),
            ];
            let flags = features
                .iter()
                .fold(FeatureFlags::empty(), |acc, feature| acc | feature.flag());
            let written = pack(&sources, version, flags, &out)?;
            println!("rpu-fwinfo: wrote {} ({written} bytes)", out.display());
        }
    }
    Ok(())
}

fn inspect(bytes: &[u8], expect_version: Option<FwVersion>, mode: Mode) -> Result<String> {
    let header = read_header(bytes).context("decoding container header")?;
    let expect = Expectations::new(expect_version.unwrap_or(header.version), mode.required_features());
    let mut report = format!(
        "images:   {}\nversion:  {}\nfeatures: {:?}\n",
        header.image_count, header.version, header.features
    );
    match parse(bytes, &expect) {
        Ok(parsed) => {
            for image in parsed.images.iter() {
                report.push_str(&format!(
                    "  {:<16} {:>8} bytes  sha256 {}\n",
                    image.kind().as_str(),
                    image.size(),
                    hex::encode(Sha256::digest(image.data()))
                ));
            }
            report.push_str("status:   ok\n");
        }
        Err(err) => report.push_str(&format!("status:   rejected ({err})\n")),
    }
    Ok(report)
}

fn pack(
    sources: &[(ImageKind, PathBuf)],
    version: FwVersion,
    features: FeatureFlags,
    out: &Path,
) -> Result<usize> {
    let mut set = FirmwareImageSet::new();
    for (kind, path) in sources {
        let data = fs::read(path).with_context(|| format!("reading {kind} from {}", path.display()))?;
        info!("[rpu-fwinfo] {kind}: {} bytes", data.len());
        set.insert(FirmwareImage::owned(*kind, data));
    }
    let bytes = encode(version, features, &set)?;
    fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn packed(dir: &Path, version: FwVersion, features: FeatureFlags) -> Vec<u8> {
        let sources: Vec<(ImageKind, PathBuf)> = ImageKind::PATCHES
            .iter()
            .enumerate()
            .map(|(idx, kind)| {
                let path = dir.join(format!("{kind}.bin"));
                fs::write(&path, vec![idx as u8; 16 * (idx + 1)]).unwrap();
                (*kind, path)
            })
            .collect();
        let out = dir.join("fw.bin");
        pack(&sources, version, features, &out).unwrap();
        fs::read(out).unwrap()
    }

    #[test]
    fn packed_container_inspects_clean() {
        let dir = tempdir().unwrap();
        let version = FwVersion::new(1, 2, 8, 1);
        let bytes = packed(dir.path(), version, FeatureFlags::SYSTEM_MODE);
        let report = inspect(&bytes, Some(version), Mode::System).unwrap();
        assert!(report.contains("version:  1.2.8.1"));
        assert!(report.contains("lmac_patch_pri"));
        assert!(report.contains("umac_patch_sec"));
        assert!(report.ends_with("status:   ok\n"));
    }

    #[test]
    fn version_mismatch_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let bytes = packed(dir.path(), FwVersion::new(1, 2, 8, 1), FeatureFlags::SYSTEM_MODE);
        let report = inspect(&bytes, Some(FwVersion::new(1, 2, 9, 0)), Mode::System).unwrap();
        assert!(report.contains("rejected"));
        assert!(!report.contains("sha256"));
    }

    #[test]
    fn missing_feature_bit_is_rejected() {
        let dir = tempdir().unwrap();
        let bytes = packed(dir.path(), FwVersion::new(1, 2, 8, 1), FeatureFlags::RADIO_TEST);
        let report = inspect(&bytes, None, Mode::ScanOnly).unwrap();
        assert!(report.contains("rejected"));
    }

    #[test]
    fn short_file_fails_header_decode() {
        assert!(inspect(&[0u8; 5], None, Mode::Unspecified).is_err());
    }
}
