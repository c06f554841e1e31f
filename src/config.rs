// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Device configuration.
//!
//! Values come from a TOML file and default to the firmware version packed by
//! `build.rs` from `RPU_FW_VERSION`. The delivery mode and the container image
//! count are fixed by the build and cannot be set here; documents naming
//! them are rejected as unknown keys.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rpu_image::{Expectations, FeatureFlags, FwVersion};
use serde::{Deserialize, Deserializer};

use crate::boot::{BootPolicy, PollPolicy};
use crate::error::{Result, RpuError};
use crate::hal::topology::{Topology, Variant};

/// Environment variable naming the active configuration file.
pub const CONFIG_PATH_ENV: &str = "RPU_CONFIG_PATH";
/// Configuration file used when the environment does not name one.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rpu/rpu.toml";

/// Firmware version the build was made against.
pub fn build_fw_version() -> FwVersion {
    let word = env!("RPU_EXPECTED_FW_WORD").parse().unwrap_or(0x0102_0801);
    FwVersion::from_word(word)
}

/// Operating mode the firmware must advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingMode {
    /// Full system firmware.
    #[default]
    System,
    /// Scan-only firmware.
    ScanOnly,
    /// Radio test firmware.
    RadioTest,
    /// No mode; feature flags are not validated.
    Unspecified,
}

impl OperatingMode {
    /// Feature bit the firmware must carry.
    #[must_use]
    pub fn required_features(self) -> FeatureFlags {
        match self {
            Self::System => FeatureFlags::SYSTEM_MODE,
            Self::ScanOnly => FeatureFlags::SCAN_ONLY,
            Self::RadioTest => FeatureFlags::RADIO_TEST,
            Self::Unspecified => FeatureFlags::empty(),
        }
    }
}

/// Complete device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpuConfig {
    /// Silicon variant.
    pub variant: Variant,
    /// Operating mode the firmware must support.
    pub operating_mode: OperatingMode,
    /// Exact firmware version accepted.
    #[serde(deserialize_with = "version_from_str")]
    pub expected_version: FwVersion,
    /// Wrap RAM access in the low-power wake handshake.
    pub low_power: bool,
    /// Boot signature wait.
    pub boot_check: PollPolicy,
    /// Soft reset completion wait.
    pub reset: PollPolicy,
    /// Status reads allowed during a wake handshake.
    pub wake_spins: u32,
}

impl Default for RpuConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            operating_mode: OperatingMode::default(),
            expected_version: build_fw_version(),
            low_power: false,
            boot_check: PollPolicy::BOOT_CHECK,
            reset: PollPolicy::RESET,
            wake_spins: 10_000,
        }
    }
}

fn version_from_str<'de, D: Deserializer<'de>>(de: D) -> core::result::Result<FwVersion, D::Error> {
    let text = String::deserialize(de)?;
    text.parse().map_err(serde::de::Error::custom)
}

impl RpuConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).map_err(|e| RpuError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| RpuError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load the file named by `RPU_CONFIG_PATH`, falling back to defaults.
    pub fn load_active() -> Self {
        let path: PathBuf = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        match Self::load(&path) {
            Ok(cfg) => {
                info!("[rpu-boot] configuration loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("[rpu-boot] using default configuration: {e}");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.boot_check.attempts == 0 || self.reset.attempts == 0 {
            return Err(RpuError::Config("poll attempts must be non-zero".into()));
        }
        if self.low_power && self.variant.topology().power.is_none() {
            return Err(RpuError::Config(format!(
                "variant {:?} has no power-save registers",
                self.variant
            )));
        }
        Ok(())
    }

    /// Static topology for the configured variant.
    #[must_use]
    pub fn topology(&self) -> &'static Topology {
        self.variant.topology()
    }

    /// Container expectations derived from this configuration.
    ///
    /// The image count is always the build's four-patch layout.
    #[must_use]
    pub fn expectations(&self) -> Expectations {
        Expectations::new(self.expected_version, self.operating_mode.required_features())
    }

    /// Poll bounds for the sequencer.
    #[must_use]
    pub fn boot_policy(&self) -> BootPolicy {
        BootPolicy {
            boot_check: self.boot_check,
            reset: self.reset,
        }
    }
}
