// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Packed firmware version words and container feature flags.
// Author: Lukas Bower

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

/// Firmware version unpacked from the 32-bit container word.
///
/// The word layout is `family[31:24] major[23:16] minor[15:8] patch[7:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FwVersion {
    /// RPU family identifier.
    pub family: u8,
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch level.
    pub patch: u8,
}

impl FwVersion {
    /// Construct a version from its four fields.
    #[must_use]
    pub const fn new(family: u8, major: u8, minor: u8, patch: u8) -> Self {
        Self {
            family,
            major,
            minor,
            patch,
        }
    }

    /// Unpack a version from its wire word.
    #[must_use]
    pub const fn from_word(word: u32) -> Self {
        Self {
            family: (word >> 24) as u8,
            major: (word >> 16) as u8,
            minor: (word >> 8) as u8,
            patch: word as u8,
        }
    }

    /// Pack the version into its wire word.
    #[must_use]
    pub const fn to_word(self) -> u32 {
        ((self.family as u32) << 24)
            | ((self.major as u32) << 16)
            | ((self.minor as u32) << 8)
            | self.patch as u32
    }
}

impl fmt::Display for FwVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.family, self.major, self.minor, self.patch
        )
    }
}

/// Error returned when a dotted version string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid firmware version `{0}`; expected family.major.minor.patch")]
pub struct VersionParseError(pub String);

impl FromStr for FwVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = [0u8; 4];
        let mut parts = s.trim().split('.');
        for field in &mut fields {
            *field = parts
                .next()
                .and_then(|part| part.parse().ok())
                .ok_or_else(|| VersionParseError(s.to_owned()))?;
        }
        if parts.next().is_some() {
            return Err(VersionParseError(s.to_owned()));
        }
        Ok(Self::new(fields[0], fields[1], fields[2], fields[3]))
    }
}

bitflags! {
    /// Feature flags advertised by a firmware container.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeatureFlags: u32 {
        /// Full system (station/AP) firmware.
        const SYSTEM_MODE = 1 << 0;
        /// Radio test firmware.
        const RADIO_TEST = 1 << 1;
        /// Scan-only firmware.
        const SCAN_ONLY = 1 << 2;
        /// System firmware with raw (monitor/injection) modes.
        const SYSTEM_WITH_RAW_MODES = 1 << 3;
        /// Offloaded raw transmit firmware.
        const OFFLOADED_RAW_TX = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_layout_matches_fields() {
        let version = FwVersion::from_word(0x0102_0801);
        assert_eq!(version, FwVersion::new(1, 2, 8, 1));
        assert_eq!(version.to_word(), 0x0102_0801);
        assert_eq!(version.to_string(), "1.2.8.1");
    }

    #[test]
    fn parses_dotted_versions() {
        assert_eq!("1.2.8.1".parse(), Ok(FwVersion::new(1, 2, 8, 1)));
        assert!("1.2.8".parse::<FwVersion>().is_err());
        assert!("1.2.8.1.0".parse::<FwVersion>().is_err());
        assert!("1.2.300.1".parse::<FwVersion>().is_err());
    }

    #[test]
    fn unknown_feature_bits_are_retained() {
        let flags = FeatureFlags::from_bits_retain(0x8000_0001);
        assert!(flags.contains(FeatureFlags::SYSTEM_MODE));
        assert_eq!(flags.bits(), 0x8000_0001);
    }
}
