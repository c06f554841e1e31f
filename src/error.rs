// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error type shared by the RPU access layer and boot sequencer.
// Author: Lukas Bower

//! Errors returned by the RPU bring-up core.

use core::fmt;

use rpu_image::{FeatureFlags, FwVersion, ImageError, ImageKind};
use thiserror::Error;

use crate::boot::state::CoreState;
use crate::hal::{BusFault, Processor};

/// Convenience alias used across the crate.
pub type Result<T, E = RpuError> = core::result::Result<T, E>;

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFault {
    /// No region claims the address for this processor.
    Unmapped,
    /// A word-only region was addressed off a 4-byte boundary.
    Unaligned,
    /// The access runs past the end of its region.
    Overrun,
    /// The resolver has no bus window for the address.
    Unresolved,
    /// The region name does not exist on this variant.
    UnknownRegion,
}

impl fmt::Display for AddressFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unmapped => "unmapped",
            Self::Unaligned => "unaligned",
            Self::Overrun => "overruns region",
            Self::Unresolved => "no bus window",
            Self::UnknownRegion => "unknown region",
        })
    }
}

/// Direction of a rejected access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Host read.
    Read,
    /// Host write.
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Errors raised by the access layer, the parser bridge and the sequencer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpuError {
    /// Address is unmapped, misaligned, overruns its region or cannot be resolved.
    #[error("{processor} address {addr:#010x} rejected: {reason}")]
    InvalidAddress {
        /// Core the access was issued for.
        processor: Processor,
        /// Offending address.
        addr: u32,
        /// Classification of the failure.
        reason: AddressFault,
    },
    /// The region does not permit this direction of access.
    #[error("{access} denied for {processor} at {addr:#010x}")]
    AccessDenied {
        /// Core the access was issued for.
        processor: Processor,
        /// Offending address.
        addr: u32,
        /// Requested direction.
        access: Access,
    },
    /// The bus transport failed.
    #[error(transparent)]
    Bus(#[from] BusFault),
    /// A read returned the all-ones fault sentinel.
    #[error("{processor} memory fault reading {addr:#010x}")]
    MemoryFault {
        /// Core the access was issued for.
        processor: Processor,
        /// Address whose read returned the sentinel.
        addr: u32,
    },
    /// Container version differs from the build's expected version.
    #[error("incompatible firmware version {found}; expected {expected}")]
    IncompatibleVersion {
        /// Build expectation.
        expected: FwVersion,
        /// Container value.
        found: FwVersion,
    },
    /// Container lacks the feature bit of the configured operating mode.
    #[error("incompatible firmware features {found:?}; required {required:?}")]
    IncompatibleFeatures {
        /// Required bits.
        required: FeatureFlags,
        /// Container value.
        found: FeatureFlags,
    },
    /// Container header announces the wrong number of images.
    #[error("invalid number of images: expected {expected}, got {found}")]
    ImageCountMismatch {
        /// Build expectation.
        expected: u32,
        /// Container value.
        found: u32,
    },
    /// Container is shorter than its header or records claim.
    #[error("truncated firmware image at offset {offset} ({needed} bytes needed, {size} available)")]
    TruncatedImage {
        /// Offset of the structure that did not fit.
        offset: usize,
        /// Bytes required from `offset`.
        needed: usize,
        /// Buffer size.
        size: usize,
    },
    /// The delivery mode requires an image the set does not carry.
    #[error("missing firmware image {0}")]
    MissingImage(ImageKind),
    /// An image source could not supply a required image.
    #[error("firmware image {kind} unavailable: {reason}")]
    ImageUnavailable {
        /// Requested kind.
        kind: ImageKind,
        /// Source-specific reason.
        reason: String,
    },
    /// A bounded hardware wait ran out of attempts.
    #[error("timed out waiting for {what} after {attempts} attempts")]
    Timeout {
        /// What was being waited for.
        what: &'static str,
        /// Attempts made.
        attempts: u32,
    },
    /// A core did not report its boot signature.
    #[error("{processor} failed its boot check")]
    BootCheckFailed {
        /// Core that failed.
        processor: Processor,
    },
    /// The variant has no register map for the requested operation.
    #[error("{0} is not supported on this RPU variant")]
    Unsupported(&'static str),
    /// A core state transition was requested out of order.
    #[error("{processor} cannot move from {from} to {to}")]
    InvalidState {
        /// Core concerned.
        processor: Processor,
        /// Current state.
        from: CoreState,
        /// Requested state.
        to: CoreState,
    },
    /// The session already recorded a failed core.
    #[error("bring-up session failed; start a new session")]
    SessionFailed,
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RpuError {
    /// True for both flavours of firmware incompatibility.
    #[must_use]
    pub fn is_incompatible_firmware(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleVersion { .. } | Self::IncompatibleFeatures { .. }
        )
    }
}

impl From<ImageError> for RpuError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Truncated {
                offset,
                needed,
                size,
            } => Self::TruncatedImage {
                offset,
                needed,
                size,
            },
            ImageError::ImageCount { expected, found } => {
                Self::ImageCountMismatch { expected, found }
            }
            ImageError::IncompatibleVersion { expected, found } => {
                Self::IncompatibleVersion { expected, found }
            }
            ImageError::IncompatibleFeatures { required, found } => {
                Self::IncompatibleFeatures { required, found }
            }
            ImageError::TooLarge { kind, len } => Self::ImageUnavailable {
                kind,
                reason: format!("{len} bytes exceeds the container length field"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_incompatibilities_classify_together() {
        let version: RpuError = ImageError::IncompatibleVersion {
            expected: FwVersion::new(1, 2, 8, 1),
            found: FwVersion::new(1, 2, 9, 1),
        }
        .into();
        let features: RpuError = ImageError::IncompatibleFeatures {
            required: FeatureFlags::SYSTEM_MODE,
            found: FeatureFlags::RADIO_TEST,
        }
        .into();
        assert!(version.is_incompatible_firmware());
        assert!(features.is_incompatible_firmware());
        assert!(!RpuError::SessionFailed.is_incompatible_firmware());
    }

    #[test]
    fn count_mismatch_keeps_its_own_kind() {
        let err: RpuError = ImageError::ImageCount {
            expected: 4,
            found: 3,
        }
        .into();
        assert_eq!(
            err,
            RpuError::ImageCountMismatch {
                expected: 4,
                found: 3
            }
        );
    }
}
