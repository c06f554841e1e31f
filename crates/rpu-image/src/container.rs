// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decode and encode the single-container RPU firmware format.
// Author: Lukas Bower

//! Single-container codec.
//!
//! ```text
//! header  { image_count: u32, version: u32, feature_flags: u32 }
//! record  { type: u32, length: u32, data: [u8; length] }   x image_count
//! ```
//!
//! All fields are little-endian; records are contiguous with no padding.

use log::{debug, error, warn};
use thiserror::Error;

use crate::types::{FirmwareImage, FirmwareImageSet, ImageKind};
use crate::version::{FeatureFlags, FwVersion};

/// Size of the container header in bytes.
pub const HEADER_LEN: usize = 12;
/// Size of a record header (`type` + `length`) in bytes.
pub const RECORD_HEADER_LEN: usize = 8;
/// Number of images a patch container must carry.
pub const PATCH_IMAGE_COUNT: u32 = 4;

/// Errors raised while decoding or encoding a container.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// A header or record extends past the end of the buffer.
    #[error("truncated container: need {needed} bytes at offset {offset}, buffer holds {size}")]
    Truncated {
        /// Offset of the structure that did not fit.
        offset: usize,
        /// Bytes required from `offset`.
        needed: usize,
        /// Total buffer size.
        size: usize,
    },
    /// The header announces a different number of images than the build expects.
    #[error("invalid number of images: expected {expected}, got {found}")]
    ImageCount {
        /// Build expectation.
        expected: u32,
        /// Header value.
        found: u32,
    },
    /// The container version does not match the build exactly.
    #[error("incompatible firmware version {found}; build expects {expected}")]
    IncompatibleVersion {
        /// Build expectation.
        expected: FwVersion,
        /// Header value.
        found: FwVersion,
    },
    /// The container lacks the feature bit required by the build's operating mode.
    #[error("incompatible feature flags {found:?}; build requires {required:?}")]
    IncompatibleFeatures {
        /// Bits the build requires.
        required: FeatureFlags,
        /// Header value.
        found: FeatureFlags,
    },
    /// An image is too large to describe with a 32-bit length.
    #[error("image {kind} of {len} bytes exceeds the container length field")]
    TooLarge {
        /// Offending image.
        kind: ImageKind,
        /// Its size.
        len: usize,
    },
}

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Number of records following the header.
    pub image_count: u32,
    /// Packed firmware version.
    pub version: FwVersion,
    /// Advertised feature flags.
    pub features: FeatureFlags,
}

/// What the running build requires of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectations {
    /// Required record count.
    pub image_count: u32,
    /// Exact version the build was made against.
    pub version: FwVersion,
    /// Feature bits that must be present; empty disables the check.
    pub required_features: FeatureFlags,
}

impl Expectations {
    /// Expectations for a patch container built against `version`.
    #[must_use]
    pub fn new(version: FwVersion, required_features: FeatureFlags) -> Self {
        Self {
            image_count: PATCH_IMAGE_COUNT,
            version,
            required_features,
        }
    }

    /// Check a decoded header against these expectations.
    pub fn check(&self, header: &ContainerHeader) -> Result<(), ImageError> {
        if header.image_count != self.image_count {
            return Err(ImageError::ImageCount {
                expected: self.image_count,
                found: header.image_count,
            });
        }
        if header.version != self.version {
            return Err(ImageError::IncompatibleVersion {
                expected: self.version,
                found: header.version,
            });
        }
        if self.required_features.is_empty() {
            error!(
                "[rpu-image] no operating mode configured; feature flags {:#x} not validated",
                header.features.bits()
            );
        } else if !header.features.contains(self.required_features) {
            return Err(ImageError::IncompatibleFeatures {
                required: self.required_features,
                found: header.features,
            });
        }
        Ok(())
    }
}

/// Result of a successful [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer<'a> {
    /// Validated header.
    pub header: ContainerHeader,
    /// Zero-copy views of the recognised images.
    pub images: FirmwareImageSet<'a>,
}

/// Decode only the header of a container.
pub fn read_header(bytes: &[u8]) -> Result<ContainerHeader, ImageError> {
    let mut cursor = Cursor::new(bytes);
    let image_count = cursor.read_u32()?;
    let version = FwVersion::from_word(cursor.read_u32()?);
    let features = FeatureFlags::from_bits_retain(cursor.read_u32()?);
    Ok(ContainerHeader {
        image_count,
        version,
        features,
    })
}

/// Decode and validate a container against the build expectations.
///
/// Records with unknown types are skipped. Slots the container does not fill
/// are left empty; use [`FirmwareImageSet::missing`] to find them.
pub fn parse<'a>(bytes: &'a [u8], expect: &Expectations) -> Result<ParsedContainer<'a>, ImageError> {
    let header = read_header(bytes)?;
    debug!(
        "[rpu-image] container: images={} version={} features={:#x}",
        header.image_count,
        header.version,
        header.features.bits()
    );
    expect.check(&header)?;

    let mut cursor = Cursor::new(bytes);
    cursor.skip(HEADER_LEN)?;
    let mut images = FirmwareImageSet::new();
    for index in 0..header.image_count {
        let record_start = cursor.position();
        let ty = cursor.read_u32()?;
        let len = cursor.read_u32()? as usize;
        let data = cursor.take(len).map_err(|_| ImageError::Truncated {
            offset: record_start,
            needed: RECORD_HEADER_LEN.saturating_add(len),
            size: bytes.len(),
        })?;
        debug!("[rpu-image] record[{index}] type={ty} len={len}");
        match ImageKind::from_container_type(ty) {
            Some(kind) => {
                if images.insert(FirmwareImage::borrowed(kind, data)).is_some() {
                    warn!("[rpu-image] record[{index}] duplicates {kind}; keeping the later copy");
                }
            }
            None => warn!("[rpu-image] record[{index}] has unknown type {ty}; skipped"),
        }
    }
    Ok(ParsedContainer { header, images })
}

/// Encode the container-typed images of `images` into the wire format.
///
/// Images that do not travel in containers (RAM/HEX kinds) are ignored.
pub fn encode(
    version: FwVersion,
    features: FeatureFlags,
    images: &FirmwareImageSet<'_>,
) -> Result<Vec<u8>, ImageError> {
    let records: Vec<(u32, &[u8])> = images
        .iter()
        .filter_map(|image| image.kind().container_type().map(|ty| (ty, image.data())))
        .collect();

    let total = HEADER_LEN
        + records
            .iter()
            .map(|(_, data)| RECORD_HEADER_LEN + data.len())
            .sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&version.to_word().to_le_bytes());
    out.extend_from_slice(&features.bits().to_le_bytes());
    for (ty, data) in records {
        let len: u32 = data.len().try_into().map_err(|_| ImageError::TooLarge {
            kind: ImageKind::PATCHES[ty as usize],
            len: data.len(),
        })?;
        out.extend_from_slice(&ty.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(data);
    }
    Ok(out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ImageError::Truncated {
                offset: self.pos,
                needed: len,
                size: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ImageError> {
        self.take(len).map(|_| ())
    }

    fn read_u32(&mut self) -> Result<u32, ImageError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}
