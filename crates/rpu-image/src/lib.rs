// Author: Lukas Bower
// Purpose: Provide RPU firmware image types and the single-container codec.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Firmware image types and the single-container wire codec used to ship the
//! four RPU patch images (LMAC/UMAC, primary/secondary) in one file.
//!
//! The container is a 12-byte little-endian header followed by contiguous
//! `{type, length, data}` records. Decoding is zero-copy: every image in the
//! resulting [`FirmwareImageSet`] borrows from the input buffer.

mod container;
mod types;
mod version;

pub use container::{
    encode, parse, read_header, ContainerHeader, Expectations, ImageError, ParsedContainer, HEADER_LEN,
    PATCH_IMAGE_COUNT, RECORD_HEADER_LEN,
};
pub use types::{FirmwareImage, FirmwareImageSet, ImageKind};
pub use version::{FeatureFlags, FwVersion, VersionParseError};
