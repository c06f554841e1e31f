// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fetch firmware images for non-container delivery.
// Author: Lukas Bower

//! Firmware image sources.
//!
//! [`ImageSource`] is the fetch seam for delivery modes that take one file per
//! image. [`FsImageSource`] reads `<dir>/<kind>.bin`, e.g.
//! `lmac_patch_pri.bin`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rpu_image::{FirmwareImage, FirmwareImageSet, ImageKind};
use thiserror::Error;

use crate::boot::DeliveryMode;
use crate::error::{Result, RpuError};

/// Why a source could not supply an image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source has no such image.
    #[error("image not found")]
    NotFound,
    /// The image exists but could not be read.
    #[error("{0}")]
    Other(String),
}

/// Supplies firmware images by kind.
pub trait ImageSource {
    /// Fetch the bytes of `kind`.
    fn fetch(&mut self, kind: ImageKind) -> core::result::Result<Vec<u8>, FetchError>;
}

impl<S: ImageSource + ?Sized> ImageSource for &mut S {
    fn fetch(&mut self, kind: ImageKind) -> core::result::Result<Vec<u8>, FetchError> {
        (**self).fetch(kind)
    }
}

/// Reads images from a firmware directory.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    dir: PathBuf,
}

impl FsImageSource {
    /// Serve images from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path an image of `kind` is expected at.
    #[must_use]
    pub fn path_for(&self, kind: ImageKind) -> PathBuf {
        self.dir.join(format!("{}.bin", kind.as_str()))
    }

    /// Directory images are served from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSource for FsImageSource {
    fn fetch(&mut self, kind: ImageKind) -> core::result::Result<Vec<u8>, FetchError> {
        let path = self.path_for(kind);
        match fs::read(&path) {
            Ok(data) => {
                debug!("[rpu-boot] fetched {kind} ({} bytes) from {}", data.len(), path.display());
                Ok(data)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::NotFound),
            Err(e) => Err(FetchError::Other(format!("{}: {e}", path.display()))),
        }
    }
}

/// Fetch every image `mode` can use.
///
/// Unavailable patch images are skipped so the affected core boots from ROM;
/// any other unavailable image is an error.
pub fn collect_images(
    source: &mut dyn ImageSource,
    mode: DeliveryMode,
) -> Result<FirmwareImageSet<'static>> {
    let mut images = FirmwareImageSet::new();
    for &kind in mode.images() {
        match source.fetch(kind) {
            Ok(data) => {
                images.insert(FirmwareImage::owned(kind, data));
            }
            Err(FetchError::NotFound) if kind.is_patch() => {
                info!("[rpu-boot] no {kind} image; core will boot from ROM");
            }
            Err(FetchError::NotFound) => {
                return Err(RpuError::ImageUnavailable {
                    kind,
                    reason: "not found".into(),
                })
            }
            Err(FetchError::Other(reason)) => {
                return Err(RpuError::ImageUnavailable { kind, reason })
            }
        }
    }
    Ok(images)
}
