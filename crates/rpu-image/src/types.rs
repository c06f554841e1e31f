// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed firmware image views handed to the RPU boot sequencer.
// Author: Lukas Bower

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Firmware image kinds understood by the boot sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageKind {
    /// LMAC primary patch (entry image).
    LmacPatchPri,
    /// LMAC secondary patch (code image).
    LmacPatchSec,
    /// UMAC primary patch (entry image).
    UmacPatchPri,
    /// UMAC secondary patch (code image).
    UmacPatchSec,
    /// Full LMAC RAM image.
    LmacRam,
    /// Full UMAC RAM image.
    UmacRam,
    /// Monolithic LMAC replacement image.
    LmacHex,
    /// Monolithic UMAC replacement image.
    UmacHex,
}

impl ImageKind {
    /// Kinds carried in the single-container format, in wire type order.
    pub const PATCHES: [ImageKind; 4] = [
        ImageKind::LmacPatchPri,
        ImageKind::LmacPatchSec,
        ImageKind::UmacPatchPri,
        ImageKind::UmacPatchSec,
    ];

    /// Map a container record type to its image slot.
    #[must_use]
    pub fn from_container_type(ty: u32) -> Option<Self> {
        Self::PATCHES.get(usize::try_from(ty).ok()?).copied()
    }

    /// Container record type for this kind, if it travels in a container.
    #[must_use]
    pub fn container_type(self) -> Option<u32> {
        Self::PATCHES
            .iter()
            .position(|kind| *kind == self)
            .map(|idx| idx as u32)
    }

    /// Patch images are optional: a core without one boots from ROM.
    #[must_use]
    pub fn is_patch(self) -> bool {
        self.container_type().is_some()
    }

    /// Short lowercase name used for file lookup and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LmacPatchPri => "lmac_patch_pri",
            Self::LmacPatchSec => "lmac_patch_sec",
            Self::UmacPatchPri => "umac_patch_pri",
            Self::UmacPatchSec => "umac_patch_sec",
            Self::LmacRam => "lmac_ram",
            Self::UmacRam => "umac_ram",
            Self::LmacHex => "lmac_hex",
            Self::UmacHex => "umac_hex",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only firmware image, either borrowed from a container or owned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage<'a> {
    kind: ImageKind,
    data: Cow<'a, [u8]>,
}

impl<'a> FirmwareImage<'a> {
    /// Wrap a zero-copy view into a caller-owned buffer.
    #[must_use]
    pub fn borrowed(kind: ImageKind, data: &'a [u8]) -> Self {
        Self {
            kind,
            data: Cow::Borrowed(data),
        }
    }

    /// Wrap bytes produced by an image fetcher.
    #[must_use]
    pub fn owned(kind: ImageKind, data: Vec<u8>) -> FirmwareImage<'static> {
        FirmwareImage {
            kind,
            data: Cow::Owned(data),
        }
    }

    /// Image kind.
    #[must_use]
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// The images available for one bring-up attempt, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareImageSet<'a> {
    images: BTreeMap<ImageKind, FirmwareImage<'a>>,
}

impl<'a> FirmwareImageSet<'a> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image, returning any image previously stored for the same kind.
    pub fn insert(&mut self, image: FirmwareImage<'a>) -> Option<FirmwareImage<'a>> {
        self.images.insert(image.kind(), image)
    }

    /// Builder-style insert of a borrowed image.
    #[must_use]
    pub fn with(mut self, kind: ImageKind, data: &'a [u8]) -> Self {
        self.insert(FirmwareImage::borrowed(kind, data));
        self
    }

    /// Look up an image by kind.
    #[must_use]
    pub fn get(&self, kind: ImageKind) -> Option<&FirmwareImage<'a>> {
        self.images.get(&kind)
    }

    /// Bytes of an image, if present and non-empty.
    #[must_use]
    pub fn data(&self, kind: ImageKind) -> Option<&[u8]> {
        self.get(kind).map(FirmwareImage::data).filter(|d| !d.is_empty())
    }

    /// Kinds from `expected` that are absent (or empty) in this set.
    #[must_use]
    pub fn missing(&self, expected: &[ImageKind]) -> Vec<ImageKind> {
        expected
            .iter()
            .copied()
            .filter(|kind| self.data(*kind).is_none())
            .collect()
    }

    /// Number of images in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the set holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterate images in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &FirmwareImage<'a>> {
        self.images.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_types_follow_patch_order() {
        assert_eq!(ImageKind::from_container_type(0), Some(ImageKind::LmacPatchPri));
        assert_eq!(ImageKind::from_container_type(3), Some(ImageKind::UmacPatchSec));
        assert_eq!(ImageKind::from_container_type(4), None);
        assert_eq!(ImageKind::UmacPatchPri.container_type(), Some(2));
        assert_eq!(ImageKind::LmacRam.container_type(), None);
        assert!(!ImageKind::UmacHex.is_patch());
    }

    #[test]
    fn missing_treats_empty_images_as_absent() {
        let set = FirmwareImageSet::new()
            .with(ImageKind::LmacPatchPri, &[1, 2, 3])
            .with(ImageKind::LmacPatchSec, &[]);
        assert_eq!(
            set.missing(&ImageKind::PATCHES),
            vec![
                ImageKind::LmacPatchSec,
                ImageKind::UmacPatchPri,
                ImageKind::UmacPatchSec
            ]
        );
    }
}
