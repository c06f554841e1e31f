// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v2.0
// Date Modified: 2027-09-02
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Bring-up core for the RPU radio coprocessor.
//!
//! The crate provides the region-aware memory access primitive every higher
//! layer uses to reach RPU memory, and the boot sequencer that resets, loads
//! and verifies the LMAC and UMAC cores. Transport and address translation are
//! injected through [`hal::Bus`] and [`hal::OffsetResolver`].

/// Boot sequencing, processor control and bounded polling.
pub mod boot;
/// Configuration loading and build-time constants.
pub mod config;
/// Device facade.
pub mod device;
/// Error type.
pub mod error;
/// Firmware image sources.
pub mod fw;
/// Address space, region tables and access paths.
pub mod hal;

pub use boot::{BootReport, CoreState, Delay, DeliveryMode, PollPolicy, StdDelay};
pub use config::{OperatingMode, RpuConfig};
pub use device::Rpu;
pub use error::{AddressFault, Result, RpuError};
pub use fw::{FetchError, FsImageSource, ImageSource};
pub use hal::topology::{RegionKind, RegionName, Variant};
pub use hal::{Bus, BusFault, OffsetResolver, Processor, Window, WindowResolver};
pub use rpu_image::{FeatureFlags, FirmwareImage, FirmwareImageSet, FwVersion, ImageKind};
