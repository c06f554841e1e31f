// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Firmware boot sequencer for the two RPU cores.
// Author: Lukas Bower

//! Boot sequencing.
//!
//! The sequencer drives reset, transfer, launch and boot-check for LMAC then
//! UMAC in one of three delivery modes:
//!
//! * **HEX**: start the global timer, then per core program the patch entry
//!   address, copy the image into code RAM, set the initial PC and run. A
//!   failed boot check is logged and the sequence carries on.
//! * **RAM**: per core reset, copy the RAM image, boot from RAM and verify.
//!   Any failure aborts.
//! * **ROM+PATCH**: per core either load both patch halves and boot through
//!   the patch, or boot straight from ROM when no patch is supplied. Any
//!   failure aborts.
//!
//! Polls are bounded by [`PollPolicy`] and paced through an injected [`Delay`].

use core::fmt;

use log::{error, info, warn};
use rpu_image::{FirmwareImageSet, ImageKind};

use crate::error::{Result, RpuError};
use crate::hal::Processor;

pub mod control;
/// Bounded polling.
pub mod poll;
/// Per-core state machine.
pub mod state;

pub use control::{CoreControl, RegisterControl};
pub use poll::{poll_until, Delay, PollPolicy, StdDelay};
pub use state::{BootSession, CoreState};

/// How firmware reaches the cores. Fixed per build and per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Monolithic replacement image per core.
    Hex,
    /// Full RAM image per core.
    Ram,
    /// ROM firmware with optional patch images.
    RomPatch,
}

impl DeliveryMode {
    /// Mode selected by the build's delivery feature.
    #[must_use]
    pub fn from_build() -> Self {
        match env!("RPU_DELIVERY_MODE") {
            "hex" => Self::Hex,
            "ram" => Self::Ram,
            _ => Self::RomPatch,
        }
    }

    /// Images the mode cannot run without.
    #[must_use]
    pub fn required_images(self) -> &'static [ImageKind] {
        match self {
            Self::Hex => &[ImageKind::LmacHex, ImageKind::UmacHex],
            Self::Ram => &[ImageKind::LmacRam, ImageKind::UmacRam],
            Self::RomPatch => &[],
        }
    }

    /// Every image the mode may use.
    #[must_use]
    pub fn images(self) -> &'static [ImageKind] {
        match self {
            Self::Hex | Self::Ram => self.required_images(),
            Self::RomPatch => &ImageKind::PATCHES,
        }
    }
}

impl Default for DeliveryMode {
    fn default() -> Self {
        Self::from_build()
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hex => "hex",
            Self::Ram => "ram",
            Self::RomPatch => "rom-patch",
        })
    }
}

/// Poll bounds used while sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootPolicy {
    /// Boot signature wait.
    pub boot_check: PollPolicy,
    /// Soft reset completion wait.
    pub reset: PollPolicy,
}

impl Default for BootPolicy {
    fn default() -> Self {
        Self {
            boot_check: PollPolicy::BOOT_CHECK,
            reset: PollPolicy::RESET,
        }
    }
}

/// Outcome for one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreReport {
    /// State at the end of the sequence.
    pub state: CoreState,
    /// Whether the boot signature was observed.
    pub signature_seen: bool,
}

/// Result of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// Mode the images were delivered in.
    pub mode: DeliveryMode,
    /// Per-core outcome indexed by [`Processor::index`].
    pub cores: [CoreReport; 2],
}

impl BootReport {
    /// Outcome for `processor`.
    #[must_use]
    pub fn core(&self, processor: Processor) -> &CoreReport {
        &self.cores[processor.index()]
    }

    /// True when both cores showed their boot signature.
    #[must_use]
    pub fn all_verified(&self) -> bool {
        self.cores.iter().all(|core| core.signature_seen)
    }
}

/// Poll the boot signature of `processor` until it appears.
pub fn check_boot<C, D>(
    control: &mut C,
    delay: &mut D,
    policy: PollPolicy,
    processor: Processor,
) -> Result<u32>
where
    C: CoreControl + ?Sized,
    D: Delay + ?Sized,
{
    poll_until(policy, delay, "boot signature", || {
        control.boot_signature(processor)
    })
}

/// Drives one load through a [`CoreControl`].
pub struct BootSequencer<'s, C, D: ?Sized> {
    control: C,
    delay: &'s mut D,
    session: &'s mut BootSession,
    policy: BootPolicy,
}

impl<'s, C: CoreControl, D: Delay + ?Sized> BootSequencer<'s, C, D> {
    /// Sequence against `session`, pacing polls with `delay`.
    pub fn new(control: C, delay: &'s mut D, session: &'s mut BootSession, policy: BootPolicy) -> Self {
        Self {
            control,
            delay,
            session,
            policy,
        }
    }

    /// Load `images` in `mode` and bring both cores up.
    ///
    /// Missing required images are reported before any hardware access.
    pub fn run(&mut self, mode: DeliveryMode, images: &FirmwareImageSet<'_>) -> Result<BootReport> {
        if self.session.is_failed() {
            return Err(RpuError::SessionFailed);
        }
        if let Some(kind) = images.missing(mode.required_images()).first() {
            error!("[rpu-boot] {mode} mode requires {kind}");
            return Err(RpuError::MissingImage(*kind));
        }
        if mode == DeliveryMode::RomPatch {
            for (pri, sec) in [
                (ImageKind::LmacPatchPri, ImageKind::LmacPatchSec),
                (ImageKind::UmacPatchPri, ImageKind::UmacPatchSec),
            ] {
                if images.data(pri).is_some() && images.data(sec).is_none() {
                    return Err(RpuError::MissingImage(sec));
                }
            }
        }

        info!("[rpu-boot] loading firmware in {mode} mode");
        let mut report = BootReport {
            mode,
            cores: [CoreReport::default(); 2],
        };
        if mode == DeliveryMode::Hex {
            self.control.start_timer()?;
        }
        for processor in Processor::ALL {
            let outcome = match mode {
                DeliveryMode::Hex => self.hex_core(processor, images),
                DeliveryMode::Ram => self.ram_core(processor, images),
                DeliveryMode::RomPatch => self.rom_patch_core(processor, images),
            };
            match outcome {
                Ok(signature_seen) => {
                    report.cores[processor.index()] = CoreReport {
                        state: self.session.state(processor),
                        signature_seen,
                    };
                }
                Err(err) => {
                    error!("[rpu-boot] {processor} bring-up failed: {err}");
                    // Precondition errors leave the core where it was.
                    if !matches!(err, RpuError::InvalidState { .. } | RpuError::MissingImage(_)) {
                        self.session.fail(processor);
                    }
                    return Err(err);
                }
            }
        }
        info!("[rpu-boot] firmware loaded in {mode} mode");
        Ok(report)
    }

    fn reset(&mut self, processor: Processor) -> Result<()> {
        self.session.advance(processor, CoreState::Reset)?;
        self.control.assert_reset(processor)?;
        let control = &mut self.control;
        poll_until(self.policy.reset, &mut *self.delay, "core reset", || {
            control.reset_complete(processor)
        })?;
        Ok(())
    }

    /// Fatal boot check used by RAM and ROM+PATCH modes.
    fn verify(&mut self, processor: Processor) -> Result<bool> {
        match check_boot(&mut self.control, &mut *self.delay, self.policy.boot_check, processor) {
            Ok(_) => {
                self.session.advance(processor, CoreState::VerifiedRunning)?;
                info!("[rpu-boot] {processor} booted");
                Ok(true)
            }
            Err(RpuError::Timeout { attempts, .. }) => {
                error!("[rpu-boot] {processor} boot signature missing after {attempts} polls");
                Err(RpuError::BootCheckFailed { processor })
            }
            Err(err) => Err(err),
        }
    }

    fn hex_core(&mut self, processor: Processor, images: &FirmwareImageSet<'_>) -> Result<bool> {
        let kind = match processor {
            Processor::Lmac => ImageKind::LmacHex,
            Processor::Umac => ImageKind::UmacHex,
        };
        let image = images.data(kind).ok_or(RpuError::MissingImage(kind))?;
        let entry = self.control.hex_patch_address(processor, image)?;
        self.control.set_patch_address(processor, entry)?;
        self.control.load_hex(processor, image)?;
        self.session.advance(processor, CoreState::Loaded)?;
        self.control.launch_hex(processor)?;
        self.session.advance(processor, CoreState::Booted)?;

        match check_boot(&mut self.control, &mut *self.delay, self.policy.boot_check, processor) {
            Ok(_) => {
                self.session.advance(processor, CoreState::VerifiedRunning)?;
                info!("[rpu-boot] {processor} booted from HEX image");
                Ok(true)
            }
            Err(err) => {
                warn!("[rpu-boot] {processor} boot check failed ({err}); continuing");
                Ok(false)
            }
        }
    }

    fn ram_core(&mut self, processor: Processor, images: &FirmwareImageSet<'_>) -> Result<bool> {
        let kind = match processor {
            Processor::Lmac => ImageKind::LmacRam,
            Processor::Umac => ImageKind::UmacRam,
        };
        let image = images.data(kind).ok_or(RpuError::MissingImage(kind))?;
        self.reset(processor)?;
        self.control.load_ram(processor, image)?;
        self.session.advance(processor, CoreState::Loaded)?;
        self.control.boot_ram(processor)?;
        self.session.advance(processor, CoreState::Booted)?;
        self.verify(processor)
    }

    fn rom_patch_core(&mut self, processor: Processor, images: &FirmwareImageSet<'_>) -> Result<bool> {
        let (pri, sec) = match processor {
            Processor::Lmac => (ImageKind::LmacPatchPri, ImageKind::LmacPatchSec),
            Processor::Umac => (ImageKind::UmacPatchPri, ImageKind::UmacPatchSec),
        };
        match images.data(pri) {
            Some(primary) => {
                let secondary = images.data(sec).ok_or(RpuError::MissingImage(sec))?;
                self.reset(processor)?;
                self.control.load_patch(processor, primary, secondary)?;
                self.session.advance(processor, CoreState::Loaded)?;
                self.control.boot_rom(processor, true)?;
            }
            None => {
                info!("[rpu-boot] {processor} has no patch; booting from ROM");
                self.session.select_rom(processor)?;
                self.control.boot_rom(processor, false)?;
            }
        }
        self.session.advance(processor, CoreState::Booted)?;
        self.verify(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        signature: [bool; 2],
    }

    impl CoreControl for Recorder {
        fn assert_reset(&mut self, p: Processor) -> Result<()> {
            self.calls.push(format!("{p} reset"));
            Ok(())
        }

        fn reset_complete(&mut self, _p: Processor) -> Result<bool> {
            Ok(true)
        }

        fn load_ram(&mut self, p: Processor, _image: &[u8]) -> Result<()> {
            self.calls.push(format!("{p} load_ram"));
            Ok(())
        }

        fn boot_ram(&mut self, p: Processor) -> Result<()> {
            self.calls.push(format!("{p} boot_ram"));
            Ok(())
        }

        fn load_patch(&mut self, p: Processor, _pri: &[u8], _sec: &[u8]) -> Result<()> {
            self.calls.push(format!("{p} load_patch"));
            Ok(())
        }

        fn boot_rom(&mut self, p: Processor, with_patch: bool) -> Result<()> {
            self.calls.push(format!("{p} boot_rom patch={with_patch}"));
            Ok(())
        }

        fn start_timer(&mut self) -> Result<()> {
            self.calls.push("timer".into());
            Ok(())
        }

        fn hex_patch_address(&mut self, _p: Processor, _image: &[u8]) -> Result<u32> {
            Ok(0x2800_0100)
        }

        fn set_patch_address(&mut self, p: Processor, addr: u32) -> Result<()> {
            self.calls.push(format!("{p} patch_addr {addr:#x}"));
            Ok(())
        }

        fn load_hex(&mut self, p: Processor, _image: &[u8]) -> Result<()> {
            self.calls.push(format!("{p} load_hex"));
            Ok(())
        }

        fn launch_hex(&mut self, p: Processor) -> Result<()> {
            self.calls.push(format!("{p} launch_hex"));
            Ok(())
        }

        fn boot_signature(&mut self, p: Processor) -> Result<bool> {
            Ok(self.signature[p.index()])
        }
    }

    struct NoDelay;

    impl Delay for NoDelay {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    fn quick() -> BootPolicy {
        BootPolicy {
            boot_check: PollPolicy {
                attempts: 3,
                interval_ms: 0,
            },
            reset: PollPolicy {
                attempts: 3,
                interval_ms: 0,
            },
        }
    }

    #[test]
    fn pure_rom_boot_skips_reset_and_transfer() {
        let mut control = Recorder {
            signature: [true, true],
            ..Recorder::default()
        };
        let mut session = BootSession::new();
        let images = FirmwareImageSet::new()
            .with(ImageKind::UmacPatchPri, b"pri")
            .with(ImageKind::UmacPatchSec, b"sec");
        let report = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::RomPatch, &images)
            .unwrap();
        assert!(report.all_verified());
        assert_eq!(
            control.calls,
            vec![
                "LMAC boot_rom patch=false",
                "UMAC reset",
                "UMAC load_patch",
                "UMAC boot_rom patch=true",
            ]
        );
    }

    #[test]
    fn pure_rom_reload_keeps_cores_running() {
        let mut control = Recorder {
            signature: [true, true],
            ..Recorder::default()
        };
        let mut session = BootSession::new();
        let images = FirmwareImageSet::new();
        for _ in 0..2 {
            let report = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
                .run(DeliveryMode::RomPatch, &images)
                .unwrap();
            assert!(report.all_verified());
        }
        assert_eq!(session.state(Processor::Lmac), CoreState::VerifiedRunning);
        assert_eq!(session.state(Processor::Umac), CoreState::VerifiedRunning);
        assert_eq!(control.calls.len(), 4);
    }

    #[test]
    fn out_of_order_load_leaves_session_usable() {
        let mut control = Recorder {
            signature: [true, true],
            ..Recorder::default()
        };
        let mut session = BootSession::new();
        let images = FirmwareImageSet::new()
            .with(ImageKind::LmacHex, b"lmac")
            .with(ImageKind::UmacHex, b"umac");
        BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::Hex, &images)
            .unwrap();
        let again = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::Hex, &images);
        assert_eq!(
            again,
            Err(RpuError::InvalidState {
                processor: Processor::Lmac,
                from: CoreState::VerifiedRunning,
                to: CoreState::Loaded,
            })
        );
        assert!(!session.is_failed());
        assert_eq!(session.state(Processor::Lmac), CoreState::VerifiedRunning);
    }

    #[test]
    fn primary_without_secondary_is_missing_before_any_call() {
        let mut control = Recorder::default();
        let mut session = BootSession::new();
        let images = FirmwareImageSet::new().with(ImageKind::LmacPatchPri, b"pri");
        let err = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::RomPatch, &images)
            .unwrap_err();
        assert_eq!(err, RpuError::MissingImage(ImageKind::LmacPatchSec));
        assert!(control.calls.is_empty());
    }

    #[test]
    fn failed_session_refuses_new_loads() {
        let mut control = Recorder::default();
        let mut session = BootSession::new();
        let images = FirmwareImageSet::new()
            .with(ImageKind::LmacRam, b"lmac")
            .with(ImageKind::UmacRam, b"umac");
        let first = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::Ram, &images);
        assert_eq!(
            first,
            Err(RpuError::BootCheckFailed {
                processor: Processor::Lmac
            })
        );
        let second = BootSequencer::new(&mut control, &mut NoDelay, &mut session, quick())
            .run(DeliveryMode::Ram, &images);
        assert_eq!(second, Err(RpuError::SessionFailed));
    }
}
