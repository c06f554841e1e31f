// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Device facade tying memory access, configuration and boot together.
// Author: Lukas Bower

//! The [`Rpu`] device handle.

use log::{info, warn};
use rpu_image::{FirmwareImageSet, FwVersion};

use crate::boot::{
    self, BootReport, BootSequencer, BootSession, CoreState, Delay, DeliveryMode, RegisterControl, StdDelay,
};
use crate::config::RpuConfig;
use crate::error::Result;
use crate::fw::{self, ImageSource};
use crate::hal::clear;
use crate::hal::mem::MemoryAccess;
use crate::hal::power::{PowerSave, PsLock};
use crate::hal::topology::RegionName;
use crate::hal::{Bus, OffsetResolver, Processor};

/// One RPU: its address space, configuration and current bring-up session.
///
/// Firmware is always delivered in the mode the crate was built for.
pub struct Rpu<B, R, D = StdDelay> {
    mem: MemoryAccess<B, R>,
    mode: DeliveryMode,
    config: RpuConfig,
    delay: D,
    session: BootSession,
}

impl<B: Bus, R: OffsetResolver> Rpu<B, R, StdDelay> {
    /// Device sleeping on the host clock between polls.
    pub fn new(bus: B, resolver: R, config: RpuConfig) -> Self {
        Self::with_delay(bus, resolver, config, StdDelay)
    }
}

impl<B: Bus, R: OffsetResolver, D: Delay> Rpu<B, R, D> {
    /// Device pacing polls through `delay`.
    pub fn with_delay(bus: B, resolver: R, config: RpuConfig, delay: D) -> Self {
        let topology = config.topology();
        let mut mem = MemoryAccess::new(bus, resolver, topology);
        if config.low_power {
            match topology.power {
                Some(regs) => {
                    mem = mem.with_power_save(PowerSave::new(regs, config.wake_spins, PsLock::new()));
                }
                None => warn!(
                    "[rpu-ps] low power requested but {:?} has no power-save registers",
                    topology.variant
                ),
            }
        }
        let mode = DeliveryMode::from_build();
        info!(
            "[rpu-boot] {:?} RPU, {mode} delivery, expecting firmware {}",
            topology.variant, config.expected_version
        );
        Self {
            mem,
            mode,
            config,
            delay,
            session: BootSession::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RpuConfig {
        &self.config
    }

    /// Delivery mode selected at build time.
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Handle to the power-save critical section, when low power is enabled.
    pub fn ps_lock(&self) -> Option<PsLock> {
        self.mem.power_save().map(|ps| ps.lock_handle().clone())
    }

    /// Shared access to the bus.
    pub fn bus(&self) -> &B {
        self.mem.bus()
    }

    /// Exclusive access to the bus.
    pub fn bus_mut(&mut self) -> &mut B {
        self.mem.bus_mut()
    }

    /// Release the bus and resolver.
    pub fn into_parts(self) -> (B, R) {
        self.mem.into_parts()
    }

    /// Read `len` bytes of RPU memory.
    pub fn mem_read(&mut self, processor: Processor, addr: u32, len: usize) -> Result<Vec<u8>> {
        self.mem.read(processor, addr, len)
    }

    /// Write RPU memory.
    pub fn mem_write(&mut self, processor: Processor, addr: u32, data: &[u8]) -> Result<()> {
        self.mem.write(processor, addr, data)
    }

    /// Zero-fill a named region.
    pub fn mem_clear(&mut self, processor: Processor, region: RegionName) -> Result<()> {
        clear::clear(&mut self.mem, processor, region)
    }

    /// Read a control register.
    pub fn reg_read(&mut self, processor: Processor, addr: u32) -> Result<u32> {
        self.mem.reg_read(processor, addr)
    }

    /// Write a control register.
    pub fn reg_write(&mut self, processor: Processor, addr: u32, value: u32) -> Result<()> {
        self.mem.reg_write(processor, addr, value)
    }

    /// Decode and validate a single-container firmware file.
    pub fn parse_firmware_container<'a>(&self, bytes: &'a [u8]) -> Result<FirmwareImageSet<'a>> {
        let parsed = rpu_image::parse(bytes, &self.config.expectations())?;
        let missing = parsed.images.missing(&rpu_image::ImageKind::PATCHES);
        if !missing.is_empty() {
            warn!("[rpu-image] container lacks {missing:?}");
        }
        Ok(parsed.images)
    }

    /// Load `images` in the build's delivery mode.
    pub fn load_firmware(&mut self, images: &FirmwareImageSet<'_>) -> Result<BootReport> {
        let control = RegisterControl::new(&mut self.mem);
        BootSequencer::new(
            control,
            &mut self.delay,
            &mut self.session,
            self.config.boot_policy(),
        )
        .run(self.mode, images)
    }

    /// Parse a container, check compatibility, then load it.
    ///
    /// Compatibility failures return before any hardware access.
    pub fn load_container(&mut self, bytes: &[u8]) -> Result<BootReport> {
        let images = self.parse_firmware_container(bytes)?;
        self.load_firmware(&images)
    }

    /// Fetch the delivery mode's images from `source` and load them.
    pub fn bring_up(&mut self, source: &mut dyn ImageSource) -> Result<BootReport> {
        let images = fw::collect_images(source, self.mode)?;
        self.load_firmware(&images)
    }

    /// Re-query both boot signatures. Session state is left untouched.
    pub fn check_boot(&mut self) -> Result<()> {
        let policy = self.config.boot_check;
        let mut control = RegisterControl::new(&mut self.mem);
        for processor in Processor::ALL {
            boot::check_boot(&mut control, &mut self.delay, policy, processor)?;
        }
        Ok(())
    }

    /// Firmware version reported by the running UMAC.
    pub fn firmware_version(&mut self) -> Result<FwVersion> {
        let addr = self.mem.topology().version_word;
        let word = self.mem.read_word(Processor::Umac, addr)?;
        Ok(FwVersion::from_word(word))
    }

    /// Boot state of `processor` in the current session.
    pub fn core_state(&self, processor: Processor) -> CoreState {
        self.session.state(processor)
    }

    /// Discard the current session so bring-up can start again.
    pub fn new_session(&mut self) {
        self.session = BootSession::new();
    }
}
