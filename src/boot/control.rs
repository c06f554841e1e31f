// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-core control register programming for reset, load and launch.
// Author: Lukas Bower

//! Processor control.
//!
//! [`CoreControl`] is the seam between the boot sequencer and the hardware.
//! [`RegisterControl`] drives it from the variant's [`CoreMap`] through the
//! memory access layer; tests substitute recording implementations.

use log::debug;

use crate::error::{AddressFault, Result, RpuError};
use crate::hal::mem::MemoryAccess;
use crate::hal::regs::{self, mips, CoreMap, Launch, BOOT_SIGNATURE};
use crate::hal::topology::{RegionKind, RegionName};
use crate::hal::{Bus, OffsetResolver, Processor};

/// Register-level operations the boot sequencer issues per core.
pub trait CoreControl {
    /// Request a soft reset.
    fn assert_reset(&mut self, processor: Processor) -> Result<()>;

    /// Whether the soft reset request has completed.
    fn reset_complete(&mut self, processor: Processor) -> Result<bool>;

    /// Transfer a full RAM image.
    fn load_ram(&mut self, processor: Processor, image: &[u8]) -> Result<()>;

    /// Start the core from its RAM image.
    fn boot_ram(&mut self, processor: Processor) -> Result<()>;

    /// Transfer the primary and secondary patch halves.
    fn load_patch(&mut self, processor: Processor, primary: &[u8], secondary: &[u8]) -> Result<()>;

    /// Start the core from ROM, optionally through the loaded patch.
    fn boot_rom(&mut self, processor: Processor, with_patch: bool) -> Result<()>;

    /// Program the global timer start-up sequence.
    fn start_timer(&mut self) -> Result<()>;

    /// Entry address a HEX image asks to be patched in at.
    fn hex_patch_address(&mut self, processor: Processor, image: &[u8]) -> Result<u32>;

    /// Write the patch entry address register.
    fn set_patch_address(&mut self, processor: Processor, addr: u32) -> Result<()>;

    /// Transfer a HEX image into code RAM.
    fn load_hex(&mut self, processor: Processor, image: &[u8]) -> Result<()>;

    /// Set the initial PC to the ROM entry and assert CPU run.
    fn launch_hex(&mut self, processor: Processor) -> Result<()>;

    /// Whether the boot signature is present.
    fn boot_signature(&mut self, processor: Processor) -> Result<bool>;
}

impl<C: CoreControl + ?Sized> CoreControl for &mut C {
    fn assert_reset(&mut self, processor: Processor) -> Result<()> {
        (**self).assert_reset(processor)
    }

    fn reset_complete(&mut self, processor: Processor) -> Result<bool> {
        (**self).reset_complete(processor)
    }

    fn load_ram(&mut self, processor: Processor, image: &[u8]) -> Result<()> {
        (**self).load_ram(processor, image)
    }

    fn boot_ram(&mut self, processor: Processor) -> Result<()> {
        (**self).boot_ram(processor)
    }

    fn load_patch(&mut self, processor: Processor, primary: &[u8], secondary: &[u8]) -> Result<()> {
        (**self).load_patch(processor, primary, secondary)
    }

    fn boot_rom(&mut self, processor: Processor, with_patch: bool) -> Result<()> {
        (**self).boot_rom(processor, with_patch)
    }

    fn start_timer(&mut self) -> Result<()> {
        (**self).start_timer()
    }

    fn hex_patch_address(&mut self, processor: Processor, image: &[u8]) -> Result<u32> {
        (**self).hex_patch_address(processor, image)
    }

    fn set_patch_address(&mut self, processor: Processor, addr: u32) -> Result<()> {
        (**self).set_patch_address(processor, addr)
    }

    fn load_hex(&mut self, processor: Processor, image: &[u8]) -> Result<()> {
        (**self).load_hex(processor, image)
    }

    fn launch_hex(&mut self, processor: Processor) -> Result<()> {
        (**self).launch_hex(processor)
    }

    fn boot_signature(&mut self, processor: Processor) -> Result<bool> {
        (**self).boot_signature(processor)
    }
}

/// [`CoreControl`] over the variant register maps.
pub struct RegisterControl<'a, B, R> {
    mem: &'a mut MemoryAccess<B, R>,
}

impl<'a, B: Bus, R: OffsetResolver> RegisterControl<'a, B, R> {
    /// Drive control registers through `mem`.
    pub fn new(mem: &'a mut MemoryAccess<B, R>) -> Self {
        Self { mem }
    }

    fn core(&self, processor: Processor) -> CoreMap {
        *self.mem.topology().core(processor)
    }

    fn code_ram_start(&self, processor: Processor) -> Result<u32> {
        self.mem
            .topology()
            .region(processor, RegionName::CodeRam)
            .map(|region| region.start)
            .ok_or(RpuError::Unsupported("code RAM"))
    }

    fn launch(&mut self, processor: Processor, entry: u32) -> Result<()> {
        match self.core(processor).launch {
            Launch::BootVector { control, run, .. } => {
                let vector: Vec<u8> = regs::mips_jump_vector(entry)
                    .iter()
                    .flat_map(|word| word.to_le_bytes())
                    .collect();
                self.mem.write(processor, mips::BEV_START, &vector)?;
                self.mem.reg_write(processor, control, run)
            }
            Launch::InitPc {
                init_pc,
                cpu_run,
                run,
            } => {
                self.mem.reg_write(processor, init_pc, entry)?;
                self.mem.reg_write(processor, cpu_run, run)
            }
        }
    }
}

impl<B: Bus, R: OffsetResolver> CoreControl for RegisterControl<'_, B, R> {
    fn assert_reset(&mut self, processor: Processor) -> Result<()> {
        let reset = self.core(processor).reset;
        self.mem.reg_write(processor, reset.addr, reset.mask)
    }

    fn reset_complete(&mut self, processor: Processor) -> Result<bool> {
        let reset = self.core(processor).reset;
        Ok(self.mem.reg_read(processor, reset.addr)? & reset.mask == 0)
    }

    fn load_ram(&mut self, processor: Processor, image: &[u8]) -> Result<()> {
        let addr = self.core(processor).ram_load;
        debug!("[rpu-boot] {processor} RAM image {} bytes at {addr:#010x}", image.len());
        self.mem.write(processor, addr, image)
    }

    fn boot_ram(&mut self, processor: Processor) -> Result<()> {
        let entry = self.core(processor).ram_load;
        self.launch(processor, entry)
    }

    fn load_patch(&mut self, processor: Processor, primary: &[u8], secondary: &[u8]) -> Result<()> {
        let core = self.core(processor);
        debug!(
            "[rpu-boot] {processor} patch pri {} bytes at {:#010x}, sec {} bytes at {:#010x}",
            primary.len(),
            core.patch_pri,
            secondary.len(),
            core.patch_sec
        );
        self.mem.write(processor, core.patch_pri, primary)?;
        self.mem.write(processor, core.patch_sec, secondary)
    }

    fn boot_rom(&mut self, processor: Processor, with_patch: bool) -> Result<()> {
        let core = self.core(processor);
        match core.launch {
            Launch::BootVector { patch_ctrl, .. } => {
                self.mem.reg_write(processor, patch_ctrl, u32::from(with_patch))?;
            }
            Launch::InitPc { .. } if with_patch => {
                self.set_patch_address(processor, core.patch_pri)?;
            }
            Launch::InitPc { .. } => {}
        }
        self.launch(processor, core.rom_entry)
    }

    fn start_timer(&mut self) -> Result<()> {
        for &(reg, value) in self.mem.topology().timer_init {
            self.mem.reg_write(Processor::Lmac, reg, value)?;
        }
        Ok(())
    }

    fn hex_patch_address(&mut self, processor: Processor, image: &[u8]) -> Result<u32> {
        let &[a, b, c, d, ..] = image else {
            return Err(RpuError::TruncatedImage {
                offset: 0,
                needed: 4,
                size: image.len(),
            });
        };
        let start = self.code_ram_start(processor)?;
        let addr = start
            .checked_add(u32::from_le_bytes([a, b, c, d]))
            .ok_or(RpuError::InvalidAddress {
                processor,
                addr: start,
                reason: AddressFault::Overrun,
            })?;
        match self.mem.classify(processor, addr) {
            Some(region) if region.kind == RegionKind::CodeRam => Ok(addr),
            _ => Err(RpuError::InvalidAddress {
                processor,
                addr,
                reason: AddressFault::Unmapped,
            }),
        }
    }

    fn set_patch_address(&mut self, processor: Processor, addr: u32) -> Result<()> {
        let reg = self
            .core(processor)
            .patch_addr_reg
            .ok_or(RpuError::Unsupported("patch address register"))?;
        self.mem.reg_write(processor, reg, addr)
    }

    fn load_hex(&mut self, processor: Processor, image: &[u8]) -> Result<()> {
        let start = self.code_ram_start(processor)?;
        debug!("[rpu-boot] {processor} HEX image {} bytes at {start:#010x}", image.len());
        self.mem.write(processor, start, image)
    }

    fn launch_hex(&mut self, processor: Processor) -> Result<()> {
        let core = self.core(processor);
        match core.launch {
            Launch::InitPc { .. } => self.launch(processor, core.rom_entry),
            Launch::BootVector { .. } => Err(RpuError::Unsupported("HEX launch")),
        }
    }

    fn boot_signature(&mut self, processor: Processor) -> Result<bool> {
        let addr = self.core(processor).boot_signature;
        Ok(self.mem.read_word(processor, addr)? == BOOT_SIGNATURE)
    }
}
