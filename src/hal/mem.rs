// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Region-aware read/write access to the RPU address space.
// Author: Lukas Bower

//! Region classification and access dispatch.
//!
//! Every access is classified against the variant [`Topology`], checked for
//! direction, range and alignment, then routed to the bus path its region
//! requires: resolver-backed block/word transfers for RAM, per-word register
//! writes for core-direct, boot-vector and secure memory, and the
//! address/data register pair for the core indirect window.

use log::{debug, trace};

use super::power::PowerSave;
use super::regs::{mips, vpr, IndirectRegs};
use super::topology::{Caps, Region, RegionKind, Topology};
use super::{Bus, OffsetResolver, Processor};
use crate::error::{Access, AddressFault, Result, RpuError};

/// Sentinel returned by unpowered or faulted RPU memory.
pub const FAULT_SENTINEL: u32 = 0xFFFF_FFFF;

/// Shared registers are resolved through the LMAC view.
const SHARED_VIEW: Processor = Processor::Lmac;

/// Memory access layer over an injected bus and offset resolver.
pub struct MemoryAccess<B, R> {
    bus: B,
    resolver: R,
    topology: &'static Topology,
    power: Option<PowerSave>,
    rom_gate: bool,
}

impl<B: Bus, R: OffsetResolver> MemoryAccess<B, R> {
    /// Build an access layer for `topology`.
    pub fn new(bus: B, resolver: R, topology: &'static Topology) -> Self {
        Self {
            bus,
            resolver,
            topology,
            power: None,
            rom_gate: false,
        }
    }

    /// Wrap RAM-class transactions in the low-power wake handshake.
    #[must_use]
    pub fn with_power_save(mut self, power: PowerSave) -> Self {
        self.power = Some(power);
        self
    }

    /// Topology in use.
    pub fn topology(&self) -> &'static Topology {
        self.topology
    }

    /// Low-power handshake, if enabled.
    pub fn power_save(&self) -> Option<&PowerSave> {
        self.power.as_ref()
    }

    /// Shared access to the bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Exclusive access to the bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus and resolver.
    pub fn into_parts(self) -> (B, R) {
        (self.bus, self.resolver)
    }

    /// Whether the ROM access gate is currently asserted.
    pub fn rom_gate_asserted(&self) -> bool {
        self.rom_gate
    }

    /// Classify `addr` as seen from `processor`.
    pub fn classify(&self, processor: Processor, addr: u32) -> Option<&'static Region> {
        self.topology.classify(processor, addr)
    }

    /// Read `len` bytes starting at `addr`. Only RAM-class regions are readable.
    pub fn read(&mut self, processor: Processor, addr: u32, len: usize) -> Result<Vec<u8>> {
        let region = self.locate(processor, addr, len, Access::Read)?;
        let mut buf = vec![0u8; len];
        if len == 0 {
            return Ok(buf);
        }
        let offset = self.resolve(processor, addr)?;
        // An asserted gate is released in the same woken transaction as the read.
        let gate = if self.rom_gate {
            Some(self.rom_gate_offset()?)
        } else {
            None
        };
        let mut released = false;
        let word = self.transact(|bus| {
            if let Some(gate) = gate {
                bus.write_word(gate, vpr::ROM_ACCESS_DISABLE)?;
                released = true;
            }
            if len == 4 {
                Ok(Some(bus.read_word(offset)?))
            } else {
                bus.read_block(offset, &mut buf)?;
                Ok(None)
            }
        });
        if released {
            self.rom_gate = false;
            debug!("[rpu-mem] ROM gate released");
        }
        if let Some(word) = word? {
            if word == FAULT_SENTINEL && region.caps.contains(Caps::SENTINEL) {
                return Err(RpuError::MemoryFault { processor, addr });
            }
            buf.copy_from_slice(&word.to_le_bytes());
        }
        Ok(buf)
    }

    /// Read one little-endian word.
    pub fn read_word(&mut self, processor: Processor, addr: u32) -> Result<u32> {
        let bytes = self.read(processor, addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write `data` starting at `addr` using the region's access path.
    ///
    /// Writes into ROM leave the ROM gate asserted; the caller reverts it.
    pub fn write(&mut self, processor: Processor, addr: u32, data: &[u8]) -> Result<()> {
        let region = self.locate(processor, addr, data.len(), Access::Write)?;
        if data.is_empty() {
            return Ok(());
        }
        trace!(
            "[rpu-mem] {processor} write {} bytes to {} at {addr:#010x}",
            data.len(),
            region.name
        );
        match region.kind {
            RegionKind::Ram | RegionKind::CodeRam | RegionKind::DataRam => {
                self.write_linear(processor, addr, data)
            }
            RegionKind::Rom => {
                if !self.rom_gate {
                    self.set_rom_gate(true)?;
                }
                self.write_linear(processor, addr, data)
            }
            RegionKind::SecureRam => self.write_words(processor, addr, data, addr),
            RegionKind::CoreDirect => {
                require_aligned(processor, addr)?;
                self.write_words(processor, addr, data, addr)
            }
            RegionKind::BootVector => {
                require_aligned(processor, addr)?;
                let base = self
                    .topology
                    .core(processor)
                    .bev_instr_base
                    .ok_or(RpuError::Unsupported("boot exception vector"))?;
                let target = base + (addr & mips::BEV_OFFSET_MASK);
                self.write_words(processor, addr, data, target)
            }
            RegionKind::CoreIndirect => {
                require_aligned(processor, addr)?;
                let regs = self
                    .topology
                    .core(processor)
                    .indirect
                    .ok_or(RpuError::Unsupported("core indirect window"))?;
                self.write_indirect(processor, addr, data, regs)
            }
        }
    }

    /// Read a control register; no region policy applies.
    pub fn reg_read(&mut self, processor: Processor, addr: u32) -> Result<u32> {
        let offset = self.resolve(processor, addr)?;
        Ok(self.bus.read_word(offset)?)
    }

    /// Write a control register; no region policy applies.
    pub fn reg_write(&mut self, processor: Processor, addr: u32, value: u32) -> Result<()> {
        let offset = self.resolve(processor, addr)?;
        trace!("[rpu-mem] {processor} reg {addr:#010x} <- {value:#010x}");
        Ok(self.bus.write_word(offset, value)?)
    }

    /// Assert or release the ROM access gate.
    pub fn set_rom_gate(&mut self, enable: bool) -> Result<()> {
        let offset = self.rom_gate_offset()?;
        let value = if enable {
            vpr::ROM_ACCESS_ENABLE
        } else {
            vpr::ROM_ACCESS_DISABLE
        };
        self.bus.write_word(offset, value)?;
        debug!(
            "[rpu-mem] ROM gate {}",
            if enable { "asserted" } else { "released" }
        );
        self.rom_gate = enable;
        Ok(())
    }

    fn rom_gate_offset(&self) -> Result<u64> {
        let reg = self
            .topology
            .rom_gate
            .ok_or(RpuError::Unsupported("ROM access gate"))?;
        self.resolve(SHARED_VIEW, reg)
    }

    fn locate(
        &self,
        processor: Processor,
        addr: u32,
        len: usize,
        access: Access,
    ) -> Result<&'static Region> {
        let region = self
            .classify(processor, addr)
            .ok_or(RpuError::InvalidAddress {
                processor,
                addr,
                reason: AddressFault::Unmapped,
            })?;
        let permitted = match access {
            Access::Read => region.readable(),
            Access::Write => region.writable(),
        };
        if !permitted {
            return Err(RpuError::AccessDenied {
                processor,
                addr,
                access,
            });
        }
        if !region.fits(addr, len) {
            return Err(RpuError::InvalidAddress {
                processor,
                addr,
                reason: AddressFault::Overrun,
            });
        }
        Ok(region)
    }

    fn resolve(&self, processor: Processor, addr: u32) -> Result<u64> {
        self.resolver
            .resolve(processor, addr)
            .ok_or(RpuError::InvalidAddress {
                processor,
                addr,
                reason: AddressFault::Unresolved,
            })
    }

    fn transact<T>(&mut self, op: impl FnOnce(&mut B) -> Result<T>) -> Result<T> {
        match &self.power {
            Some(power) => power.with_awake(&mut self.bus, op),
            None => op(&mut self.bus),
        }
    }

    fn write_linear(&mut self, processor: Processor, addr: u32, data: &[u8]) -> Result<()> {
        let offset = self.resolve(processor, addr)?;
        if let &[a, b, c, d] = data {
            let word = u32::from_le_bytes([a, b, c, d]);
            self.transact(|bus| Ok(bus.write_word(offset, word)?))
        } else {
            self.transact(|bus| Ok(bus.write_block(offset, data)?))
        }
    }

    /// One register write per word at `target`, `target + 4`, ...
    fn write_words(
        &mut self,
        processor: Processor,
        addr: u32,
        data: &[u8],
        target: u32,
    ) -> Result<()> {
        for (index, word) in words(data).enumerate() {
            let reg = target
                .checked_add(index as u32 * 4)
                .ok_or(RpuError::InvalidAddress {
                    processor,
                    addr,
                    reason: AddressFault::Overrun,
                })?;
            self.reg_write(processor, reg, word)?;
        }
        Ok(())
    }

    fn write_indirect(
        &mut self,
        processor: Processor,
        addr: u32,
        data: &[u8],
        regs: IndirectRegs,
    ) -> Result<()> {
        let word_index = (addr & mips::CORE_INDIRECT_OFFSET_MASK) >> 2;
        self.reg_write(processor, regs.ctrl, word_index)?;
        for word in words(data) {
            self.reg_write(processor, regs.wdata, word)?;
        }
        debug!(
            "[rpu-mem] {processor} indirect write of {} bytes at word {word_index:#x}",
            data.len()
        );
        Ok(())
    }
}

fn require_aligned(processor: Processor, addr: u32) -> Result<()> {
    if addr % 4 == 0 {
        Ok(())
    } else {
        Err(RpuError::InvalidAddress {
            processor,
            addr,
            reason: AddressFault::Unaligned,
        })
    }
}

/// Little-endian words of `data`, the last one zero-padded.
fn words(data: &[u8]) -> impl Iterator<Item = u32> + '_ {
    data.chunks(4).map(|chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(word)
    })
}
