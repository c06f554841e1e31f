// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Zero-fill a named RPU memory region.
// Author: Lukas Bower

use core::ops::{Deref, DerefMut};

use log::{info, warn};

use super::mem::MemoryAccess;
use super::topology::{RegionKind, RegionName};
use super::{Bus, OffsetResolver, Processor};
use crate::error::{AddressFault, Result, RpuError};

/// Keeps the ROM gate asserted while alive and releases it on drop.
struct RomGateGuard<'a, B: Bus, R: OffsetResolver> {
    mem: &'a mut MemoryAccess<B, R>,
}

impl<'a, B: Bus, R: OffsetResolver> RomGateGuard<'a, B, R> {
    fn assert(mem: &'a mut MemoryAccess<B, R>) -> Result<Self> {
        mem.set_rom_gate(true)?;
        Ok(Self { mem })
    }
}

impl<B: Bus, R: OffsetResolver> Deref for RomGateGuard<'_, B, R> {
    type Target = MemoryAccess<B, R>;

    fn deref(&self) -> &Self::Target {
        self.mem
    }
}

impl<B: Bus, R: OffsetResolver> DerefMut for RomGateGuard<'_, B, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.mem
    }
}

impl<B: Bus, R: OffsetResolver> Drop for RomGateGuard<'_, B, R> {
    fn drop(&mut self) {
        if let Err(err) = self.mem.set_rom_gate(false) {
            warn!("[rpu-clear] failed to release ROM gate: {err}");
        }
    }
}

/// Zero-fill `name` for `processor` in 4-byte strides.
///
/// Stops at the first failed write without rolling back; clearing again is safe.
pub fn clear<B: Bus, R: OffsetResolver>(
    mem: &mut MemoryAccess<B, R>,
    processor: Processor,
    name: RegionName,
) -> Result<()> {
    let region = mem
        .topology()
        .region(processor, name)
        .ok_or(RpuError::InvalidAddress {
            processor,
            addr: 0,
            reason: AddressFault::UnknownRegion,
        })?;
    info!(
        "[rpu-clear] {processor} clearing {name} {:#010x}..={:#010x}",
        region.start, region.end
    );

    let fill = |mem: &mut MemoryAccess<B, R>| -> Result<()> {
        let zero = [0u8; 4];
        let mut addr = region.start;
        loop {
            let len = (region.end - addr).saturating_add(1).min(4) as usize;
            mem.write(processor, addr, &zero[..len])?;
            match addr.checked_add(4) {
                Some(next) if next <= region.end => addr = next,
                _ => return Ok(()),
            }
        }
    };

    if region.kind == RegionKind::Rom {
        let mut guard = RomGateGuard::assert(mem)?;
        fill(&mut *guard)
    } else {
        fill(mem)
    }
}
