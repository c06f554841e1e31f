// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: In-memory bus double shared by the integration tests.
// Author: Lukas Bower
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use rpu_boot::boot::{BootPolicy, BootReport, BootSequencer, BootSession, CoreState, Delay, PollPolicy, RegisterControl};
use rpu_boot::hal::mem::MemoryAccess;
use rpu_boot::hal::regs::{mips, vpr, BOOT_SIGNATURE};
use rpu_boot::{
    Bus, BusFault, DeliveryMode, FirmwareImageSet, OffsetResolver, Processor, Result, RpuConfig, Variant,
};

/// One bus transaction as seen by the double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    ReadWord(u64),
    WriteWord(u64, u32),
    ReadBlock(u64, usize),
    WriteBlock(u64, usize),
}

impl Op {
    pub fn offset(&self) -> u64 {
        match *self {
            Op::ReadWord(o) | Op::WriteWord(o, _) | Op::ReadBlock(o, _) | Op::WriteBlock(o, _) => o,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Op::WriteWord(..) | Op::WriteBlock(..))
    }
}

/// Byte-addressed memory with a transaction log.
#[derive(Default)]
pub struct FakeBus {
    mem: HashMap<u64, u8>,
    pub ops: Vec<Op>,
    /// Bits cleared by hardware as soon as they are written.
    self_clearing: HashMap<u64, u32>,
    /// Offsets whose writes fail.
    failing_writes: HashSet<u64>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft reset bits of both variants complete immediately.
    pub fn with_self_clearing_resets(mut self) -> Self {
        for (addr, mask) in [
            (mips::LMAC_CONTROL, mips::CONTROL_SOFT_RESET),
            (mips::UMAC_CONTROL, mips::CONTROL_SOFT_RESET),
            (vpr::LMAC_RESET, vpr::RESET_REQ),
            (vpr::UMAC_RESET, vpr::RESET_REQ),
        ] {
            self.self_clearing.insert(u64::from(addr), mask);
        }
        self
    }

    pub fn fail_writes_at(&mut self, offset: u64) {
        self.failing_writes.insert(offset);
    }

    pub fn poke(&mut self, offset: u64, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.mem.insert(offset + i as u64, byte);
        }
    }

    pub fn peek(&self, offset: u64) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.mem.get(&(offset + i as u64)).copied().unwrap_or(0);
        }
        u32::from_le_bytes(bytes)
    }

    pub fn reads_of(&self, offset: u64) -> usize {
        self.ops.iter().filter(|op| **op == Op::ReadWord(offset)).count()
    }

    pub fn word_writes_to(&self, offset: u64) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                Op::WriteWord(o, v) if o == offset => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.ops.iter().filter(|op| op.is_write()).count()
    }

    fn check_write(&self, offset: u64) -> Result<(), BusFault> {
        if self.failing_writes.contains(&offset) {
            Err(BusFault { offset })
        } else {
            Ok(())
        }
    }
}

impl Bus for FakeBus {
    fn read_word(&mut self, offset: u64) -> Result<u32, BusFault> {
        self.ops.push(Op::ReadWord(offset));
        Ok(self.peek(offset))
    }

    fn write_word(&mut self, offset: u64, value: u32) -> Result<(), BusFault> {
        self.check_write(offset)?;
        self.ops.push(Op::WriteWord(offset, value));
        let mask = self.self_clearing.get(&offset).copied().unwrap_or(0);
        self.poke(offset, value & !mask);
        Ok(())
    }

    fn read_block(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), BusFault> {
        self.ops.push(Op::ReadBlock(offset, buf.len()));
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.mem.get(&(offset + i as u64)).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn write_block(&mut self, offset: u64, data: &[u8]) -> Result<(), BusFault> {
        self.check_write(offset)?;
        self.ops.push(Op::WriteBlock(offset, data.len()));
        for (i, byte) in data.iter().enumerate() {
            self.mem.insert(offset + i as u64, *byte);
        }
        Ok(())
    }
}

/// Identity mapping; UMAC's private core-direct space is lifted above 4 GiB.
pub struct FlatResolver;

pub const UMAC_PRIVATE: u64 = 1 << 32;

impl OffsetResolver for FlatResolver {
    fn resolve(&self, processor: Processor, addr: u32) -> Option<u64> {
        let private = (0x8000_0000..=0x800F_FFFF).contains(&addr);
        let base = if processor == Processor::Umac && private {
            UMAC_PRIVATE
        } else {
            0
        };
        Some(base + u64::from(addr))
    }
}

/// Delay that returns immediately and counts calls.
#[derive(Default)]
pub struct NoDelay {
    pub calls: u32,
}

impl Delay for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {
        self.calls += 1;
    }
}

/// Route `log` output through the test harness; `RUST_LOG` selects the level.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn quick_config(variant: Variant) -> RpuConfig {
    RpuConfig {
        variant,
        boot_check: PollPolicy {
            attempts: 20,
            interval_ms: 10,
        },
        reset: PollPolicy {
            attempts: 5,
            interval_ms: 1,
        },
        ..RpuConfig::default()
    }
}

/// Make a core's boot signature visible.
pub fn signal_booted(bus: &mut FakeBus, variant: Variant, processor: Processor) {
    let addr = match (variant, processor) {
        (Variant::Mips, Processor::Lmac) => mips::LMAC_BOOT_SIG,
        (Variant::Mips, Processor::Umac) => mips::UMAC_BOOT_SIG,
        (_, Processor::Lmac) => vpr::LMAC_BOOT_SIG,
        (_, Processor::Umac) => vpr::UMAC_BOOT_SIG,
    };
    bus.poke(u64::from(addr), BOOT_SIGNATURE);
}

/// Sequencer wired to a [`FakeBus`] with an explicit delivery mode.
///
/// The device facade always uses the build's mode; this drives the other
/// modes through the same register-level control path.
pub struct Rig {
    pub mem: MemoryAccess<FakeBus, FlatResolver>,
    pub session: BootSession,
    pub delay: NoDelay,
    policy: BootPolicy,
}

impl Rig {
    pub fn new(variant: Variant, bus: FakeBus) -> Self {
        init_logging();
        let config = quick_config(variant);
        Self {
            mem: MemoryAccess::new(bus, FlatResolver, config.topology()),
            session: BootSession::new(),
            delay: NoDelay::default(),
            policy: config.boot_policy(),
        }
    }

    pub fn load(&mut self, mode: DeliveryMode, images: &FirmwareImageSet<'_>) -> Result<BootReport> {
        BootSequencer::new(
            RegisterControl::new(&mut self.mem),
            &mut self.delay,
            &mut self.session,
            self.policy,
        )
        .run(mode, images)
    }

    pub fn state(&self, processor: Processor) -> CoreState {
        self.session.state(processor)
    }

    pub fn bus(&self) -> &FakeBus {
        self.mem.bus()
    }

    pub fn bus_mut(&mut self) -> &mut FakeBus {
        self.mem.bus_mut()
    }
}
