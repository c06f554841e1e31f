// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Hardware seams for RPU memory access: processors, bus and offset resolution.
// Author: Lukas Bower

//! Hardware abstraction for the RPU address space.
//!
//! The bus transport and the address-to-offset tables are supplied by the host
//! integration through the [`Bus`] and [`OffsetResolver`] traits. Everything
//! above them (region classification, access policy, indirect windows, ROM
//! gating and low-power wake) lives in [`mem::MemoryAccess`].

use core::fmt;

use thiserror::Error;

/// Region zero-fill.
pub mod clear;
pub mod mem;
pub mod power;
pub mod regs;
pub mod topology;

/// One of the two RPU processor cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Processor {
    /// Lower MAC core.
    Lmac,
    /// Upper MAC core.
    Umac,
}

impl Processor {
    /// Both cores in bring-up order.
    pub const ALL: [Processor; 2] = [Processor::Lmac, Processor::Umac];

    /// Index into per-core tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Lmac => 0,
            Self::Umac => 1,
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lmac => "LMAC",
            Self::Umac => "UMAC",
        })
    }
}

/// Failure reported by the bus transport. Transactions that fail have no side effects.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("bus transaction failed at offset {offset:#x}")]
pub struct BusFault {
    /// Byte offset of the failed transaction.
    pub offset: u64,
}

/// Word and block access over the RPU link's byte-offset space.
pub trait Bus {
    /// Read one 32-bit word.
    fn read_word(&mut self, offset: u64) -> Result<u32, BusFault>;

    /// Write one 32-bit word.
    fn write_word(&mut self, offset: u64, value: u32) -> Result<(), BusFault>;

    /// Read `buf.len()` bytes starting at `offset`.
    fn read_block(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), BusFault>;

    /// Write `data` starting at `offset`.
    fn write_block(&mut self, offset: u64, data: &[u8]) -> Result<(), BusFault>;
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn read_word(&mut self, offset: u64) -> Result<u32, BusFault> {
        (**self).read_word(offset)
    }

    fn write_word(&mut self, offset: u64, value: u32) -> Result<(), BusFault> {
        (**self).write_word(offset, value)
    }

    fn read_block(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), BusFault> {
        (**self).read_block(offset, buf)
    }

    fn write_block(&mut self, offset: u64, data: &[u8]) -> Result<(), BusFault> {
        (**self).write_block(offset, data)
    }
}

/// Maps a processor-relative RPU address onto a bus offset.
pub trait OffsetResolver {
    /// Returns `None` when the address has no window on the link.
    fn resolve(&self, processor: Processor, addr: u32) -> Option<u64>;
}

/// Linear window of the RPU address space exposed on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Core the window belongs to; `None` applies to both.
    pub processor: Option<Processor>,
    /// First RPU address covered.
    pub start: u32,
    /// Last RPU address covered (inclusive).
    pub end: u32,
    /// Bus offset of `start`.
    pub base: u64,
}

impl Window {
    /// A window shared by both cores.
    #[must_use]
    pub const fn shared(start: u32, end: u32, base: u64) -> Self {
        Self {
            processor: None,
            start,
            end,
            base,
        }
    }

    /// A window private to one core.
    #[must_use]
    pub const fn private(processor: Processor, start: u32, end: u32, base: u64) -> Self {
        Self {
            processor: Some(processor),
            start,
            end,
            base,
        }
    }

    fn covers(&self, processor: Processor, addr: u32) -> bool {
        self.processor.map_or(true, |p| p == processor) && (self.start..=self.end).contains(&addr)
    }
}

/// Table-driven resolver; the first matching window wins.
#[derive(Debug, Clone, Default)]
pub struct WindowResolver {
    windows: Vec<Window>,
}

impl WindowResolver {
    /// Build a resolver from an ordered window list.
    #[must_use]
    pub fn new(windows: impl Into<Vec<Window>>) -> Self {
        Self {
            windows: windows.into(),
        }
    }

    /// Append a window with lower priority than the existing ones.
    pub fn push(&mut self, window: Window) {
        self.windows.push(window);
    }
}

impl OffsetResolver for WindowResolver {
    fn resolve(&self, processor: Processor, addr: u32) -> Option<u64> {
        self.windows
            .iter()
            .find(|w| w.covers(processor, addr))
            .map(|w| w.base + u64::from(addr - w.start))
    }
}

impl<R: OffsetResolver + ?Sized> OffsetResolver for &R {
    fn resolve(&self, processor: Processor, addr: u32) -> Option<u64> {
        (**self).resolve(processor, addr)
    }
}
