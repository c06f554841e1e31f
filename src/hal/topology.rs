// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Static per-variant RPU region tables and address classification.
// Author: Lukas Bower

//! Region tables for each RPU variant.
//!
//! A [`Topology`] is plain data: the region table, the per-core register maps,
//! the ROM gate location and a few variant switches. Classification is a pure
//! lookup over the table.

use core::fmt;

use bitflags::bitflags;
use serde::Deserialize;

use super::regs::{self, mips, vpr, CoreMap, PowerRegs};
use super::Processor;

/// Physical kind of a memory region; decides the access path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Shared general RAM.
    Ram,
    /// Boot ROM, writable only behind the ROM gate.
    Rom,
    /// Per-core instruction RAM.
    CodeRam,
    /// Data RAM.
    DataRam,
    /// Secure-domain RAM.
    SecureRam,
    /// Core-private memory reached through direct register writes.
    CoreDirect,
    /// Core memory reached through an address/data register pair.
    CoreIndirect,
    /// Boot exception vector window.
    BootVector,
}

impl RegionKind {
    /// RAM-class regions share the resolver-based block/word path.
    #[must_use]
    pub const fn is_ram_class(self) -> bool {
        matches!(self, Self::Ram | Self::CodeRam | Self::DataRam)
    }
}

/// Name of a region table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionName {
    /// General-purpose RAM (Mips).
    Gram,
    /// Packet RAM (Mips).
    PktRam,
    /// Core ROM (Mips, core direct).
    CoreRom,
    /// Core retention RAM (Mips, core direct).
    CoreRetention,
    /// Core scratch RAM (Mips, core direct).
    CoreScratch,
    /// Core indirect window (Mips).
    CoreIndirect,
    /// Boot exception vector (Mips).
    BootVector,
    /// RAM bank 0 (Vpr).
    Ram0,
    /// RAM bank 1 (Vpr).
    Ram1,
    /// ROM bank 0 (Vpr).
    Rom0,
    /// ROM bank 1 (Vpr).
    Rom1,
    /// Per-core code RAM (Vpr).
    CodeRam,
    /// Data RAM (Vpr).
    DataRam,
    /// Secure RAM (VprSecure).
    SecureRam,
}

impl RegionName {
    /// Upper-case name used in logs and by the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gram => "GRAM",
            Self::PktRam => "PKTRAM",
            Self::CoreRom => "CORE_ROM",
            Self::CoreRetention => "CORE_RETENTION",
            Self::CoreScratch => "CORE_SCRATCH",
            Self::CoreIndirect => "CORE_INDIRECT",
            Self::BootVector => "BOOT_VECTOR",
            Self::Ram0 => "RAM0",
            Self::Ram1 => "RAM1",
            Self::Rom0 => "ROM0",
            Self::Rom1 => "ROM1",
            Self::CodeRam => "CODE_RAM",
            Self::DataRam => "DATA_RAM",
            Self::SecureRam => "SECURE_RAM",
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Access capabilities of a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps: u8 {
        /// Host may read.
        const READ = 1 << 0;
        /// Host may write.
        const WRITE = 1 << 1;
        /// Writes require the ROM access gate.
        const GATED = 1 << 2;
        /// A word read of `0xFFFF_FFFF` signals a memory fault.
        const SENTINEL = 1 << 3;
    }
}

/// One entry of a region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Table name.
    pub name: RegionName,
    /// Access path.
    pub kind: RegionKind,
    /// First address.
    pub start: u32,
    /// Last address (inclusive).
    pub end: u32,
    /// Core the region belongs to; `None` is visible to both.
    pub scope: Option<Processor>,
    /// Capabilities.
    pub caps: Caps,
}

impl Region {
    const fn new(
        name: RegionName,
        kind: RegionKind,
        (start, end): (u32, u32),
        scope: Option<Processor>,
        caps: Caps,
    ) -> Self {
        Self {
            name,
            kind,
            start,
            end,
            scope,
            caps,
        }
    }

    /// Whether `processor` sees this region at `addr`.
    #[must_use]
    pub fn contains(&self, processor: Processor, addr: u32) -> bool {
        self.scope.map_or(true, |p| p == processor) && (self.start..=self.end).contains(&addr)
    }

    /// Whether `[addr, addr + len)` stays inside the region.
    #[must_use]
    pub fn fits(&self, addr: u32, len: usize) -> bool {
        match len {
            0 => true,
            n => u64::from(addr) + (n as u64 - 1) <= u64::from(self.end),
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }

    /// Host may read.
    #[must_use]
    pub fn readable(&self) -> bool {
        self.caps.contains(Caps::READ)
    }

    /// Host may write.
    #[must_use]
    pub fn writable(&self) -> bool {
        self.caps.contains(Caps::WRITE)
    }
}

/// Supported RPU silicon variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Legacy two-MIPS-core RPU.
    #[default]
    Mips,
    /// VPR cores without a secure domain.
    Vpr,
    /// VPR cores with secure RAM.
    VprSecure,
}

impl Variant {
    /// Static topology for this variant.
    #[must_use]
    pub fn topology(self) -> &'static Topology {
        match self {
            Self::Mips => &MIPS,
            Self::Vpr => &VPR,
            Self::VprSecure => &VPR_SECURE,
        }
    }
}

/// Everything variant-specific the access layer and sequencer need.
#[derive(Debug, PartialEq, Eq)]
pub struct Topology {
    /// Variant this table describes.
    pub variant: Variant,
    /// Region table in lookup order.
    pub regions: &'static [Region],
    /// Register maps indexed by [`Processor::index`].
    pub cores: [CoreMap; 2],
    /// ROM access gate register, if the variant has one.
    pub rom_gate: Option<u32>,
    /// Register writes that start the global timer before HEX boot.
    pub timer_init: &'static [(u32, u32)],
    /// Host-visible power-save registers, if the variant supports low power.
    pub power: Option<PowerRegs>,
    /// Address of the UMAC firmware version word.
    pub version_word: u32,
}

impl Topology {
    /// Classify `addr` as seen from `processor`.
    #[must_use]
    pub fn classify(&self, processor: Processor, addr: u32) -> Option<&'static Region> {
        self.regions.iter().find(|r| r.contains(processor, addr))
    }

    /// Look up a region by name for `processor`.
    #[must_use]
    pub fn region(&self, processor: Processor, name: RegionName) -> Option<&'static Region> {
        self.regions
            .iter()
            .find(|r| r.name == name && r.scope.map_or(true, |p| p == processor))
    }

    /// Register map for `processor`.
    #[must_use]
    pub fn core(&self, processor: Processor) -> &CoreMap {
        &self.cores[processor.index()]
    }
}

const RW: Caps = Caps::READ.union(Caps::WRITE);
const RW_SENTINEL: Caps = RW.union(Caps::SENTINEL);
const WO: Caps = Caps::WRITE;
const GATED: Caps = Caps::WRITE.union(Caps::GATED);
const LMAC: Option<Processor> = Some(Processor::Lmac);
const UMAC: Option<Processor> = Some(Processor::Umac);

static MIPS_REGIONS: [Region; 10] = [
    Region::new(RegionName::Gram, RegionKind::Ram, (mips::GRAM_START, mips::GRAM_END), None, RW),
    Region::new(RegionName::PktRam, RegionKind::Ram, (mips::PKTRAM_START, mips::PKTRAM_END), None, RW),
    Region::new(RegionName::BootVector, RegionKind::BootVector, (mips::BEV_START, mips::BEV_END), None, WO),
    Region::new(
        RegionName::CoreIndirect,
        RegionKind::CoreIndirect,
        (mips::CORE_INDIRECT_START, mips::CORE_INDIRECT_END),
        None,
        WO,
    ),
    Region::new(RegionName::CoreRom, RegionKind::CoreDirect, mips::LMAC_ROM, LMAC, WO),
    Region::new(RegionName::CoreRetention, RegionKind::CoreDirect, mips::LMAC_RETENTION, LMAC, WO),
    Region::new(RegionName::CoreScratch, RegionKind::CoreDirect, mips::LMAC_SCRATCH, LMAC, WO),
    Region::new(RegionName::CoreRom, RegionKind::CoreDirect, mips::UMAC_ROM, UMAC, WO),
    Region::new(RegionName::CoreRetention, RegionKind::CoreDirect, mips::UMAC_RETENTION, UMAC, WO),
    Region::new(RegionName::CoreScratch, RegionKind::CoreDirect, mips::UMAC_SCRATCH, UMAC, WO),
];

static VPR_REGIONS: [Region; 7] = [
    Region::new(RegionName::Ram0, RegionKind::Ram, vpr::RAM0, None, RW_SENTINEL),
    Region::new(RegionName::Ram1, RegionKind::Ram, vpr::RAM1, None, RW_SENTINEL),
    Region::new(RegionName::Rom0, RegionKind::Rom, vpr::ROM0, None, GATED),
    Region::new(RegionName::Rom1, RegionKind::Rom, vpr::ROM1, None, GATED),
    Region::new(RegionName::CodeRam, RegionKind::CodeRam, vpr::LMAC_CODE_RAM, LMAC, RW_SENTINEL),
    Region::new(RegionName::CodeRam, RegionKind::CodeRam, vpr::UMAC_CODE_RAM, UMAC, RW_SENTINEL),
    Region::new(RegionName::DataRam, RegionKind::DataRam, vpr::DATA_RAM, None, RW_SENTINEL),
];

static VPR_SECURE_REGIONS: [Region; 8] = [
    Region::new(RegionName::Ram0, RegionKind::Ram, vpr::RAM0, None, RW_SENTINEL),
    Region::new(RegionName::Ram1, RegionKind::Ram, vpr::RAM1, None, RW_SENTINEL),
    Region::new(RegionName::Rom0, RegionKind::Rom, vpr::ROM0, None, GATED),
    Region::new(RegionName::Rom1, RegionKind::Rom, vpr::ROM1, None, GATED),
    Region::new(RegionName::CodeRam, RegionKind::CodeRam, vpr::LMAC_CODE_RAM, LMAC, RW_SENTINEL),
    Region::new(RegionName::CodeRam, RegionKind::CodeRam, vpr::UMAC_CODE_RAM, UMAC, RW_SENTINEL),
    Region::new(RegionName::DataRam, RegionKind::DataRam, vpr::DATA_RAM, None, RW_SENTINEL),
    Region::new(RegionName::SecureRam, RegionKind::SecureRam, vpr::SECURE_RAM, None, WO),
];

/// Legacy MIPS topology.
pub static MIPS: Topology = Topology {
    variant: Variant::Mips,
    regions: &MIPS_REGIONS,
    cores: regs::MIPS_CORES,
    rom_gate: None,
    timer_init: &[],
    power: Some(regs::MIPS_POWER),
    version_word: mips::UMAC_VERSION,
};

/// VPR topology.
pub static VPR: Topology = Topology {
    variant: Variant::Vpr,
    regions: &VPR_REGIONS,
    cores: regs::VPR_CORES,
    rom_gate: Some(vpr::ROM_ACCESS_REG),
    timer_init: &regs::VPR_TIMER_INIT,
    power: None,
    version_word: vpr::UMAC_VERSION,
};

/// VPR topology with the secure domain enabled.
pub static VPR_SECURE: Topology = Topology {
    variant: Variant::VprSecure,
    regions: &VPR_SECURE_REGIONS,
    cores: regs::VPR_CORES,
    rom_gate: Some(vpr::ROM_ACCESS_REG),
    timer_init: &regs::VPR_TIMER_INIT,
    power: None,
    version_word: vpr::UMAC_VERSION,
};
