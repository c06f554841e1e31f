// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: RPU address map constants and per-core control register maps.
// Author: Lukas Bower

//! Address map and control-register layout for each RPU variant.
//!
//! Regions are described in [`super::topology`]; this module holds the raw
//! addresses and the per-core [`CoreMap`] that processor control is driven
//! from. Nothing here touches hardware.

/// Legacy two-MIPS-core RPU.
pub mod mips {
    /// Shared general-purpose RAM.
    pub const GRAM_START: u32 = 0xB700_0000;
    /// End of GRAM (inclusive).
    pub const GRAM_END: u32 = 0xB701_01FF;
    /// Packet RAM.
    pub const PKTRAM_START: u32 = 0xB000_0000;
    /// End of packet RAM (inclusive).
    pub const PKTRAM_END: u32 = 0xB003_0FFF;
    /// Boot exception vector window.
    pub const BEV_START: u32 = 0xBFC0_0000;
    /// End of the boot exception vector window (inclusive).
    pub const BEV_END: u32 = 0xBFCF_FFFF;
    /// Offset mask applied to BEV addresses before remapping.
    pub const BEV_OFFSET_MASK: u32 = 0x000F_FFFF;
    /// Core indirect memory window.
    pub const CORE_INDIRECT_START: u32 = 0xC000_0000;
    /// End of the core indirect window (inclusive).
    pub const CORE_INDIRECT_END: u32 = 0xC0FF_FFFF;
    /// Offset mask applied to core indirect addresses.
    pub const CORE_INDIRECT_OFFSET_MASK: u32 = 0x00FF_FFFF;

    /// LMAC core ROM (core direct).
    pub const LMAC_ROM: (u32, u32) = (0x8000_0000, 0x8003_3FFF);
    /// LMAC retention RAM (core direct).
    pub const LMAC_RETENTION: (u32, u32) = (0x8004_0000, 0x8004_BFFF);
    /// LMAC scratch RAM (core direct).
    pub const LMAC_SCRATCH: (u32, u32) = (0x8008_0000, 0x8008_FFFF);
    /// UMAC core ROM (core direct).
    pub const UMAC_ROM: (u32, u32) = (0x8000_0000, 0x8005_FFFF);
    /// UMAC retention RAM (core direct).
    pub const UMAC_RETENTION: (u32, u32) = (0x8008_0000, 0x800A_3FFF);
    /// UMAC scratch RAM (core direct).
    pub const UMAC_SCRATCH: (u32, u32) = (0x800C_0000, 0x800C_FFFF);

    /// LMAC MCU control register.
    pub const LMAC_CONTROL: u32 = 0xA400_0000;
    /// UMAC MCU control register.
    pub const UMAC_CONTROL: u32 = 0xA400_0100;
    /// Control bit: run the core.
    pub const CONTROL_RUN: u32 = 1 << 0;
    /// Control bit: soft reset, self-clearing once the core is in reset.
    pub const CONTROL_SOFT_RESET: u32 = 1 << 1;
    /// LMAC core memory address-control register.
    pub const LMAC_CORE_MEM_CTRL: u32 = 0xA400_0030;
    /// LMAC core memory write-data register.
    pub const LMAC_CORE_MEM_WDATA: u32 = 0xA400_0034;
    /// UMAC core memory address-control register.
    pub const UMAC_CORE_MEM_CTRL: u32 = 0xA400_0130;
    /// UMAC core memory write-data register.
    pub const UMAC_CORE_MEM_WDATA: u32 = 0xA400_0134;
    /// LMAC boot exception instruction register 0 (BEV base remaps here).
    pub const LMAC_BOOT_EXCP_INSTR_0: u32 = 0xA400_0050;
    /// UMAC boot exception instruction register 0.
    pub const UMAC_BOOT_EXCP_INSTR_0: u32 = 0xA400_0150;
    /// LMAC patch-present flag consumed by the ROM loader.
    pub const LMAC_PATCH_CTRL: u32 = 0xA400_2C2C;
    /// UMAC patch-present flag consumed by the ROM loader.
    pub const UMAC_PATCH_CTRL: u32 = 0xA400_2C30;

    /// LMAC boot signature location.
    pub const LMAC_BOOT_SIG: u32 = 0xB700_0D50;
    /// UMAC boot signature location.
    pub const UMAC_BOOT_SIG: u32 = 0xB700_6000;
    /// UMAC firmware version word.
    pub const UMAC_VERSION: u32 = 0xB700_0010;

    /// Primary patch load address (LMAC retention RAM).
    pub const LMAC_PATCH_PRI: u32 = 0x8004_4000;
    /// Secondary patch load address (LMAC retention RAM).
    pub const LMAC_PATCH_SEC: u32 = 0x8004_0000;
    /// Primary patch load address (UMAC retention RAM).
    pub const UMAC_PATCH_PRI: u32 = 0x8009_8000;
    /// Secondary patch load address (UMAC retention RAM).
    pub const UMAC_PATCH_SEC: u32 = 0x8008_0000;

    /// Link-level power-save control offset.
    pub const PS_CTRL_OFFSET: u64 = 0x0004_0000;
    /// Link-level power-save status offset.
    pub const PS_STATUS_OFFSET: u64 = 0x0004_0004;
}

/// Newer RPU with VPR cores, split code/data RAM and a ROM access gate.
pub mod vpr {
    /// Shared RAM bank 0.
    pub const RAM0: (u32, u32) = (0x2000_0000, 0x2003_FFFF);
    /// Shared RAM bank 1.
    pub const RAM1: (u32, u32) = (0x2004_0000, 0x2007_FFFF);
    /// ROM bank 0 (writable only while the ROM gate is asserted).
    pub const ROM0: (u32, u32) = (0x1000_0000, 0x1003_FFFF);
    /// ROM bank 1.
    pub const ROM1: (u32, u32) = (0x1004_0000, 0x1007_FFFF);
    /// LMAC code RAM.
    pub const LMAC_CODE_RAM: (u32, u32) = (0x2800_0000, 0x2801_FFFF);
    /// UMAC code RAM.
    pub const UMAC_CODE_RAM: (u32, u32) = (0x2802_0000, 0x2803_FFFF);
    /// Shared data RAM.
    pub const DATA_RAM: (u32, u32) = (0x2F00_0000, 0x2F03_FFFF);
    /// Secure RAM, present on secure-domain parts only.
    pub const SECURE_RAM: (u32, u32) = (0x3000_0000, 0x3000_FFFF);

    /// ROM access gate register.
    pub const ROM_ACCESS_REG: u32 = 0x5F0C_0000;
    /// Gate value enabling ROM writes.
    pub const ROM_ACCESS_ENABLE: u32 = 1;
    /// Gate value restoring normal RAM access.
    pub const ROM_ACCESS_DISABLE: u32 = 0;

    /// LMAC (VPR0) patch address register.
    pub const LMAC_PATCH_ADDR_REG: u32 = 0x5F0C_1000;
    /// UMAC (VPR1) patch address register.
    pub const UMAC_PATCH_ADDR_REG: u32 = 0x5F0C_1004;
    /// LMAC initial program counter.
    pub const LMAC_INITPC: u32 = 0x5F10_0808;
    /// UMAC initial program counter.
    pub const UMAC_INITPC: u32 = 0x5F10_1808;
    /// LMAC CPU run register.
    pub const LMAC_CPURUN: u32 = 0x5F10_0800;
    /// UMAC CPU run register.
    pub const UMAC_CPURUN: u32 = 0x5F10_1800;
    /// Value written to a CPU run register to start the core.
    pub const CPURUN_START: u32 = 1;
    /// LMAC reset register.
    pub const LMAC_RESET: u32 = 0x5F10_0000;
    /// UMAC reset register.
    pub const UMAC_RESET: u32 = 0x5F10_1000;
    /// Reset request bit, self-clearing.
    pub const RESET_REQ: u32 = 1;

    /// Global real-time counter clock configuration.
    pub const GRTC_CLKCFG: u32 = 0x5F0E_0710;
    /// Global real-time counter mode.
    pub const GRTC_MODE: u32 = 0x5F0E_0510;
    /// Global real-time counter start task.
    pub const GRTC_TASKS_START: u32 = 0x5F0E_0060;

    /// LMAC boot signature location.
    pub const LMAC_BOOT_SIG: u32 = 0x2F00_0D50;
    /// UMAC boot signature location.
    pub const UMAC_BOOT_SIG: u32 = 0x2F00_6000;
    /// UMAC firmware version word.
    pub const UMAC_VERSION: u32 = 0x2F00_0010;
}

/// Boot signature written by firmware once a core is executing.
pub const BOOT_SIGNATURE: u32 = 0x5A5A_5A5A;

/// Host-visible power-save registers on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerRegs {
    /// Bus offset of the wake control register.
    pub ctrl: u64,
    /// Value requesting wake.
    pub wake: u32,
    /// Bus offset of the power-save status register.
    pub status: u64,
    /// Status bit set while the RPU is awake.
    pub awake: u32,
}

/// Address/data register pair for core indirect writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectRegs {
    /// Address-control register (takes a word index).
    pub ctrl: u32,
    /// Data register (auto-increments per write).
    pub wdata: u32,
}

/// Register and mask used to soft-reset a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReg {
    /// Register address.
    pub addr: u32,
    /// Self-clearing request bit.
    pub mask: u32,
}

/// How a core is started once its image is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Write a jump sequence into the boot exception vector, then set the run bit.
    BootVector {
        /// MCU control register.
        control: u32,
        /// Run bit in `control`.
        run: u32,
        /// Patch-present flag register read by the ROM loader.
        patch_ctrl: u32,
    },
    /// Program the initial PC register, then write the CPU run register.
    InitPc {
        /// Initial PC register.
        init_pc: u32,
        /// CPU run register.
        cpu_run: u32,
        /// Value starting the core.
        run: u32,
    },
}

/// Per-core register map and well-known addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreMap {
    /// Soft reset register.
    pub reset: ResetReg,
    /// Launch mechanism.
    pub launch: Launch,
    /// Indirect window registers, on variants that have one.
    pub indirect: Option<IndirectRegs>,
    /// Base register the BEV window remaps onto, on variants that have one.
    pub bev_instr_base: Option<u32>,
    /// Patch entry address register, on variants that have one.
    pub patch_addr_reg: Option<u32>,
    /// Boot signature location.
    pub boot_signature: u32,
    /// ROM entry point.
    pub rom_entry: u32,
    /// Where a RAM image is loaded and entered.
    pub ram_load: u32,
    /// Primary patch load address (also the patched entry point).
    pub patch_pri: u32,
    /// Secondary patch load address.
    pub patch_sec: u32,
}

pub(crate) const MIPS_CORES: [CoreMap; 2] = [
    CoreMap {
        reset: ResetReg {
            addr: mips::LMAC_CONTROL,
            mask: mips::CONTROL_SOFT_RESET,
        },
        launch: Launch::BootVector {
            control: mips::LMAC_CONTROL,
            run: mips::CONTROL_RUN,
            patch_ctrl: mips::LMAC_PATCH_CTRL,
        },
        indirect: Some(IndirectRegs {
            ctrl: mips::LMAC_CORE_MEM_CTRL,
            wdata: mips::LMAC_CORE_MEM_WDATA,
        }),
        bev_instr_base: Some(mips::LMAC_BOOT_EXCP_INSTR_0),
        patch_addr_reg: None,
        boot_signature: mips::LMAC_BOOT_SIG,
        rom_entry: mips::LMAC_ROM.0,
        ram_load: mips::LMAC_ROM.0,
        patch_pri: mips::LMAC_PATCH_PRI,
        patch_sec: mips::LMAC_PATCH_SEC,
    },
    CoreMap {
        reset: ResetReg {
            addr: mips::UMAC_CONTROL,
            mask: mips::CONTROL_SOFT_RESET,
        },
        launch: Launch::BootVector {
            control: mips::UMAC_CONTROL,
            run: mips::CONTROL_RUN,
            patch_ctrl: mips::UMAC_PATCH_CTRL,
        },
        indirect: Some(IndirectRegs {
            ctrl: mips::UMAC_CORE_MEM_CTRL,
            wdata: mips::UMAC_CORE_MEM_WDATA,
        }),
        bev_instr_base: Some(mips::UMAC_BOOT_EXCP_INSTR_0),
        patch_addr_reg: None,
        boot_signature: mips::UMAC_BOOT_SIG,
        rom_entry: mips::UMAC_ROM.0,
        ram_load: mips::UMAC_ROM.0,
        patch_pri: mips::UMAC_PATCH_PRI,
        patch_sec: mips::UMAC_PATCH_SEC,
    },
];

pub(crate) const VPR_CORES: [CoreMap; 2] = [
    CoreMap {
        reset: ResetReg {
            addr: vpr::LMAC_RESET,
            mask: vpr::RESET_REQ,
        },
        launch: Launch::InitPc {
            init_pc: vpr::LMAC_INITPC,
            cpu_run: vpr::LMAC_CPURUN,
            run: vpr::CPURUN_START,
        },
        indirect: None,
        bev_instr_base: None,
        patch_addr_reg: Some(vpr::LMAC_PATCH_ADDR_REG),
        boot_signature: vpr::LMAC_BOOT_SIG,
        rom_entry: vpr::ROM0.0,
        ram_load: vpr::LMAC_CODE_RAM.0,
        patch_pri: vpr::LMAC_CODE_RAM.0,
        patch_sec: vpr::LMAC_CODE_RAM.0 + 0x1_0000,
    },
    CoreMap {
        reset: ResetReg {
            addr: vpr::UMAC_RESET,
            mask: vpr::RESET_REQ,
        },
        launch: Launch::InitPc {
            init_pc: vpr::UMAC_INITPC,
            cpu_run: vpr::UMAC_CPURUN,
            run: vpr::CPURUN_START,
        },
        indirect: None,
        bev_instr_base: None,
        patch_addr_reg: Some(vpr::UMAC_PATCH_ADDR_REG),
        boot_signature: vpr::UMAC_BOOT_SIG,
        rom_entry: vpr::ROM1.0,
        ram_load: vpr::UMAC_CODE_RAM.0,
        patch_pri: vpr::UMAC_CODE_RAM.0,
        patch_sec: vpr::UMAC_CODE_RAM.0 + 0x1_0000,
    },
];

/// Global timer start-up sequence required before VPR cores run from HEX images.
pub(crate) const VPR_TIMER_INIT: [(u32, u32); 3] = [
    (vpr::GRTC_CLKCFG, 0x0001_0001),
    (vpr::GRTC_MODE, 0x0000_0002),
    (vpr::GRTC_TASKS_START, 0x0000_0001),
];

pub(crate) const MIPS_POWER: PowerRegs = PowerRegs {
    ctrl: mips::PS_CTRL_OFFSET,
    wake: 1,
    status: mips::PS_STATUS_OFFSET,
    awake: 1,
};

/// Encode the MIPS jump sequence `lui k0, hi; ori k0, k0, lo; jr k0; nop`.
#[must_use]
pub const fn mips_jump_vector(entry: u32) -> [u32; 4] {
    [
        0x3C1A_0000 | (entry >> 16),
        0x375A_0000 | (entry & 0xFFFF),
        0x0340_0008,
        0x0000_0000,
    ]
}
