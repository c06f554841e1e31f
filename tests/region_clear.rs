// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Verify region zero-fill and ROM gate restoration.
// Author: Lukas Bower

mod support;

use rpu_boot::hal::regs::{mips, vpr};
use rpu_boot::{AddressFault, BusFault, Processor, RegionName, Rpu, RpuError, Variant};
use support::{quick_config, FakeBus, FlatResolver, NoDelay, UMAC_PRIVATE};

fn device(variant: Variant) -> Rpu<FakeBus, FlatResolver, NoDelay> {
    Rpu::with_delay(
        FakeBus::new(),
        FlatResolver,
        quick_config(variant),
        NoDelay::default(),
    )
}

#[test]
fn clear_zero_fills_ram_in_word_strides() {
    let mut rpu = device(Variant::Mips);
    rpu.mem_write(Processor::Lmac, mips::GRAM_START + 0x100, &[0xAB; 32])
        .unwrap();
    rpu.bus_mut().ops.clear();

    rpu.mem_clear(Processor::Lmac, RegionName::Gram).unwrap();

    let words = (mips::GRAM_END - mips::GRAM_START + 1) as usize / 4;
    assert_eq!(rpu.bus().writes(), words);
    assert_eq!(rpu.mem_read(Processor::Lmac, mips::GRAM_START + 0x100, 32).unwrap(), vec![0; 32]);
}

#[test]
fn clear_targets_the_processor_private_region() {
    let mut rpu = device(Variant::Mips);
    rpu.mem_clear(Processor::Umac, RegionName::CoreScratch).unwrap();
    let (start, end) = mips::UMAC_SCRATCH;
    let bus = rpu.bus();
    assert_eq!(bus.writes(), (end - start + 1) as usize / 4);
    assert!(bus.ops.iter().all(|op| op.offset() >= UMAC_PRIVATE));
}

#[test]
fn clear_of_rom_releases_gate_on_success() {
    let mut rpu = device(Variant::Vpr);
    rpu.mem_clear(Processor::Lmac, RegionName::Rom1).unwrap();
    let gate = rpu.bus().word_writes_to(u64::from(vpr::ROM_ACCESS_REG));
    assert_eq!(gate, vec![vpr::ROM_ACCESS_ENABLE, vpr::ROM_ACCESS_DISABLE]);
    assert_eq!(rpu.bus().peek(u64::from(vpr::ROM_ACCESS_REG)), vpr::ROM_ACCESS_DISABLE);
}

#[test]
fn clear_of_rom_releases_gate_after_mid_clear_failure() {
    let mut rpu = device(Variant::Vpr);
    let failing = u64::from(vpr::ROM0.0 + 0x40);
    rpu.bus_mut().fail_writes_at(failing);

    assert_eq!(
        rpu.mem_clear(Processor::Lmac, RegionName::Rom0),
        Err(RpuError::Bus(BusFault { offset: failing }))
    );
    let gate = rpu.bus().word_writes_to(u64::from(vpr::ROM_ACCESS_REG));
    assert_eq!(gate, vec![vpr::ROM_ACCESS_ENABLE, vpr::ROM_ACCESS_DISABLE]);
    // Stopped at the failing word without rolling back.
    assert_eq!(rpu.bus().writes(), 2 + 0x40 / 4);
}

#[test]
fn clear_of_unknown_region_is_invalid() {
    let mut rpu = device(Variant::Mips);
    assert_eq!(
        rpu.mem_clear(Processor::Lmac, RegionName::SecureRam),
        Err(RpuError::InvalidAddress {
            processor: Processor::Lmac,
            addr: 0,
            reason: AddressFault::UnknownRegion,
        })
    );
    assert!(rpu.bus().ops.is_empty());
}
