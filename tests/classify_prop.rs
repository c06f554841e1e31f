// CLASSIFICATION: COMMUNITY
// Filename: classify_prop.rs v0.1
// Date Modified: 2027-09-02
// Author: Lukas Bower

mod support;

use proptest::prelude::*;
use rpu_boot::hal::regs::mips;
use rpu_boot::{AddressFault, Processor, Rpu, RpuError, Variant};
use support::{quick_config, FakeBus, FlatResolver, NoDelay};

fn device(variant: Variant) -> Rpu<FakeBus, FlatResolver, NoDelay> {
    Rpu::with_delay(
        FakeBus::new(),
        FlatResolver,
        quick_config(variant),
        NoDelay::default(),
    )
}

fn variant() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::Mips),
        Just(Variant::Vpr),
        Just(Variant::VprSecure)
    ]
}

fn processor() -> impl Strategy<Value = Processor> {
    prop_oneof![Just(Processor::Lmac), Just(Processor::Umac)]
}

proptest! {
    #[test]
    fn unmapped_addresses_fail_both_directions(
        variant in variant(),
        processor in processor(),
        addr in any::<u32>(),
    ) {
        prop_assume!(variant.topology().classify(processor, addr).is_none());
        let mut rpu = device(variant);
        let unmapped = Err(RpuError::InvalidAddress {
            processor,
            addr,
            reason: AddressFault::Unmapped,
        });
        prop_assert_eq!(rpu.mem_read(processor, addr, 4).map(|_| ()), unmapped.clone());
        prop_assert_eq!(rpu.mem_write(processor, addr, &[0; 4]), unmapped);
        prop_assert!(rpu.bus().ops.is_empty());
    }

    #[test]
    fn unreadable_regions_always_deny_reads(
        variant in variant(),
        processor in processor(),
        pick in any::<prop::sample::Index>(),
        offset in any::<u64>(),
        len in 0usize..64,
    ) {
        let candidates: Vec<_> = variant
            .topology()
            .regions
            .iter()
            .filter(|r| !r.readable() && r.scope.map_or(true, |p| p == processor))
            .collect();
        let region = pick.get(&candidates);
        let addr = region.start + (offset % region.size()) as u32;
        let mut rpu = device(variant);
        let denied = matches!(
            rpu.mem_read(processor, addr, len),
            Err(RpuError::AccessDenied { .. })
        );
        prop_assert!(denied);
    }

    #[test]
    fn gram_round_trip(
        offset in 0u32..0x1_0000,
        data in proptest::collection::vec(any::<u8>(), 1..256),
    ) {
        let mut rpu = device(Variant::Mips);
        let addr = mips::GRAM_START + offset;
        rpu.mem_write(Processor::Lmac, addr, &data).unwrap();
        prop_assert_eq!(rpu.mem_read(Processor::Umac, addr, data.len()).unwrap(), data);
    }
}
