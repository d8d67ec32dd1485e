//! Boot Entry Point Tests
//!
//! Validation ordering, the halt path and the processor hand-off.

#[cfg(test)]
mod tests {
    use std::thread;

    use params::{CapacityTable, ConsistencyError, Limit, Relation};

    use crate::arch::bringup::{BringUp, Mode};
    use crate::arch::gdt::Gdt;
    use crate::boot::{start_ap, start_bsp, try_start_ap, try_start_bsp};
    use crate::context::KernelContext;
    use crate::error::{BootError, HardwareSequenceViolation};
    use crate::memory::paging::BootPageDirectory;
    use crate::smp::BringUpBarrier;
    use crate::tests::mock::{plan, MockMachine};

    // ========================================
    // Boot Processor
    // ========================================

    #[test]
    fn test_start_bsp() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let mut machine = MockMachine::new();
        machine.interrupts = true;

        let context = start_bsp(&mut machine, &plan(&gdt, &dir), &CapacityTable::build(), &barrier);

        assert_eq!(context.cpu(), 0);
        assert!(context.is_boot_processor());
        assert!(context.mode().is_complete());
        assert_eq!(context.limit(Limit::Nproc), 64);
        assert_eq!(context.limit(Limit::LogSize), 30);
        assert!(barrier.is_released());
        assert_eq!(barrier.online(), 1);
        assert!(!machine.interrupts);
    }

    #[test]
    fn test_inconsistent_table_stops_before_hardware() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let table = CapacityTable::build().with(Limit::LogSize, 10);
        let mut machine = MockMachine::new();

        let err = try_start_bsp(&mut machine, &plan(&gdt, &dir), &table, &barrier).unwrap_err();

        assert_eq!(
            err,
            BootError::Consistency(ConsistencyError::new(Relation::LogHoldsThreeOps, 10, 30))
        );
        assert!(machine.events.is_empty());
        assert!(!barrier.is_released());
    }

    #[test]
    #[should_panic(expected = "machine halted")]
    fn test_start_bsp_halts_on_error() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let table = CapacityTable::build().with(Limit::Nbuf, 0);
        let mut machine = MockMachine::new();

        start_bsp(&mut machine, &plan(&gdt, &dir), &table, &barrier);
    }

    #[test]
    fn test_sequence_error_not_published() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::new();
        let barrier = BringUpBarrier::new();
        let mut machine = MockMachine::new();

        let err = try_start_bsp(&mut machine, &plan(&gdt, &dir), &CapacityTable::build(), &barrier).unwrap_err();

        assert!(matches!(
            err,
            BootError::Sequence(HardwareSequenceViolation::ExecutingCodeUnmapped(_))
        ));
        assert!(!barrier.is_released());
    }

    #[test]
    fn test_stack_not_page_multiple() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let table = CapacityTable::build().with(Limit::KernelStackSize, 6000);
        let mut machine = MockMachine::new();

        let err = try_start_bsp(&mut machine, &plan(&gdt, &dir), &table, &barrier).unwrap_err();

        match err {
            BootError::Consistency(e) => assert_eq!(e.relation(), Relation::StackPageMultiple),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!barrier.is_released());
    }

    // ========================================
    // Kernel Context
    // ========================================

    #[test]
    fn test_context_requires_complete_mode() {
        let capacities = CapacityTable::build().validate().unwrap();
        let mut machine = MockMachine::new();
        let fact = BringUp::new(&mut machine).mode_fact();

        assert_eq!(
            KernelContext::new(0, fact, capacities),
            Err(BootError::Sequence(HardwareSequenceViolation::OutOfOrder {
                current: Mode::Unprotected,
                expected: Mode::TERMINAL,
            }))
        );
    }

    // ========================================
    // Application Processors
    // ========================================

    #[test]
    fn test_ap_before_bsp() {
        let barrier = BringUpBarrier::new();
        let mut machine = MockMachine::new();

        assert_eq!(
            try_start_ap(&mut machine, &CapacityTable::build(), &barrier),
            Err(BootError::Sequence(HardwareSequenceViolation::BarrierNotReleased))
        );
        assert!(machine.events.is_empty());
    }

    #[test]
    fn test_ap_after_bsp() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let table = CapacityTable::build();
        let mut bsp = MockMachine::new();
        let mut ap = MockMachine::new();

        start_bsp(&mut bsp, &plan(&gdt, &dir), &table, &barrier);
        let context = try_start_ap(&mut ap, &table, &barrier).unwrap();

        assert_eq!(context.cpu(), 1);
        assert!(!context.is_boot_processor());
        assert!(context.mode().write_protect_enabled());
        assert_eq!(ap.cr0, bsp.cr0);
        assert_eq!(ap.cr3, bsp.cr3);
    }

    #[test]
    fn test_aps_wait_for_bsp() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let barrier = BringUpBarrier::new();
        let table = CapacityTable::build();

        let (table, barrier) = (&table, &barrier);

        let cpus = thread::scope(|s| {
            let mut waiting = std::vec::Vec::new();
            for _ in 0..3 {
                waiting.push(s.spawn(move || {
                    let mut machine = MockMachine::new();
                    let context = start_ap(&mut machine, table, barrier);
                    assert!(context.mode().is_complete());
                    context.cpu()
                }));
            }

            let mut bsp = MockMachine::new();
            let context = start_bsp(&mut bsp, &plan(&gdt, &dir), table, barrier);
            assert_eq!(context.cpu(), 0);

            let mut cpus: std::vec::Vec<_> = waiting.into_iter().map(|h| h.join().unwrap()).collect();
            cpus.sort_unstable();
            cpus
        });

        assert_eq!(cpus, [1, 2, 3]);
        assert_eq!(barrier.online(), 4);
    }
}
