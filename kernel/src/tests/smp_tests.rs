//! Multiprocessor Bring-Up Tests
//!
//! Snapshot publication, replication and the processor count bound.

#[cfg(test)]
mod tests {
    use params::{CapacityTable, Limit};

    use crate::arch::bringup::{BringUp, Mode};
    use crate::arch::gdt::Gdt;
    use crate::error::HardwareSequenceViolation;
    use crate::memory::paging::BootPageDirectory;
    use crate::smp::BringUpBarrier;
    use crate::tests::mock::{plan, MockMachine, ROOT};

    // ========================================
    // Snapshot
    // ========================================

    #[test]
    fn test_snapshot_requires_terminal_mode() {
        let gdt = Gdt::flat();
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);
        bringup.enter_protected_mode(&gdt).unwrap();

        assert_eq!(
            bringup.snapshot().err(),
            Some(HardwareSequenceViolation::OutOfOrder {
                current: Mode::ProtectedFlat,
                expected: Mode::TERMINAL,
            })
        );
    }

    #[test]
    fn test_replicate_copies_boot_processor() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let mut bsp = MockMachine::new();
        let mut ap = MockMachine::new();

        let mut bringup = BringUp::new(&mut bsp);
        bringup.run(&plan(&gdt, &dir)).unwrap();
        let snapshot = bringup.snapshot().unwrap();
        assert_eq!(snapshot.root(), ROOT);

        let fact = BringUp::new(&mut ap).replicate(&snapshot).unwrap();

        assert!(fact.is_complete());
        assert_eq!(ap.cr0, bsp.cr0);
        assert_eq!(ap.cr3, bsp.cr3);
        assert_eq!(ap.cr4, bsp.cr4);
        assert_eq!(ap.gdt, bsp.gdt);
        assert_eq!(ap.segments, bsp.segments);
        // Same writes in the same order.
        assert_eq!(ap.events, bsp.events);
    }

    #[test]
    fn test_replicate_only_from_unprotected() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let mut bsp = MockMachine::new();
        let mut bringup = BringUp::new(&mut bsp);
        bringup.run(&plan(&gdt, &dir)).unwrap();
        let snapshot = bringup.snapshot().unwrap();

        let mut ap = MockMachine::new();
        let mut replica = BringUp::new(&mut ap);
        replica.enter_protected_mode(&gdt).unwrap();
        assert!(matches!(
            replica.replicate(&snapshot),
            Err(HardwareSequenceViolation::OutOfOrder { .. })
        ));
    }

    // ========================================
    // Barrier
    // ========================================

    #[test]
    fn test_poll_before_publish() {
        let barrier = BringUpBarrier::new();
        assert!(!barrier.is_released());
        assert_eq!(barrier.poll().err(), Some(HardwareSequenceViolation::BarrierNotReleased));
    }

    #[test]
    fn test_publish_once() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);
        bringup.run(&plan(&gdt, &dir)).unwrap();
        let snapshot = bringup.snapshot().unwrap();
        let barrier = BringUpBarrier::new();

        barrier.publish(snapshot).unwrap();
        assert!(barrier.is_released());
        assert_eq!(barrier.poll().unwrap().root(), ROOT);
        assert_eq!(barrier.publish(snapshot), Err(HardwareSequenceViolation::AlreadyPublished));
    }

    #[test]
    fn test_join_bounded_by_ncpu() {
        let capacities = CapacityTable::build().with(Limit::Ncpu, 2).validate().unwrap();
        let barrier = BringUpBarrier::new();

        assert_eq!(barrier.join(&capacities), Ok(0));
        assert_eq!(barrier.join(&capacities), Ok(1));
        assert_eq!(barrier.join(&capacities), Err(HardwareSequenceViolation::TooManyCpus { limit: 2 }));
        assert_eq!(barrier.online(), 2);
    }

    #[test]
    fn test_join_default_limit() {
        let capacities = CapacityTable::build().validate().unwrap();
        let barrier = BringUpBarrier::new();

        for expected in 0..params::param::NCPU {
            assert_eq!(barrier.join(&capacities), Ok(expected));
        }
        assert!(barrier.join(&capacities).is_err());
    }
}
