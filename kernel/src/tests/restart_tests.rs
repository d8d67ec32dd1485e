//! Warm Restart Tests

#[cfg(test)]
mod tests {
    use crate::arch::bringup::{BootPlan, BringUp, Mode};
    use crate::arch::control::{Cr0, Cr4};
    use crate::arch::gdt::Gdt;
    use crate::memory::layout::{PhysAddr, VirtAddr};
    use crate::memory::paging::{BootPageDirectory, PDFlags};
    use crate::tests::mock::{plan, Event, MockMachine, CR0_RESET, ROOT};

    #[test]
    fn test_restart_returns_to_unprotected() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);
        bringup.run(&plan(&gdt, &dir)).unwrap();

        bringup.restart();

        assert_eq!(bringup.mode(), Mode::Unprotected);
        assert_eq!(bringup.root(), None);
        assert!(bringup.address_space().is_none());
        assert!(bringup.snapshot().is_err());
        assert_eq!(machine.cr0.bits(), CR0_RESET);
        assert_eq!(machine.cr4, Cr4::empty());
        assert_eq!(machine.cr3, PhysAddr::zero());
    }

    #[test]
    fn test_paging_and_write_protect_clear_together() {
        let gdt = Gdt::flat();
        let dir = BootPageDirectory::entry();
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);
        bringup.run(&plan(&gdt, &dir)).unwrap();
        bringup.restart();

        let writes = machine.cr0_writes();
        let after = &writes[3..];
        // The first write drops PG and WP at once but keeps PE.
        assert!(!after[0].intersects(Cr0::PAGING | Cr0::WRITE_PROTECT));
        assert!(after[0].contains(Cr0::PROTECTION_ENABLE));
        assert!(!after[1].contains(Cr0::PROTECTION_ENABLE));
    }

    #[test]
    fn test_restart_from_unprotected() {
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);
        bringup.restart();

        assert_eq!(bringup.mode(), Mode::Unprotected);
        assert_eq!(machine.cr0.bits(), CR0_RESET);
    }

    #[test]
    fn test_second_run_uses_new_tables() {
        let gdt = Gdt::flat();
        let mut first = BootPageDirectory::entry();
        first
            .map_large(VirtAddr::new(0x0040_0000), PhysAddr::new(0x0040_0000), PDFlags::RW)
            .unwrap();
        let second = BootPageDirectory::entry();
        let second_root = PhysAddr::new(0x0030_0000);
        let mut machine = MockMachine::new();
        let mut bringup = BringUp::new(&mut machine);

        bringup.run(&plan(&gdt, &first)).unwrap();
        assert!(bringup.address_space().unwrap().translate(VirtAddr::new(0x0040_0000)).is_some());

        bringup.restart();
        let next = BootPlan {
            gdt: &gdt,
            space: &second,
            root: second_root,
            read_only: &[],
        };
        let fact = bringup.run(&next).unwrap();

        assert!(fact.is_complete());
        assert_eq!(bringup.root(), Some(second_root));
        // Nothing from the first directory survives.
        assert!(bringup.address_space().unwrap().translate(VirtAddr::new(0x0040_0000)).is_none());
        assert_eq!(machine.cr3, second_root);

        let roots: std::vec::Vec<_> = machine
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Cr3(root) => Some(*root),
                _ => None,
            })
            .collect();
        assert_eq!(roots, [ROOT, PhysAddr::zero(), second_root]);
    }
}
