//! Processor entry symbols for the 32-bit x86 target.
//!
//! The assembly boot stub loads the kernel at `EXTENDED_MEMORY`, gives each
//! processor a stack, and jumps to [`pdx_bsp_main`] on the boot processor
//! and [`pdx_ap_main`] on every other one.

use params::CapacityTable;
use spin::Once;

use crate::arch::bringup::BootPlan;
use crate::arch::gdt::Gdt;
use crate::arch::machine::Machine;
use crate::arch::x86::X86Machine;
use crate::boot::{start_ap, start_bsp};
use crate::context::KernelContext;
use crate::memory::layout::{kernel_phys, VirtAddr};
use crate::memory::paging::BootPageDirectory;
use crate::smp::BringUpBarrier;

static GDT: Once<Gdt> = Once::new();

static ENTRY_DIRECTORY: BootPageDirectory = BootPageDirectory::entry();

static BARRIER: BringUpBarrier<'static> = BringUpBarrier::new();

/// Boot-processor entry.
#[no_mangle]
pub extern "C" fn pdx_bsp_main() -> ! {
    #[cfg(feature = "serial-console")]
    crate::serial::init_logger(log::LevelFilter::Info);

    // SAFETY: the boot stub enters here once, in ring 0, on the boot processor.
    let mut machine = unsafe { X86Machine::new() };

    let directory = &ENTRY_DIRECTORY;
    let plan = BootPlan {
        gdt: GDT.call_once(Gdt::flat),
        space: directory,
        root: kernel_phys(VirtAddr::new(directory as *const BootPageDirectory as u32)),
        read_only: &[],
    };

    let context = start_bsp(&mut machine, &plan, &CapacityTable::build(), &BARRIER);
    park(&mut machine, context)
}

/// Application-processor entry.
#[no_mangle]
pub extern "C" fn pdx_ap_main() -> ! {
    // SAFETY: the boot stub enters here once per processor, in ring 0.
    let mut machine = unsafe { X86Machine::new() };

    let context = start_ap(&mut machine, &CapacityTable::build(), &BARRIER);
    park(&mut machine, context)
}

/// Nothing schedules work yet; the processor stops once it is online.
fn park(machine: &mut X86Machine, context: KernelContext) -> ! {
    log::info!("[boot] cpu{} parked", context.cpu());
    machine.halt()
}
