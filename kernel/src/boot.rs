//! Boot entry points.
//!
//! [`start_bsp`] runs on the boot processor: it validates the capacity
//! table, brings the processor up, publishes the resulting mode and hands
//! back the [`KernelContext`] every later subsystem is built from.
//! [`start_ap`] is the application-processor counterpart. Any failure is
//! logged and the processor halts.

use params::{CapacityTable, Limit};

use crate::arch::bringup::{BootPlan, BringUp, ModeSnapshot};
use crate::arch::machine::Machine;
use crate::context::KernelContext;
use crate::error::BootError;
use crate::smp::BringUpBarrier;

/// Boot-processor startup, returning the error instead of halting.
pub fn try_start_bsp<'a, M: Machine>(
    machine: &mut M,
    plan: &BootPlan<'a>,
    table: &CapacityTable,
    barrier: &BringUpBarrier<'a>,
) -> Result<KernelContext, BootError> {
    machine.disable_interrupts();

    // Limits first: nothing is sized from an unchecked table.
    let capacities = table.validate()?;

    let mut bringup = BringUp::new(machine);
    let mode = bringup.run(plan)?;
    let snapshot = bringup.snapshot()?;

    let cpu = barrier.join(&capacities)?;
    let context = KernelContext::new(cpu, mode, capacities)?;
    barrier.publish(snapshot)?;

    log::info!(
        "[boot] cpu{} online in {} mode ({} processes, {} cpus)",
        context.cpu(),
        mode.mode(),
        context.limit(Limit::Nproc),
        context.limit(Limit::Ncpu),
    );
    Ok(context)
}

/// Boot-processor startup. Halts on any failure.
pub fn start_bsp<'a, M: Machine>(
    machine: &mut M,
    plan: &BootPlan<'a>,
    table: &CapacityTable,
    barrier: &BringUpBarrier<'a>,
) -> KernelContext {
    match try_start_bsp(machine, plan, table, barrier) {
        Ok(context) => context,
        Err(err) => halt(machine, err),
    }
}

/// Application-processor startup, returning the error instead of halting.
///
/// Fails with `BarrierNotReleased` if the boot processor has not published
/// yet; use [`start_ap`] to wait instead.
pub fn try_start_ap<'a, M: Machine>(
    machine: &mut M,
    table: &CapacityTable,
    barrier: &BringUpBarrier<'a>,
) -> Result<KernelContext, BootError> {
    machine.disable_interrupts();
    let snapshot = *barrier.poll()?;
    join_snapshot(machine, table, barrier, snapshot)
}

/// Application-processor startup. Spins until the boot processor has
/// published its mode, then copies it. Halts on any failure.
pub fn start_ap<'a, M: Machine>(machine: &mut M, table: &CapacityTable, barrier: &BringUpBarrier<'a>) -> KernelContext {
    machine.disable_interrupts();
    let snapshot = *barrier.wait();
    match join_snapshot(machine, table, barrier, snapshot) {
        Ok(context) => context,
        Err(err) => halt(machine, err),
    }
}

fn join_snapshot<'a, M: Machine>(
    machine: &mut M,
    table: &CapacityTable,
    barrier: &BringUpBarrier<'a>,
    snapshot: ModeSnapshot<'a>,
) -> Result<KernelContext, BootError> {
    let capacities = table.validate()?;
    let cpu = barrier.join(&capacities)?;

    let mut bringup = BringUp::new(machine);
    let mode = bringup.replicate(&snapshot)?;
    let context = KernelContext::new(cpu, mode, capacities)?;

    log::info!("[boot] cpu{} online in {} mode", cpu, mode.mode());
    Ok(context)
}

/// Log `err` and stop the processor.
pub fn halt<M: Machine>(machine: &mut M, err: BootError) -> ! {
    log::error!("[boot] fatal: {}", err);
    machine.halt()
}
