//! Boot processor to application processor hand-off.
//!
//! The boot processor publishes its [`ModeSnapshot`] exactly once, after
//! its own bring-up finished. Application processors wait for the snapshot
//! and copy it; none of them runs the checked sequence on its own.

use core::sync::atomic::{AtomicUsize, Ordering};

use params::{Capacities, Limit};
use spin::Once;

use crate::arch::bringup::ModeSnapshot;
use crate::error::HardwareSequenceViolation;

/// Identifier of an online processor, in the order they joined.
pub type CpuId = usize;

/// Release barrier for secondary processors.
pub struct BringUpBarrier<'a> {
    snapshot: Once<ModeSnapshot<'a>>,
    online: AtomicUsize,
}

impl<'a> BringUpBarrier<'a> {
    pub const fn new() -> Self {
        Self {
            snapshot: Once::new(),
            online: AtomicUsize::new(0),
        }
    }

    /// Release every waiting processor with `snapshot`.
    pub fn publish(&self, snapshot: ModeSnapshot<'a>) -> Result<(), HardwareSequenceViolation> {
        let mut first = false;
        self.snapshot.call_once(|| {
            first = true;
            snapshot
        });

        if first {
            log::info!("[smp] boot processor mode published");
            Ok(())
        } else {
            Err(HardwareSequenceViolation::AlreadyPublished)
        }
    }

    /// The published snapshot, without waiting.
    pub fn poll(&self) -> Result<&ModeSnapshot<'a>, HardwareSequenceViolation> {
        self.snapshot.get().ok_or(HardwareSequenceViolation::BarrierNotReleased)
    }

    /// Spin until the boot processor publishes.
    pub fn wait(&self) -> &ModeSnapshot<'a> {
        self.snapshot.wait()
    }

    pub fn is_released(&self) -> bool {
        self.snapshot.is_completed()
    }

    /// Claim the next processor slot.
    ///
    /// Fails once `NCPU` processors are online.
    pub fn join(&self, capacities: &Capacities) -> Result<CpuId, HardwareSequenceViolation> {
        let limit = capacities.get(Limit::Ncpu);
        self.online
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .map_err(|_| HardwareSequenceViolation::TooManyCpus { limit })
    }

    /// Number of processors that joined.
    pub fn online(&self) -> usize {
        self.online.load(Ordering::Acquire)
    }
}

impl Default for BringUpBarrier<'_> {
    fn default() -> Self {
        Self::new()
    }
}
