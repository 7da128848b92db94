use std::{collections::BTreeMap, time::Duration};

use spinwheel_core::{Scheduler, TimerHandle, TimerTask};

/// Timers the world has requested and not yet seen fire.
///
/// Every scheduled handle is remembered so that stale deliveries can be
/// recognised and so that restarts and game over can cancel everything.
#[derive(Debug, Default)]
pub(crate) struct TimerBook {
    pending: BTreeMap<TimerHandle, TimerTask>,
}

impl TimerBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn arm(&mut self, scheduler: &mut dyn Scheduler, delay: Duration, task: TimerTask) {
        let handle = scheduler.schedule(delay, task.clone());
        let _ = self.pending.insert(handle, task);
    }

    /// Claims a delivered timer, returning `None` for unknown handles.
    pub(crate) fn take(&mut self, handle: TimerHandle) -> Option<TimerTask> {
        self.pending.remove(&handle)
    }

    /// Cancels every pending timer whose task satisfies `predicate`.
    pub(crate) fn cancel_matching(
        &mut self,
        scheduler: &mut dyn Scheduler,
        predicate: impl Fn(&TimerTask) -> bool,
    ) {
        let doomed: Vec<TimerHandle> = self
            .pending
            .iter()
            .filter(|(_, task)| predicate(task))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in doomed {
            scheduler.cancel(handle);
            let _ = self.pending.remove(&handle);
        }
    }

    pub(crate) fn cancel_all(&mut self, scheduler: &mut dyn Scheduler) {
        for handle in self.pending.keys() {
            scheduler.cancel(*handle);
        }
        self.pending.clear();
    }

    pub(crate) fn is_armed(&self, predicate: impl Fn(&TimerTask) -> bool) -> bool {
        self.pending.values().any(predicate)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
