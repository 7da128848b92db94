#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic deferred scheduling for the Spinwheel engine.
//!
//! [`TimerQueue`] implements the core [`Scheduler`] contract against a
//! virtual clock. Hosts pop due timers in order and feed them back to the
//! world, which keeps every session replayable without a real timer thread.
//! [`Recurrence`] describes timers that re-arm themselves after firing.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use spinwheel_core::{Scheduler, TimerHandle, TimerTask};

/// Timer that came due and was removed from the queue.
#[derive(Clone, Debug, PartialEq)]
pub struct FiredTimer {
    /// Handle returned when the timer was scheduled.
    pub handle: TimerHandle,
    /// Task supplied when the timer was scheduled.
    pub task: TimerTask,
    /// Virtual time at which the timer came due.
    pub due: Duration,
}

/// Virtual-time timer queue.
///
/// Timers fire in due-time order; timers sharing a due time fire in the order
/// they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_handle: u64,
    pending: BTreeMap<(Duration, u64), TimerTask>,
    due_by_handle: HashMap<TimerHandle, Duration>,
}

impl TimerQueue {
    /// Creates an empty queue positioned at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time of the queue.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reports whether the timer identified by `handle` is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due_by_handle.contains_key(&handle)
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Iterator over pending tasks in firing order.
    pub fn tasks(&self) -> impl Iterator<Item = &TimerTask> {
        self.pending.values()
    }

    /// Removes the earliest timer due at or before `deadline`.
    ///
    /// The queue clock moves to the timer's due time so that timers scheduled
    /// while handling it are measured from the moment it fired.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<FiredTimer> {
        let (&(due, sequence), _) = self.pending.iter().next()?;
        if due > deadline {
            return None;
        }

        let task = self.pending.remove(&(due, sequence))?;
        let handle = TimerHandle::new(sequence);
        let _ = self.due_by_handle.remove(&handle);
        self.now = self.now.max(due);
        Some(FiredTimer { handle, task, due })
    }

    /// Moves the queue clock forward to `deadline` without firing anything.
    pub fn advance_to(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    /// Cancels every pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.due_by_handle.clear();
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        let sequence = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        let due = self.now.saturating_add(delay);
        let handle = TimerHandle::new(sequence);
        let _ = self.pending.insert((due, sequence), task);
        let _ = self.due_by_handle.insert(handle, due);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(due) = self.due_by_handle.remove(&handle) {
            let _ = self.pending.remove(&(due, handle.get()));
        }
    }
}

/// Delays of a timer that re-arms itself after firing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recurrence {
    initial: Duration,
    repeat: Duration,
}

impl Recurrence {
    /// Creates a recurrence from explicit delays.
    #[must_use]
    pub const fn new(initial: Duration, repeat: Duration) -> Self {
        Self { initial, repeat }
    }

    /// Creates a recurrence from whole-second delays.
    #[must_use]
    pub const fn from_seconds(initial: u32, repeat: u32) -> Self {
        Self::new(
            Duration::from_secs(initial as u64),
            Duration::from_secs(repeat as u64),
        )
    }

    /// Delay before the first firing.
    ///
    /// A zero initial delay falls back to the repeat delay; when both are zero
    /// the timer never fires.
    #[must_use]
    pub fn first_delay(&self) -> Option<Duration> {
        [self.initial, self.repeat]
            .into_iter()
            .find(|delay| !delay.is_zero())
    }

    /// Delay before re-arming after a firing, if the timer repeats.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        (!self.repeat.is_zero()).then_some(self.repeat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_due_order_with_stable_ties() {
        let mut queue = TimerQueue::new();
        let late = queue.schedule(Duration::from_secs(3), TimerTask::Heartbeat);
        let first = queue.schedule(Duration::from_secs(1), TimerTask::AutoSpin);
        let second = queue.schedule(Duration::from_secs(1), TimerTask::SpinFrame);

        let fired: Vec<_> = std::iter::from_fn(|| queue.pop_due(Duration::from_secs(10)))
            .map(|timer| timer.handle)
            .collect();

        assert_eq!(fired, vec![first, second, late]);
        assert_eq!(queue.now(), Duration::from_secs(3));
    }

    #[test]
    fn pop_due_respects_deadline() {
        let mut queue = TimerQueue::new();
        let _ = queue.schedule(Duration::from_millis(500), TimerTask::GatingTick);

        assert!(queue.pop_due(Duration::from_millis(499)).is_none());
        let fired = queue.pop_due(Duration::from_millis(500)).expect("due timer");
        assert_eq!(fired.task, TimerTask::GatingTick);
        assert_eq!(fired.due, Duration::from_millis(500));
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(Duration::from_secs(1), TimerTask::PauseExpired);
        assert!(queue.is_pending(handle));

        queue.cancel(handle);
        queue.cancel(handle);

        assert!(!queue.is_pending(handle));
        assert!(queue.pop_due(Duration::from_secs(5)).is_none());
    }

    #[test]
    fn delays_are_measured_from_current_time() {
        let mut queue = TimerQueue::new();
        queue.advance_to(Duration::from_secs(4));
        let _ = queue.schedule(Duration::from_secs(2), TimerTask::Heartbeat);
        assert_eq!(queue.next_due(), Some(Duration::from_secs(6)));
    }

    #[test]
    fn tasks_are_listed_in_firing_order_until_cleared() {
        let mut queue = TimerQueue::new();
        let _ = queue.schedule(Duration::from_secs(2), TimerTask::PauseExpired);
        let _ = queue.schedule(Duration::from_secs(1), TimerTask::PauseCountdown);

        let tasks: Vec<_> = queue.tasks().cloned().collect();
        assert_eq!(tasks, vec![TimerTask::PauseCountdown, TimerTask::PauseExpired]);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.tasks().count(), 0);
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn recurrence_falls_back_to_repeat_delay() {
        let recurrence = Recurrence::from_seconds(0, 7);
        assert_eq!(recurrence.first_delay(), Some(Duration::from_secs(7)));
        assert_eq!(recurrence.next_delay(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn recurrence_without_delays_never_fires() {
        let recurrence = Recurrence::from_seconds(0, 0);
        assert_eq!(recurrence.first_delay(), None);
        assert_eq!(recurrence.next_delay(), None);
    }

    #[test]
    fn one_shot_recurrence_does_not_rearm() {
        let recurrence = Recurrence::from_seconds(5, 0);
        assert_eq!(recurrence.first_delay(), Some(Duration::from_secs(5)));
        assert_eq!(recurrence.next_delay(), None);
    }
}
