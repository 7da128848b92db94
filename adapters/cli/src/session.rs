use std::time::Duration;

use spinwheel_core::{Command, Event, SessionPhase};
use spinwheel_scheduler::TimerQueue;
use spinwheel_world::{self as world, query, World};

/// Upper bound on virtual time spent waiting for a spin to settle.
const SPIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives a world against a virtual-time timer queue.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    queue: TimerQueue,
}

impl Session {
    /// Wraps `world` and arms its ambient timers.
    pub(crate) fn start(world: World) -> (Self, Vec<Event>) {
        let mut session = Self {
            world,
            queue: TimerQueue::new(),
        };
        let events = session.submit(Command::ArmTimers);
        (session, events)
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut self.queue, &mut events);
        events
    }

    /// Advances virtual time by `dt`, delivering due timers in order.
    ///
    /// The world clock is ticked to each timer's due time before it fires.
    pub(crate) fn advance(&mut self, dt: Duration) -> Vec<Event> {
        let deadline = query::now(&self.world).saturating_add(dt);
        self.advance_to(deadline)
    }

    fn advance_to(&mut self, deadline: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(fired) = self.queue.pop_due(deadline) {
            let lag = fired.due.saturating_sub(query::now(&self.world));
            if !lag.is_zero() {
                events.extend(self.submit(Command::Tick { dt: lag }));
            }
            events.extend(self.submit(Command::TimerFired {
                handle: fired.handle,
            }));
        }
        let rest = deadline.saturating_sub(query::now(&self.world));
        if !rest.is_zero() {
            events.extend(self.submit(Command::Tick { dt: rest }));
        }
        self.queue.advance_to(deadline);
        events
    }

    /// Starts a spin and runs virtual time until it resolves.
    pub(crate) fn spin(&mut self) -> Vec<Event> {
        let mut events = self.submit(Command::StartSpin);
        let limit = query::now(&self.world).saturating_add(SPIN_TIMEOUT);
        while query::phase(&self.world) == SessionPhase::Spinning {
            let Some(due) = self.queue.next_due().filter(|due| *due <= limit) else {
                break;
            };
            events.extend(self.advance_to(due));
        }
        events
    }
}
