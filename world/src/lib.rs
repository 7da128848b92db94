#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Spinwheel.
//!
//! The world owns one [`GameState`] per session. Adapters mutate it only
//! through [`apply`], read it only through [`query`], and host the timers it
//! requests through the [`Scheduler`] contract.

mod gating;
mod registry;
mod resolution;
mod timers;
mod wheel;

use std::time::Duration;

use spinwheel_core::{
    palette_color, Command, ConfigError, Event, GameConfig, Item, RuntimeWarning, Scheduler,
    SessionPhase, SourceEntry, SpinRejection, TimerHandle, TimerTask, WELCOME_BANNER,
};
use spinwheel_modifiers::parse_source;
use spinwheel_spin::{SpinMotion, Spinner};
use tracing::{debug, info, warn};

use crate::{registry::Registry, timers::TimerBook, wheel::WheelState};

pub use gating::is_allowed;
pub use wheel::pointer_index;

const READY_STATUS: &str = "Spin to start.";
const SPINNING_STATUS: &str = "Spinning...";
const GAME_OVER_STATUS: &str = "Game over. Restart to play again.";
const NO_ITEMS_STATUS: &str = "No items are eligible right now.";
const PAUSE_COUNTDOWN: Duration = Duration::from_secs(1);

/// Represents the authoritative Spinwheel world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    source: String,
    spinner: Spinner,
    state: GameState,
}

impl World {
    /// Parses `source` and creates a world ready for its first spin.
    ///
    /// Ambient timers are not armed until [`Command::ArmTimers`] is applied.
    pub fn new(source: impl Into<String>, config: GameConfig) -> Result<Self, ConfigError> {
        let source = source.into();
        let entries = parse_source(&source)?;
        let spinner = Spinner::new(config.spin_seed);
        let heartbeat_enabled = config.heartbeat_enabled;
        let state = GameState::from_entries(entries, config, Duration::ZERO, heartbeat_enabled);
        info!(
            active = state.wheel.active.len(),
            hidden = state.wheel.hidden.len(),
            "world created"
        );
        Ok(Self {
            banner: WELCOME_BANNER,
            source,
            spinner,
            state,
        })
    }
}

#[derive(Debug)]
struct ActiveSpin {
    motion: SpinMotion,
    started_at: Duration,
    last_frame_at: Duration,
}

/// Every piece of mutable session state, replaced wholesale on restart.
#[derive(Debug)]
pub(crate) struct GameState {
    config: GameConfig,
    wheel: WheelState,
    registry: Registry,
    bps: f64,
    now: Duration,
    origin: Option<Duration>,
    phase: SessionPhase,
    spin: Option<ActiveSpin>,
    angle_offset: f64,
    last_pointer: Option<usize>,
    auto_spin: bool,
    heartbeat_enabled: bool,
    mercy_started: bool,
    pause_until: Option<Duration>,
    timers: TimerBook,
    status: String,
}

impl GameState {
    fn from_entries(
        entries: Vec<SourceEntry>,
        config: GameConfig,
        now: Duration,
        heartbeat_enabled: bool,
    ) -> Self {
        let bps = config.initial_bps;
        let mut state = Self {
            config,
            wheel: WheelState::new(),
            registry: Registry::new(),
            bps,
            now,
            origin: None,
            phase: SessionPhase::Idle,
            spin: None,
            angle_offset: 0.0,
            last_pointer: None,
            auto_spin: false,
            heartbeat_enabled,
            mercy_started: false,
            pause_until: None,
            timers: TimerBook::new(),
            status: READY_STATUS.to_owned(),
        };

        for entry in entries {
            state
                .registry
                .register(&entry.base_name, &entry.modifiers, entry.color, true);
            if entry.modifiers.missing {
                continue;
            }
            let color = entry
                .color
                .unwrap_or_else(|| palette_color(state.wheel.active.len()));
            state
                .wheel
                .active
                .push(Item::new(entry.base_name, entry.modifiers, color));
        }

        let mut initial_events = Vec::new();
        gating::reconcile(&mut state, &mut initial_events);
        state.last_pointer = pointer_index(state.angle_offset, state.wheel.active.len());
        state
    }

    /// Time since the elapsed-time origin, zero before the first spin.
    pub(crate) fn elapsed(&self) -> Duration {
        self.origin
            .map_or(Duration::ZERO, |origin| self.now.saturating_sub(origin))
    }

    fn heartbeat_interval(&self) -> Duration {
        let millis = (60_000.0 / self.bps.max(1.0)).floor().max(1.0);
        Duration::from_millis(millis as u64)
    }

    pub(crate) fn set_status(&mut self, message: String, out_events: &mut Vec<Event>) {
        self.status.clone_from(&message);
        out_events.push(Event::StatusChanged { message });
    }

    /// Replaces any pending heartbeat with one measured at the current rate.
    pub(crate) fn rearm_heartbeat(&mut self, scheduler: &mut dyn Scheduler) {
        self.timers
            .cancel_matching(scheduler, |task| matches!(task, TimerTask::Heartbeat));
        if self.heartbeat_enabled && self.phase != SessionPhase::GameOver {
            let interval = self.heartbeat_interval();
            self.timers.arm(scheduler, interval, TimerTask::Heartbeat);
        }
    }

    /// Re-arms auto-spin once items become eligible again while idle.
    fn resume_auto_spin(&mut self, scheduler: &mut dyn Scheduler) {
        let waiting = self
            .timers
            .is_armed(|task| matches!(task, TimerTask::AutoSpin));
        if !waiting && !self.wheel.active.is_empty() {
            self.schedule_auto_spin(scheduler);
        }
    }

    pub(crate) fn schedule_auto_spin(&mut self, scheduler: &mut dyn Scheduler) {
        self.timers
            .cancel_matching(scheduler, |task| matches!(task, TimerTask::AutoSpin));
        if self.auto_spin && self.phase == SessionPhase::Idle {
            let delay = Duration::from_millis(self.config.auto_spin_delay_ms);
            self.timers.arm(scheduler, delay, TimerTask::AutoSpin);
        }
    }

    pub(crate) fn start_pause(
        &mut self,
        duration: Duration,
        scheduler: &mut dyn Scheduler,
        out_events: &mut Vec<Event>,
    ) {
        self.phase = SessionPhase::Paused;
        self.pause_until = Some(self.now.saturating_add(duration));
        self.timers
            .cancel_matching(scheduler, |task| matches!(task, TimerTask::AutoSpin));
        self.timers
            .arm(scheduler, duration, TimerTask::PauseExpired);
        self.timers
            .arm(scheduler, PAUSE_COUNTDOWN, TimerTask::PauseCountdown);
        info!(seconds = duration.as_secs(), "relax pause started");
        out_events.push(Event::PauseStarted { duration });
    }

    pub(crate) fn end_game(
        &mut self,
        message: String,
        scheduler: &mut dyn Scheduler,
        out_events: &mut Vec<Event>,
    ) {
        self.phase = SessionPhase::GameOver;
        self.auto_spin = false;
        self.spin = None;
        self.pause_until = None;
        self.timers.cancel_all(scheduler);
        info!(%message, "game over");
        self.set_status(message.clone(), out_events);
        out_events.push(Event::GameOver { message });
    }

    fn arm_ambient_timers(&mut self, scheduler: &mut dyn Scheduler) {
        self.rearm_heartbeat(scheduler);
        let gating_armed = self
            .timers
            .is_armed(|task| matches!(task, TimerTask::GatingTick));
        if !gating_armed && self.config.gating_tick_ms > 0 {
            let cadence = Duration::from_millis(self.config.gating_tick_ms);
            self.timers.arm(scheduler, cadence, TimerTask::GatingTick);
        }
    }

    fn start_mercy_timers(&mut self, scheduler: &mut dyn Scheduler) {
        if self.mercy_started {
            return;
        }
        self.mercy_started = true;
        for (id, config) in self.registry.mercy_configs() {
            if let Some(delay) = config.recurrence.first_delay() {
                self.timers
                    .arm(scheduler, delay, TimerTask::Mercy { config: id });
            }
        }
    }
}

/// Rate rounded for display.
pub(crate) fn rounded_rate(bps: f64) -> i64 {
    bps.round() as i64
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(
    world: &mut World,
    command: Command,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::ArmTimers => world.state.arm_ambient_timers(scheduler),
        Command::Tick { dt } => {
            world.state.now = world.state.now.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::StartSpin => start_spin(world, scheduler, out_events),
        Command::TimerFired { handle } => fire_timer(world, handle, scheduler, out_events),
        Command::SetAutoSpin { enabled } => {
            world.state.auto_spin = enabled;
            world.state.schedule_auto_spin(scheduler);
        }
        Command::SetHeartbeat { enabled } => {
            world.state.heartbeat_enabled = enabled;
            world.state.rearm_heartbeat(scheduler);
        }
        Command::ReconcileGating => {
            gating::reconcile(&mut world.state, out_events);
            world.state.resume_auto_spin(scheduler);
        }
        Command::AddItem {
            base_name,
            modifiers,
            color,
        } => {
            gating::insert_item(&mut world.state, base_name, modifiers, color, out_events);
            world.state.resume_auto_spin(scheduler);
        }
        Command::Restart => restart(world, scheduler, out_events),
    }
}

fn start_spin(world: &mut World, scheduler: &mut dyn Scheduler, out_events: &mut Vec<Event>) {
    let state = &mut world.state;
    let rejection = match state.phase {
        SessionPhase::GameOver => Some(SpinRejection::GameOver),
        SessionPhase::Spinning => Some(SpinRejection::AlreadySpinning),
        SessionPhase::Paused => Some(SpinRejection::Paused),
        SessionPhase::Idle if state.wheel.active.is_empty() => {
            Some(SpinRejection::NoItemsEligible)
        }
        SessionPhase::Idle => None,
    };

    if let Some(reason) = rejection {
        match reason {
            SpinRejection::GameOver => state.set_status(GAME_OVER_STATUS.to_owned(), out_events),
            SpinRejection::NoItemsEligible => {
                out_events.push(Event::WarningRaised {
                    warning: RuntimeWarning::NoItemsEligible,
                });
                state.set_status(NO_ITEMS_STATUS.to_owned(), out_events);
            }
            SpinRejection::AlreadySpinning | SpinRejection::Paused => {}
        }
        debug!(?reason, "spin rejected");
        out_events.push(Event::SpinRejected { reason });
        return;
    }

    state.start_mercy_timers(scheduler);
    if state.origin.is_none() {
        state.origin = Some(state.now);
    }
    state
        .timers
        .cancel_matching(scheduler, |task| matches!(task, TimerTask::AutoSpin));

    let motion = world.spinner.launch();
    state.spin = Some(ActiveSpin {
        motion,
        started_at: state.now,
        last_frame_at: state.now,
    });
    state.phase = SessionPhase::Spinning;
    state.last_pointer = pointer_index(state.angle_offset, state.wheel.active.len());
    let frame = Duration::from_millis(state.config.spin_frame_ms);
    state.timers.arm(scheduler, frame, TimerTask::SpinFrame);

    debug!(speed = motion.initial_speed(), "spin started");
    out_events.push(Event::SpinStarted);
    state.set_status(SPINNING_STATUS.to_owned(), out_events);
}

fn advance_spin(world: &mut World, scheduler: &mut dyn Scheduler, out_events: &mut Vec<Event>) {
    let state = &mut world.state;
    let Some(spin) = state.spin.as_mut() else {
        return;
    };

    let dt = state.now.saturating_sub(spin.last_frame_at).as_secs_f64();
    let elapsed = state.now.saturating_sub(spin.started_at).as_secs_f64();
    spin.last_frame_at = state.now;
    let speed = world.spinner.speed(&spin.motion, elapsed);
    state.angle_offset = (state.angle_offset + speed * dt).rem_euclid(360.0);

    let index = pointer_index(state.angle_offset, state.wheel.active.len());
    if index != state.last_pointer {
        state.last_pointer = index;
        if let Some(index) = index {
            out_events.push(Event::PointerMoved { index });
        }
    }

    if SpinMotion::is_settled(elapsed) {
        finish_spin(world, scheduler, out_events);
    } else {
        let frame = Duration::from_millis(state.config.spin_frame_ms);
        state.timers.arm(scheduler, frame, TimerTask::SpinFrame);
    }
}

fn finish_spin(world: &mut World, scheduler: &mut dyn Scheduler, out_events: &mut Vec<Event>) {
    let state = &mut world.state;
    state.spin = None;
    state.phase = SessionPhase::Idle;

    let Some(index) = pointer_index(state.angle_offset, state.wheel.active.len()) else {
        out_events.push(Event::WarningRaised {
            warning: RuntimeWarning::NoItemsEligible,
        });
        state.set_status(NO_ITEMS_STATUS.to_owned(), out_events);
        state.schedule_auto_spin(scheduler);
        return;
    };

    state.last_pointer = Some(index);
    out_events.push(Event::SpinFinished { index });
    resolution::resolve(state, index, scheduler, out_events);
}

fn end_pause(world: &mut World, scheduler: &mut dyn Scheduler, out_events: &mut Vec<Event>) {
    let state = &mut world.state;
    state.pause_until = None;
    state.phase = SessionPhase::Idle;
    state
        .timers
        .cancel_matching(scheduler, |task| matches!(task, TimerTask::PauseCountdown));
    let auto_spin = state.auto_spin;
    out_events.push(Event::PauseEnded { auto_spin });

    if auto_spin {
        state.set_status("Relax over. Spinning automatically.".to_owned(), out_events);
        start_spin(world, scheduler, out_events);
    } else {
        state.set_status("Relax over. Spin to continue.".to_owned(), out_events);
    }
}

fn fire_timer(
    world: &mut World,
    handle: TimerHandle,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    let Some(task) = world.state.timers.take(handle) else {
        debug!(handle = handle.get(), "ignoring stale timer");
        return;
    };

    match task {
        TimerTask::Heartbeat => {
            if world.state.phase != SessionPhase::Paused {
                out_events.push(Event::HeartbeatPulsed);
            }
            world.state.rearm_heartbeat(scheduler);
        }
        TimerTask::AutoSpin => {
            if world.state.auto_spin && world.state.phase == SessionPhase::Idle {
                start_spin(world, scheduler, out_events);
            }
        }
        TimerTask::SpinFrame => advance_spin(world, scheduler, out_events),
        TimerTask::PauseExpired => end_pause(world, scheduler, out_events),
        TimerTask::PauseCountdown => {
            let state = &mut world.state;
            let Some(until) = state.pause_until else {
                return;
            };
            let remaining = until.saturating_sub(state.now);
            if state.phase != SessionPhase::Paused || remaining.is_zero() {
                return;
            }
            let seconds = remaining.as_secs_f64().ceil().max(1.0) as u64;
            state.set_status(format!("Relax: {seconds} seconds remaining."), out_events);
            state
                .timers
                .arm(scheduler, PAUSE_COUNTDOWN, TimerTask::PauseCountdown);
        }
        TimerTask::GatingTick => {
            let state = &mut world.state;
            gating::reconcile(state, out_events);
            state.resume_auto_spin(scheduler);
            let cadence = Duration::from_millis(state.config.gating_tick_ms);
            state.timers.arm(scheduler, cadence, TimerTask::GatingTick);
        }
        TimerTask::Mercy { config } => {
            let state = &mut world.state;
            let Some(mercy) = state.registry.mercy_config(config).cloned() else {
                return;
            };
            if state.registry.is_blocked(&mercy.base_name) {
                return;
            }
            debug!(item = %mercy.base_name, "mercy duplicated item");
            gating::insert_item(state, mercy.base_name, mercy.modifiers, mercy.color, out_events);
            state.resume_auto_spin(scheduler);
            if let Some(delay) = mercy.recurrence.next_delay() {
                state
                    .timers
                    .arm(scheduler, delay, TimerTask::Mercy { config });
            }
        }
        TimerTask::CooldownRestore { item } => {
            debug!(item = %item.base_name, "cooldown elapsed");
            gating::insert_item(
                &mut world.state,
                item.base_name,
                item.modifiers,
                Some(item.color),
                out_events,
            );
            world.state.resume_auto_spin(scheduler);
        }
    }
}

fn restart(world: &mut World, scheduler: &mut dyn Scheduler, out_events: &mut Vec<Event>) {
    world.state.timers.cancel_all(scheduler);
    match parse_source(&world.source) {
        Ok(entries) => {
            let config = world.state.config.clone();
            let now = world.state.now;
            let heartbeat_enabled = world.state.heartbeat_enabled;
            world.state = GameState::from_entries(entries, config, now, heartbeat_enabled);
            world.state.arm_ambient_timers(scheduler);
            info!(active = world.state.wheel.active.len(), "session restarted");
            out_events.push(Event::Restarted);
            out_events.push(Event::RateChanged {
                bps: world.state.bps,
            });
            world
                .state
                .set_status(READY_STATUS.to_owned(), out_events);
        }
        Err(error) => {
            warn!(%error, "restart rejected the item source");
            world.state.phase = SessionPhase::GameOver;
            out_events.push(Event::ConfigurationRejected { error });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{rounded_rate, World};
    use spinwheel_core::{Item, ItemColor, ModifierSet, SessionPhase, TimerTask};

    /// Progress of a name toward a per-name target.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Progress {
        /// Selections counted so far.
        pub current: u32,
        /// Selections required to reach the target.
        pub target: u32,
    }

    impl Progress {
        /// Reports whether the target has been reached.
        #[must_use]
        pub const fn reached(&self) -> bool {
            self.current >= self.target
        }
    }

    /// Wheel sector prepared for a rendering surface.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Sector {
        label: String,
        color: ItemColor,
        start_angle: f64,
        extent: f64,
    }

    impl Sector {
        /// Label drawn inside the sector.
        #[must_use]
        pub fn label(&self) -> &str {
            &self.label
        }

        /// Fill color of the sector.
        #[must_use]
        pub const fn color(&self) -> ItemColor {
            self.color
        }

        /// Angle, in degrees, at which the sector starts.
        #[must_use]
        pub const fn start_angle(&self) -> f64 {
            self.start_angle
        }

        /// Angular width of the sector in degrees.
        #[must_use]
        pub const fn extent(&self) -> f64 {
            self.extent
        }
    }

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Original item source the session was parsed from.
    #[must_use]
    pub fn source(world: &World) -> &str {
        &world.source
    }

    /// Current phase of the session state machine.
    #[must_use]
    pub fn phase(world: &World) -> SessionPhase {
        world.state.phase
    }

    /// Latest status line.
    #[must_use]
    pub fn status(world: &World) -> &str {
        &world.state.status
    }

    /// Current rate.
    #[must_use]
    pub fn bps(world: &World) -> f64 {
        world.state.bps
    }

    /// Rate label shown to players.
    #[must_use]
    pub fn rate_label(world: &World) -> String {
        format!("BPM: {}", rounded_rate(world.state.bps))
    }

    /// Session clock.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.state.now
    }

    /// Time since the first spin or the latest timer reset.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.state.elapsed()
    }

    /// Multiplier that the next non-multiplier result will apply.
    #[must_use]
    pub fn pending_multiplier(world: &World) -> u64 {
        world.state.wheel.pending_multiplier
    }

    /// Items currently on the wheel, in sector order.
    #[must_use]
    pub fn active_items(world: &World) -> &[Item] {
        &world.state.wheel.active
    }

    /// Items currently withheld by gating.
    #[must_use]
    pub fn hidden_items(world: &World) -> &[Item] {
        &world.state.wheel.hidden
    }

    /// Label shown for `item`, including special-target progress.
    #[must_use]
    pub fn display_label(world: &World, item: &Item) -> String {
        world.state.registry.format_label(item)
    }

    /// Current wheel rotation in degrees.
    #[must_use]
    pub fn angle_offset(world: &World) -> f64 {
        world.state.angle_offset
    }

    /// Sector under the pointer at the current rotation.
    #[must_use]
    pub fn pointer_index(world: &World) -> Option<usize> {
        super::pointer_index(world.state.angle_offset, world.state.wheel.active.len())
    }

    /// Sectors of the active wheel, recomputed from the current rotation.
    #[must_use]
    pub fn sectors(world: &World) -> Vec<Sector> {
        let active = &world.state.wheel.active;
        if active.is_empty() {
            return Vec::new();
        }
        let extent = 360.0 / active.len() as f64;
        active
            .iter()
            .enumerate()
            .map(|(index, item)| Sector {
                label: world.state.registry.format_label(item),
                color: item.color,
                start_angle: 90.0 - extent / 2.0 + index as f64 * extent + world.state.angle_offset,
                extent,
            })
            .collect()
    }

    /// Reports whether an item with `modifiers` passes gating right now.
    #[must_use]
    pub fn is_eligible(world: &World, modifiers: &ModifierSet) -> bool {
        super::is_allowed(
            modifiers,
            world.state.bps,
            world.state.elapsed().as_secs_f64(),
        )
    }

    /// Progress of `base_name` toward its special target, if it has one.
    #[must_use]
    pub fn special_progress(world: &World, base_name: &str) -> Option<Progress> {
        world.state.registry.special_progress(base_name)
    }

    /// Progress of `base_name` toward its maximum, if it has one.
    #[must_use]
    pub fn max_progress(world: &World, base_name: &str) -> Option<Progress> {
        world.state.registry.max_progress(base_name)
    }

    /// Reports whether `base_name` is blocked for the rest of the session.
    #[must_use]
    pub fn is_blocked(world: &World, base_name: &str) -> bool {
        world.state.registry.is_blocked(base_name)
    }

    /// Names blocked for the rest of the session, sorted.
    #[must_use]
    pub fn blocked_names(world: &World) -> Vec<&str> {
        world.state.registry.blocked_names().collect()
    }

    /// Reports whether automatic spinning is enabled.
    #[must_use]
    pub fn auto_spin_enabled(world: &World) -> bool {
        world.state.auto_spin
    }

    /// Reports whether heartbeat pulses are enabled.
    #[must_use]
    pub fn heartbeat_enabled(world: &World) -> bool {
        world.state.heartbeat_enabled
    }

    /// Interval between heartbeat pulses at the current rate.
    #[must_use]
    pub fn heartbeat_interval(world: &World) -> Duration {
        world.state.heartbeat_interval()
    }

    /// Time left in the current relax pause.
    #[must_use]
    pub fn pause_remaining(world: &World) -> Option<Duration> {
        world
            .state
            .pause_until
            .map(|until| until.saturating_sub(world.state.now))
    }

    /// Number of timers the world is waiting on.
    #[must_use]
    pub fn armed_timer_count(world: &World) -> usize {
        world.state.timers.len()
    }

    /// Reports whether any mercy duplication timer is armed.
    #[must_use]
    pub fn mercy_armed(world: &World) -> bool {
        world
            .state
            .timers
            .is_armed(|task| matches!(task, TimerTask::Mercy { .. }))
    }
}
