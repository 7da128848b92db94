#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spinwheel engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! changed. Deferred work is requested through the [`Scheduler`] trait and
//! delivered back to the world as [`Command::TimerFired`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Spinwheel.";

/// Fixed palette cycled through when assigning item colors.
pub const PALETTE: [ItemColor; 8] = [
    ItemColor::from_rgb(0xff, 0x6b, 0x6b),
    ItemColor::from_rgb(0x4e, 0xcd, 0xc4),
    ItemColor::from_rgb(0xff, 0xd9, 0x3d),
    ItemColor::from_rgb(0x1a, 0x53, 0x5c),
    ItemColor::from_rgb(0xff, 0x9f, 0x1c),
    ItemColor::from_rgb(0x9b, 0x5d, 0xe5),
    ItemColor::from_rgb(0x00, 0xbb, 0xf9),
    ItemColor::from_rgb(0xf1, 0x5b, 0xb5),
];

/// Returns the palette entry for the provided position, wrapping cyclically.
#[must_use]
pub const fn palette_color(index: usize) -> ItemColor {
    PALETTE[index % PALETTE.len()]
}

/// Visual appearance applied to a wheel sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl ItemColor {
    /// Creates a new item color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

impl fmt::Display for ItemColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// Delays, in seconds, driving the recurring duplication of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mercy {
    /// Delay before the first duplication.
    pub initial_delay: u32,
    /// Delay between subsequent duplications; zero disables repetition.
    pub repeat_delay: u32,
}

/// Structured modifiers attached to an item through its bracketed annotations.
///
/// Every field is independent; absent numeric modifiers are `None` and absent
/// flags are `false`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierSet {
    /// Recurring duplication timer.
    pub mercy: Option<Mercy>,
    /// Number of selections of this name that wins the game.
    pub special_target: Option<u32>,
    /// Seconds an instance is withheld from the wheel after being selected.
    pub cooldown: Option<u32>,
    /// Number of selections after which the name is removed for the session.
    pub max: Option<u32>,
    /// Signed amount added to the rate when selected.
    pub bpm_boost: Option<i64>,
    /// Factor the rate is multiplied by when selected.
    pub bpm_multiplier: Option<f64>,
    /// Exclusive lower rate bound for eligibility.
    pub bps_min: Option<i64>,
    /// Exclusive upper rate bound for eligibility.
    pub bps_max: Option<i64>,
    /// Exclusive lower bound, in seconds since the first spin, for eligibility.
    pub timer_min_seconds: Option<u64>,
    /// Exclusive upper bound, in seconds since the first spin, for eligibility.
    pub timer_max_seconds: Option<u64>,
    /// Sound file requested when the item is selected.
    pub sound_effect: Option<String>,
    /// Whether the selected instance is destroyed.
    pub fragile: bool,
    /// Whether the entry is a template that never appears at startup.
    pub missing: bool,
    /// Whether selecting the item restarts the elapsed-time origin.
    pub reset_timer: bool,
}

impl ModifierSet {
    /// Reports whether the set carries no modifiers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Single item instance presented on, or withheld from, the wheel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Name shown on the wheel, stripped of modifier annotations.
    pub base_name: String,
    /// Modifiers shared by every instance carrying the same name.
    pub modifiers: ModifierSet,
    /// Sector color assigned to the instance.
    pub color: ItemColor,
}

impl Item {
    /// Creates a new item instance.
    #[must_use]
    pub fn new(base_name: impl Into<String>, modifiers: ModifierSet, color: ItemColor) -> Self {
        Self {
            base_name: base_name.into(),
            modifiers,
            color,
        }
    }
}

/// Parsed line of the item source, ready for registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Name of the entry with annotations removed.
    pub base_name: String,
    /// Modifiers interpreted from the annotations.
    pub modifiers: ModifierSet,
    /// Palette color, absent for `missing` template entries.
    pub color: Option<ItemColor>,
}

/// Stable identifier of a registered mercy configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MercyId(u32);

impl MercyId {
    /// Creates a new mercy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle identifying a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a new timer handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Deferred actions the world asks its host to deliver later.
#[derive(Clone, Debug, PartialEq)]
pub enum TimerTask {
    /// Ambient rate pulse.
    Heartbeat,
    /// Starts the next spin when automatic spinning is enabled.
    AutoSpin,
    /// Advances the spin animation by one frame.
    SpinFrame,
    /// Ends the relax pause.
    PauseExpired,
    /// Refreshes the relax countdown shown while paused.
    PauseCountdown,
    /// Periodic gating reconciliation.
    GatingTick,
    /// Duplicates the item described by a mercy configuration.
    Mercy {
        /// Configuration whose item is duplicated.
        config: MercyId,
    },
    /// Reinserts an item withheld by its cooldown.
    CooldownRestore {
        /// Item restored to the wheel, identical to the removed instance.
        item: Item,
    },
}

/// Host abstraction over cancelable delayed callbacks.
///
/// Implementations never run tasks themselves; the host delivers due tasks
/// back to the world as [`Command::TimerFired`].
pub trait Scheduler {
    /// Requests delivery of `task` once `delay` has elapsed.
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Cancels a pending timer. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Tunable parameters of a game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Rate at session start.
    pub initial_bps: f64,
    /// Pause length, in seconds, of a relax result per unit of multiplier.
    pub relax_seconds: u64,
    /// Delay before an automatic spin starts.
    pub auto_spin_delay_ms: u64,
    /// Cadence of spin animation frames.
    pub spin_frame_ms: u64,
    /// Cadence of periodic gating reconciliation.
    pub gating_tick_ms: u64,
    /// Whether heartbeat pulses are emitted.
    pub heartbeat_enabled: bool,
    /// Seed for spin randomness.
    pub spin_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_bps: 60.0,
            relax_seconds: 5,
            auto_spin_delay_ms: 300,
            spin_frame_ms: 16,
            gating_tick_ms: 1_000,
            heartbeat_enabled: true,
            spin_seed: 0x5eed_0f_5b1d,
        }
    }
}

/// Observable phase of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Waiting for the next spin.
    Idle,
    /// A spin animation is in progress.
    Spinning,
    /// A relax pause suspends spinning.
    Paused,
    /// The session ended; only a restart continues play.
    GameOver,
}

/// Classification of a resolved spin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// A multiplier item grew the pending multiplier.
    Chained {
        /// Pending multiplier after chaining.
        pending: u64,
    },
    /// The spin applied its effects and play continues.
    Continue,
    /// The relax item paused the session.
    Paused {
        /// Length of the pause.
        duration: Duration,
    },
    /// A special target was reached.
    Win,
    /// The selected fragile instance was destroyed.
    ItemDestroyed,
    /// The selected name reached its maximum and was removed.
    ItemCapped,
    /// The selected instance left the wheel for its cooldown.
    CooledDown,
}

/// Result record produced by the outcome resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Name of the selected item.
    pub base_name: String,
    /// Label shown for the winner, prefixed with the applied multiplier.
    pub winner: String,
    /// Multiplier that scaled the result.
    pub applied_multiplier: u64,
    /// Classification of the result.
    pub kind: OutcomeKind,
    /// Phase the session entered after resolution.
    pub phase: SessionPhase,
    /// Composed status message.
    pub message: String,
}

/// Reasons a spin request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpinRejection {
    /// A spin is already in progress.
    AlreadySpinning,
    /// A relax pause is active.
    Paused,
    /// The session has ended.
    GameOver,
    /// Gating hid every item.
    NoItemsEligible,
}

/// Reasons an item instance left the wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// The instance was fragile.
    Destroyed,
    /// Its name reached the configured maximum.
    Capped,
    /// The instance is cooling down.
    Cooldown,
}

/// Where an inserted item ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The item joined the active wheel.
    Active,
    /// Gating withheld the item in the hidden pool.
    Hidden,
    /// The name is blocked; nothing was inserted.
    Blocked,
}

/// Fatal configuration errors detected while parsing the item source.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two lines with the same name carry different modifiers.
    #[error("conflicting modifiers found for choice '{name}'; all occurrences must use the same modifiers")]
    ConflictingModifiers {
        /// Name carrying conflicting modifiers.
        name: String,
    },
    /// The source contained no non-blank lines.
    #[error("the item source is empty")]
    EmptySource,
}

/// Recoverable conditions reported while the session runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeWarning {
    /// A sound effect could not be located or played.
    SoundUnavailable {
        /// Requested sound file.
        file: String,
    },
    /// Gating hid every item, so nothing can be spun.
    NoItemsEligible,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Arms the ambient heartbeat and gating timers of a fresh world.
    ArmTimers,
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the wheel start spinning.
    StartSpin,
    /// Delivers a timer previously requested from the scheduler.
    TimerFired {
        /// Handle returned when the timer was scheduled.
        handle: TimerHandle,
    },
    /// Enables or disables automatic spinning.
    SetAutoSpin {
        /// Whether automatic spinning is enabled.
        enabled: bool,
    },
    /// Enables or disables heartbeat pulses.
    SetHeartbeat {
        /// Whether heartbeat pulses are enabled.
        enabled: bool,
    },
    /// Re-evaluates gating for every active and hidden item.
    ReconcileGating,
    /// Inserts an item instance, subject to blocking and gating.
    AddItem {
        /// Name of the inserted item.
        base_name: String,
        /// Modifiers of the inserted item.
        modifiers: ModifierSet,
        /// Color of the inserted item; a palette color is chosen when absent.
        color: Option<ItemColor>,
    },
    /// Discards all session state and re-parses the original source.
    Restart,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the session clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a spin started.
    SpinStarted,
    /// Reports that a spin request was rejected.
    SpinRejected {
        /// Specific reason the spin was refused.
        reason: SpinRejection,
    },
    /// Reports that the pointer crossed into another sector.
    PointerMoved {
        /// Index of the sector now under the pointer.
        index: usize,
    },
    /// Confirms that a spin settled on a sector.
    SpinFinished {
        /// Index of the selected sector.
        index: usize,
    },
    /// Carries the result of a resolved spin.
    OutcomeResolved {
        /// Result record produced by the resolver.
        record: OutcomeRecord,
    },
    /// Confirms that an item instance was inserted.
    ItemAdded {
        /// Name of the inserted item.
        base_name: String,
        /// Where the item was placed.
        placement: Placement,
    },
    /// Reports that gating moved an active item to the hidden pool.
    ItemHidden {
        /// Name of the hidden item.
        base_name: String,
    },
    /// Reports that gating reinstated a hidden item.
    ItemRevealed {
        /// Name of the reinstated item.
        base_name: String,
    },
    /// Confirms that an item instance left the wheel.
    ItemRemoved {
        /// Name of the removed item.
        base_name: String,
        /// Why the instance was removed.
        reason: RemovalReason,
    },
    /// Reports that a name was blocked for the rest of the session.
    NameBlocked {
        /// Blocked name.
        base_name: String,
    },
    /// Reports a new rate value.
    RateChanged {
        /// Rate after the change.
        bps: f64,
    },
    /// Reports that the elapsed-time origin restarted.
    TimerReset,
    /// Requests playback of a sound effect.
    SoundRequested {
        /// Sound file named by the modifier.
        file: String,
    },
    /// Ambient pulse at the current rate.
    HeartbeatPulsed,
    /// Reports that a relax pause began.
    PauseStarted {
        /// Length of the pause.
        duration: Duration,
    },
    /// Reports that a relax pause ended.
    PauseEnded {
        /// Whether a spin starts automatically.
        auto_spin: bool,
    },
    /// Reports that the session ended.
    GameOver {
        /// Final status message.
        message: String,
    },
    /// Confirms that the session restarted from the original source.
    Restarted,
    /// Carries a new status line for display.
    StatusChanged {
        /// Status line text.
        message: String,
    },
    /// Reports a recoverable runtime condition.
    WarningRaised {
        /// Condition that occurred.
        warning: RuntimeWarning,
    },
    /// Reports that restarting failed to parse the source.
    ConfigurationRejected {
        /// Error raised by the parser.
        error: ConfigError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn palette_wraps_after_eight_entries() {
        assert_eq!(palette_color(0), palette_color(8));
        assert_eq!(palette_color(3), palette_color(11));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn color_displays_as_uppercase_hex() {
        assert_eq!(PALETTE[0].to_string(), "#FF6B6B");
        assert_eq!(PALETTE[6].to_string(), "#00BBF9");
    }

    #[test]
    fn default_modifier_set_is_empty() {
        assert!(ModifierSet::default().is_empty());
        let fragile = ModifierSet {
            fragile: true,
            ..ModifierSet::default()
        };
        assert!(!fragile.is_empty());
    }

    #[test]
    fn source_entry_round_trips_through_bincode() {
        let entry = SourceEntry {
            base_name: "Boom".to_owned(),
            modifiers: ModifierSet {
                mercy: Some(Mercy {
                    initial_delay: 3,
                    repeat_delay: 7,
                }),
                bpm_multiplier: Some(1.5),
                sound_effect: Some("Boom.wav".to_owned()),
                ..ModifierSet::default()
            },
            color: Some(PALETTE[2]),
        };
        assert_round_trip(&entry);
    }

    #[test]
    fn config_defaults_match_session_constants() {
        let config = GameConfig::default();
        assert!((config.initial_bps - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.relax_seconds, 5);
        assert_eq!(config.auto_spin_delay_ms, 300);
        assert_eq!(config.spin_frame_ms, 16);
        assert!(config.heartbeat_enabled);
    }

    #[test]
    fn conflicting_modifiers_message_names_the_choice() {
        let error = ConfigError::ConflictingModifiers {
            name: "Relax".to_owned(),
        };
        assert!(error.to_string().contains("'Relax'"));
    }
}
