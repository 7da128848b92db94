//! Outcome resolver applying a selected item's modifiers in a fixed order.
//!
//! Resolution runs a chain of independent effect steps over one shared
//! [`OutcomeContext`]. Any step may end the session, which short-circuits the
//! remaining steps; every step is total over the state it inspects.

use std::time::Duration;

use spinwheel_core::{
    Event, Item, OutcomeKind, OutcomeRecord, RemovalReason, Scheduler, SessionPhase, TimerTask,
};
use tracing::{debug, info};

use crate::{gating, rounded_rate, GameState};

const RELAX_NAME: &str = "relax";

struct OutcomeContext {
    item: Item,
    index: usize,
    winner: String,
    applied_multiplier: u64,
    ended: bool,
    reached_max: bool,
    removed: bool,
    kind: OutcomeKind,
    message: String,
    side_messages: Vec<String>,
}

type Step = fn(&mut GameState, &mut OutcomeContext, &mut dyn Scheduler, &mut Vec<Event>);

const STEPS: [Step; 7] = [
    apply_rate,
    request_sound,
    reset_timer,
    advance_special,
    advance_max,
    shatter_fragile,
    start_cooldown,
];

/// Resolves the spin that settled on the active sector at `index`.
pub(crate) fn resolve(
    state: &mut GameState,
    index: usize,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    let Some(item) = state.wheel.active.get(index).cloned() else {
        return;
    };
    let label = state.registry.format_label(&item);

    if let Some(factor) = chain_factor(&item.base_name) {
        let applied = state.wheel.pending_multiplier;
        let pending = applied.saturating_mul(factor);
        state.wheel.pending_multiplier = pending;
        state.phase = SessionPhase::Idle;
        let message = format!("Result: {label}. Spin again.");
        state.set_status(message.clone(), out_events);
        state.schedule_auto_spin(scheduler);
        debug!(factor, pending, "multiplier chained");
        out_events.push(Event::OutcomeResolved {
            record: OutcomeRecord {
                base_name: item.base_name,
                winner: label,
                applied_multiplier: applied,
                kind: OutcomeKind::Chained { pending },
                phase: SessionPhase::Idle,
                message,
            },
        });
        return;
    }

    let applied_multiplier = state.wheel.pending_multiplier;
    let winner = if applied_multiplier > 1 {
        format!("{applied_multiplier}x {label}")
    } else {
        label
    };
    let mut context = OutcomeContext {
        message: format!("Result: {winner}. Spin again."),
        item,
        index,
        winner,
        applied_multiplier,
        ended: false,
        reached_max: false,
        removed: false,
        kind: OutcomeKind::Continue,
        side_messages: Vec::new(),
    };

    for step in STEPS {
        if context.ended {
            break;
        }
        step(state, &mut context, scheduler, out_events);
    }

    state.wheel.pending_multiplier = 1;

    let is_relax = context.item.base_name.trim().eq_ignore_ascii_case(RELAX_NAME);
    if !context.ended && is_relax {
        let seconds = state
            .config
            .relax_seconds
            .saturating_mul(context.applied_multiplier);
        let duration = Duration::from_secs(seconds);
        context.kind = OutcomeKind::Paused { duration };
        context.message = format!("Result: {}. Relax for {seconds} seconds.", context.winner);
    }

    let message = compose(&context.message, &context.side_messages);
    if context.ended {
        state.end_game(message.clone(), scheduler, out_events);
    } else if let OutcomeKind::Paused { duration } = context.kind {
        state.set_status(message.clone(), out_events);
        state.start_pause(duration, scheduler, out_events);
    } else {
        state.phase = SessionPhase::Idle;
        state.set_status(message.clone(), out_events);
        state.schedule_auto_spin(scheduler);
    }

    info!(
        item = %context.item.base_name,
        applied = context.applied_multiplier,
        kind = ?context.kind,
        "outcome resolved"
    );
    out_events.push(Event::OutcomeResolved {
        record: OutcomeRecord {
            base_name: context.item.base_name,
            winner: context.winner,
            applied_multiplier: context.applied_multiplier,
            kind: context.kind,
            phase: state.phase,
            message,
        },
    });
}

/// Factor of a `<digits>x` multiplier name, clamped to at least one.
fn chain_factor(base_name: &str) -> Option<u64> {
    let lowered = base_name.trim().to_ascii_lowercase();
    let digits = lowered.strip_suffix('x')?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX).max(1))
}

fn compose(message: &str, side_messages: &[String]) -> String {
    if side_messages.is_empty() {
        return message.to_owned();
    }
    format!("{message} {}", side_messages.join(" "))
}

fn apply_rate(
    state: &mut GameState,
    context: &mut OutcomeContext,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    let modifiers = &context.item.modifiers;
    if modifiers.bpm_multiplier.is_none() && modifiers.bpm_boost.is_none() {
        return;
    }
    let applied = context.applied_multiplier;

    if let Some(factor) = modifiers.bpm_multiplier {
        let scale = factor.powi(i32::try_from(applied).unwrap_or(i32::MAX));
        let next = state.bps * scale;
        if next.is_finite() {
            state.bps = next;
            context.side_messages.push(format!(
                "BPM multiplied by {scale} to {}.",
                rounded_rate(state.bps)
            ));
        } else {
            debug!(scale, bps = state.bps, "rate multiplier overflowed");
        }
    }

    if let Some(boost) = modifiers.bpm_boost {
        let total = boost.saturating_mul(i64::try_from(applied).unwrap_or(i64::MAX));
        state.bps += total as f64;
        let direction = if total < 0 { "decreased" } else { "increased" };
        context.side_messages.push(format!(
            "BPM {direction} by {} to {}.",
            total.unsigned_abs(),
            rounded_rate(state.bps)
        ));
    }

    out_events.push(Event::RateChanged { bps: state.bps });
    gating::reconcile(state, out_events);
    state.rearm_heartbeat(scheduler);
}

fn request_sound(
    _state: &mut GameState,
    context: &mut OutcomeContext,
    _scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    if let Some(file) = &context.item.modifiers.sound_effect {
        out_events.push(Event::SoundRequested { file: file.clone() });
    }
}

fn reset_timer(
    state: &mut GameState,
    context: &mut OutcomeContext,
    _scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    if !context.item.modifiers.reset_timer {
        return;
    }
    state.origin = Some(state.now);
    out_events.push(Event::TimerReset);
    context.side_messages.push("Timer reset.".to_owned());
}

fn advance_special(
    state: &mut GameState,
    context: &mut OutcomeContext,
    _scheduler: &mut dyn Scheduler,
    _out_events: &mut Vec<Event>,
) {
    let name = &context.item.base_name;
    let amount = context.applied_multiplier.max(1);
    let Some(progress) = state.registry.advance_special(name, amount) else {
        return;
    };

    if progress.reached() {
        context.ended = true;
        context.kind = OutcomeKind::Win;
        context.message = format!("{name} was chosen {} times", progress.target);
    } else {
        context.message = format!(
            "Result: {}. {name} chosen {}/{}. Spin again.",
            context.winner,
            progress.current.min(progress.target),
            progress.target
        );
    }
}

fn advance_max(
    state: &mut GameState,
    context: &mut OutcomeContext,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    let name = context.item.base_name.clone();
    let Some(progress) = state.registry.advance_max(&name) else {
        return;
    };
    if !progress.reached() {
        return;
    }

    context.reached_max = true;
    context.kind = OutcomeKind::ItemCapped;
    for _ in 0..state.wheel.purge(&name) {
        out_events.push(Event::ItemRemoved {
            base_name: name.clone(),
            reason: RemovalReason::Capped,
        });
    }

    let dropped = state.registry.block(&name);
    state.timers.cancel_matching(scheduler, |task| match task {
        TimerTask::Mercy { config } => dropped.contains(config),
        TimerTask::CooldownRestore { item } => item.base_name == name,
        _ => false,
    });
    info!(item = %name, limit = progress.target, "name reached its maximum");
    out_events.push(Event::NameBlocked {
        base_name: name.clone(),
    });

    if state.wheel.active.is_empty() {
        context.ended = true;
        context.message = format!(
            "{} reached its maximum of {}. No items remain.",
            context.winner, progress.target
        );
    } else {
        context.message = format!(
            "Result: {}. {name} reached its maximum of {} and was removed. Spin again.",
            context.winner, progress.target
        );
    }
}

fn shatter_fragile(
    state: &mut GameState,
    context: &mut OutcomeContext,
    _scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    if context.reached_max || !context.item.modifiers.fragile {
        return;
    }
    if !state.wheel.take_instance(context.index, &context.item) {
        return;
    }

    context.removed = true;
    context.kind = OutcomeKind::ItemDestroyed;
    out_events.push(Event::ItemRemoved {
        base_name: context.item.base_name.clone(),
        reason: RemovalReason::Destroyed,
    });

    if state.wheel.active.is_empty() {
        context.ended = true;
        context.message = format!("{} was destroyed. No items remain.", context.winner);
    } else {
        context.message = format!(
            "{} was destroyed after being chosen. Spin again.",
            context.winner
        );
    }
}

fn start_cooldown(
    state: &mut GameState,
    context: &mut OutcomeContext,
    scheduler: &mut dyn Scheduler,
    out_events: &mut Vec<Event>,
) {
    let Some(seconds) = context.item.modifiers.cooldown else {
        return;
    };
    if context.reached_max
        || context.removed
        || state.registry.is_blocked(&context.item.base_name)
    {
        return;
    }
    if !state.wheel.take_instance(context.index, &context.item) {
        return;
    }

    context.removed = true;
    context.kind = OutcomeKind::CooledDown;
    out_events.push(Event::ItemRemoved {
        base_name: context.item.base_name.clone(),
        reason: RemovalReason::Cooldown,
    });
    state.timers.arm(
        scheduler,
        Duration::from_secs(u64::from(seconds)),
        TimerTask::CooldownRestore {
            item: context.item.clone(),
        },
    );

    if state.wheel.active.is_empty() {
        context.ended = true;
        context.message = format!("{} is cooling down. No items remain.", context.winner);
    } else {
        context.message = format!(
            "{} is cooling down for {seconds} seconds. Spin again.",
            context.winner
        );
    }
}
