//! Eligibility filter that hides and reveals items as rate and time change.

use spinwheel_core::{palette_color, Event, Item, ItemColor, ModifierSet, Placement};
use tracing::debug;

use crate::GameState;

/// Reports whether an item with `modifiers` may appear on the wheel.
///
/// Every bound is exclusive: an item sitting exactly on a boundary is not
/// eligible.
#[must_use]
pub fn is_allowed(modifiers: &ModifierSet, bps: f64, elapsed_seconds: f64) -> bool {
    let above = |bound: Option<i64>, value: f64| bound.map_or(true, |bound| value > bound as f64);
    let below = |bound: Option<i64>, value: f64| bound.map_or(true, |bound| value < bound as f64);
    let seconds = |bound: Option<u64>| bound.and_then(|bound| i64::try_from(bound).ok());

    above(modifiers.bps_min, bps)
        && below(modifiers.bps_max, bps)
        && above(seconds(modifiers.timer_min_seconds), elapsed_seconds)
        && below(seconds(modifiers.timer_max_seconds), elapsed_seconds)
}

/// Moves ineligible active items to the hidden pool and reinstates hidden
/// items that became eligible.
pub(crate) fn reconcile(state: &mut GameState, out_events: &mut Vec<Event>) {
    let bps = state.bps;
    let elapsed = state.elapsed().as_secs_f64();

    let mut newly_hidden = Vec::new();
    for index in (0..state.wheel.active.len()).rev() {
        if !is_allowed(&state.wheel.active[index].modifiers, bps, elapsed) {
            let item = state.wheel.active.remove(index);
            debug!(item = %item.base_name, bps, elapsed, "gating hid item");
            out_events.push(Event::ItemHidden {
                base_name: item.base_name.clone(),
            });
            newly_hidden.push(item);
        }
    }
    newly_hidden.reverse();
    state.wheel.hidden.extend(newly_hidden);

    let pool = std::mem::take(&mut state.wheel.hidden);
    for item in pool {
        if state.registry.is_blocked(&item.base_name) {
            continue;
        }
        if is_allowed(&item.modifiers, bps, elapsed) {
            state
                .registry
                .register(&item.base_name, &item.modifiers, Some(item.color), false);
            debug!(item = %item.base_name, bps, elapsed, "gating revealed item");
            out_events.push(Event::ItemRevealed {
                base_name: item.base_name.clone(),
            });
            state.wheel.active.push(item);
        } else {
            state.wheel.hidden.push(item);
        }
    }
}

/// Inserts a new item instance, gating it immediately.
pub(crate) fn insert_item(
    state: &mut GameState,
    base_name: String,
    modifiers: ModifierSet,
    color: Option<ItemColor>,
    out_events: &mut Vec<Event>,
) {
    let placement = if state.registry.is_blocked(&base_name) {
        Placement::Blocked
    } else {
        let color = color.unwrap_or_else(|| palette_color(state.wheel.active.len()));
        state
            .registry
            .register(&base_name, &modifiers, Some(color), false);
        let allowed = is_allowed(&modifiers, state.bps, state.elapsed().as_secs_f64());
        let item = Item::new(base_name.clone(), modifiers, color);
        if allowed {
            state.wheel.active.push(item);
            Placement::Active
        } else {
            state.wheel.hidden.push(item);
            Placement::Hidden
        }
    };

    debug!(item = %base_name, ?placement, "item inserted");
    out_events.push(Event::ItemAdded {
        base_name,
        placement,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: Option<i64>, max: Option<i64>) -> ModifierSet {
        ModifierSet {
            bps_min: min,
            bps_max: max,
            ..ModifierSet::default()
        }
    }

    #[test]
    fn rate_bounds_are_exclusive() {
        let fast = bounds(Some(90), None);
        assert!(!is_allowed(&fast, 90.0, 0.0));
        assert!(is_allowed(&fast, 91.0, 0.0));
        assert!(is_allowed(&fast, 90.000_1, 0.0));

        let slow = bounds(None, Some(40));
        assert!(!is_allowed(&slow, 40.0, 0.0));
        assert!(is_allowed(&slow, 39.5, 0.0));
    }

    #[test]
    fn time_bounds_are_exclusive() {
        let window = ModifierSet {
            timer_min_seconds: Some(5),
            timer_max_seconds: Some(10),
            ..ModifierSet::default()
        };
        assert!(!is_allowed(&window, 60.0, 5.0));
        assert!(is_allowed(&window, 60.0, 5.5));
        assert!(!is_allowed(&window, 60.0, 10.0));
    }

    #[test]
    fn unbounded_items_are_always_allowed() {
        assert!(is_allowed(&ModifierSet::default(), -3.0, 0.0));
    }
}
