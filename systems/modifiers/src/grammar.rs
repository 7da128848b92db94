//! Token grammar for bracketed item annotations.
//!
//! Rules are tried in a fixed priority order and the first match wins. A
//! token that matches nothing, or whose numbers do not fit their field, is
//! dropped without error.

use std::sync::LazyLock;

use regex::Regex;
use spinwheel_core::{Mercy, ModifierSet};

struct Grammar {
    mercy: Regex,
    special_target: Regex,
    cooldown: Regex,
    max: Regex,
    bpm_boost: Regex,
    bpm_multiplier: Regex,
    bps_min: Regex,
    bps_max: Regex,
    timer_min: Regex,
    timer_max: Regex,
}

static GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| Grammar {
    mercy: rule(r"^mercy\s+([0-9]+)\s+([0-9]+)$"),
    special_target: rule(r"^1\s*/\s*([0-9]+)$"),
    cooldown: rule(r"^cooldown\s+([0-9]+)$"),
    max: rule(r"^max\s+([0-9]+)$"),
    bpm_boost: rule(r"^\+\s*([+-]?[0-9]+)$"),
    bpm_multiplier: rule(r"^\*\s*([+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+))$"),
    bps_min: rule(r"^>\s*([+-]?[0-9]+)$"),
    bps_max: rule(r"^<\s*([+-]?[0-9]+)$"),
    timer_min: rule(r"^>\s*([0-9]+)\s*s$"),
    timer_max: rule(r"^<\s*([0-9]+)\s*s$"),
});

fn rule(pattern: &str) -> Regex {
    Regex::new(pattern).expect("modifier grammar patterns are valid")
}

fn capture<T: std::str::FromStr>(pattern: &Regex, token: &str) -> Option<Option<T>> {
    pattern
        .captures(token)
        .map(|captures| captures.get(1).and_then(|value| value.as_str().parse().ok()))
}

/// Applies a single annotation token to the modifier set.
///
/// `token` is the text inside one pair of parentheses with surrounding
/// spaces removed; matching is case-insensitive while sound file names keep
/// their original case.
pub(crate) fn interpret_token(token: &str, modifiers: &mut ModifierSet) {
    let lower = token.to_lowercase();
    let grammar = &*GRAMMAR;

    if let Some(captures) = grammar.mercy.captures(&lower) {
        let initial = captures.get(1).and_then(|value| value.as_str().parse().ok());
        let repeat = captures.get(2).and_then(|value| value.as_str().parse().ok());
        if let (Some(initial_delay), Some(repeat_delay)) = (initial, repeat) {
            modifiers.mercy = Some(Mercy {
                initial_delay,
                repeat_delay,
            });
        }
        return;
    }

    if let Some(target) = capture::<u32>(&grammar.special_target, &lower) {
        if let Some(target) = target.filter(|target| *target > 0) {
            modifiers.special_target = Some(target);
        }
        return;
    }

    if let Some(seconds) = capture(&grammar.cooldown, &lower) {
        if seconds.is_some() {
            modifiers.cooldown = seconds;
        }
        return;
    }

    if let Some(limit) = capture(&grammar.max, &lower) {
        if limit.is_some() {
            modifiers.max = limit;
        }
        return;
    }

    if let Some(boost) = capture(&grammar.bpm_boost, &lower) {
        if boost.is_some() {
            modifiers.bpm_boost = boost;
        }
        return;
    }

    if let Some(factor) = capture::<f64>(&grammar.bpm_multiplier, &lower) {
        if let Some(factor) = factor.filter(|factor| factor.is_finite()) {
            modifiers.bpm_multiplier = Some(factor);
        }
        return;
    }

    if let Some(bound) = capture(&grammar.bps_min, &lower) {
        if bound.is_some() {
            modifiers.bps_min = bound;
        }
        return;
    }

    if let Some(bound) = capture(&grammar.bps_max, &lower) {
        if bound.is_some() {
            modifiers.bps_max = bound;
        }
        return;
    }

    if let Some(seconds) = capture(&grammar.timer_min, &lower) {
        if seconds.is_some() {
            modifiers.timer_min_seconds = seconds;
        }
        return;
    }

    if let Some(seconds) = capture(&grammar.timer_max, &lower) {
        if seconds.is_some() {
            modifiers.timer_max_seconds = seconds;
        }
        return;
    }

    if lower.len() > ".wav".len() && lower.ends_with(".wav") {
        modifiers.sound_effect = Some(token.to_owned());
        return;
    }

    match lower.as_str() {
        "fragile" => modifiers.fragile = true,
        "missing" => modifiers.missing = true,
        "reset" => modifiers.reset_timer = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(tokens: &[&str]) -> ModifierSet {
        let mut modifiers = ModifierSet::default();
        for token in tokens {
            interpret_token(token, &mut modifiers);
        }
        modifiers
    }

    #[test]
    fn timer_bounds_require_trailing_seconds_suffix() {
        let modifiers = interpret(&[">30s", "<90 s"]);
        assert_eq!(modifiers.timer_min_seconds, Some(30));
        assert_eq!(modifiers.timer_max_seconds, Some(90));
        assert_eq!(modifiers.bps_min, None);
        assert_eq!(modifiers.bps_max, None);
    }

    #[test]
    fn rate_bounds_accept_signed_values() {
        let modifiers = interpret(&[">-5", "< +120"]);
        assert_eq!(modifiers.bps_min, Some(-5));
        assert_eq!(modifiers.bps_max, Some(120));
    }

    #[test]
    fn zero_special_target_is_dropped() {
        assert_eq!(interpret(&["1/0"]).special_target, None);
        assert_eq!(interpret(&["1 / 4"]).special_target, Some(4));
    }

    #[test]
    fn overflowing_numbers_are_dropped() {
        let modifiers = interpret(&["max 99999999999", "cooldown 5"]);
        assert_eq!(modifiers.max, None);
        assert_eq!(modifiers.cooldown, Some(5));
    }

    #[test]
    fn multiplier_accepts_fractions() {
        assert_eq!(interpret(&["*0.5"]).bpm_multiplier, Some(0.5));
        assert_eq!(interpret(&["* .25"]).bpm_multiplier, Some(0.25));
        assert_eq!(interpret(&["*-2"]).bpm_multiplier, Some(-2.0));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let modifiers = interpret(&["FRAGILE", "Missing", "ReSeT", "MERCY 1 2"]);
        assert!(modifiers.fragile);
        assert!(modifiers.missing);
        assert!(modifiers.reset_timer);
        assert_eq!(
            modifiers.mercy,
            Some(Mercy {
                initial_delay: 1,
                repeat_delay: 2,
            })
        );
    }

    #[test]
    fn sound_effect_keeps_original_case() {
        assert_eq!(
            interpret(&["Gong.WAV"]).sound_effect.as_deref(),
            Some("Gong.WAV")
        );
        assert_eq!(interpret(&[".wav"]).sound_effect, None);
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        assert!(interpret(&["sparkly", "mercy 5", "+", "max"]).is_empty());
    }
}
