//! Per-name bookkeeping derived from item modifiers.
//!
//! The registry never adds, removes, or hides items; it only tracks progress
//! toward special targets and maximums, the set of blocked names, and the
//! mercy configurations that seed duplication timers.

use std::collections::{BTreeMap, BTreeSet};

use spinwheel_core::{Item, ItemColor, MercyId, ModifierSet};
use spinwheel_scheduler::Recurrence;

use crate::query::Progress;

/// Template of an item duplicated by a recurring mercy timer.
#[derive(Clone, Debug)]
pub(crate) struct MercyConfig {
    /// Name of the duplicated item.
    pub(crate) base_name: String,
    /// Modifiers copied onto every duplicate.
    pub(crate) modifiers: ModifierSet,
    /// Color copied onto every duplicate, if the template had one.
    pub(crate) color: Option<ItemColor>,
    /// Delays driving the duplication timer.
    pub(crate) recurrence: Recurrence,
}

/// Registry of counters and timer templates keyed by item name.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    special_targets: BTreeMap<String, u32>,
    special_counts: BTreeMap<String, u32>,
    max_targets: BTreeMap<String, u32>,
    max_counts: BTreeMap<String, u32>,
    max_blocked: BTreeSet<String>,
    mercy_configs: BTreeMap<MercyId, MercyConfig>,
    next_mercy_id: u32,
}

impl Registry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the bookkeeping implied by an item's modifiers.
    ///
    /// Targets and maximums are first-seen-wins: a name that is already
    /// tracked keeps its target and progress.
    pub(crate) fn register(
        &mut self,
        base_name: &str,
        modifiers: &ModifierSet,
        color: Option<ItemColor>,
        register_mercy: bool,
    ) {
        if let (true, Some(mercy)) = (register_mercy, modifiers.mercy) {
            let id = MercyId::new(self.next_mercy_id);
            self.next_mercy_id = self.next_mercy_id.wrapping_add(1);
            let _ = self.mercy_configs.insert(
                id,
                MercyConfig {
                    base_name: base_name.to_owned(),
                    modifiers: modifiers.clone(),
                    color,
                    recurrence: Recurrence::from_seconds(mercy.initial_delay, mercy.repeat_delay),
                },
            );
        }

        if let Some(target) = modifiers.special_target {
            if !self.special_targets.contains_key(base_name) {
                let _ = self.special_targets.insert(base_name.to_owned(), target);
                let _ = self.special_counts.insert(base_name.to_owned(), 0);
            }
        }

        if let Some(limit) = modifiers.max {
            if !self.max_targets.contains_key(base_name) {
                let _ = self.max_targets.insert(base_name.to_owned(), limit);
                let _ = self.max_counts.insert(base_name.to_owned(), 0);
            }
        }
    }

    /// Recomputes the label shown for an item from current progress.
    pub(crate) fn format_label(&self, item: &Item) -> String {
        match item.modifiers.special_target {
            Some(target) => {
                let current = self
                    .special_counts
                    .get(&item.base_name)
                    .copied()
                    .unwrap_or(0);
                format!("{} ({current}/{target})", item.base_name)
            }
            None => item.base_name.clone(),
        }
    }

    /// Adds `amount` selections toward the name's special target.
    pub(crate) fn advance_special(&mut self, base_name: &str, amount: u64) -> Option<Progress> {
        let target = *self.special_targets.get(base_name)?;
        let count = self.special_counts.entry(base_name.to_owned()).or_insert(0);
        *count = count.saturating_add(u32::try_from(amount).unwrap_or(u32::MAX));
        Some(Progress {
            current: *count,
            target,
        })
    }

    /// Adds one selection toward the name's maximum.
    pub(crate) fn advance_max(&mut self, base_name: &str) -> Option<Progress> {
        let target = *self.max_targets.get(base_name)?;
        let count = self.max_counts.entry(base_name.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        Some(Progress {
            current: *count,
            target,
        })
    }

    /// Current progress toward the name's special target.
    pub(crate) fn special_progress(&self, base_name: &str) -> Option<Progress> {
        let target = *self.special_targets.get(base_name)?;
        let current = self.special_counts.get(base_name).copied().unwrap_or(0);
        Some(Progress { current, target })
    }

    /// Current progress toward the name's maximum.
    pub(crate) fn max_progress(&self, base_name: &str) -> Option<Progress> {
        let target = *self.max_targets.get(base_name)?;
        let current = self.max_counts.get(base_name).copied().unwrap_or(0);
        Some(Progress { current, target })
    }

    /// Reports whether the name reached its maximum this session.
    pub(crate) fn is_blocked(&self, base_name: &str) -> bool {
        self.max_blocked.contains(base_name)
    }

    /// Names blocked for the rest of the session, in sorted order.
    pub(crate) fn blocked_names(&self) -> impl Iterator<Item = &str> {
        self.max_blocked.iter().map(String::as_str)
    }

    /// Blocks the name permanently and drops its mercy configurations.
    ///
    /// Returns the identifiers of the dropped configurations so their timers
    /// can be cancelled.
    pub(crate) fn block(&mut self, base_name: &str) -> Vec<MercyId> {
        let _ = self.max_blocked.insert(base_name.to_owned());
        let dropped: Vec<MercyId> = self
            .mercy_configs
            .iter()
            .filter(|(_, config)| config.base_name == base_name)
            .map(|(id, _)| *id)
            .collect();
        for id in &dropped {
            let _ = self.mercy_configs.remove(id);
        }
        dropped
    }

    /// Looks up a mercy configuration.
    pub(crate) fn mercy_config(&self, id: MercyId) -> Option<&MercyConfig> {
        self.mercy_configs.get(&id)
    }

    /// Iterator over every mercy configuration in registration order.
    pub(crate) fn mercy_configs(&self) -> impl Iterator<Item = (MercyId, &MercyConfig)> {
        self.mercy_configs.iter().map(|(id, config)| (*id, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinwheel_core::{Mercy, PALETTE};

    fn with_target(target: u32) -> ModifierSet {
        ModifierSet {
            special_target: Some(target),
            ..ModifierSet::default()
        }
    }

    #[test]
    fn first_registration_wins_for_special_targets() {
        let mut registry = Registry::new();
        registry.register("Gem", &with_target(3), None, true);
        let _ = registry.advance_special("Gem", 2);
        registry.register("Gem", &with_target(9), None, false);

        assert_eq!(
            registry.special_progress("Gem"),
            Some(Progress {
                current: 2,
                target: 3,
            })
        );
    }

    #[test]
    fn label_reports_progress_only_for_special_targets() {
        let mut registry = Registry::new();
        registry.register("Gem", &with_target(3), None, true);
        let _ = registry.advance_special("Gem", 1);

        let gem = Item::new("Gem", with_target(3), PALETTE[0]);
        let plain = Item::new("Plain", ModifierSet::default(), PALETTE[1]);
        assert_eq!(registry.format_label(&gem), "Gem (1/3)");
        assert_eq!(registry.format_label(&plain), "Plain");
    }

    #[test]
    fn mercy_is_recorded_only_when_requested() {
        let modifiers = ModifierSet {
            mercy: Some(Mercy {
                initial_delay: 2,
                repeat_delay: 4,
            }),
            ..ModifierSet::default()
        };
        let mut registry = Registry::new();
        registry.register("Hope", &modifiers, Some(PALETTE[2]), true);
        registry.register("Hope", &modifiers, Some(PALETTE[2]), false);

        assert_eq!(registry.mercy_configs().count(), 1);
    }

    #[test]
    fn blocking_drops_mercy_configs_of_that_name() {
        let modifiers = ModifierSet {
            mercy: Some(Mercy {
                initial_delay: 1,
                repeat_delay: 1,
            }),
            max: Some(1),
            ..ModifierSet::default()
        };
        let mut registry = Registry::new();
        registry.register("Maxer", &modifiers, None, true);
        registry.register("Other", &modifiers, None, true);

        let dropped = registry.block("Maxer");

        assert_eq!(dropped.len(), 1);
        assert!(registry.mercy_config(dropped[0]).is_none());
        assert!(registry.is_blocked("Maxer"));
        assert!(!registry.is_blocked("Other"));
        assert_eq!(registry.mercy_configs().count(), 1);
    }

    #[test]
    fn max_progress_counts_single_selections() {
        let modifiers = ModifierSet {
            max: Some(2),
            ..ModifierSet::default()
        };
        let mut registry = Registry::new();
        registry.register("Cap", &modifiers, None, true);

        let first = registry.advance_max("Cap").expect("tracked");
        assert!(!first.reached());
        let second = registry.advance_max("Cap").expect("tracked");
        assert!(second.reached());
        assert!(registry.advance_max("Unknown").is_none());
    }
}
