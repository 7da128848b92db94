#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Modifier parser that turns item source text into registered entries.
//!
//! Each line names one item. Text inside parentheses is split off as
//! annotation tokens and interpreted against a fixed grammar; everything else
//! forms the item's base name. A parse pass additionally enforces that every
//! occurrence of a name carries the same modifiers and assigns palette colors
//! to entries that appear on the wheel at startup.

mod grammar;

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use spinwheel_core::{palette_color, ConfigError, ModifierSet, SourceEntry};

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("annotation pattern is valid"));

/// Splits a line into its base name and interpreted modifiers.
///
/// The base name is the text outside parenthesized groups, trimmed. When
/// nothing remains outside the groups the whole trimmed line is used.
#[must_use]
pub fn parse_line(line: &str) -> (String, ModifierSet) {
    let mut modifiers = ModifierSet::default();
    for annotation in ANNOTATION.find_iter(line) {
        let token = annotation
            .as_str()
            .trim_matches(|character: char| character == '(' || character == ')' || character == ' ');
        grammar::interpret_token(token, &mut modifiers);
    }

    let stripped = ANNOTATION.replace_all(line, "");
    let base_name = match stripped.trim() {
        "" => line.trim(),
        name => name,
    };

    (base_name.to_owned(), modifiers)
}

/// Stateful parse pass over the lines of one item source.
#[derive(Debug, Default)]
pub struct ParsePass {
    seen: HashMap<String, ModifierSet>,
    entries: Vec<SourceEntry>,
    colored: usize,
}

impl ParsePass {
    /// Creates an empty parse pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single line into the pass.
    ///
    /// Blank lines are skipped. A name that was already seen with different
    /// modifiers fails with [`ConfigError::ConflictingModifiers`].
    pub fn push_line(&mut self, line: &str) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let (base_name, modifiers) = parse_line(line);
        let conflicting = self
            .seen
            .get(&base_name)
            .is_some_and(|previous| *previous != modifiers);
        if conflicting {
            return Err(ConfigError::ConflictingModifiers { name: base_name });
        }
        let _ = self
            .seen
            .entry(base_name.clone())
            .or_insert_with(|| modifiers.clone());

        let color = if modifiers.missing {
            None
        } else {
            let color = palette_color(self.colored);
            self.colored += 1;
            Some(color)
        };

        self.entries.push(SourceEntry {
            base_name,
            modifiers,
            color,
        });
        Ok(())
    }

    /// Completes the pass, yielding the parsed entries in source order.
    pub fn finish(self) -> Result<Vec<SourceEntry>, ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        Ok(self.entries)
    }
}

/// Parses a complete item source, one item per line.
pub fn parse_source(source: &str) -> Result<Vec<SourceEntry>, ConfigError> {
    let mut pass = ParsePass::new();
    for line in source.lines() {
        pass.push_line(line)?;
    }
    pass.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinwheel_core::{Mercy, PALETTE};

    #[test]
    fn base_name_excludes_every_annotation() {
        let (name, modifiers) = parse_line("  Lucky (1/3) Seven (fragile) ");
        assert_eq!(name, "Lucky  Seven");
        assert_eq!(modifiers.special_target, Some(3));
        assert!(modifiers.fragile);
    }

    #[test]
    fn annotation_only_line_keeps_whole_text_as_name() {
        let (name, modifiers) = parse_line("(fragile)");
        assert_eq!(name, "(fragile)");
        assert!(modifiers.fragile);
    }

    #[test]
    fn unclosed_parenthesis_stays_in_name() {
        let (name, modifiers) = parse_line("Half (open");
        assert_eq!(name, "Half (open");
        assert!(modifiers.is_empty());
    }

    #[test]
    fn tokens_are_trimmed_inside_parentheses() {
        let (_, modifiers) = parse_line("Spawner ( mercy 4 9 )");
        assert_eq!(
            modifiers.mercy,
            Some(Mercy {
                initial_delay: 4,
                repeat_delay: 9,
            })
        );
    }

    #[test]
    fn missing_entries_receive_no_color_and_do_not_advance_palette() {
        let entries = parse_source("A\nGhost (missing)\nB\n").expect("valid source");
        let colors: Vec<_> = entries.iter().map(|entry| entry.color).collect();
        assert_eq!(colors, vec![Some(PALETTE[0]), None, Some(PALETTE[1])]);
    }

    #[test]
    fn empty_source_is_rejected() {
        assert_eq!(parse_source(" \n\n\t\n"), Err(ConfigError::EmptySource));
    }

    #[test]
    fn identical_duplicates_are_accepted() {
        let entries = parse_source("Coin (+5)\nCoin (+5)").expect("identical duplicates");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].modifiers, entries[1].modifiers);
        assert_ne!(entries[0].color, entries[1].color);
    }
}
