//! Expand/collapse state for one table instance.
//!
//! State is a per-level map from group key to an expanded flag, seeded
//! from `collapsed_by_default` whenever the dataset or configuration
//! changes identity, and mutated only through `toggle`. Levels are
//! 1-based: level L covers keys with L value segments.
//!
//! Visibility rule: a row at depth D is visible iff every ancestor level
//! is expanded, or the row is the designated first child of the collapsed
//! ancestor (the single representative that keeps a collapsed branch
//! clickable).

use rustc_hash::FxHashMap;

use crate::definition::DimensionSpec;
use crate::record::{ancestor_key, key_depth, resolve, Record, KEY_SEPARATOR};

/// Per-instance expand/collapse state.
#[derive(Debug, Clone, Default)]
pub struct ExpandState {
    levels: FxHashMap<usize, FxHashMap<String, bool>>,
}

impl ExpandState {
    pub fn new() -> Self {
        ExpandState::default()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Seeds every group key reachable from the records at every level
    /// to `!collapsed_by_default`.
    pub fn seed(&mut self, records: &[Record], dimensions: &[DimensionSpec]) {
        self.clear();
        for record in records {
            let mut key = String::new();
            for (idx, dim) in dimensions.iter().enumerate() {
                let value = resolve(record, &dim.field).label();
                key.push(KEY_SEPARATOR);
                key.push_str(&value);

                self.levels
                    .entry(idx + 1)
                    .or_default()
                    .insert(key.clone(), !dim.collapsed_by_default);
            }
        }
    }

    pub fn is_expanded(&self, level: usize, key: &str) -> Option<bool> {
        self.levels.get(&level).and_then(|m| m.get(key)).copied()
    }

    pub fn set(&mut self, level: usize, key: impl Into<String>, expanded: bool) {
        self.levels.entry(level).or_default().insert(key.into(), expanded);
    }

    /// Flips a group's flag. When the owning dimension cascades and the
    /// result is "expanded", every descendant key is expanded as well.
    /// Unknown keys are ignored.
    pub fn toggle(
        &mut self,
        level: usize,
        key: &str,
        dimensions: &[DimensionSpec],
    ) -> Option<bool> {
        let state = self
            .levels
            .get_mut(&level)
            .and_then(|m| m.get_mut(key))?;
        let expanded = !*state;
        *state = expanded;

        let cascades = level >= 1
            && dimensions
                .get(level - 1)
                .map(|d| d.cascade_expand_to_children)
                .unwrap_or(false);
        if cascades && expanded {
            self.expand_descendants(level, key);
        }

        Some(expanded)
    }

    /// Recursively expands every key below `parent` at all deeper levels.
    fn expand_descendants(&mut self, level: usize, parent: &str) {
        let child_level = level + 1;
        let prefix = format!("{parent}{KEY_SEPARATOR}");

        let children: Vec<String> = match self.levels.get(&child_level) {
            Some(map) => map
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect(),
            None => return,
        };

        for child in children {
            self.set(child_level, child.clone(), true);
            self.expand_descendants(child_level, &child);
        }
    }

    /// Whether a row survives visibility filtering, given the explicit
    /// first-child designations recorded during row construction.
    pub fn is_row_visible(
        &self,
        row_key: &str,
        first_children: &FxHashMap<String, String>,
    ) -> bool {
        let depth = key_depth(row_key);

        for level in 1..depth {
            let check_key = ancestor_key(row_key, level);
            if self.is_expanded(level, &check_key) == Some(false) {
                let first_child = first_children.get(&check_key).map(|s| s.as_str());
                if first_child != Some(row_key) {
                    return false;
                }
            }
        }

        true
    }
}
