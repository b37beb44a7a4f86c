//! Authoring-form binding table.
//!
//! Targets are listed in order with interleaved separators; every target
//! belongs to the state group opened by the nearest separator above it. The
//! leading group is state 0 and has no separator of its own, so explicit
//! separators are numbered `1..=n`, contiguous and increasing in list order.
//! Every edit that can disturb that numbering rescans from the first touched
//! entry.

use serde::{Deserialize, Serialize};

use crate::error::SwitchError;
use crate::ids::TargetRef;
use crate::kind::TargetKind;
use crate::mask::MAX_STATES;

/// A target as authored, before consolidation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthoredTarget {
    /// Empty slots are kept while authoring and dropped at consolidation.
    pub target: Option<TargetRef>,
    /// Explicit kind for ambiguous hosts (particle modules, animator
    /// parameters). `Unknown` lets consolidation classify the target.
    #[serde(default)]
    pub kind: TargetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Cached state group; recomputed by the table on every structural edit.
    #[serde(skip)]
    pub group: u8,
}

impl AuthoredTarget {
    pub fn new(target: TargetRef, kind: TargetKind) -> Self {
        Self {
            target: Some(target),
            kind,
            parameter: None,
            group: 0,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameter = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Separator {
        #[serde(default)]
        state: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tooltip: Option<String>,
    },
    Target(AuthoredTarget),
}

impl Entry {
    #[inline]
    pub fn is_separator(&self) -> bool {
        matches!(self, Entry::Separator { .. })
    }

    /// Separator index for separators, cached group for targets.
    #[inline]
    pub fn state(&self) -> u8 {
        match self {
            Entry::Separator { state, .. } => *state,
            Entry::Target(target) => target.group,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Entry>", into = "Vec<Entry>")]
pub struct BindingTable {
    entries: Vec<Entry>,
}

impl From<Vec<Entry>> for BindingTable {
    fn from(entries: Vec<Entry>) -> Self {
        let mut table = Self { entries };
        table.regroup_from(0);
        table
    }
}

impl From<BindingTable> for Vec<Entry> {
    fn from(table: BindingTable) -> Self {
        table.entries
    }
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn separator_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_separator()).count()
    }

    /// Number of state groups, the implicit leading group included.
    pub fn state_count(&self) -> usize {
        self.separator_count() + 1
    }

    /// State index of the last group.
    pub fn last_state(&self) -> u8 {
        self.entries
            .iter()
            .rev()
            .find(|e| e.is_separator())
            .map_or(0, Entry::state)
    }

    /// Group markers in list order, starting with the implicit state 0.
    pub fn markers(&self) -> Vec<u8> {
        std::iter::once(0)
            .chain(self.entries.iter().filter(|e| e.is_separator()).map(Entry::state))
            .collect()
    }

    pub fn targets(&self) -> impl Iterator<Item = &AuthoredTarget> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Target(target) => Some(target),
            Entry::Separator { .. } => None,
        })
    }

    /// Targets paired with their group, derived from separator positions.
    pub fn grouped(&self) -> impl Iterator<Item = (u8, &AuthoredTarget)> {
        let mut group = 0u8;
        self.entries.iter().filter_map(move |e| match e {
            Entry::Separator { .. } => {
                group = group.saturating_add(1);
                None
            }
            Entry::Target(target) => Some((group, target)),
        })
    }

    pub fn separator_tooltip(&self, state: u8) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            Entry::Separator {
                state: s,
                tooltip: Some(text),
            } if *s == state => Some(text.as_str()),
            _ => None,
        })
    }

    /// Append a target to the last group. Returns its entry index.
    pub fn push_target(&mut self, mut target: AuthoredTarget) -> usize {
        target.group = self.last_state();
        self.entries.push(Entry::Target(target));
        self.entries.len() - 1
    }

    /// Insert a target at the end of group `state`. Returns its entry index.
    pub fn insert(&mut self, mut target: AuthoredTarget, state: u8) -> Result<usize, SwitchError> {
        let count = self.state_count();
        if usize::from(state) >= count {
            return Err(SwitchError::NoSuchState { state, count });
        }
        let mut seen = 0usize;
        let position = self
            .entries
            .iter()
            .position(|e| {
                if e.is_separator() {
                    seen += 1;
                    seen == usize::from(state) + 1
                } else {
                    false
                }
            })
            .unwrap_or(self.entries.len());
        target.group = state;
        self.entries.insert(position, Entry::Target(target));
        Ok(position)
    }

    /// Append a separator opening the next state group.
    pub fn insert_separator(&mut self) -> Result<u8, SwitchError> {
        if self.state_count() >= MAX_STATES {
            return Err(SwitchError::TooManyStates { max: MAX_STATES });
        }
        let state = self.last_state() + 1;
        self.entries.push(Entry::Separator {
            state,
            tooltip: None,
        });
        Ok(state)
    }

    pub fn set_separator_tooltip(&mut self, state: u8, text: Option<String>) -> Result<(), SwitchError> {
        let count = self.state_count();
        let slot = self.entries.iter_mut().find_map(|e| match e {
            Entry::Separator { state: s, tooltip } if *s == state => Some(tooltip),
            _ => None,
        });
        match slot {
            Some(tooltip) => {
                *tooltip = text;
                Ok(())
            }
            None => Err(SwitchError::NoSuchState { state, count }),
        }
    }

    /// Remove any entry. Removing a separator merges its group into the one
    /// above and renumbers every following separator down by one.
    pub fn remove(&mut self, index: usize) -> Result<Entry, SwitchError> {
        if index >= self.entries.len() {
            return Err(SwitchError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        if entry.is_separator() {
            self.regroup_from(index);
        }
        Ok(entry)
    }

    pub fn remove_separator(&mut self, state: u8) -> Result<Entry, SwitchError> {
        if state == 0 {
            return Err(SwitchError::ImplicitSeparator);
        }
        let index = self
            .entries
            .iter()
            .position(|e| e.is_separator() && e.state() == state)
            .ok_or(SwitchError::NoSuchState {
                state,
                count: self.state_count(),
            })?;
        self.remove(index)
    }

    /// Move an entry, then rescan groups from the lowest touched index.
    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> Result<(), SwitchError> {
        let len = self.entries.len();
        for index in [old_index, new_index] {
            if index >= len {
                return Err(SwitchError::IndexOutOfRange { index, len });
            }
        }
        let entry = self.entries.remove(old_index);
        self.entries.insert(new_index, entry);
        self.regroup_from(old_index.min(new_index));
        Ok(())
    }

    /// Rebuild a table from its compact form: `offsets[k]` is the number of
    /// targets preceding separator `k + 1`.
    pub fn from_offsets(targets: Vec<AuthoredTarget>, offsets: &[usize]) -> Result<Self, SwitchError> {
        if offsets.len() + 1 > MAX_STATES {
            return Err(SwitchError::TooManyStates { max: MAX_STATES });
        }
        let mut previous = 0;
        for (separator, &offset) in offsets.iter().enumerate() {
            if offset < previous || offset > targets.len() {
                return Err(SwitchError::InvalidOffsets { separator, offset });
            }
            previous = offset;
        }

        let mut entries = Vec::with_capacity(targets.len() + offsets.len());
        let mut opened = 0usize;
        for (i, mut target) in targets.into_iter().enumerate() {
            while opened < offsets.len() && offsets[opened] <= i {
                opened += 1;
                entries.push(Entry::Separator {
                    state: opened as u8,
                    tooltip: None,
                });
            }
            target.group = opened as u8;
            entries.push(Entry::Target(target));
        }
        while opened < offsets.len() {
            opened += 1;
            entries.push(Entry::Separator {
                state: opened as u8,
                tooltip: None,
            });
        }
        Ok(Self { entries })
    }

    /// Compact form of the separator positions.
    pub fn group_offsets(&self) -> Vec<usize> {
        let mut targets = 0usize;
        let mut offsets = Vec::with_capacity(self.separator_count());
        for entry in &self.entries {
            if entry.is_separator() {
                offsets.push(targets);
            } else {
                targets += 1;
            }
        }
        offsets
    }

    fn regroup_from(&mut self, start: usize) {
        let mut state = match start.checked_sub(1).and_then(|i| self.entries.get(i)) {
            Some(entry) => entry.state(),
            None => 0,
        };
        for entry in self.entries.iter_mut().skip(start) {
            match entry {
                Entry::Separator { state: s, .. } => {
                    state = state.saturating_add(1);
                    *s = state;
                }
                Entry::Target(target) => target.group = state,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: u64) -> AuthoredTarget {
        AuthoredTarget::new(TargetRef(id), TargetKind::GameObject)
    }

    /// Groups 0..=3 with two targets each.
    fn four_groups() -> BindingTable {
        let mut table = BindingTable::new();
        for group in 0..4u64 {
            if group > 0 {
                table.insert_separator().unwrap();
            }
            table.push_target(target(group * 10));
            table.push_target(target(group * 10 + 1));
        }
        table
    }

    fn groups_of(table: &BindingTable) -> Vec<(u64, u8)> {
        table
            .grouped()
            .map(|(g, t)| (t.target.unwrap().0, g))
            .collect()
    }

    #[test]
    fn removing_a_separator_renumbers_followers() {
        let mut table = four_groups();
        assert_eq!(table.markers(), vec![0, 1, 2, 3]);

        table.remove_separator(2).unwrap();
        assert_eq!(table.markers(), vec![0, 1, 2]);
        assert_eq!(
            groups_of(&table),
            vec![(0, 0), (1, 0), (10, 1), (11, 1), (20, 1), (21, 1), (30, 2), (31, 2)]
        );
        // cached groups agree with positional groups
        for (group, t) in table.grouped() {
            assert_eq!(t.group, group);
        }
    }

    #[test]
    fn implicit_head_cannot_be_removed() {
        let mut table = four_groups();
        assert!(matches!(table.remove_separator(0), Err(SwitchError::ImplicitSeparator)));
        assert!(matches!(
            table.remove_separator(9),
            Err(SwitchError::NoSuchState { state: 9, count: 4 })
        ));
    }

    #[test]
    fn separators_are_capped() {
        let mut table = BindingTable::new();
        for expected in 1..MAX_STATES as u8 {
            assert_eq!(table.insert_separator().unwrap(), expected);
        }
        assert_eq!(table.state_count(), MAX_STATES);
        assert!(matches!(
            table.insert_separator(),
            Err(SwitchError::TooManyStates { max: 32 })
        ));
        assert_eq!(table.state_count(), MAX_STATES);
    }

    #[test]
    fn reorder_keeps_separators_contiguous() {
        let mut table = four_groups();
        // entries: t0 t1 S1 t10 t11 S2 t20 t21 S3 t30 t31
        // move S3 up to just after S1
        table.reorder(8, 3).unwrap();
        assert_eq!(table.markers(), vec![0, 1, 2, 3]);
        assert_eq!(
            groups_of(&table),
            vec![(0, 0), (1, 0), (10, 2), (11, 2), (20, 3), (21, 3), (30, 3), (31, 3)]
        );

        // move a target from the last group to the head
        table.reorder(10, 0).unwrap();
        assert_eq!(table.entries()[0].state(), 0);
        assert_eq!(groups_of(&table)[0], (31, 0));
    }

    #[test]
    fn reorder_rejects_out_of_range() {
        let mut table = four_groups();
        assert!(matches!(
            table.reorder(0, 99),
            Err(SwitchError::IndexOutOfRange { index: 99, .. })
        ));
    }

    #[test]
    fn insert_lands_at_end_of_group() {
        let mut table = four_groups();
        let index = table.insert(target(99), 1).unwrap();
        assert_eq!(index, 5);
        assert_eq!(table.entries()[6], Entry::Separator { state: 2, tooltip: None });
        assert!(table.insert(target(100), 4).is_err());

        let last = table.insert(target(42), 3).unwrap();
        assert_eq!(last, table.len() - 1);
    }

    #[test]
    fn compact_offsets_rebuild_the_same_groups() {
        let table = four_groups();
        let offsets = table.group_offsets();
        assert_eq!(offsets, vec![2, 4, 6]);

        let targets: Vec<AuthoredTarget> = table.targets().cloned().collect();
        let rebuilt = BindingTable::from_offsets(targets, &offsets).unwrap();
        assert_eq!(rebuilt, table);

        let trailing = BindingTable::from_offsets(vec![target(1)], &[1, 1]).unwrap();
        assert_eq!(trailing.markers(), vec![0, 1, 2]);
        assert!(BindingTable::from_offsets(vec![target(1)], &[1, 0]).is_err());
    }

    #[test]
    fn deserializing_recomputes_groups() {
        let json = r#"[
            { "type": "target", "target": 1, "kind": "GameObject" },
            { "type": "separator", "state": 7, "tooltip": "Lights on" },
            { "type": "target", "target": 2, "kind": "Renderer" }
        ]"#;
        let table: BindingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.markers(), vec![0, 1]);
        assert_eq!(table.separator_tooltip(1), Some("Lights on"));
        let last = table.targets().last().unwrap();
        assert_eq!(last.group, 1);
    }

    #[test]
    fn separator_tooltips_survive_serialization() {
        let mut table = four_groups();
        table.set_separator_tooltip(2, Some("Dim".to_owned())).unwrap();
        assert!(matches!(
            table.set_separator_tooltip(0, None),
            Err(SwitchError::NoSuchState { state: 0, count: 4 })
        ));

        let json = serde_json::to_string(&table).unwrap();
        let back: BindingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.separator_tooltip(2), Some("Dim"));
        assert_eq!(back.separator_tooltip(1), None);

        let mut cleared = back;
        cleared.set_separator_tooltip(2, None).unwrap();
        assert_eq!(cleared.separator_tooltip(2), None);
    }
}
