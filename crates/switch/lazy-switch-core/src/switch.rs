//! The switch record: authored settings, live state and both binding forms.

use serde::{Deserialize, Serialize};

use crate::binding::TargetBinding;
use crate::config::FixupMode;
use crate::ids::{SwitchId, TargetRef};
use crate::mask::StateMask;
use crate::table::BindingTable;

fn default_state_count() -> i32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_allowed() -> StateMask {
    StateMask::ALL
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Switch {
    /// Arena slot; assigned by [`SwitchRuntime::insert`](crate::SwitchRuntime::insert).
    #[serde(default)]
    pub id: SwitchId,
    #[serde(default)]
    pub name: String,
    /// Scene object hosting the switch.
    pub object: TargetRef,
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub state: i32,
    #[serde(default = "default_state_count")]
    pub state_count: i32,
    #[serde(default)]
    pub is_synced: bool,
    #[serde(default)]
    pub is_randomized: bool,

    #[serde(default)]
    pub master: Option<SwitchId>,
    /// Filled by the link resolver on group masters only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slaves: Vec<SwitchId>,

    #[serde(default = "default_allowed")]
    pub allowed_states: StateMask,
    #[serde(skip)]
    allowed_list: Vec<i32>,

    #[serde(default)]
    pub authoring: BindingTable,
    #[serde(default)]
    pub bindings: Vec<TargetBinding>,
    #[serde(default)]
    pub fixup_mode: FixupMode,
    /// Empty disables persistence.
    #[serde(default)]
    pub persistence_key: String,

    #[serde(skip)]
    pub interaction_disabled: bool,
    #[serde(skip)]
    pub synced_state: u8,
}

impl Switch {
    pub fn new(object: TargetRef) -> Self {
        let mut switch = Self {
            id: SwitchId::default(),
            name: String::new(),
            object,
            enabled: true,
            state: 0,
            state_count: default_state_count(),
            is_synced: false,
            is_randomized: false,
            master: None,
            slaves: Vec::new(),
            allowed_states: StateMask::ALL,
            allowed_list: Vec::new(),
            authoring: BindingTable::new(),
            bindings: Vec::new(),
            fixup_mode: FixupMode::AsIs,
            persistence_key: String::new(),
            interaction_disabled: false,
            synced_state: 0,
        };
        switch.refresh_allowed_states();
        switch
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Master link with the self-reference guard applied.
    #[inline]
    pub fn master(&self) -> Option<SwitchId> {
        self.master.filter(|m| *m != self.id)
    }

    #[inline]
    pub fn persists(&self) -> bool {
        !self.persistence_key.is_empty()
    }

    /// Runtime rows exist and the authoring table has been consumed.
    #[inline]
    pub fn is_baked(&self) -> bool {
        self.authoring.is_empty() && !self.bindings.is_empty()
    }

    /// Number of state groups this switch contributes to its link group:
    /// the authored markers, or the baked state count once the table is gone.
    pub fn group_count(&self) -> usize {
        if self.is_baked() {
            self.state_count.max(1) as usize
        } else {
            self.authoring.state_count()
        }
    }

    /// Enterable states in ascending order, limited to `state_count`.
    pub fn allowed_list(&self) -> &[i32] {
        &self.allowed_list
    }

    /// Rebuild the enterable-state cache after `allowed_states` or
    /// `state_count` changed.
    pub fn refresh_allowed_states(&mut self) {
        self.allowed_list = self.allowed_states.states_below(self.state_count).collect();
    }

    /// `value` taken modulo the state count, always non-negative.
    #[inline]
    pub fn wrap(&self, value: i32) -> i32 {
        value.rem_euclid(self.state_count.max(1))
    }

    /// Next enterable state after the current one, wrapping to the first.
    pub fn next_allowed_state(&self) -> Option<i32> {
        self.allowed_list
            .iter()
            .copied()
            .find(|s| *s > self.state)
            .or_else(|| self.allowed_list.first().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::TargetKind;

    #[test]
    fn modulo_lands_in_range() {
        let mut sw = Switch::new(TargetRef(1));
        sw.state_count = 3;
        for v in -7..7 {
            let wrapped = sw.wrap(v);
            assert!((0..3).contains(&wrapped));
            assert_eq!(wrapped, v.rem_euclid(3));
        }
    }

    #[test]
    fn advance_walk_wraps_to_first_allowed() {
        let mut sw = Switch::new(TargetRef(1));
        sw.state_count = 4;
        sw.allowed_states = StateMask(0b1101);
        sw.refresh_allowed_states();
        assert_eq!(sw.allowed_list(), &[0, 2, 3]);

        sw.state = 3;
        assert_eq!(sw.next_allowed_state(), Some(0));
        sw.state = 1;
        assert_eq!(sw.next_allowed_state(), Some(2));
    }

    #[test]
    fn no_allowed_states_means_no_next() {
        let mut sw = Switch::new(TargetRef(1));
        sw.allowed_states = StateMask::NONE;
        sw.refresh_allowed_states();
        assert!(sw.allowed_list().is_empty());
        assert_eq!(sw.next_allowed_state(), None);
    }

    #[test]
    fn self_master_reads_as_none() {
        let mut sw = Switch::new(TargetRef(1));
        sw.id = SwitchId(4);
        sw.master = Some(SwitchId(4));
        assert_eq!(sw.master(), None);
        sw.master = Some(SwitchId(2));
        assert_eq!(sw.master(), Some(SwitchId(2)));
    }

    #[test]
    fn baked_switches_report_their_state_count() {
        let mut sw = Switch::new(TargetRef(1));
        for _ in 0..3 {
            sw.authoring.insert_separator().unwrap();
        }
        assert!(!sw.is_baked());
        assert_eq!(sw.group_count(), 4);

        sw.authoring.clear();
        sw.state_count = 4;
        sw.bindings.push(TargetBinding::new(TargetRef(2), TargetKind::GameObject, StateMask(0b1)));
        assert!(sw.is_baked());
        assert_eq!(sw.group_count(), 4);
    }

    #[test]
    fn json_defaults() {
        let sw: Switch = serde_json::from_str(r#"{ "object": 9 }"#).unwrap();
        assert_eq!(sw.state_count, 2);
        assert!(sw.enabled);
        assert_eq!(sw.allowed_states, StateMask::ALL);
        assert_eq!(sw.fixup_mode, FixupMode::AsIs);
        assert!(!sw.persists());
    }
}
