//! Per-target state membership bitmask.

use std::ops::{BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

/// Upper bound on the number of states a switch can have.
///
/// State membership is stored one bit per state in a [`StateMask`], so a table
/// that would need more states is rejected rather than truncated.
pub const MAX_STATES: usize = 32;

/// Bit `s` set means "the target is active while the switch is in state `s`".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMask(pub u32);

impl StateMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Mask with only `state` set; empty when `state` is outside `0..MAX_STATES`.
    #[inline]
    pub fn bit(state: i32) -> Self {
        if (0..MAX_STATES as i32).contains(&state) {
            Self(1u32 << state)
        } else {
            Self::NONE
        }
    }

    /// Mask with the first `count` states set.
    pub fn first(count: usize) -> Self {
        if count >= MAX_STATES {
            Self::ALL
        } else {
            Self((1u32 << count) - 1)
        }
    }

    #[inline]
    pub fn contains(self, state: i32) -> bool {
        self.0 & Self::bit(state).0 != 0
    }

    #[inline]
    pub fn insert(&mut self, state: i32) {
        self.0 |= Self::bit(state).0;
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Collapse observed "on" and "off" evidence into an enable mask.
    ///
    /// Explicit "on" evidence wins; a target never observed on falls back to
    /// the complement of its "off" evidence.
    #[inline]
    pub fn from_evidence(on: StateMask, off: StateMask) -> Self {
        if on.is_empty() {
            !off
        } else {
            on
        }
    }

    /// Set states strictly below `count`, in ascending order.
    pub fn states_below(self, count: i32) -> impl Iterator<Item = i32> {
        let limit = count.clamp(0, MAX_STATES as i32);
        (0..limit).filter(move |s| self.contains(*s))
    }
}

impl BitOr for StateMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StateMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for StateMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_evidence_is_kept_verbatim() {
        let on = StateMask(0b1010);
        assert_eq!(StateMask::from_evidence(on, StateMask::NONE), StateMask(0b1010));
        // off evidence is ignored once anything was observed on
        assert_eq!(StateMask::from_evidence(on, StateMask(0b0100)), StateMask(0b1010));
    }

    #[test]
    fn off_only_evidence_is_complemented() {
        let mask = StateMask::from_evidence(StateMask::NONE, StateMask(0b100));
        assert!(!mask.contains(2));
        assert!(mask.contains(0));
        assert!(mask.contains(1));
        assert!(mask.contains(31));
    }

    #[test]
    fn out_of_range_bits_are_empty() {
        assert_eq!(StateMask::bit(-1), StateMask::NONE);
        assert_eq!(StateMask::bit(32), StateMask::NONE);
        assert!(!StateMask::ALL.contains(40));
    }

    #[test]
    fn states_below_respects_count() {
        let allowed: Vec<i32> = StateMask(0b1101).states_below(3).collect();
        assert_eq!(allowed, vec![0, 2]);
        assert_eq!(StateMask::first(3), StateMask(0b111));
        assert_eq!(StateMask::first(32), StateMask::ALL);
    }
}
