//! Identifiers for switches, scene objects and players.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable index of a switch inside a [`SwitchRuntime`](crate::SwitchRuntime) arena.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchId(pub u32);

impl SwitchId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "switch#{}", self.0)
    }
}

/// Opaque reference to an object or component owned by the host scene.
///
/// The core never dereferences it; every read or write goes through
/// [`TargetHost`](crate::host::TargetHost).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRef(pub u64);

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i32);

/// A player as reported by presence and ownership callbacks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub is_local: bool,
}

impl PlayerRef {
    pub fn local(id: i32) -> Self {
        Self {
            id: PlayerId(id),
            is_local: true,
        }
    }

    pub fn remote(id: i32) -> Self {
        Self {
            id: PlayerId(id),
            is_local: false,
        }
    }
}

/// Monotonic allocator for SwitchId.
/// Dense indices double as arena slots.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_switch: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_switch(&mut self) -> SwitchId {
        let id = SwitchId(self.next_switch);
        self.next_switch = self.next_switch.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_switch(), SwitchId(0));
        assert_eq!(alloc.alloc_switch(), SwitchId(1));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(SwitchId(3).to_string(), "switch#3");
        assert_eq!(TargetRef(12).to_string(), "object#12");
    }
}
