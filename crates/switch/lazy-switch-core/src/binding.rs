//! Consolidated (runtime) binding rows.
//!
//! One row per distinct (target, kind) pair. Rows are produced by the
//! consolidation pass and only read afterwards.

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::host::TargetHost;
use crate::ids::TargetRef;
use crate::kind::TargetKind;
use crate::mask::StateMask;

/// Animator parameter name with its integer key, hashed on first use.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnimatorParameter {
    name: String,
    #[serde(skip)]
    key: OnceCell<i32>,
}

impl AnimatorParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key<H: TargetHost + ?Sized>(&self, host: &H) -> i32 {
        *self.key.get_or_init(|| host.parameter_key(&self.name))
    }
}

impl PartialEq for AnimatorParameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AnimatorParameter {}

/// One row of a switch's baked binding table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBinding {
    pub target: TargetRef,
    pub kind: TargetKind,
    pub enable_mask: StateMask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<AnimatorParameter>,
}

impl TargetBinding {
    pub fn new(target: TargetRef, kind: TargetKind, enable_mask: StateMask) -> Self {
        Self {
            target,
            kind,
            enable_mask,
            parameter: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameter = Some(AnimatorParameter::new(name));
        self
    }

    #[inline]
    pub fn should_be_active(&self, state: i32) -> bool {
        self.enable_mask.contains(state)
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter.as_ref().map(AnimatorParameter::name)
    }
}
