//! Target kinds and the host-facing vocabulary used to drive them.
//!
//! A [`TargetKind`] names the single side effect a binding performs. Kinds are a
//! closed set: adding one means extending this enum together with
//! [`TargetKind::property`] and the dispatch in [`crate::resolver`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Sub-modules of a particle system that can be toggled independently.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ParticleModule {
    Emission,
    Shape,
    VelocityOverLifetime,
    LimitVelocityOverLifetime,
    InheritVelocity,
    ForceOverLifetime,
    ColorOverLifetime,
    ColorBySpeed,
    SizeOverLifetime,
    SizeBySpeed,
    RotationOverLifetime,
    RotationBySpeed,
    ExternalForces,
    Noise,
    Collision,
    Trigger,
    SubEmitters,
    TextureSheetAnimation,
    Lights,
    Trails,
    CustomData,
}

impl ParticleModule {
    pub const ALL: [ParticleModule; 21] = [
        ParticleModule::Emission,
        ParticleModule::Shape,
        ParticleModule::VelocityOverLifetime,
        ParticleModule::LimitVelocityOverLifetime,
        ParticleModule::InheritVelocity,
        ParticleModule::ForceOverLifetime,
        ParticleModule::ColorOverLifetime,
        ParticleModule::ColorBySpeed,
        ParticleModule::SizeOverLifetime,
        ParticleModule::SizeBySpeed,
        ParticleModule::RotationOverLifetime,
        ParticleModule::RotationBySpeed,
        ParticleModule::ExternalForces,
        ParticleModule::Noise,
        ParticleModule::Collision,
        ParticleModule::Trigger,
        ParticleModule::SubEmitters,
        ParticleModule::TextureSheetAnimation,
        ParticleModule::Lights,
        ParticleModule::Trails,
        ParticleModule::CustomData,
    ];
}

/// Which concrete side effect a target binding performs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    #[default]
    Unknown,
    GameObject,
    /// Script behaviour (networked-event receiver); toggles `enabled`.
    UdonBehaviour,
    Renderer,
    Collider,
    Camera,
    /// Drives `is_kinematic` inverted: active means simulated.
    Rigidbody,
    UGUISelectable,
    PositionConstraint,
    RotationConstraint,
    ScaleConstraint,
    ParentConstraint,
    AimConstraint,
    LookAtConstraint,
    VRCPickup,
    /// Active means realtime updates, inactive means on-demand.
    CustomRenderTexture,
    ParticleModule(ParticleModule),
    AnimatorBool,
    AnimatorTrigger,
    /// Authoring-only host kind; a binding must pick one of its modules.
    ParticleSystem,
    /// Authoring-only host kind; a binding must pick a parameter kind.
    Animator,
}

impl TargetKind {
    #[inline]
    pub fn particle_module(self) -> Option<ParticleModule> {
        match self {
            TargetKind::ParticleModule(module) => Some(module),
            _ => None,
        }
    }

    /// Kinds keyed by an animator parameter name.
    #[inline]
    pub fn is_animator_parameter(self) -> bool {
        matches!(self, TargetKind::AnimatorBool | TargetKind::AnimatorTrigger)
    }

    /// Kinds with no persistent "on" reading.
    #[inline]
    pub fn is_trigger(self) -> bool {
        matches!(self, TargetKind::AnimatorTrigger)
    }

    /// Host property toggled by this kind and whether "active" maps to `false`.
    ///
    /// Animator kinds and authoring-only kinds have no plain boolean property.
    pub fn property(self) -> Option<(Property, bool)> {
        let property = match self {
            TargetKind::GameObject => Property::ActiveSelf,
            TargetKind::UdonBehaviour
            | TargetKind::Renderer
            | TargetKind::Collider
            | TargetKind::Camera => Property::Enabled,
            TargetKind::Rigidbody => return Some((Property::Kinematic, true)),
            TargetKind::UGUISelectable => Property::Interactable,
            TargetKind::PositionConstraint
            | TargetKind::RotationConstraint
            | TargetKind::ScaleConstraint
            | TargetKind::ParentConstraint
            | TargetKind::AimConstraint
            | TargetKind::LookAtConstraint => Property::ConstraintActive,
            TargetKind::VRCPickup => Property::Pickupable,
            TargetKind::CustomRenderTexture => Property::RealtimeUpdate,
            TargetKind::ParticleModule(module) => Property::ParticleModule(module),
            TargetKind::Unknown
            | TargetKind::AnimatorBool
            | TargetKind::AnimatorTrigger
            | TargetKind::ParticleSystem
            | TargetKind::Animator => return None,
        };
        Some((property, false))
    }
}

/// Boolean properties a host exposes on its objects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Property {
    ActiveSelf,
    Enabled,
    Interactable,
    Pickupable,
    Kinematic,
    ConstraintActive,
    RealtimeUpdate,
    ParticleModule(ParticleModule),
}

bitflags! {
    /// Capabilities an object reference exposes, as reported by the host.
    ///
    /// One object may expose several; [`crate::resolver::classify`] picks a kind
    /// by a fixed precedence order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        const GAME_OBJECT = 1 << 0;
        /// Networked-event receiver (script behaviour).
        const EVENT_RECEIVER = 1 << 1;
        /// Authoring proxy wrapping a backing script behaviour.
        const SCRIPT_PROXY = 1 << 2;
        const RENDERER = 1 << 3;
        const COLLIDER = 1 << 4;
        const CAMERA = 1 << 5;
        const RIGIDBODY = 1 << 6;
        const SELECTABLE = 1 << 7;
        const POSITION_CONSTRAINT = 1 << 8;
        const ROTATION_CONSTRAINT = 1 << 9;
        const SCALE_CONSTRAINT = 1 << 10;
        const PARENT_CONSTRAINT = 1 << 11;
        const AIM_CONSTRAINT = 1 << 12;
        const LOOK_AT_CONSTRAINT = 1 << 13;
        const PICKUP = 1 << 14;
        const CUSTOM_RENDER_TEXTURE = 1 << 15;
        const PARTICLE_SYSTEM = 1 << 16;
        const ANIMATOR = 1 << 17;
        /// Generic component with an `enabled` flag.
        const BEHAVIOUR = 1 << 18;
    }
}
