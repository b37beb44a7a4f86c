//! Kind resolver: classification, live readings and side effects per kind.

use log::trace;

use crate::binding::AnimatorParameter;
use crate::host::TargetHost;
use crate::ids::TargetRef;
use crate::kind::{Capabilities, TargetKind};

/// Capability checks in precedence order. The first match wins, so a script
/// behaviour that also reports a generic `enabled` toggle classifies as
/// [`TargetKind::UdonBehaviour`].
const PRECEDENCE: [(Capabilities, TargetKind); 17] = [
    (Capabilities::GAME_OBJECT, TargetKind::GameObject),
    (Capabilities::EVENT_RECEIVER, TargetKind::UdonBehaviour),
    (Capabilities::RENDERER, TargetKind::Renderer),
    (Capabilities::COLLIDER, TargetKind::Collider),
    (Capabilities::CAMERA, TargetKind::Camera),
    (Capabilities::RIGIDBODY, TargetKind::Rigidbody),
    (Capabilities::SELECTABLE, TargetKind::UGUISelectable),
    (Capabilities::POSITION_CONSTRAINT, TargetKind::PositionConstraint),
    (Capabilities::ROTATION_CONSTRAINT, TargetKind::RotationConstraint),
    (Capabilities::SCALE_CONSTRAINT, TargetKind::ScaleConstraint),
    (Capabilities::PARENT_CONSTRAINT, TargetKind::ParentConstraint),
    (Capabilities::AIM_CONSTRAINT, TargetKind::AimConstraint),
    (Capabilities::LOOK_AT_CONSTRAINT, TargetKind::LookAtConstraint),
    (Capabilities::PICKUP, TargetKind::VRCPickup),
    (Capabilities::CUSTOM_RENDER_TEXTURE, TargetKind::CustomRenderTexture),
    (Capabilities::PARTICLE_SYSTEM, TargetKind::ParticleSystem),
    (Capabilities::ANIMATOR, TargetKind::Animator),
];

/// Best-matching kind for a reference, [`TargetKind::Unknown`] if none match.
///
/// Particle systems and animators classify as their authoring-only host kinds;
/// the author picks the concrete module or parameter kind.
pub fn classify<H: TargetHost + ?Sized>(host: &H, target: TargetRef) -> TargetKind {
    classify_capabilities(host.capabilities(target))
}

pub fn classify_capabilities(caps: Capabilities) -> TargetKind {
    PRECEDENCE
        .iter()
        .find(|(cap, _)| caps.contains(*cap))
        .map_or(TargetKind::Unknown, |(_, kind)| *kind)
}

/// Live on/off reading of `target` under `kind`.
///
/// Trigger kinds have no persistent state and report `is_current_state`.
/// Kinds without a boolean reading (unknown, authoring-only hosts) read as on.
pub fn is_active<H: TargetHost + ?Sized>(
    host: &H,
    target: TargetRef,
    kind: TargetKind,
    parameter: Option<&str>,
    is_current_state: bool,
) -> bool {
    if !host.is_valid(target) {
        return false;
    }
    match kind {
        TargetKind::AnimatorBool => parameter.is_some_and(|name| host.animator_bool(target, name)),
        _ if kind.is_trigger() => is_current_state,
        _ => match kind.property() {
            Some((property, inverted)) => host.read(target, property) != inverted,
            None => true,
        },
    }
}

/// Drive `target` so that it reads as `should_be_active` under `kind`.
///
/// Unknown and authoring-only kinds are no-ops, as are animator kinds without
/// a parameter.
pub fn apply<H: TargetHost + ?Sized>(
    host: &mut H,
    target: TargetRef,
    kind: TargetKind,
    parameter: Option<&AnimatorParameter>,
    should_be_active: bool,
) {
    trace!("apply {target} {kind:?} -> {should_be_active}");
    match kind {
        TargetKind::AnimatorBool => {
            if let Some(parameter) = parameter {
                let key = parameter.key(&*host);
                host.set_animator_bool(target, key, should_be_active);
            }
        }
        TargetKind::AnimatorTrigger => {
            if let Some(parameter) = parameter {
                let key = parameter.key(&*host);
                host.set_animator_trigger(target, key, should_be_active);
            }
        }
        _ => {
            if let Some((property, inverted)) = kind.property() {
                host.write(target, property, should_be_active != inverted);
            }
        }
    }
}

/// Flip the live reading of `target` under `kind`. Animator kinds are left
/// untouched since their reading is not a plain flag.
pub fn toggle<H: TargetHost + ?Sized>(host: &mut H, target: TargetRef, kind: TargetKind) {
    if let Some((property, _)) = kind.property() {
        let current = host.read(target, property);
        host.write(target, property, !current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_receiver_beats_generic_behaviour() {
        let caps = Capabilities::EVENT_RECEIVER | Capabilities::BEHAVIOUR;
        assert_eq!(classify_capabilities(caps), TargetKind::UdonBehaviour);
    }

    #[test]
    fn event_receiver_beats_renderer() {
        let caps = Capabilities::RENDERER | Capabilities::EVENT_RECEIVER;
        assert_eq!(classify_capabilities(caps), TargetKind::UdonBehaviour);
    }

    #[test]
    fn game_object_wins_over_everything() {
        let caps = Capabilities::all();
        assert_eq!(classify_capabilities(caps), TargetKind::GameObject);
    }

    #[test]
    fn host_kinds_and_unknown() {
        assert_eq!(
            classify_capabilities(Capabilities::PARTICLE_SYSTEM | Capabilities::BEHAVIOUR),
            TargetKind::ParticleSystem
        );
        assert_eq!(classify_capabilities(Capabilities::ANIMATOR), TargetKind::Animator);
        assert_eq!(classify_capabilities(Capabilities::BEHAVIOUR), TargetKind::Unknown);
        assert_eq!(classify_capabilities(Capabilities::empty()), TargetKind::Unknown);
    }

    #[test]
    fn constraints_keep_their_order() {
        let caps = Capabilities::AIM_CONSTRAINT | Capabilities::ROTATION_CONSTRAINT;
        assert_eq!(classify_capabilities(caps), TargetKind::RotationConstraint);
        assert_eq!(
            classify_capabilities(Capabilities::PICKUP | Capabilities::LOOK_AT_CONSTRAINT),
            TargetKind::LookAtConstraint
        );
    }
}
