//! Host collaborator traits.
//!
//! The core owns no scene objects. Adapters implement these traits over the
//! real runtime (or a mock world in tests) and pass them into the runtime and
//! the consolidation pass.

use crate::ids::{PlayerId, PlayerRef, TargetRef};
use crate::kind::{Capabilities, Property};

/// Read/write access to the objects switches are bound to.
pub trait TargetHost {
    /// `false` once the object has been destroyed or never existed.
    fn is_valid(&self, target: TargetRef) -> bool;

    /// Capabilities exposed by the reference; empty for invalid targets.
    fn capabilities(&self, target: TargetRef) -> Capabilities;

    fn read(&self, target: TargetRef, property: Property) -> bool;

    fn write(&mut self, target: TargetRef, property: Property, value: bool);

    /// Default value of an animator bool parameter, `false` when absent.
    fn animator_bool(&self, target: TargetRef, name: &str) -> bool;

    fn set_animator_bool(&mut self, target: TargetRef, key: i32, value: bool);

    /// Fire (`true`) or reset (`false`) an animator trigger.
    fn set_animator_trigger(&mut self, target: TargetRef, key: i32, fire: bool);

    /// Integer key for an animator parameter name.
    fn parameter_key(&self, name: &str) -> i32 {
        fnv1a(name)
    }

    /// Backing behaviour of an authoring proxy.
    fn backing_object(&self, _proxy: TargetRef) -> Option<TargetRef> {
        None
    }

    /// Hierarchy node hosting the target: the object itself for game objects,
    /// the owning game object for components, `None` for assets.
    fn owner_object(&self, target: TargetRef) -> Option<TargetRef>;

    fn parent(&self, _object: TargetRef) -> Option<TargetRef> {
        None
    }

    /// Whether the hierarchy node carries the editor-only marker.
    fn is_editor_only(&self, _object: TargetRef) -> bool {
        false
    }

    fn is_active_in_hierarchy(&self, object: TargetRef) -> bool;
}

/// Network ownership and replication requests. Best effort, fire-and-forget.
pub trait Networking {
    fn local_player(&self) -> PlayerRef;

    fn is_owner(&self, object: TargetRef) -> bool;

    /// Whether replicated data for the object has arrived.
    fn is_object_ready(&self, _object: TargetRef) -> bool {
        true
    }

    fn owner_of(&self, object: TargetRef) -> PlayerRef;

    fn set_owner(&mut self, player: PlayerId, object: TargetRef);

    fn request_serialization(&mut self, object: TargetRef);
}

/// Per-player durable key/value storage, one byte per key.
pub trait PlayerStore {
    fn set_byte(&mut self, key: &str, value: u8);

    fn try_get_byte(&self, player: PlayerId, key: &str) -> Option<u8>;
}

/// Everything the switch runtime needs from its host.
pub trait Host: TargetHost + Networking + PlayerStore {}

impl<T: TargetHost + Networking + PlayerStore + ?Sized> Host for T {}

/// Whether `target` survives into the runtime build.
///
/// Walks the target's hierarchy node and its ancestors; any editor-only marker
/// strips the whole branch. Assets without a hierarchy node are available.
pub fn is_available_on_runtime<H: TargetHost + ?Sized>(host: &H, target: TargetRef) -> bool {
    if !host.is_valid(target) {
        return false;
    }
    let mut node = host.owner_object(target);
    while let Some(current) = node {
        if host.is_editor_only(current) {
            return false;
        }
        node = host.parent(current);
    }
    true
}

fn fnv1a(name: &str) -> i32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_is_stable() {
        assert_eq!(fnv1a(""), 0x811c_9dc5_u32 as i32);
        assert_eq!(fnv1a("Open"), fnv1a("Open"));
        assert_ne!(fnv1a("Open"), fnv1a("Closed"));
    }
}
