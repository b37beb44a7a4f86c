//! In-memory scene implementing every host trait, for tests and benches.

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

use lazy_switch_core::{
    Capabilities, Networking, ParticleModule, PlayerId, PlayerRef, PlayerStore, Pose, Property,
    RespawnHost, Switch, TargetHost, TargetRef,
};

/// Object types a scene fixture can declare.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    GameObject,
    /// Script behaviour; receives networked events.
    Script,
    /// Authoring-side wrapper around a script behaviour.
    ScriptProxy,
    /// Script that also renders; classifies as a script.
    ScriptRenderer,
    Renderer,
    Collider,
    Camera,
    Rigidbody,
    Selectable,
    PositionConstraint,
    RotationConstraint,
    ScaleConstraint,
    ParentConstraint,
    AimConstraint,
    LookAtConstraint,
    Pickup,
    CustomRenderTexture,
    ParticleSystem,
    Animator,
    /// Plain component with only an `enabled` flag.
    Behaviour,
    ObjectSync,
    ObjectPool,
}

impl ObjectType {
    pub fn capabilities(self) -> Capabilities {
        match self {
            ObjectType::GameObject => Capabilities::GAME_OBJECT,
            ObjectType::Script => Capabilities::EVENT_RECEIVER | Capabilities::BEHAVIOUR,
            ObjectType::ScriptProxy => Capabilities::SCRIPT_PROXY | Capabilities::BEHAVIOUR,
            ObjectType::ScriptRenderer => {
                Capabilities::EVENT_RECEIVER | Capabilities::RENDERER | Capabilities::BEHAVIOUR
            }
            ObjectType::Renderer => Capabilities::RENDERER,
            ObjectType::Collider => Capabilities::COLLIDER,
            ObjectType::Camera => Capabilities::CAMERA | Capabilities::BEHAVIOUR,
            ObjectType::Rigidbody => Capabilities::RIGIDBODY,
            ObjectType::Selectable => Capabilities::SELECTABLE | Capabilities::BEHAVIOUR,
            ObjectType::PositionConstraint => Capabilities::POSITION_CONSTRAINT,
            ObjectType::RotationConstraint => Capabilities::ROTATION_CONSTRAINT,
            ObjectType::ScaleConstraint => Capabilities::SCALE_CONSTRAINT,
            ObjectType::ParentConstraint => Capabilities::PARENT_CONSTRAINT,
            ObjectType::AimConstraint => Capabilities::AIM_CONSTRAINT,
            ObjectType::LookAtConstraint => Capabilities::LOOK_AT_CONSTRAINT,
            ObjectType::Pickup => Capabilities::PICKUP | Capabilities::BEHAVIOUR,
            ObjectType::CustomRenderTexture => Capabilities::CUSTOM_RENDER_TEXTURE,
            ObjectType::ParticleSystem => Capabilities::PARTICLE_SYSTEM,
            ObjectType::Animator => Capabilities::ANIMATOR | Capabilities::BEHAVIOUR,
            ObjectType::Behaviour | ObjectType::ObjectSync | ObjectType::ObjectPool => Capabilities::BEHAVIOUR,
        }
    }

    /// Assets live outside the hierarchy.
    fn is_asset(self) -> bool {
        matches!(self, ObjectType::CustomRenderTexture)
    }
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct MockObject {
    pub id: TargetRef,
    #[serde(rename = "type")]
    pub ty: ObjectType,
    /// Reading under the object's natural kind: active for game objects,
    /// enabled for components, not kinematic for rigidbodies.
    #[serde(default = "yes")]
    pub active: bool,
    /// Game object hosting a component.
    #[serde(default)]
    pub owner: Option<TargetRef>,
    /// Parent game object.
    #[serde(default)]
    pub parent: Option<TargetRef>,
    #[serde(default)]
    pub editor_only: bool,
    /// Backing behaviour of a script proxy.
    #[serde(default)]
    pub backing: Option<TargetRef>,
    #[serde(default)]
    pub modules: HashMap<ParticleModule, bool>,
    /// Animator bool parameter defaults.
    #[serde(default)]
    pub bools: HashMap<String, bool>,
    /// Network owner; the local player when absent.
    #[serde(default)]
    pub network_owner: Option<i32>,
    #[serde(default = "yes")]
    pub network_ready: bool,
    #[serde(default)]
    pub held: bool,
    #[serde(default)]
    pub pose: Pose,
}

impl MockObject {
    pub fn new(id: u64, ty: ObjectType) -> Self {
        Self {
            id: TargetRef(id),
            ty,
            active: true,
            owner: None,
            parent: None,
            editor_only: false,
            backing: None,
            modules: HashMap::new(),
            bools: HashMap::new(),
            network_owner: None,
            network_ready: true,
            held: false,
            pose: Pose::default(),
        }
    }

    fn initial(&self, property: Property) -> bool {
        match property {
            Property::Kinematic => !self.active,
            Property::ParticleModule(module) => self.modules.get(&module).copied().unwrap_or(self.active),
            _ => self.active,
        }
    }
}

/// Scene fixture: objects, switches and the local player.
#[derive(Clone, Debug, Deserialize)]
pub struct Scene {
    #[serde(default = "default_local")]
    pub local_player: i32,
    pub objects: Vec<MockObject>,
    #[serde(default)]
    pub switches: Vec<Switch>,
}

fn default_local() -> i32 {
    1
}

#[derive(Debug, Default)]
pub struct MockWorld {
    pub local: i32,
    objects: HashMap<TargetRef, MockObject>,
    props: HashMap<(TargetRef, Property), bool>,
    animator_values: HashMap<(TargetRef, i32), bool>,
    store: HashMap<(PlayerId, String), u8>,
    destroyed: HashSet<TargetRef>,

    /// Every property write, in order.
    pub writes: Vec<(TargetRef, Property, bool)>,
    pub triggers: Vec<(TargetRef, i32, bool)>,
    pub serialization_requests: Vec<TargetRef>,
    pub owner_changes: Vec<(PlayerId, TargetRef)>,
    pub drops: Vec<TargetRef>,
    pub synced_respawns: Vec<TargetRef>,
    pub pool_returns: Vec<(TargetRef, TargetRef)>,
    pub broadcasts: Vec<TargetRef>,
}

impl MockWorld {
    pub fn new(local: i32) -> Self {
        Self {
            local,
            ..Self::default()
        }
    }

    pub fn from_objects(local: i32, objects: impl IntoIterator<Item = MockObject>) -> Self {
        let mut world = Self::new(local);
        for object in objects {
            world.add(object);
        }
        world
    }

    pub fn add(&mut self, object: MockObject) -> TargetRef {
        let id = object.id;
        self.objects.insert(id, object);
        id
    }

    pub fn object(&self, target: TargetRef) -> Option<&MockObject> {
        self.objects.get(&target)
    }

    pub fn object_mut(&mut self, target: TargetRef) -> Option<&mut MockObject> {
        self.objects.get_mut(&target)
    }

    pub fn destroy(&mut self, target: TargetRef) {
        self.destroyed.insert(target);
    }

    /// Reading of `target` under its natural property, with writes applied.
    pub fn is_on(&self, target: TargetRef) -> bool {
        let Some(object) = self.objects.get(&target) else {
            return false;
        };
        let property = match object.ty {
            ObjectType::GameObject => Property::ActiveSelf,
            ObjectType::Rigidbody => return !self.read(target, Property::Kinematic),
            ObjectType::Selectable => Property::Interactable,
            ObjectType::Pickup => Property::Pickupable,
            ObjectType::CustomRenderTexture => Property::RealtimeUpdate,
            ObjectType::PositionConstraint
            | ObjectType::RotationConstraint
            | ObjectType::ScaleConstraint
            | ObjectType::ParentConstraint
            | ObjectType::AimConstraint
            | ObjectType::LookAtConstraint => Property::ConstraintActive,
            _ => Property::Enabled,
        };
        self.read(target, property)
    }

    pub fn set_on(&mut self, target: TargetRef, property: Property, value: bool) {
        self.props.insert((target, property), value);
    }

    pub fn animator_value(&self, target: TargetRef, name: &str) -> Option<bool> {
        let key = self.parameter_key(name);
        self.animator_values.get(&(target, key)).copied()
    }

    pub fn stored(&self, player: i32, key: &str) -> Option<u8> {
        self.store.get(&(PlayerId(player), key.to_owned())).copied()
    }

    pub fn seed_store(&mut self, player: i32, key: &str, value: u8) {
        self.store.insert((PlayerId(player), key.to_owned()), value);
    }

    pub fn set_network_owner(&mut self, target: TargetRef, player: i32) {
        if let Some(object) = self.objects.get_mut(&target) {
            object.network_owner = Some(player);
        }
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.triggers.clear();
        self.serialization_requests.clear();
        self.owner_changes.clear();
    }

    fn player(&self, id: i32) -> PlayerRef {
        if id == self.local {
            PlayerRef::local(id)
        } else {
            PlayerRef::remote(id)
        }
    }
}

impl TargetHost for MockWorld {
    fn is_valid(&self, target: TargetRef) -> bool {
        self.objects.contains_key(&target) && !self.destroyed.contains(&target)
    }

    fn capabilities(&self, target: TargetRef) -> Capabilities {
        if !self.is_valid(target) {
            return Capabilities::empty();
        }
        self.objects
            .get(&target)
            .map_or(Capabilities::empty(), |o| o.ty.capabilities())
    }

    fn read(&self, target: TargetRef, property: Property) -> bool {
        if let Some(value) = self.props.get(&(target, property)) {
            return *value;
        }
        self.objects
            .get(&target)
            .is_some_and(|o| o.initial(property))
    }

    fn write(&mut self, target: TargetRef, property: Property, value: bool) {
        self.writes.push((target, property, value));
        self.props.insert((target, property), value);
    }

    fn animator_bool(&self, target: TargetRef, name: &str) -> bool {
        self.objects
            .get(&target)
            .and_then(|o| o.bools.get(name).copied())
            .unwrap_or(false)
    }

    fn set_animator_bool(&mut self, target: TargetRef, key: i32, value: bool) {
        self.animator_values.insert((target, key), value);
    }

    fn set_animator_trigger(&mut self, target: TargetRef, key: i32, fire: bool) {
        self.triggers.push((target, key, fire));
    }

    fn backing_object(&self, proxy: TargetRef) -> Option<TargetRef> {
        let object = self.objects.get(&proxy)?;
        match object.ty {
            ObjectType::ScriptProxy => object.backing,
            _ => None,
        }
    }

    fn owner_object(&self, target: TargetRef) -> Option<TargetRef> {
        let object = self.objects.get(&target)?;
        match object.ty {
            ObjectType::GameObject => Some(target),
            ty if ty.is_asset() => None,
            _ => object.owner,
        }
    }

    fn parent(&self, object: TargetRef) -> Option<TargetRef> {
        self.objects.get(&object).and_then(|o| o.parent)
    }

    fn is_editor_only(&self, object: TargetRef) -> bool {
        self.objects.get(&object).is_some_and(|o| o.editor_only)
    }

    fn is_active_in_hierarchy(&self, object: TargetRef) -> bool {
        let mut node = Some(object);
        while let Some(current) = node {
            if !self.read(current, Property::ActiveSelf) {
                return false;
            }
            node = self.parent(current);
        }
        true
    }
}

impl Networking for MockWorld {
    fn local_player(&self) -> PlayerRef {
        PlayerRef::local(self.local)
    }

    fn is_owner(&self, object: TargetRef) -> bool {
        self.owner_of(object).is_local
    }

    fn is_object_ready(&self, object: TargetRef) -> bool {
        self.objects.get(&object).map_or(true, |o| o.network_ready)
    }

    fn owner_of(&self, object: TargetRef) -> PlayerRef {
        let id = self
            .objects
            .get(&object)
            .and_then(|o| o.network_owner)
            .unwrap_or(self.local);
        self.player(id)
    }

    fn set_owner(&mut self, player: PlayerId, object: TargetRef) {
        self.owner_changes.push((player, object));
        self.set_network_owner(object, player.0);
    }

    fn request_serialization(&mut self, object: TargetRef) {
        self.serialization_requests.push(object);
    }
}

impl PlayerStore for MockWorld {
    fn set_byte(&mut self, key: &str, value: u8) {
        self.store.insert((PlayerId(self.local), key.to_owned()), value);
    }

    fn try_get_byte(&self, player: PlayerId, key: &str) -> Option<u8> {
        self.store.get(&(player, key.to_owned())).copied()
    }
}

impl RespawnHost for MockWorld {
    fn pose(&self, object: TargetRef) -> Pose {
        self.objects.get(&object).map(|o| o.pose).unwrap_or_default()
    }

    fn set_pose(&mut self, object: TargetRef, pose: Pose) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.pose = pose;
        }
    }

    fn is_held(&self, pickup: TargetRef) -> bool {
        self.objects.get(&pickup).is_some_and(|o| o.held)
    }

    fn drop_pickup(&mut self, pickup: TargetRef) {
        self.drops.push(pickup);
        if let Some(o) = self.objects.get_mut(&pickup) {
            o.held = false;
        }
    }

    fn respawn_synced(&mut self, object_sync: TargetRef) {
        self.synced_respawns.push(object_sync);
    }

    fn return_to_pool(&mut self, pool: TargetRef, object: TargetRef) {
        self.pool_returns.push((pool, object));
    }

    fn broadcast_respawn(&mut self, respawner: TargetRef) {
        self.broadcasts.push(respawner);
    }
}
