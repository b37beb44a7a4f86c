//! Respawn companion: puts a set of objects back where they started.
//!
//! Delayed respawns are explicit deadlines. The host calls [`Respawner::tick`]
//! with the current time and the respawner runs whatever has come due.

use hashbrown::HashSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::host::{Networking, TargetHost};
use crate::ids::{PlayerId, PlayerRef, TargetRef};

/// What sets a respawn off.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TriggerMode {
    #[default]
    InteractLocal,
    /// Interaction respawns on every client through a network event.
    InteractGlobal,
    LocalPlayerEnter,
    LocalPlayerExit,
    AnyPlayerEnter,
    AnyPlayerExit,
    FirstPlayerEnter,
    LastPlayerExit,
    /// Only explicit [`Respawner::do_respawn`] calls.
    Manual,
}

impl TriggerMode {
    #[inline]
    pub fn is_interact(self) -> bool {
        matches!(self, TriggerMode::InteractLocal | TriggerMode::InteractGlobal)
    }

    #[inline]
    fn tracks_players(self) -> bool {
        matches!(self, TriggerMode::FirstPlayerEnter | TriggerMode::LastPlayerExit)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// One object to respawn and the helpers attached to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RespawnTarget {
    pub object: TargetRef,
    /// Network position sync component; respawned through the host when set.
    #[serde(default)]
    pub object_sync: Option<TargetRef>,
    /// Pool the object is returned to after respawning.
    #[serde(default)]
    pub pool: Option<TargetRef>,
    #[serde(default)]
    pub pickup: Option<TargetRef>,
    /// Force a held pickup out of the player's hand; held pickups are left
    /// alone otherwise.
    #[serde(default)]
    pub drop_on_respawn: bool,
    #[serde(skip)]
    pub home: Pose,
}

impl RespawnTarget {
    pub fn new(object: TargetRef) -> Self {
        Self {
            object,
            object_sync: None,
            pool: None,
            pickup: None,
            drop_on_respawn: false,
            home: Pose::default(),
        }
    }
}

/// Scene operations needed to respawn objects.
pub trait RespawnHost: TargetHost + Networking {
    fn pose(&self, object: TargetRef) -> Pose;

    fn set_pose(&mut self, object: TargetRef, pose: Pose);

    fn is_held(&self, pickup: TargetRef) -> bool;

    fn drop_pickup(&mut self, pickup: TargetRef);

    /// Teleport a network-synced object back to its spawn point.
    fn respawn_synced(&mut self, object_sync: TargetRef);

    fn return_to_pool(&mut self, pool: TargetRef, object: TargetRef);

    /// Ask every client to run [`Respawner::exec`] on `respawner`.
    fn broadcast_respawn(&mut self, respawner: TargetRef);
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RespawnOutcome {
    Idle,
    Scheduled { at: f32 },
    Broadcast,
    /// `retry_at` is set when some pooled targets were owned elsewhere.
    Executed { respawned: usize, retry_at: Option<f32> },
}

fn default_retry_delay() -> f32 {
    Config::default().respawn_retry_delay
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Respawner {
    /// Object hosting the component; identifies it in network broadcasts.
    pub object: TargetRef,
    #[serde(default)]
    pub trigger_mode: TriggerMode,
    /// Seconds between the trigger and the respawn.
    #[serde(default)]
    pub delay: f32,
    /// Restart a pending delay on every trigger instead of ignoring repeats.
    #[serde(default)]
    pub debounce: bool,
    #[serde(default)]
    pub targets: Vec<RespawnTarget>,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f32,

    #[serde(skip)]
    pub interaction_disabled: bool,
    #[serde(skip)]
    deadline: Option<f32>,
    #[serde(skip)]
    retry_at: Option<f32>,
    #[serde(skip)]
    entered: HashSet<PlayerId>,
}

impl Respawner {
    pub fn new(object: TargetRef, trigger_mode: TriggerMode, cfg: &Config) -> Self {
        Self {
            object,
            trigger_mode,
            delay: 0.0,
            debounce: false,
            targets: Vec::new(),
            retry_delay: cfg.respawn_retry_delay,
            interaction_disabled: false,
            deadline: None,
            retry_at: None,
            entered: HashSet::new(),
        }
    }

    pub fn deadline(&self) -> Option<f32> {
        self.deadline
    }

    pub fn retry_at(&self) -> Option<f32> {
        self.retry_at
    }

    /// Capture home poses. Interaction is only offered in the interact modes.
    pub fn start<H: RespawnHost + ?Sized>(&mut self, host: &H) {
        for target in &mut self.targets {
            target.home = host.pose(target.object);
        }
        self.interaction_disabled = !self.trigger_mode.is_interact();
        if self.trigger_mode.tracks_players() {
            self.entered.clear();
        }
    }

    pub fn interact<H: RespawnHost + ?Sized>(&mut self, now: f32, host: &mut H) -> RespawnOutcome {
        if self.trigger_mode.is_interact() {
            self.do_respawn(now, host)
        } else {
            RespawnOutcome::Idle
        }
    }

    pub fn on_player_trigger_enter<H: RespawnHost + ?Sized>(
        &mut self,
        now: f32,
        host: &mut H,
        player: PlayerRef,
    ) -> RespawnOutcome {
        match self.trigger_mode {
            TriggerMode::LocalPlayerEnter if player.is_local => self.do_respawn(now, host),
            TriggerMode::AnyPlayerEnter => self.do_respawn(now, host),
            TriggerMode::FirstPlayerEnter => {
                let first = self.entered.is_empty();
                self.entered.insert(player.id);
                if first {
                    self.do_respawn(now, host)
                } else {
                    RespawnOutcome::Idle
                }
            }
            TriggerMode::LastPlayerExit => {
                self.entered.insert(player.id);
                RespawnOutcome::Idle
            }
            _ => RespawnOutcome::Idle,
        }
    }

    pub fn on_player_trigger_exit<H: RespawnHost + ?Sized>(
        &mut self,
        now: f32,
        host: &mut H,
        player: PlayerRef,
    ) -> RespawnOutcome {
        match self.trigger_mode {
            TriggerMode::LocalPlayerExit if player.is_local => self.do_respawn(now, host),
            TriggerMode::AnyPlayerExit => self.do_respawn(now, host),
            TriggerMode::FirstPlayerEnter => {
                self.entered.remove(&player.id);
                RespawnOutcome::Idle
            }
            TriggerMode::LastPlayerExit => {
                if self.entered.remove(&player.id) && self.entered.is_empty() {
                    self.do_respawn(now, host)
                } else {
                    RespawnOutcome::Idle
                }
            }
            _ => RespawnOutcome::Idle,
        }
    }

    /// Respawn now, or schedule it `delay` seconds out.
    ///
    /// Without debounce a pending deadline is kept and the repeat ignored.
    pub fn do_respawn<H: RespawnHost + ?Sized>(&mut self, now: f32, host: &mut H) -> RespawnOutcome {
        if self.delay <= 0.0 {
            return self.broadcast(now, host);
        }
        if let (Some(at), false) = (self.deadline, self.debounce) {
            return RespawnOutcome::Scheduled { at };
        }
        let at = now + self.delay;
        self.deadline = Some(at);
        debug!("{}: respawn scheduled at {at}", self.object);
        RespawnOutcome::Scheduled { at }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Run the pending respawn or retry if it has come due.
    pub fn tick<H: RespawnHost + ?Sized>(&mut self, now: f32, host: &mut H) -> RespawnOutcome {
        if self.deadline.is_some_and(|at| now >= at) {
            self.deadline = None;
            return self.broadcast(now, host);
        }
        if self.retry_at.is_some_and(|at| now >= at) {
            return self.exec(now, host);
        }
        RespawnOutcome::Idle
    }

    fn broadcast<H: RespawnHost + ?Sized>(&mut self, now: f32, host: &mut H) -> RespawnOutcome {
        if self.trigger_mode == TriggerMode::InteractGlobal {
            host.broadcast_respawn(self.object);
            RespawnOutcome::Broadcast
        } else {
            self.exec(now, host)
        }
    }

    /// Respawn every target this client may move.
    ///
    /// Targets with object sync need local ownership. A pooled target owned
    /// elsewhere schedules one retry after `retry_delay`.
    pub fn exec<H: RespawnHost + ?Sized>(&mut self, now: f32, host: &mut H) -> RespawnOutcome {
        self.deadline = None;
        self.retry_at = None;
        let mut respawned = 0;
        let mut delayed = false;

        for target in &self.targets {
            if !host.is_valid(target.object) {
                continue;
            }
            let sync = target.object_sync.filter(|s| host.is_valid(*s));
            let pool = target.pool.filter(|p| host.is_valid(*p));
            let pickup = target.pickup.filter(|p| host.is_valid(*p));
            let held = pickup.is_some_and(|p| host.is_held(p));

            if sync.is_none() || host.is_owner(target.object) {
                if held {
                    if !target.drop_on_respawn {
                        continue;
                    }
                    if let Some(pickup) = pickup {
                        host.drop_pickup(pickup);
                    }
                }
                match sync {
                    Some(sync) => host.respawn_synced(sync),
                    None => host.set_pose(target.object, target.home),
                }
                if let Some(pool) = pool {
                    let owner = host.owner_of(pool);
                    if owner.is_local {
                        host.return_to_pool(pool, target.object);
                    } else {
                        host.set_owner(owner.id, target.object);
                    }
                }
                respawned += 1;
            } else if !delayed
                && pool.is_some_and(|p| !host.is_owner(p))
                && (!held || target.drop_on_respawn)
            {
                delayed = true;
            }
        }

        if delayed {
            let at = now + self.retry_delay;
            debug!("{}: pooled targets owned elsewhere, retrying at {at}", self.object);
            self.retry_at = Some(at);
        }
        RespawnOutcome::Executed {
            respawned,
            retry_at: self.retry_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interact_modes() {
        assert!(TriggerMode::InteractLocal.is_interact());
        assert!(TriggerMode::InteractGlobal.is_interact());
        assert!(!TriggerMode::Manual.is_interact());
        assert!(TriggerMode::LastPlayerExit.tracks_players());
    }

    #[test]
    fn json_defaults() {
        let r: Respawner = serde_json::from_str(r#"{ "object": 3, "delay": 2.0 }"#).unwrap();
        assert_eq!(r.trigger_mode, TriggerMode::InteractLocal);
        assert_eq!(r.retry_delay, 0.5);
        assert!(r.deadline().is_none());
    }
}
