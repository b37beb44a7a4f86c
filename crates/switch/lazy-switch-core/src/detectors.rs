//! Companion components that drive a switch from scene events.
//!
//! Each holds the id of the switch it controls. A component whose switch is
//! missing logs an error on enable and disables itself.

use hashbrown::HashSet;
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::SwitchError;
use crate::host::Host;
use crate::ids::{PlayerId, PlayerRef, SwitchId, TargetRef};
use crate::runtime::SwitchRuntime;

/// Resolve the controlled switch and, when it shares this component's object,
/// take interaction away from it.
fn claim_switch(runtime: &mut SwitchRuntime, object: TargetRef, switch: Option<SwitchId>) -> Option<SwitchId> {
    let id = switch?;
    let sw = runtime.get_mut(id)?;
    if sw.object == object {
        sw.interaction_disabled = true;
    }
    Some(id)
}

/// Set `state` when non-negative, otherwise advance.
fn drive<H: Host + ?Sized>(
    runtime: &mut SwitchRuntime,
    host: &mut H,
    id: SwitchId,
    state: i32,
) -> Result<(), SwitchError> {
    if state >= 0 {
        runtime.set_state(host, id, state)?;
    } else {
        runtime.advance(host, id)?;
    }
    Ok(())
}

/// Blocks interaction on a switch living on the same object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionBlocker {
    pub object: TargetRef,
    #[serde(default)]
    pub switch: Option<SwitchId>,
    #[serde(skip, default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl InteractionBlocker {
    pub fn new(object: TargetRef, switch: Option<SwitchId>) -> Self {
        Self {
            object,
            switch,
            enabled: true,
        }
    }

    /// Returns the controlled switch, or `None` after disabling itself.
    pub fn on_enable(&mut self, runtime: &mut SwitchRuntime) -> Option<SwitchId> {
        let claimed = claim_switch(runtime, self.object, self.switch);
        if claimed.is_none() {
            error!("{}: switch is not assigned", self.object);
            self.enabled = false;
        }
        claimed
    }
}

/// Changes a switch when its own object is enabled or disabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableDetector {
    #[serde(flatten)]
    pub blocker: InteractionBlocker,
    pub detect_on_enable: bool,
    /// `-1` advances instead of setting a state.
    pub enable_state: i32,
    pub detect_on_disable: bool,
    pub disable_state: i32,
}

impl EnableDetector {
    pub fn new(object: TargetRef, switch: Option<SwitchId>) -> Self {
        Self {
            blocker: InteractionBlocker::new(object, switch),
            detect_on_enable: true,
            enable_state: -1,
            detect_on_disable: true,
            disable_state: -1,
        }
    }

    pub fn on_enable<H: Host + ?Sized>(&mut self, runtime: &mut SwitchRuntime, host: &mut H) -> Result<(), SwitchError> {
        let Some(id) = self.blocker.on_enable(runtime) else {
            return Ok(());
        };
        if !self.detect_on_enable {
            return Ok(());
        }
        drive(runtime, host, id, self.enable_state)
    }

    pub fn on_disable<H: Host + ?Sized>(&mut self, runtime: &mut SwitchRuntime, host: &mut H) -> Result<(), SwitchError> {
        if !self.detect_on_disable || !self.blocker.enabled {
            return Ok(());
        }
        let Some(id) = self.blocker.switch.filter(|id| runtime.get(*id).is_some()) else {
            return Ok(());
        };
        drive(runtime, host, id, self.disable_state)
    }
}

/// Changes a switch when players enter or leave a trigger volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEnterDetector {
    pub object: TargetRef,
    #[serde(default)]
    pub switch: Option<SwitchId>,
    /// `-1` disables the reaction.
    pub enter_state: i32,
    pub exit_state: i32,
    /// Track every player: react to the first entry and the last exit only.
    #[serde(default)]
    pub detect_all_players: bool,
    #[serde(skip, default = "enabled")]
    pub enabled: bool,
    #[serde(skip)]
    entered: HashSet<PlayerId>,
}

impl PlayerEnterDetector {
    pub fn new(object: TargetRef, switch: Option<SwitchId>) -> Self {
        Self {
            object,
            switch,
            enter_state: -1,
            exit_state: -1,
            detect_all_players: false,
            enabled: true,
            entered: HashSet::new(),
        }
    }

    pub fn inside(&self) -> usize {
        self.entered.len()
    }

    pub fn on_enable(&mut self, runtime: &mut SwitchRuntime) {
        if claim_switch(runtime, self.object, self.switch).is_none() {
            error!("{}: switch is not assigned", self.object);
            self.enabled = false;
            return;
        }
        self.entered.clear();
    }

    pub fn on_player_trigger_enter<H: Host + ?Sized>(
        &mut self,
        runtime: &mut SwitchRuntime,
        host: &mut H,
        player: PlayerRef,
    ) -> Result<(), SwitchError> {
        let Some(id) = self.active_switch() else {
            return Ok(());
        };
        if !self.detect_all_players {
            if player.is_local && self.enter_state >= 0 {
                runtime.set_state(host, id, self.enter_state)?;
            }
            return Ok(());
        }
        let first = self.entered.is_empty();
        self.entered.insert(player.id);
        if first && self.enter_state >= 0 {
            runtime.set_state(host, id, self.enter_state)?;
        }
        Ok(())
    }

    pub fn on_player_trigger_exit<H: Host + ?Sized>(
        &mut self,
        runtime: &mut SwitchRuntime,
        host: &mut H,
        player: PlayerRef,
    ) -> Result<(), SwitchError> {
        let Some(id) = self.active_switch() else {
            return Ok(());
        };
        if !self.detect_all_players {
            if player.is_local && self.exit_state >= 0 {
                runtime.set_state(host, id, self.exit_state)?;
            }
            return Ok(());
        }
        if self.entered.remove(&player.id) && self.entered.is_empty() && self.exit_state >= 0 {
            runtime.set_state(host, id, self.exit_state)?;
        }
        Ok(())
    }

    fn active_switch(&self) -> Option<SwitchId> {
        self.switch.filter(|_| self.enabled)
    }
}
