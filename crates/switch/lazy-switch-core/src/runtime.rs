//! Switch runtime: the arena of switches and their state machine.
//!
//! Every entry point takes the host explicitly. Calls addressed to a slave are
//! routed to its group master, which applies its own rows, mirrors its state
//! onto the slaves and owns network sync and persistence.

use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::Config;
use crate::consolidate::{self, ConsolidationReport};
use crate::error::SwitchError;
use crate::host::{Host, TargetHost};
use crate::ids::{IdAllocator, PlayerRef, SwitchId};
use crate::link;
use crate::mask::StateMask;
use crate::resolver;
use crate::switch::Switch;

#[derive(Debug)]
pub struct SwitchRuntime {
    pub cfg: Config,
    ids: IdAllocator,
    switches: Vec<Switch>,
    rng: Pcg32,
}

impl Default for SwitchRuntime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SwitchRuntime {
    pub fn new(cfg: Config) -> Self {
        let seed = cfg.rng_seed.unwrap_or_else(rand::random);
        Self {
            cfg,
            ids: IdAllocator::new(),
            switches: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Build a runtime from switches whose master links refer to their
    /// position in `switches`.
    pub fn with_switches(cfg: Config, switches: impl IntoIterator<Item = Switch>) -> Self {
        let mut runtime = Self::new(cfg);
        for switch in switches {
            runtime.insert(switch);
        }
        runtime
    }

    /// Add a switch. Its id is reassigned to its arena slot.
    ///
    /// The state count is raised to the authored group count so an authored
    /// state survives until consolidation settles the group's final count.
    pub fn insert(&mut self, mut switch: Switch) -> SwitchId {
        let id = self.ids.alloc_switch();
        switch.id = id;
        switch.state_count = switch.state_count.max(switch.group_count() as i32);
        switch.state = switch.wrap(switch.state);
        switch.refresh_allowed_states();
        self.switches.push(switch);
        id
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    pub fn get(&self, id: SwitchId) -> Option<&Switch> {
        self.switches.get(id.index())
    }

    pub fn get_mut(&mut self, id: SwitchId) -> Option<&mut Switch> {
        self.switches.get_mut(id.index())
    }

    fn switch(&self, id: SwitchId) -> Result<&Switch, SwitchError> {
        self.get(id).ok_or(SwitchError::UnknownSwitch(id))
    }

    fn switch_mut(&mut self, id: SwitchId) -> Result<&mut Switch, SwitchError> {
        self.get_mut(id).ok_or(SwitchError::UnknownSwitch(id))
    }

    /// Switch that owns state for `id`: the end of its master chain.
    pub fn resolve_master(&self, id: SwitchId) -> Result<SwitchId, SwitchError> {
        link::resolve_terminal(&self.switches, id)
    }

    /// Effective state, read through the master.
    pub fn state(&self, id: SwitchId) -> Result<i32, SwitchError> {
        let master = self.resolve_master(id)?;
        Ok(self.switches[master.index()].state)
    }

    /// Set the group's state, taken modulo the state count.
    ///
    /// Returns `false` (and does nothing) when the wrapped value equals the
    /// current state.
    pub fn set_state<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId, value: i32) -> Result<bool, SwitchError> {
        let master = self.resolve_master(id)?;
        let sw = &mut self.switches[master.index()];
        let value = sw.wrap(value);
        if sw.state == value {
            return Ok(false);
        }
        sw.state = value;
        self.commit(host, master);
        Ok(true)
    }

    /// Move to the next enterable state, or a random one for randomized
    /// switches. Not gated by interaction blocking.
    ///
    /// Returns `false` when the switch has no enterable state.
    pub fn advance<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId) -> Result<bool, SwitchError> {
        let master = self.resolve_master(id)?;
        let sw = &self.switches[master.index()];
        let allowed = sw.allowed_list();
        let next = if allowed.is_empty() {
            None
        } else if sw.is_randomized {
            Some(allowed[self.rng.random_range(0..allowed.len())])
        } else {
            sw.next_allowed_state()
        };
        let Some(next) = next else {
            trace!("{master}: no enterable state");
            return Ok(false);
        };
        self.switches[master.index()].state = next;
        self.commit(host, master);
        Ok(true)
    }

    /// User interaction on the switch `id`.
    ///
    /// Ignored while interaction is blocked on `id` or the group has no
    /// enterable state.
    pub fn interact<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId) -> Result<bool, SwitchError> {
        if !self.is_interactive(id)? {
            return Ok(false);
        }
        self.advance(host, id)
    }

    pub fn is_interactive(&self, id: SwitchId) -> Result<bool, SwitchError> {
        if self.switch(id)?.interaction_disabled {
            return Ok(false);
        }
        let master = self.resolve_master(id)?;
        Ok(!self.switches[master.index()].allowed_list().is_empty())
    }

    pub fn set_interaction_disabled(&mut self, id: SwitchId, disabled: bool) -> Result<(), SwitchError> {
        self.switch_mut(id)?.interaction_disabled = disabled;
        Ok(())
    }

    pub fn set_allowed_states(&mut self, id: SwitchId, mask: StateMask) -> Result<(), SwitchError> {
        let sw = self.switch_mut(id)?;
        sw.allowed_states = mask;
        sw.refresh_allowed_states();
        Ok(())
    }

    /// The switch became enabled and active.
    ///
    /// Slaves re-apply their rows. A synced switch owned elsewhere adopts the
    /// last received state once its object is network-ready; otherwise the
    /// persisted state is restored.
    pub fn on_enable<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId) -> Result<(), SwitchError> {
        let sw = self.switch_mut(id)?;
        sw.enabled = true;
        if sw.master().is_some() {
            apply_bindings(&self.switches[id.index()], host);
            return Ok(());
        }

        if sw.is_synced && !host.is_owner(sw.object) {
            if !host.is_object_ready(sw.object) {
                return Ok(());
            }
            sw.state = sw.wrap(i32::from(sw.synced_state));
            self.save(host, id);
        } else {
            let local = host.local_player();
            self.load(host, id, local);
        }
        self.update_state(host, id);
        Ok(())
    }

    /// Persisted data for `player` became available.
    ///
    /// Only the local player's restore matters, and only on masters. Returns
    /// whether a stored state was adopted.
    pub fn on_player_restored<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        id: SwitchId,
        player: PlayerRef,
    ) -> Result<bool, SwitchError> {
        let sw = self.switch(id)?;
        if !player.is_local || sw.master().is_some() {
            return Ok(false);
        }
        if !self.load(host, id, player) {
            return Ok(false);
        }
        self.update_state(host, id);
        self.sync(host, id);
        Ok(true)
    }

    /// Byte to replicate for a synced switch.
    pub fn on_pre_serialization(&mut self, id: SwitchId) -> Result<Option<u8>, SwitchError> {
        let sw = self.switch_mut(id)?;
        if !sw.is_synced {
            return Ok(None);
        }
        sw.synced_state = sw.state as u8;
        Ok(Some(sw.synced_state))
    }

    /// Adopt a replicated state. Applies and persists it without requesting
    /// another serialization.
    pub fn on_deserialization<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId, synced: u8) -> Result<(), SwitchError> {
        let sw = self.switch_mut(id)?;
        if !sw.is_synced {
            return Ok(());
        }
        sw.synced_state = synced;
        sw.state = sw.wrap(i32::from(synced));
        self.update_state(host, id);
        self.save(host, id);
        Ok(())
    }

    /// Run the build-time consolidation pass over every switch.
    pub fn consolidate<H: TargetHost + ?Sized>(&mut self, host: &mut H) -> Result<ConsolidationReport, SwitchError> {
        let report = consolidate::consolidate(&mut self.switches, host)?;
        debug!(
            "consolidated {} switches into {} rows ({} dropped, {} groups)",
            report.switches, report.bindings, report.dropped, report.groups
        );
        Ok(report)
    }

    /// Apply, sync and persist a state change on a master.
    fn commit<H: Host + ?Sized>(&mut self, host: &mut H, master: SwitchId) {
        self.update_state(host, master);
        self.sync(host, master);
        self.save(host, master);
    }

    fn update_state<H: TargetHost + ?Sized>(&mut self, host: &mut H, master: SwitchId) {
        apply_bindings(&self.switches[master.index()], host);
        let state = self.switches[master.index()].state;
        for k in 0..self.switches[master.index()].slaves.len() {
            let slave = self.switches[master.index()].slaves[k];
            let Some(sw) = self.switches.get_mut(slave.index()) else {
                continue;
            };
            sw.state = state;
            apply_bindings(&self.switches[slave.index()], host);
        }
    }

    fn sync<H: Host + ?Sized>(&self, host: &mut H, id: SwitchId) {
        let sw = &self.switches[id.index()];
        if !sw.is_synced {
            return;
        }
        if !host.is_owner(sw.object) {
            let local = host.local_player();
            host.set_owner(local.id, sw.object);
        }
        host.request_serialization(sw.object);
    }

    fn save<H: Host + ?Sized>(&self, host: &mut H, id: SwitchId) {
        let sw = &self.switches[id.index()];
        if sw.persists() {
            host.set_byte(&sw.persistence_key, sw.state as u8);
        }
    }

    /// Restore the persisted state. A synced switch owned elsewhere instead
    /// writes the replicated state into storage.
    fn load<H: Host + ?Sized>(&mut self, host: &mut H, id: SwitchId, player: PlayerRef) -> bool {
        let sw = &mut self.switches[id.index()];
        if !sw.persists() {
            return false;
        }
        if sw.is_synced && !host.is_owner(sw.object) {
            host.set_byte(&sw.persistence_key, sw.synced_state);
            return false;
        }
        match host.try_get_byte(player.id, &sw.persistence_key) {
            Some(saved) => {
                sw.state = sw.wrap(i32::from(saved));
                true
            }
            None => false,
        }
    }
}

/// Drive every row of `sw` for its current state. Nothing happens while the
/// switch is disabled or its object is inactive; destroyed targets are skipped.
fn apply_bindings<H: TargetHost + ?Sized>(sw: &Switch, host: &mut H) {
    if !sw.enabled || !host.is_active_in_hierarchy(sw.object) {
        return;
    }
    for binding in &sw.bindings {
        if !host.is_valid(binding.target) {
            trace!("{}: {} is gone, skipped", sw.id, binding.target);
            continue;
        }
        resolver::apply(
            host,
            binding.target,
            binding.kind,
            binding.parameter.as_ref(),
            binding.should_be_active(sw.state),
        );
    }
}
