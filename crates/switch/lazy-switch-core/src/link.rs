//! Master/slave link resolution.
//!
//! Switches reference their master by [`SwitchId`]. Chains are followed to
//! their terminal switch; every switch reaching the same terminal forms one
//! group with a single authoritative master and a flat list of slaves.
//!
//! Planning is read-only so that a malformed graph (unknown ids, cycles,
//! oversized tables) is rejected before any switch is touched.

use hashbrown::HashSet;
use indexmap::IndexMap;
use log::warn;

use crate::error::SwitchError;
use crate::host::{is_available_on_runtime, TargetHost};
use crate::ids::SwitchId;
use crate::mask::MAX_STATES;
use crate::switch::Switch;

/// Members reaching one terminal, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkGroup {
    pub members: Vec<SwitchId>,
    /// Largest state-group count over all members, at least 2.
    pub state_count: i32,
}

#[derive(Clone, Debug, Default)]
pub struct LinkPlan {
    /// Chain terminal per switch, indexed like the input slice.
    pub terminals: Vec<SwitchId>,
    pub groups: IndexMap<SwitchId, LinkGroup>,
    /// Switches whose master link points at themselves.
    pub self_links: Vec<SwitchId>,
}

impl LinkPlan {
    #[inline]
    pub fn terminal(&self, id: SwitchId) -> SwitchId {
        self.terminals.get(id.index()).copied().unwrap_or(id)
    }
}

fn lookup(switches: &[Switch], id: SwitchId) -> Result<&Switch, SwitchError> {
    switches.get(id.index()).ok_or(SwitchError::UnknownSwitch(id))
}

/// Follow master links from `start` to the end of the chain.
///
/// Self-references end the chain. Any longer loop is reported with the full
/// path that led into it.
pub fn resolve_terminal(switches: &[Switch], start: SwitchId) -> Result<SwitchId, SwitchError> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut current = start;
    loop {
        visited.insert(current);
        path.push(current);
        let Some(next) = lookup(switches, current)?.master() else {
            return Ok(current);
        };
        if visited.contains(&next) {
            path.push(next);
            return Err(SwitchError::MasterCycle { chain: path });
        }
        current = next;
    }
}

/// Group every switch under its chain terminal.
///
/// `switches[i]` must carry id `i`.
pub fn plan(switches: &[Switch]) -> Result<LinkPlan, SwitchError> {
    let mut plan = LinkPlan {
        terminals: Vec::with_capacity(switches.len()),
        ..LinkPlan::default()
    };
    for (index, switch) in switches.iter().enumerate() {
        let id = SwitchId(index as u32);
        let markers = switch.group_count();
        if markers > MAX_STATES {
            return Err(SwitchError::TooManyStates { max: MAX_STATES });
        }
        if switch.master == Some(id) {
            plan.self_links.push(id);
        }

        let terminal = resolve_terminal(switches, id)?;
        plan.terminals.push(terminal);
        let group = plan.groups.entry(terminal).or_insert_with(|| LinkGroup {
            members: Vec::new(),
            state_count: 2,
        });
        group.members.push(id);
        group.state_count = group.state_count.max(markers as i32);
    }
    Ok(plan)
}

/// Install the planned groups: pick each group's master, copy the group's
/// state onto every member and strip slaves of sync and persistence.
///
/// Returns the number of groups whose master had to be substituted.
pub fn finalize<H: TargetHost + ?Sized>(switches: &mut [Switch], plan: &LinkPlan, host: &H) -> usize {
    for id in &plan.self_links {
        warn!("{id}: master link points at itself, cleared");
        switches[id.index()].master = None;
    }

    let mut substituted = 0;
    for (&terminal, group) in &plan.groups {
        let mut master = terminal;
        if !is_available_on_runtime(host, switches[terminal.index()].object) {
            let candidate = group
                .members
                .iter()
                .copied()
                .find(|m| *m != terminal && is_available_on_runtime(host, switches[m.index()].object));
            if let Some(candidate) = candidate {
                warn!("{terminal}: master is stripped from the build, {candidate} takes over");
                master = candidate;
                substituted += 1;
            }
        }

        let count = group.state_count;
        let state = switches[terminal.index()].state.rem_euclid(count);
        let slaves: Vec<SwitchId> = group.members.iter().copied().filter(|m| *m != master).collect();

        let head = &mut switches[master.index()];
        head.master = None;
        head.state = state;
        head.state_count = count;
        head.refresh_allowed_states();
        if master != terminal {
            // the substitute takes over the group's network and storage role
            let (synced, key) = {
                let old = &switches[terminal.index()];
                (old.is_synced, old.persistence_key.clone())
            };
            let head = &mut switches[master.index()];
            head.is_synced = synced;
            head.persistence_key = key;
        }

        for slave in &slaves {
            let sw = &mut switches[slave.index()];
            sw.master = Some(master);
            sw.state = state;
            sw.state_count = count;
            sw.is_synced = false;
            sw.persistence_key.clear();
            sw.slaves.clear();
            sw.refresh_allowed_states();
        }
        switches[master.index()].slaves = slaves;
    }
    substituted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TargetRef;

    fn chain(masters: &[Option<u32>]) -> Vec<Switch> {
        masters
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mut sw = Switch::new(TargetRef(i as u64 + 100));
                sw.id = SwitchId(i as u32);
                sw.master = m.map(SwitchId);
                sw
            })
            .collect()
    }

    #[test]
    fn chains_collapse_to_their_terminal() {
        let switches = chain(&[None, Some(0), Some(1), None]);
        let plan = plan(&switches).unwrap();
        assert_eq!(
            plan.terminals,
            vec![SwitchId(0), SwitchId(0), SwitchId(0), SwitchId(3)]
        );
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(
            plan.groups[&SwitchId(0)].members,
            vec![SwitchId(0), SwitchId(1), SwitchId(2)]
        );
        assert_eq!(plan.groups[&SwitchId(0)].state_count, 2);
    }

    #[test]
    fn self_link_is_a_chain_end() {
        let switches = chain(&[Some(0)]);
        let plan = plan(&switches).unwrap();
        assert_eq!(plan.self_links, vec![SwitchId(0)]);
        assert_eq!(plan.terminal(SwitchId(0)), SwitchId(0));
    }

    #[test]
    fn longer_loops_are_rejected() {
        let switches = chain(&[Some(1), Some(2), Some(0)]);
        match resolve_terminal(&switches, SwitchId(0)) {
            Err(SwitchError::MasterCycle { chain }) => {
                assert_eq!(chain, vec![SwitchId(0), SwitchId(1), SwitchId(2), SwitchId(0)]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert!(plan(&switches).is_err());
    }

    #[test]
    fn dangling_master_is_unknown() {
        let switches = chain(&[Some(7)]);
        assert!(matches!(
            plan(&switches),
            Err(SwitchError::UnknownSwitch(SwitchId(7)))
        ));
    }
}
