//! Build-time consolidation.
//!
//! Samples the live state of every authored target, folds the per-state
//! observations into one enable mask per (target, kind) row and replaces the
//! authoring tables with the compact runtime rows. Master links are resolved in
//! the same pass.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::binding::TargetBinding;
use crate::config::FixupMode;
use crate::error::SwitchError;
use crate::host::{is_available_on_runtime, TargetHost};
use crate::ids::TargetRef;
use crate::kind::TargetKind;
use crate::link;
use crate::mask::StateMask;
use crate::resolver;
use crate::switch::Switch;

/// Summary of one consolidation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    /// Switches whose tables were rebuilt.
    pub switches: usize,
    /// Runtime rows written across all switches.
    pub bindings: usize,
    /// Authored entries that produced no row.
    pub dropped: usize,
    pub groups: usize,
    pub substituted_masters: usize,
    /// Switches left untouched because they are stripped from the build.
    pub skipped_switches: usize,
}

/// Row identity. Animator parameter kinds also key on the parameter name so
/// two parameters on one animator stay separate rows.
type RowKey = (TargetRef, TargetKind, Option<String>);

#[derive(Debug)]
struct Evidence {
    /// Object the live reading comes from (the proxy when one was unwrapped).
    source: TargetRef,
    live: bool,
    on: StateMask,
    off: StateMask,
}

/// Rebuild every switch's runtime rows and link groups.
///
/// `switches[i]` must carry id `i`. Any error is reported before a switch is
/// modified.
pub fn consolidate<H: TargetHost + ?Sized>(
    switches: &mut [Switch],
    host: &mut H,
) -> Result<ConsolidationReport, SwitchError> {
    let plan = link::plan(switches)?;
    let mut report = ConsolidationReport {
        groups: plan.groups.len(),
        ..ConsolidationReport::default()
    };

    for index in 0..switches.len() {
        if !is_available_on_runtime(&*host, switches[index].object) {
            debug!("{}: stripped from the build, skipped", switches[index].id);
            report.skipped_switches += 1;
            continue;
        }
        let terminal = plan.terminal(switches[index].id);
        let live_state = switches[terminal.index()].state;
        let sw = &switches[index];
        if sw.is_baked() {
            report.bindings += sw.bindings.len();
            continue;
        }

        let rows = bake(sw, live_state, host, &mut report.dropped);
        report.switches += 1;
        report.bindings += rows.len();
        debug!("{}: baked {} rows", sw.id, rows.len());

        let sw = &mut switches[index];
        sw.bindings = rows;
        sw.authoring.clear();
    }

    report.substituted_masters = link::finalize(switches, &plan, &*host);
    Ok(report)
}

/// Concrete object and kind for an authored reference, or `None` when the
/// reference cannot be driven.
///
/// Proxies drive their backing behaviour. Particle-system and animator hosts
/// need an explicit sub-kind from the author.
fn resolve_target<H: TargetHost + ?Sized>(
    host: &H,
    target: TargetRef,
    authored: TargetKind,
    parameter: Option<&str>,
) -> Option<(TargetRef, TargetKind)> {
    if let Some(backing) = host.backing_object(target) {
        return Some((backing, TargetKind::UdonBehaviour));
    }
    match resolver::classify(host, target) {
        TargetKind::Unknown => None,
        TargetKind::ParticleSystem => authored
            .particle_module()
            .map(|module| (target, TargetKind::ParticleModule(module))),
        TargetKind::Animator => {
            (authored.is_animator_parameter() && parameter.is_some()).then_some((target, authored))
        }
        kind => Some((target, kind)),
    }
}

fn bake<H: TargetHost + ?Sized>(
    sw: &Switch,
    live_state: i32,
    host: &mut H,
    dropped: &mut usize,
) -> Vec<TargetBinding> {
    let mut rows: IndexMap<RowKey, Evidence> = IndexMap::new();

    for (group, authored) in sw.authoring.grouped() {
        let Some(source) = authored.target else {
            *dropped += 1;
            continue;
        };
        let parameter = authored.parameter.as_deref();
        let Some((target, kind)) = resolve_target(&*host, source, authored.kind, parameter) else {
            debug!("{}: {source} has no drivable kind, dropped", sw.id);
            *dropped += 1;
            continue;
        };
        if !is_available_on_runtime(&*host, target) {
            debug!("{}: {target} is stripped from the build, dropped", sw.id);
            *dropped += 1;
            continue;
        }

        let state = i32::from(group);
        let is_current = state == live_state;
        let live = resolver::is_active(&*host, source, kind, parameter, is_current);
        let expected = match sw.fixup_mode {
            FixupMode::AsIs => live,
            FixupMode::OnBuild | FixupMode::OnEnable => is_current,
        };

        let key = (
            target,
            kind,
            kind.is_animator_parameter().then(|| parameter.unwrap_or_default().to_owned()),
        );
        let evidence = rows.entry(key).or_insert(Evidence {
            source,
            live,
            on: StateMask::NONE,
            off: StateMask::NONE,
        });
        if is_current == expected {
            evidence.on.insert(state);
        } else {
            evidence.off.insert(state);
        }
    }

    rows.into_iter()
        .map(|((target, kind, parameter), evidence)| {
            let enable_mask = StateMask::from_evidence(evidence.on, evidence.off);
            if sw.fixup_mode == FixupMode::OnBuild && enable_mask.contains(live_state) != evidence.live {
                debug!("{}: forcing {} to match state {live_state}", sw.id, evidence.source);
                resolver::toggle(&mut *host, evidence.source, kind);
            }
            let row = TargetBinding::new(target, kind, enable_mask);
            match parameter {
                Some(name) => row.with_parameter(name),
                None => row,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_flat() {
        let report = ConsolidationReport {
            switches: 2,
            bindings: 5,
            ..ConsolidationReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["switches"], 2);
        assert_eq!(json["bindings"], 5);
        assert_eq!(json["dropped"], 0);
    }
}
