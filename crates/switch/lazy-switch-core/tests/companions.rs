use anyhow::Result;
use lazy_switch_core::{
    Config, EnableDetector, InteractionBlocker, PlayerEnterDetector, PlayerId, PlayerRef, Pose,
    RespawnOutcome, RespawnTarget, Respawner, SwitchId, SwitchRuntime, TargetRef, TriggerMode,
};
use lazy_switch_test_fixtures::{scenes, MockObject, MockWorld, ObjectType};

fn baked(name: &str) -> Result<(MockWorld, SwitchRuntime)> {
    let (mut world, mut runtime) = scenes::runtime(name, Config::seeded(3))?;
    runtime.consolidate(&mut world)?;
    world.clear_log();
    Ok((world, runtime))
}

#[test]
fn blocker_without_switch_disables_itself() -> Result<()> {
    let (_, mut runtime) = baked("basic_toggle")?;

    let mut unassigned = InteractionBlocker::new(TargetRef(1), None);
    assert_eq!(unassigned.on_enable(&mut runtime), None);
    assert!(!unassigned.enabled);

    let mut dangling = InteractionBlocker::new(TargetRef(1), Some(SwitchId(9)));
    assert_eq!(dangling.on_enable(&mut runtime), None);
    assert!(!dangling.enabled);
    Ok(())
}

#[test]
fn blocker_only_claims_a_switch_on_its_own_object() -> Result<()> {
    let (mut world, mut runtime) = baked("basic_toggle")?;

    let mut elsewhere = InteractionBlocker::new(TargetRef(10), Some(SwitchId(0)));
    assert_eq!(elsewhere.on_enable(&mut runtime), Some(SwitchId(0)));
    assert!(runtime.is_interactive(SwitchId(0))?);

    let mut blocker = InteractionBlocker::new(TargetRef(1), Some(SwitchId(0)));
    assert_eq!(blocker.on_enable(&mut runtime), Some(SwitchId(0)));
    assert!(!runtime.is_interactive(SwitchId(0))?);
    assert!(!runtime.interact(&mut world, SwitchId(0))?);
    Ok(())
}

#[test]
fn enable_detector_advances_then_sets() -> Result<()> {
    let (mut world, mut runtime) = baked("multi_state")?;
    let mut detector = EnableDetector::new(TargetRef(2), Some(SwitchId(0)));
    detector.disable_state = 0;

    detector.on_enable(&mut runtime, &mut world)?;
    assert_eq!(runtime.state(SwitchId(0))?, 2);
    assert!(!runtime.is_interactive(SwitchId(0))?);

    detector.on_disable(&mut runtime, &mut world)?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    Ok(())
}

#[test]
fn enable_detector_respects_its_flags() -> Result<()> {
    let (mut world, mut runtime) = baked("multi_state")?;
    let mut detector = EnableDetector::new(TargetRef(2), Some(SwitchId(0)));
    detector.detect_on_enable = false;
    detector.detect_on_disable = false;

    detector.on_enable(&mut runtime, &mut world)?;
    detector.on_disable(&mut runtime, &mut world)?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);
    // the claim happens regardless
    assert!(!runtime.is_interactive(SwitchId(0))?);
    Ok(())
}

#[test]
fn enable_detector_without_switch_stays_quiet_on_disable() -> Result<()> {
    let (mut world, mut runtime) = baked("multi_state")?;
    let mut detector = EnableDetector::new(TargetRef(2), None);

    detector.on_enable(&mut runtime, &mut world)?;
    assert!(!detector.blocker.enabled);
    detector.on_disable(&mut runtime, &mut world)?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);
    Ok(())
}

fn trigger_volume(all_players: bool) -> PlayerEnterDetector {
    let mut detector = PlayerEnterDetector::new(TargetRef(50), Some(SwitchId(0)));
    detector.enter_state = 1;
    detector.exit_state = 0;
    detector.detect_all_players = all_players;
    detector
}

#[test]
fn volume_reacts_to_first_entry_and_last_exit() -> Result<()> {
    let (mut world, mut runtime) = baked("basic_toggle")?;
    let mut volume = trigger_volume(true);
    volume.on_enable(&mut runtime);
    let (me, other) = (PlayerRef::local(1), PlayerRef::remote(2));

    volume.on_player_trigger_enter(&mut runtime, &mut world, other)?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);

    runtime.set_state(&mut world, SwitchId(0), 0)?;
    volume.on_player_trigger_enter(&mut runtime, &mut world, me)?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    assert_eq!(volume.inside(), 2);

    runtime.set_state(&mut world, SwitchId(0), 1)?;
    volume.on_player_trigger_exit(&mut runtime, &mut world, other)?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);
    volume.on_player_trigger_exit(&mut runtime, &mut world, me)?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    assert_eq!(volume.inside(), 0);

    // a stray exit changes nothing
    runtime.set_state(&mut world, SwitchId(0), 1)?;
    volume.on_player_trigger_exit(&mut runtime, &mut world, PlayerRef::remote(3))?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);
    Ok(())
}

#[test]
fn volume_in_local_mode_ignores_other_players() -> Result<()> {
    let (mut world, mut runtime) = baked("basic_toggle")?;
    let mut volume = trigger_volume(false);
    volume.on_enable(&mut runtime);

    volume.on_player_trigger_enter(&mut runtime, &mut world, PlayerRef::remote(2))?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    volume.on_player_trigger_enter(&mut runtime, &mut world, PlayerRef::local(1))?;
    assert_eq!(runtime.state(SwitchId(0))?, 1);
    volume.on_player_trigger_exit(&mut runtime, &mut world, PlayerRef::local(1))?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    assert_eq!(volume.inside(), 0);
    Ok(())
}

#[test]
fn volume_without_switch_is_disabled() -> Result<()> {
    let (mut world, mut runtime) = baked("basic_toggle")?;
    let mut volume = PlayerEnterDetector::new(TargetRef(50), None);
    volume.enter_state = 1;
    volume.on_enable(&mut runtime);
    assert!(!volume.enabled);

    volume.on_player_trigger_enter(&mut runtime, &mut world, PlayerRef::local(1))?;
    assert_eq!(runtime.state(SwitchId(0))?, 0);
    Ok(())
}

const HOME: Pose = Pose {
    position: [1.0, 2.0, 3.0],
    rotation: [0.0, 0.0, 0.0, 1.0],
};

const AWAY: Pose = Pose {
    position: [9.0, 0.0, -4.0],
    rotation: [0.0, 1.0, 0.0, 0.0],
};

fn placed(id: u64, ty: ObjectType) -> MockObject {
    let mut object = MockObject::new(id, ty);
    object.pose = HOME;
    object
}

/// A ball (80) resting at `HOME`, moved away after the respawner starts.
fn ball_course(mode: TriggerMode) -> (MockWorld, Respawner) {
    let mut world = MockWorld::from_objects(
        1,
        [
            MockObject::new(90, ObjectType::GameObject),
            placed(80, ObjectType::GameObject),
        ],
    );
    let mut respawner = Respawner::new(TargetRef(90), mode, &Config::default());
    respawner.targets.push(RespawnTarget::new(TargetRef(80)));
    respawner.start(&world);
    world.object_mut(TargetRef(80)).unwrap().pose = AWAY;
    (world, respawner)
}

fn pose(world: &MockWorld, id: u64) -> Pose {
    world.object(TargetRef(id)).unwrap().pose
}

#[test]
fn immediate_respawn_restores_home_pose() {
    let (mut world, mut respawner) = ball_course(TriggerMode::InteractLocal);

    let outcome = respawner.interact(0.0, &mut world);
    assert_eq!(
        outcome,
        RespawnOutcome::Executed {
            respawned: 1,
            retry_at: None
        }
    );
    assert_eq!(pose(&world, 80), HOME);
}

#[test]
fn repeat_triggers_keep_the_pending_deadline() {
    let (mut world, mut respawner) = ball_course(TriggerMode::InteractLocal);
    respawner.delay = 1.0;

    assert_eq!(respawner.interact(1.0, &mut world), RespawnOutcome::Scheduled { at: 2.0 });
    assert_eq!(respawner.interact(1.5, &mut world), RespawnOutcome::Scheduled { at: 2.0 });
    assert_eq!(respawner.tick(1.9, &mut world), RespawnOutcome::Idle);
    assert_eq!(pose(&world, 80), AWAY);

    assert!(matches!(
        respawner.tick(2.0, &mut world),
        RespawnOutcome::Executed { respawned: 1, .. }
    ));
    assert_eq!(pose(&world, 80), HOME);
    assert_eq!(respawner.deadline(), None);
}

#[test]
fn debounce_restarts_the_delay() {
    let (mut world, mut respawner) = ball_course(TriggerMode::InteractLocal);
    respawner.delay = 1.0;
    respawner.debounce = true;

    respawner.interact(1.0, &mut world);
    assert_eq!(respawner.interact(1.5, &mut world), RespawnOutcome::Scheduled { at: 2.5 });
    assert_eq!(respawner.tick(2.0, &mut world), RespawnOutcome::Idle);
    assert!(matches!(
        respawner.tick(2.5, &mut world),
        RespawnOutcome::Executed { respawned: 1, .. }
    ));
}

#[test]
fn cancel_drops_a_pending_respawn() {
    let (mut world, mut respawner) = ball_course(TriggerMode::Manual);
    respawner.delay = 1.0;

    respawner.do_respawn(0.0, &mut world);
    respawner.cancel();
    assert_eq!(respawner.tick(5.0, &mut world), RespawnOutcome::Idle);
    assert_eq!(pose(&world, 80), AWAY);
}

#[test]
fn pooled_target_owned_elsewhere_is_retried() {
    let mut world = MockWorld::from_objects(
        1,
        [
            MockObject::new(90, ObjectType::GameObject),
            placed(81, ObjectType::GameObject),
            MockObject::new(82, ObjectType::ObjectSync),
            MockObject::new(83, ObjectType::ObjectPool),
        ],
    );
    world.set_network_owner(TargetRef(81), 2);
    world.set_network_owner(TargetRef(83), 2);

    let mut respawner = Respawner::new(TargetRef(90), TriggerMode::Manual, &Config::default());
    let mut target = RespawnTarget::new(TargetRef(81));
    target.object_sync = Some(TargetRef(82));
    target.pool = Some(TargetRef(83));
    respawner.targets.push(target);
    respawner.start(&world);

    assert_eq!(
        respawner.do_respawn(0.0, &mut world),
        RespawnOutcome::Executed {
            respawned: 0,
            retry_at: Some(0.5)
        }
    );
    assert!(world.synced_respawns.is_empty());
    assert_eq!(respawner.tick(0.25, &mut world), RespawnOutcome::Idle);

    // ownership of the object came back; the pool still belongs to player 2
    world.set_network_owner(TargetRef(81), 1);
    assert_eq!(
        respawner.tick(0.5, &mut world),
        RespawnOutcome::Executed {
            respawned: 1,
            retry_at: None
        }
    );
    assert_eq!(world.synced_respawns, vec![TargetRef(82)]);
    assert_eq!(world.owner_changes, vec![(PlayerId(2), TargetRef(81))]);
    assert!(world.pool_returns.is_empty());

    world.set_network_owner(TargetRef(81), 1);
    world.set_network_owner(TargetRef(83), 1);
    respawner.do_respawn(1.0, &mut world);
    assert_eq!(world.pool_returns, vec![(TargetRef(83), TargetRef(81))]);
}

fn held_ball(drop_on_respawn: bool) -> (MockWorld, Respawner) {
    let mut pickup = MockObject::new(85, ObjectType::Pickup);
    pickup.held = true;
    let mut world = MockWorld::from_objects(
        1,
        [
            MockObject::new(90, ObjectType::GameObject),
            placed(84, ObjectType::GameObject),
            pickup,
        ],
    );
    let mut respawner = Respawner::new(TargetRef(90), TriggerMode::Manual, &Config::default());
    let mut target = RespawnTarget::new(TargetRef(84));
    target.pickup = Some(TargetRef(85));
    target.drop_on_respawn = drop_on_respawn;
    respawner.targets.push(target);
    respawner.start(&world);
    world.object_mut(TargetRef(84)).unwrap().pose = AWAY;
    (world, respawner)
}

#[test]
fn held_pickups_are_left_alone() {
    let (mut world, mut respawner) = held_ball(false);

    assert!(matches!(
        respawner.do_respawn(0.0, &mut world),
        RespawnOutcome::Executed { respawned: 0, .. }
    ));
    assert_eq!(pose(&world, 84), AWAY);
    assert!(world.drops.is_empty());
}

#[test]
fn held_pickups_are_dropped_when_asked() {
    let (mut world, mut respawner) = held_ball(true);

    assert!(matches!(
        respawner.do_respawn(0.0, &mut world),
        RespawnOutcome::Executed { respawned: 1, .. }
    ));
    assert_eq!(world.drops, vec![TargetRef(85)]);
    assert_eq!(pose(&world, 84), HOME);
}

#[test]
fn global_interaction_broadcasts_instead_of_executing() {
    let (mut world, mut respawner) = ball_course(TriggerMode::InteractGlobal);

    assert_eq!(respawner.interact(0.0, &mut world), RespawnOutcome::Broadcast);
    assert_eq!(world.broadcasts, vec![TargetRef(90)]);
    assert_eq!(pose(&world, 80), AWAY);

    // every client runs the respawn when the event arrives
    respawner.exec(0.0, &mut world);
    assert_eq!(pose(&world, 80), HOME);
}

#[test]
fn last_player_out_respawns() {
    let (mut world, mut respawner) = ball_course(TriggerMode::LastPlayerExit);
    let (me, other) = (PlayerRef::local(1), PlayerRef::remote(2));

    assert_eq!(respawner.on_player_trigger_enter(0.0, &mut world, me), RespawnOutcome::Idle);
    assert_eq!(respawner.on_player_trigger_enter(0.0, &mut world, other), RespawnOutcome::Idle);
    assert_eq!(respawner.on_player_trigger_exit(1.0, &mut world, me), RespawnOutcome::Idle);
    assert!(matches!(
        respawner.on_player_trigger_exit(2.0, &mut world, other),
        RespawnOutcome::Executed { respawned: 1, .. }
    ));
}

#[test]
fn first_player_in_respawns_once() {
    let (mut world, mut respawner) = ball_course(TriggerMode::FirstPlayerEnter);
    let (me, other) = (PlayerRef::local(1), PlayerRef::remote(2));

    assert!(matches!(
        respawner.on_player_trigger_enter(0.0, &mut world, other),
        RespawnOutcome::Executed { .. }
    ));
    assert_eq!(respawner.on_player_trigger_enter(0.0, &mut world, me), RespawnOutcome::Idle);
}

#[test]
fn local_modes_ignore_remote_players() {
    let (mut world, mut respawner) = ball_course(TriggerMode::LocalPlayerEnter);

    assert_eq!(
        respawner.on_player_trigger_enter(0.0, &mut world, PlayerRef::remote(2)),
        RespawnOutcome::Idle
    );
    assert_eq!(pose(&world, 80), AWAY);
    assert!(matches!(
        respawner.on_player_trigger_enter(0.0, &mut world, PlayerRef::local(1)),
        RespawnOutcome::Executed { .. }
    ));
}

#[test]
fn only_interact_modes_accept_interaction() {
    let (mut world, mut respawner) = ball_course(TriggerMode::Manual);
    assert!(respawner.interaction_disabled);
    assert_eq!(respawner.interact(0.0, &mut world), RespawnOutcome::Idle);

    let (_, local) = ball_course(TriggerMode::InteractLocal);
    assert!(!local.interaction_disabled);
}
