// Stage activation, transitions, cancellation and completion

mod common;

use common::{entries, manager, manager_with, recorder, Log, Marker};
use skirmish_core::events::{SessionEvent, StageChangeData, StageChangeReason};
use skirmish_core::{ComponentState, LifecycleError, ModuleLoader, Registry, StageManager};

fn reason(reason: StageChangeReason) -> StageChangeData {
    StageChangeData::new(reason)
}

#[test]
fn test_stages_activate_one_at_a_time() {
    let mut manager = manager();
    let log = Log::default();
    let first = manager.add_stage_module(Marker::new("first", &log));
    let second = manager.add_stage_module(Marker::new("second", &log));
    assert!(manager.add_stage("warmup", vec![first]));
    assert!(manager.add_stage("match", vec![second]));
    let recorder = recorder(&mut manager);

    manager.load();
    assert_eq!(manager.stage_index(), 0);
    assert_eq!(manager.current_stage().unwrap().name, "warmup");
    assert_eq!(manager.module_state(first), Some(ComponentState::Loaded));
    assert_eq!(manager.module_state(second), Some(ComponentState::Unloaded));
    assert_eq!(recorder.borrow().names(), vec!["PreStageChange", "StageChanged"]);

    manager.enable();
    assert_eq!(manager.module_state(first), Some(ComponentState::Enabled));
    // Dormant stage modules are left out of sweeps
    assert_eq!(manager.module_state(second), Some(ComponentState::Unloaded));

    assert!(manager.next_stage(reason(StageChangeReason::ObjectiveSuccess)).unwrap());
    assert_eq!(manager.stage_index(), 1);
    assert_eq!(manager.module_state(first), Some(ComponentState::Unloaded));
    assert_eq!(manager.module_state(second), Some(ComponentState::Enabled));

    assert_eq!(
        entries(&log),
        vec![
            "first:on_load",
            "first:on_enable",
            "first:on_disable",
            "first:on_unload",
            "second:on_load",
            "second:on_enable",
        ]
    );

    let recorder = recorder.borrow();
    match recorder.events.last() {
        Some(SessionEvent::StageChanged {
            change,
            old_stage,
            new_stage,
        }) => {
            assert_eq!(change.reason, StageChangeReason::ObjectiveSuccess);
            assert_eq!(old_stage.as_ref().map(|stage| stage.index), Some(0));
            assert_eq!(new_stage.as_ref().map(|stage| stage.name.as_str()), Some("match"));
        }
        other => panic!("expected StageChanged, got {:?}", other),
    }
}

#[test]
fn test_next_stage_after_the_last_completes() {
    let mut manager = manager();
    let log = Log::default();
    let only = manager.add_stage_module(Marker::new("only", &log));
    manager.add_stage("only", vec![only]);
    manager.load();
    manager.enable();
    let recorder = recorder(&mut manager);

    assert!(manager.next_stage(reason(StageChangeReason::TimeLimit)).unwrap());
    assert_eq!(manager.stage_index(), -1);
    assert!(manager.current_stage().is_none());
    assert_eq!(manager.module_state(only), Some(ComponentState::Unloaded));
    assert!(manager.take_stop_request());

    let recorder = recorder.borrow();
    assert_eq!(recorder.names(), vec!["StagesComplete", "StageChanged"]);
    match &recorder.events[0] {
        SessionEvent::StagesComplete { last_stage, change } => {
            assert_eq!(last_stage.as_ref().map(|stage| stage.name.as_str()), Some("only"));
            assert_eq!(change.reason, StageChangeReason::TimeLimit);
        }
        other => panic!("expected StagesComplete, got {:?}", other),
    }
    match &recorder.events[1] {
        SessionEvent::StageChanged { new_stage, .. } => assert!(new_stage.is_none()),
        other => panic!("expected StageChanged, got {:?}", other),
    }
}

#[test]
fn test_cancelled_change_leaves_the_stage_alone() {
    let mut manager = manager();
    let log = Log::default();
    let first = manager.add_stage_module(Marker::new("first", &log));
    let second = manager.add_stage_module(Marker::new("second", &log));
    manager.add_stage("first", vec![first]);
    manager.add_stage("second", vec![second]);
    manager.load();
    manager.enable();

    let recorder = recorder(&mut manager);
    recorder.borrow_mut().cancel_pre_change = true;

    assert!(!manager.next_stage(reason(StageChangeReason::ModuleTriggered)).unwrap());
    assert_eq!(manager.stage_index(), 0);
    assert_eq!(manager.module_state(first), Some(ComponentState::Enabled));
    assert_eq!(manager.module_state(second), Some(ComponentState::Unloaded));
    assert_eq!(recorder.borrow().names(), vec!["PreStageChange"]);

    recorder.borrow_mut().cancel_pre_change = false;
    assert!(manager.next_stage(reason(StageChangeReason::ModuleTriggered)).unwrap());
    assert_eq!(manager.stage_index(), 1);
}

#[test]
fn test_change_payload_reaches_listeners() {
    #[derive(Debug, PartialEq)]
    struct Winner(&'static str);

    let mut manager = manager();
    manager.add_stage("first", Vec::new());
    manager.add_stage("second", Vec::new());
    manager.load();
    let recorder = recorder(&mut manager);

    let change = reason(StageChangeReason::ObjectiveSuccess).with(Winner("red"));
    assert!(manager.next_stage(change).unwrap());

    let recorder = recorder.borrow();
    assert_eq!(recorder.events.len(), 2);
    for event in &recorder.events {
        let change = event.stage_change().unwrap();
        assert_eq!(change.get::<Winner>(), Some(&Winner("red")));
    }
}

#[test]
fn test_next_stage_without_stages_is_an_error() {
    let mut manager = manager();
    let err = manager
        .next_stage(reason(StageChangeReason::Unknown))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NoStages));
}

#[test]
fn test_load_adds_a_default_stage() {
    let mut manager = manager();
    manager.load();
    let stages = manager.stage_manager().unwrap().stages();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0].name(), "");
    assert_eq!(manager.stage_index(), 0);
}

#[test]
fn test_unloading_the_session_deactivates_the_stage() {
    let mut manager = manager();
    let log = Log::default();
    let first = manager.add_stage_module(Marker::new("first", &log));
    manager.add_stage("first", vec![first]);
    manager.load();
    manager.enable();

    manager.disable();
    manager.unload();
    assert_eq!(manager.stage_index(), -1);
    assert_eq!(manager.module_state(first), Some(ComponentState::Unloaded));

    // Loading again starts over from the first stage
    manager.load();
    assert_eq!(manager.stage_index(), 0);
    assert_eq!(manager.module_state(first), Some(ComponentState::Loaded));
}

#[test]
fn test_stages_module_builds_dormant_stage_modules() {
    let mut registry = Registry::with_builtins();
    registry.register::<Marker>();
    let mut manager = manager_with(registry);

    let node: toml::Value = toml::from_str(
        r#"
        Stages = [
            { name = "one", modules = ["Marker"] },
            { name = "two", modules = ["Marker", "Nope"] },
        ]
        "#,
    )
    .unwrap();
    let created = ModuleLoader::new(&mut manager).load_node(&node).unwrap();
    assert!(created.is_some());

    let markers = manager.get_modules::<Marker>();
    assert_eq!(markers.len(), 2);
    let stages = manager.stage_manager().unwrap().stages();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].modules(), &markers[..1]);
    assert_eq!(stages[1].modules(), &markers[1..]);
    assert_eq!(stages[1].name(), "two");

    manager.load();
    assert_eq!(manager.module_state(markers[0]), Some(ComponentState::Loaded));
    assert_eq!(manager.module_state(markers[1]), Some(ComponentState::Unloaded));
}

#[test]
fn test_stages_module_needs_a_stage() {
    let mut manager = manager();
    let err = ModuleLoader::new(&mut manager)
        .load_named("Stages", toml::Value::Array(Vec::new()))
        .unwrap_err();
    assert_eq!(err.module.as_deref(), Some("Stages"));
    assert!(manager.stage_manager().unwrap().stages().is_empty());
}

#[test]
fn test_out_of_range_stage_is_rejected() {
    let mut manager = manager();
    let log = Log::default();
    let only = manager.add_stage_module(Marker::new("only", &log));
    manager.add_stage("only", vec![only]);
    manager.load();
    manager.enable();
    let recorder = recorder(&mut manager);

    let stages = manager.stage_manager_id();
    let changed = manager
        .with_module::<StageManager, _>(stages, |stages, ctx| {
            stages.set_current_stage(Some(5), reason(StageChangeReason::ModuleTriggered), ctx)
        })
        .unwrap();

    assert!(!changed);
    assert_eq!(manager.stage_index(), 0);
    assert_eq!(manager.module_state(only), Some(ComponentState::Enabled));
    assert!(recorder.borrow().events.is_empty());
}
