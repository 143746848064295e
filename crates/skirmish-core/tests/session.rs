// Sessions built from configuration and driven tick by tick

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::recorder;
use skirmish_core::builtin::StageTimerModule;
use skirmish_core::config::EXAMPLE_CONFIG;
use skirmish_core::events::EventListener;
use skirmish_core::listeners::LoggingListener;
use skirmish_core::{ComponentState, Registry, Session, SessionConfig};

const TIMED_STAGES: &str = r#"
name = "timed"
ticks_per_second = 20
modules = [
  { Stages = [
      { name = "a", modules = [ { StageTimer = { duration = "100ms" } } ] },
      { name = "b", modules = [ { StageTimer = { duration = "100ms" } } ] },
  ] },
]
"#;

fn session(content: &str) -> Session {
    let config = SessionConfig::parse(content).unwrap();
    Session::from_config(&config, Rc::new(Registry::with_builtins()))
}

#[test]
fn test_timed_stages_stop_the_session() {
    let mut session = session(TIMED_STAGES);
    assert_eq!(session.manager().get_modules::<StageTimerModule>().len(), 2);
    let recorder = recorder(session.manager_mut());
    let stopped_after = Rc::new(Cell::new(None));
    let seen = Rc::clone(&stopped_after);
    session.on_stop(move |session| seen.set(Some(session.played_ticks())));

    assert!(session.start());
    assert_eq!(session.manager().stage_index(), 0);

    assert!(session.tick());
    assert!(session.tick());
    assert_eq!(session.manager().stage_index(), 1);
    assert!(session.tick());
    assert!(!session.tick());

    assert_eq!(session.played_ticks(), 4);
    assert_eq!(stopped_after.get(), Some(4));
    assert!(!session.is_started());
    assert_eq!(session.state(), ComponentState::Unloaded);
    for timer in session.manager().get_modules::<StageTimerModule>() {
        assert_eq!(session.manager().module_state(timer), Some(ComponentState::Unloaded));
    }

    assert_eq!(
        recorder.borrow().names(),
        vec![
            "SessionPreLoad",
            "PreStageChange",
            "StageChanged",
            "SessionLoaded",
            "SessionStarted",
            "SessionEnabled",
            "PreStageChange",
            "StageChanged",
            "StagesComplete",
            "StageChanged",
            "SessionStopped",
        ]
    );
}

#[test]
fn test_session_lifecycle_guards() {
    let mut session = session("name = \"guards\"");
    assert!(!session.tick());
    assert!(!session.stop());
    assert!(!session.enable());

    assert!(session.load());
    assert!(!session.load());
    assert_eq!(session.state(), ComponentState::Loaded);
    assert!(session.start());
    assert!(!session.start());
    assert_eq!(session.state(), ComponentState::Enabled);
    assert!(session.started_at().is_some());

    assert!(session.stop());
    assert!(!session.stop());
    assert_eq!(session.state(), ComponentState::Unloaded);
}

#[test]
fn test_paused_session_keeps_ticking_tasks() {
    let mut session = session("name = \"paused\"");
    session.start();
    let runs = Rc::new(Cell::new(0));
    let seen = Rc::clone(&runs);
    session.manager_mut().new_task().every_ticks(1).run(move |_| {
        seen.set(seen.get() + 1);
        Ok(())
    });

    session.set_paused(true);
    assert!(session.is_paused());
    session.tick();
    session.tick();
    assert_eq!(session.played_ticks(), 0);
    assert_eq!(runs.get(), 2);

    session.set_paused(false);
    session.tick();
    assert_eq!(session.played_ticks(), 1);
}

#[test]
fn test_child_sessions_tick_and_stop_with_their_parent() {
    let mut session = session("name = \"parent\"");
    session.start();
    let parent_registry = session.manager().registry();
    assert!(!session.manager().is_child());
    let child = session.add_child("child");
    assert!(child.manager().is_child());
    assert_eq!(child.manager().parent_session(), Some("parent"));
    assert!(Rc::ptr_eq(&child.manager().registry(), &parent_registry));
    child.start();

    session.tick();
    session.tick();
    assert_eq!(session.children()[0].played_ticks(), 2);

    session.stop();
    assert!(session.children().is_empty());
}

#[test]
fn test_example_config_builds_its_modules() {
    let mut session = session(EXAMPLE_CONFIG);
    assert_eq!(session.name(), "demo");
    assert!(session.manager().find_module("dummy").is_some());
    assert!(session.manager().find_module("STAGES").is_some());
    assert_eq!(session.manager().stage_manager().unwrap().stages().len(), 2);

    let logger = Rc::new(RefCell::new(LoggingListener::new()));
    let listener: Rc<RefCell<dyn EventListener>> = logger.clone();
    session.manager_mut().add_session_listener(listener);
    session.start();
    session.tick();
    // PreLoad, the first stage change, Loaded, Started and Enabled
    assert_eq!(logger.borrow().seen(), 6);
}
