// Tasks, tick methods, tick fields and off-thread work

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{manager, Log, Probe};
use skirmish_core::builtin::{Countdown, DummyModule};
use skirmish_core::ticking::{
    AsyncContext, AsyncJob, AutoInt, TickField, TickFieldSlot, TickSpec, TickTable, Tickable,
};
use skirmish_core::{Component, Module, ModuleInfo, ModuleLoader, ModuleManager};

fn run_ticks(manager: &mut ModuleManager, ticks: usize) {
    for _ in 0..ticks {
        manager.tick();
    }
}

#[derive(Default)]
struct Score {
    points: AutoInt,
}

impl Tickable for Score {
    fn tick_fields(&mut self) -> Vec<TickFieldSlot<'_>> {
        vec![TickFieldSlot::new(
            "points",
            &mut self.points,
            TickField::new().interval(2).increment(true).amount(5),
        )]
    }
}

impl Component for Score {}

impl Module for Score {
    fn info() -> ModuleInfo {
        ModuleInfo::new("Score")
    }
}

#[test]
fn test_tick_field_follows_its_interval() {
    let mut manager = manager();
    let id = manager.add_module(Score::default());
    manager.load();

    run_ticks(&mut manager, 1);
    assert_eq!(manager.module::<Score>(id).unwrap().points.get(), 0);
    run_ticks(&mut manager, 1);
    assert_eq!(manager.module::<Score>(id).unwrap().points.get(), 5);
    run_ticks(&mut manager, 2);
    assert_eq!(manager.module::<Score>(id).unwrap().points.get(), 10);

    // Unloaded owners are not updated
    manager.unload_module(id);
    run_ticks(&mut manager, 4);
    assert_eq!(manager.module::<Score>(id).unwrap().points.get(), 10);
}

#[test]
fn test_preset_value_is_the_starting_value() {
    let mut manager = manager();
    let id = manager.add_module(Score {
        points: AutoInt::with_value(100),
    });
    manager.load();
    run_ticks(&mut manager, 2);
    assert_eq!(manager.module::<Score>(id).unwrap().points.get(), 105);
    assert!(manager.module::<Score>(id).unwrap().points.is_bound());
}

struct Beeper {
    beeps: Rc<Cell<u32>>,
}

impl Tickable for Beeper {
    fn tick_methods() -> TickTable<Self> {
        TickTable::new().method("beep", TickSpec::once_after("2t"), |beeper: &mut Beeper, _| {
            beeper.beeps.set(beeper.beeps.get() + 1);
            Ok(())
        })
    }
}

impl Component for Beeper {}

#[test]
fn test_one_shot_fires_once_and_never_restarts() {
    let mut manager = manager();
    let beeps = Rc::new(Cell::new(0));
    let id = manager.spawn_component(Beeper {
        beeps: Rc::clone(&beeps),
    });
    manager.try_load(id).unwrap();

    run_ticks(&mut manager, 1);
    assert_eq!(beeps.get(), 0);
    run_ticks(&mut manager, 1);
    assert_eq!(beeps.get(), 1);

    manager.try_unload(id).unwrap();
    manager.try_load(id).unwrap();
    run_ticks(&mut manager, 10);
    assert_eq!(beeps.get(), 1);

    let task = manager.tasks_of(id)[0];
    assert!(manager.scheduler().has_fired(task));
    assert!(!manager.scheduler().is_running(task));
    assert_eq!(manager.scheduler().name(task), Some("Beeper::beep"));
}

#[test]
fn test_unowned_task_timing() {
    let mut manager = manager();
    let runs = Rc::new(Cell::new(Vec::new()));
    let seen = Rc::clone(&runs);
    manager.new_task().every_ticks(3).run(move |ctx| {
        let mut ticks = seen.take();
        ticks.push(ctx.current_tick());
        seen.set(ticks);
        Ok(())
    });

    run_ticks(&mut manager, 8);
    assert_eq!(runs.take(), vec![1, 4, 7]);
}

#[test]
fn test_millisecond_delay_rounds_up_to_ticks() {
    let mut manager = manager();
    let fired = Rc::new(Cell::new(None));
    let seen = Rc::clone(&fired);
    // 120ms at 20 ticks per second is 2.4 ticks
    manager.new_task().delay_ms(120).run(move |ctx| {
        seen.set(Some(ctx.current_tick()));
        Ok(())
    });

    run_ticks(&mut manager, 5);
    assert_eq!(fired.get(), Some(3));
}

#[test]
fn test_tasks_stop_with_their_owner() {
    let mut manager = manager();
    let log = Log::default();
    let id = manager.spawn_component(Probe::new("probe", &log));
    let runs = Rc::new(Cell::new(0));
    let seen = Rc::clone(&runs);
    let task = manager
        .with_component::<Probe, _>(id, move |_, ctx| {
            ctx.new_task().every_ticks(1).run(move |_| {
                seen.set(seen.get() + 1);
                Ok(())
            })
        })
        .unwrap();

    run_ticks(&mut manager, 3);
    assert_eq!(runs.get(), 0);

    manager.try_load(id).unwrap();
    run_ticks(&mut manager, 3);
    assert_eq!(runs.get(), 3);

    manager.try_unload(id).unwrap();
    run_ticks(&mut manager, 3);
    assert_eq!(runs.get(), 3);

    assert!(manager.cancel_task(id, task));
    assert!(!manager.scheduler().contains(task));
    manager.try_load(id).unwrap();
    run_ticks(&mut manager, 3);
    assert_eq!(runs.get(), 3);
}

#[test]
fn test_failing_tasks_do_not_stop_the_tick() {
    let mut manager = manager();
    let runs = Rc::new(Cell::new(0));
    let seen = Rc::clone(&runs);
    manager
        .new_task()
        .name("broken")
        .every_ticks(1)
        .run(|_| -> anyhow::Result<()> { anyhow::bail!("always fails") });
    manager
        .new_task()
        .name("panics")
        .every_ticks(1)
        .run(|_| -> anyhow::Result<()> { panic!("always panics") });
    manager.new_task().every_ticks(1).run(move |_| {
        seen.set(seen.get() + 1);
        Ok(())
    });

    run_ticks(&mut manager, 3);
    assert_eq!(runs.get(), 3);
}

#[test]
fn test_tickable_object_methods_run_for_its_owner() {
    let mut manager = manager();
    let log = Log::default();
    let owner = manager.spawn_component(Probe::new("owner", &log));
    let beeps = Rc::new(Cell::new(0));
    let beeper = Rc::new(std::cell::RefCell::new(Beeper {
        beeps: Rc::clone(&beeps),
    }));

    assert!(manager.add_tickable(owner, &beeper));
    assert!(!manager.add_tickable(owner, &beeper));
    manager.try_load(owner).unwrap();
    run_ticks(&mut manager, 2);
    assert_eq!(beeps.get(), 1);

    assert!(manager.remove_tickable(owner, &beeper));
    assert!(manager.tasks_of(owner).is_empty());
}

#[test]
fn test_borrowed_tickable_is_refused() {
    let mut manager = manager();
    let log = Log::default();
    let owner = manager.spawn_component(Probe::new("owner", &log));
    let score = Rc::new(std::cell::RefCell::new(Score::default()));

    let held = score.borrow_mut();
    assert!(!manager.add_tickable(owner, &score));
    drop(held);
    assert!(manager.tasks_of(owner).is_empty());

    assert!(manager.add_tickable(owner, &score));
    // Loads the tick field holder
    manager.load();
    manager.try_load(owner).unwrap();
    run_ticks(&mut manager, 2);
    assert_eq!(score.borrow().points.get(), 5);
}

#[test]
fn test_countdown_ends_after_its_ticks() {
    let mut manager = manager();
    let log = Log::default();
    let parent = manager.spawn_component(Probe::new("parent", &log));
    manager.try_load(parent).unwrap();

    let ticked = Rc::new(Cell::new(0));
    let seen = Rc::clone(&ticked);
    let countdown = manager.spawn_component(
        Countdown::new(3)
            .on_tick(move |_| {
                seen.set(seen.get() + 1);
                Ok(())
            })
            .on_end(|ctx| {
                ctx.manager().request_stop();
                Ok(())
            }),
    );
    assert!(manager.add_subcomponent(parent, countdown));

    run_ticks(&mut manager, 2);
    assert_eq!(manager.get::<Countdown>(countdown).unwrap().remaining(), 1);
    assert!(!manager.take_stop_request());

    run_ticks(&mut manager, 1);
    assert!(manager.get::<Countdown>(countdown).unwrap().is_finished());
    assert!(manager.take_stop_request());

    run_ticks(&mut manager, 3);
    assert_eq!(ticked.get(), 3);
    assert!(!manager.take_stop_request());

    // Zero-tick countdowns still take one tick
    assert_eq!(Countdown::new(0).remaining(), 1);
}

#[test]
fn test_dummy_counts_ticks() {
    let mut manager = manager();
    let id = ModuleLoader::new(&mut manager)
        .load_named("Dummy", toml::Value::Table(toml::Table::new()))
        .unwrap();
    manager.load();
    manager.enable();

    run_ticks(&mut manager, 3);
    let dummy = manager.module::<DummyModule>(id).unwrap();
    assert_eq!(dummy.ticks(), 3);
    assert_eq!(dummy.ticks2(), 30);
    assert_eq!(dummy.reports(), 2);

    // First report one second in
    run_ticks(&mut manager, 17);
    assert_eq!(manager.module::<DummyModule>(id).unwrap().reports(), 3);
}

fn wait_for_stop(manager: &mut ModuleManager) -> bool {
    for _ in 0..200 {
        manager.tick();
        if manager.take_stop_request() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_async_task_posts_back_to_the_main_thread() {
    let mut manager = manager();
    let worker = Arc::new(AtomicI32::new(0));
    let seen = Arc::clone(&worker);
    manager.new_task().name("worker").run_async(move |ctx| {
        assert_eq!(ctx.task_name(), "worker");
        seen.store(7, Ordering::SeqCst);
        ctx.post(|manager| manager.request_stop());
        Ok(())
    });

    assert!(wait_for_stop(&mut manager));
    assert_eq!(worker.load(Ordering::SeqCst), 7);
}

struct Doubler {
    seed: i32,
    out: Arc<AtomicI32>,
}

impl Tickable for Doubler {
    fn tick_methods() -> TickTable<Self> {
        TickTable::new().offload("double", TickSpec::once_after("1t"), |doubler: &mut Doubler| {
            let seed = doubler.seed;
            let out = Arc::clone(&doubler.out);
            let job: AsyncJob = Box::new(move |ctx: AsyncContext| {
                out.store(seed * 2, Ordering::SeqCst);
                ctx.post(|manager| manager.request_stop());
                Ok(())
            });
            job
        })
    }
}

impl Component for Doubler {}

#[tokio::test]
async fn test_offloaded_tick_method_runs_on_the_blocking_pool() {
    let mut manager = manager();
    let out = Arc::new(AtomicI32::new(0));
    let id = manager.spawn_component(Doubler {
        seed: 21,
        out: Arc::clone(&out),
    });
    manager.try_load(id).unwrap();

    let mut stopped = false;
    for _ in 0..200 {
        manager.tick();
        if manager.take_stop_request() {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stopped);
    assert_eq!(out.load(Ordering::SeqCst), 42);
}
