#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::bail;
use skirmish_core::error::ModuleParseError;
use skirmish_core::events::{EventFilter, EventListener, SessionEvent};
use skirmish_core::ticking::Tickable;
use skirmish_core::{
    Component, ComponentContext, FromModuleData, ManagerOptions, Module, ModuleInfo,
    ModuleLoader, ModuleManager, NoData, Registry, Transition,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn manager() -> ModuleManager {
    ModuleManager::new(Rc::new(Registry::with_builtins()), ManagerOptions::default())
}

pub fn manager_with(registry: Registry) -> ModuleManager {
    ModuleManager::new(Rc::new(registry), ManagerOptions::default())
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn record(log: &Log, name: &str, op: Transition, fail_on: Option<Transition>) -> anyhow::Result<()> {
    log.borrow_mut().push(format!("{}:{}", name, op.hook()));
    if fail_on == Some(op) {
        bail!("{} refused to {:?}", name, op);
    }
    Ok(())
}

/// Plain component that records its hooks and can be told to fail one of them
pub struct Probe {
    pub name: &'static str,
    pub log: Log,
    pub fail_on: Option<Transition>,
}

impl Probe {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            fail_on: None,
        }
    }

    pub fn failing(name: &'static str, log: &Log, op: Transition) -> Self {
        Self {
            fail_on: Some(op),
            ..Self::new(name, log)
        }
    }
}

impl Tickable for Probe {}

impl Component for Probe {
    fn on_load(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Load, self.fail_on)
    }

    fn on_unload(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Unload, self.fail_on)
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Enable, self.fail_on)
    }

    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Disable, self.fail_on)
    }
}

/// Module counterpart of [`Probe`]
pub struct Marker {
    pub name: &'static str,
    pub log: Log,
    pub fail_on: Option<Transition>,
}

impl Marker {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            fail_on: None,
        }
    }
}

impl Tickable for Marker {}

impl Component for Marker {
    fn on_load(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Load, self.fail_on)
    }

    fn on_unload(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Unload, self.fail_on)
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Enable, self.fail_on)
    }

    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        record(&self.log, self.name, Transition::Disable, self.fail_on)
    }
}

impl Module for Marker {
    fn info() -> ModuleInfo {
        ModuleInfo::new("Marker")
    }
}

impl FromModuleData for Marker {
    type Data = NoData;

    fn from_data(_: NoData, _: &mut ModuleLoader<'_>) -> Result<Self, ModuleParseError> {
        Ok(Marker::new("configured", &Log::default()))
    }
}

/// Listener keeping every event it sees, optionally cancelling stage changes
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<SessionEvent>,
    pub cancel_pre_change: bool,
}

impl Recorder {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(SessionEvent::name).collect()
    }
}

impl EventListener for Recorder {
    fn subscribed_events(&self) -> &[EventFilter] {
        &[EventFilter::All]
    }

    fn on_event(&mut self, event: &mut SessionEvent) {
        if self.cancel_pre_change {
            event.cancel();
        }
        self.events.push(event.clone());
    }
}

pub fn recorder(manager: &mut ModuleManager) -> Rc<RefCell<Recorder>> {
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let listener: Rc<RefCell<dyn EventListener>> = recorder.clone();
    manager.add_session_listener(listener);
    recorder
}
