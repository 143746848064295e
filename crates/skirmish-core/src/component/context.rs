use std::cell::RefCell;
use std::rc::Rc;

use skirmish_events::{EventListener, SessionEvent, StageChangeData};

use crate::error::LifecycleError;
use crate::module::{ModuleId, ModuleManager};
use crate::state::ComponentState;
use crate::ticking::{TaskBuilder, TaskId, Tickable};

use super::{Component, ComponentId};

/// What a component's hooks see of the session
pub struct ComponentContext<'a> {
    manager: &'a mut ModuleManager,
    id: ComponentId,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(manager: &'a mut ModuleManager, id: ComponentId) -> Self {
        Self { manager, id }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Set when this component is a module
    pub fn module_id(&self) -> Option<ModuleId> {
        self.manager.module_id(self.id)
    }

    pub fn state(&self) -> ComponentState {
        self.manager.state_of(self.id).unwrap_or_default()
    }

    pub fn manager(&mut self) -> &mut ModuleManager {
        self.manager
    }

    /// Place a new plain component in the session. It is not a child of anything yet.
    pub fn spawn<C: Component + 'static>(&mut self, component: C) -> ComponentId {
        self.manager.spawn_component(component)
    }

    pub fn add_subcomponent(&mut self, child: ComponentId) -> bool {
        self.manager.add_subcomponent(self.id, child)
    }

    pub fn remove_subcomponent(&mut self, child: ComponentId) -> bool {
        self.manager.remove_subcomponent(self.id, child)
    }

    pub fn add_submodule(&mut self, module: ModuleId) -> bool {
        self.manager.add_submodule(self.id, module)
    }

    pub fn remove_submodule(&mut self, module: ModuleId) -> bool {
        self.manager.remove_submodule(self.id, module)
    }

    pub fn add_tickable<T: Tickable + 'static>(&mut self, tickable: &Rc<RefCell<T>>) -> bool {
        self.manager.add_tickable(self.id, tickable)
    }

    pub fn remove_tickable<T: Tickable + 'static>(&mut self, tickable: &Rc<RefCell<T>>) -> bool {
        self.manager.remove_tickable(self.id, tickable)
    }

    pub fn add_listener(&mut self, listener: Rc<RefCell<dyn EventListener>>) -> bool {
        self.manager.add_listener(self.id, listener)
    }

    pub fn remove_listener(&mut self, listener: &Rc<RefCell<dyn EventListener>>) -> bool {
        self.manager.remove_listener(self.id, listener)
    }

    /// Schedule a task owned by this component
    pub fn new_task(&mut self) -> TaskBuilder<'_> {
        TaskBuilder::new(self.manager, Some(self.id))
    }

    pub fn cancel_task(&mut self, task: TaskId) -> bool {
        self.manager.cancel_task(self.id, task)
    }

    pub fn fire(&mut self, event: SessionEvent) -> SessionEvent {
        self.manager.fire(event)
    }

    pub fn next_stage(&mut self, change: StageChangeData) -> Result<bool, LifecycleError> {
        self.manager.next_stage(change)
    }
}
