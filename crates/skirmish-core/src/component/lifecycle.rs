use std::any::{type_name, Any};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use skirmish_events::EventListener;
use tracing::{debug, warn};

use crate::bus::{same_listener, ListenerTarget};
use crate::error::LifecycleError;
use crate::module::{ModuleId, ModuleManager};
use crate::state::{ComponentState, Transition};
use crate::ticking::{
    track_field, Repeat, TaskBody, TaskId, TickDescriptor, TickTarget, Tickable,
};

use super::{short_type_name, Child, Component, ComponentContext, ComponentId};

impl ModuleManager {
    pub fn try_load(&mut self, id: ComponentId) -> Result<bool, LifecycleError> {
        self.try_transition(id, Transition::Load)
    }

    pub fn try_unload(&mut self, id: ComponentId) -> Result<bool, LifecycleError> {
        self.try_transition(id, Transition::Unload)
    }

    pub fn try_enable(&mut self, id: ComponentId) -> Result<bool, LifecycleError> {
        self.try_transition(id, Transition::Enable)
    }

    pub fn try_disable(&mut self, id: ComponentId) -> Result<bool, LifecycleError> {
        self.try_transition(id, Transition::Disable)
    }

    /// Apply one lifecycle step to a component and cascade it to its plain children.
    ///
    /// Returns `Ok(false)` without side effects when the step is not valid from the current
    /// state. A failing hook rolls the component back to its previous state, detaches any
    /// children the hook added and is returned as an error; the children are then left alone.
    /// Otherwise every plain child is attempted and the result is true only if the component
    /// and all children succeeded.
    pub fn try_transition(
        &mut self,
        id: ComponentId,
        op: Transition,
    ) -> Result<bool, LifecycleError> {
        let entry = self.arena.entry(id)?;
        let source = entry.core.state;
        let Some(target) = op.apply(source) else {
            return Ok(false);
        };
        // Children added by the hook itself are caught up when they are added
        let children_before = entry.core.children.clone();
        let children = entry.core.plain_children();
        let mut behavior = self.arena.take_behavior(id)?;

        self.arena.entry_mut(id)?.core.state = target;
        match op {
            Transition::Load => {
                self.bind_tick_fields(id, &mut *behavior);
                self.activate(id);
            }
            Transition::Unload => self.deactivate(id),
            Transition::Enable | Transition::Disable => {}
        }

        let outcome = self.run_hook(id, op, &mut *behavior);
        self.arena.put_behavior(id, behavior);

        if let Err(err) = outcome {
            if let Some(entry) = self.arena.get_mut(id) {
                entry.core.state = source;
            }
            match op {
                Transition::Load => self.deactivate(id),
                Transition::Unload => self.activate(id),
                Transition::Enable | Transition::Disable => {}
            }
            self.detach_added_children(id, &children_before);
            return Err(err);
        }

        let mut success = true;
        for child in children {
            success &= self.step_child(child, op);
        }
        Ok(success)
    }

    /// Undo `add_subcomponent`/`add_submodule` calls made since `before` was taken
    fn detach_added_children(&mut self, id: ComponentId, before: &[Child]) {
        let added: Vec<Child> = self
            .arena
            .get(id)
            .map(|entry| {
                entry
                    .core
                    .children
                    .iter()
                    .filter(|child| !before.contains(child))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        for child in added {
            match child {
                Child::Plain(child) => self.remove_subcomponent(id, child),
                Child::Managed(module) => self.remove_submodule(id, module),
            };
        }
    }

    fn step_child(&mut self, child: ComponentId, op: Transition) -> bool {
        match self.try_transition(child, op) {
            Ok(success) => success,
            Err(err) => {
                warn!(target: "modules",
                    "Error {} component {} ({}): {}",
                    op.verb(),
                    self.display_name(child),
                    child,
                    err
                );
                false
            }
        }
    }

    fn run_hook(
        &mut self,
        id: ComponentId,
        op: Transition,
        behavior: &mut dyn Component,
    ) -> Result<(), LifecycleError> {
        let mut ctx = ComponentContext::new(self, id);
        let outcome = catch_unwind(AssertUnwindSafe(|| match op {
            Transition::Load => behavior.on_load(&mut ctx),
            Transition::Unload => behavior.on_unload(&mut ctx),
            Transition::Enable => behavior.on_enable(&mut ctx),
            Transition::Disable => behavior.on_disable(&mut ctx),
        }));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(LifecycleError::Hook {
                hook: op.hook(),
                error,
            }),
            Err(payload) => Err(LifecycleError::Panicked {
                hook: op.hook(),
                message: panic_message(&*payload),
            }),
        }
    }

    /// Register listeners and start tasks. Listeners added while the component is loaded are
    /// registered by `add_listener`, so this only runs on entering `Loaded`.
    fn activate(&mut self, id: ComponentId) {
        let Some(entry) = self.arena.get(id) else {
            return;
        };
        let listeners = entry.core.listeners.clone();
        let tasks = entry.core.tasks.clone();

        self.bus.register(Some(id), ListenerTarget::Component(id));
        for listener in listeners {
            self.bus.register(Some(id), ListenerTarget::Handler(listener));
        }
        for task in tasks {
            self.scheduler.start(task);
        }
    }

    /// Unregister listeners and stop tasks
    fn deactivate(&mut self, id: ComponentId) {
        self.bus.unregister_owner(id);
        if let Some(entry) = self.arena.get(id) {
            for task in &entry.core.tasks {
                self.scheduler.stop(*task);
            }
        }
    }

    fn bind_tick_fields(&mut self, id: ComponentId, behavior: &mut dyn Component) {
        let Some(entry) = self.arena.get_mut(id) else {
            return;
        };
        if entry.core.fields_bound {
            return;
        }
        entry.core.fields_bound = true;

        let mut counters = self.field_counters.borrow_mut();
        for slot in behavior.tick_fields() {
            counters.push(track_field(id, None, slot));
        }
    }

    /// Add a plain child. If this component is already loaded the child is brought to the same
    /// state; returns false if any of those steps fails.
    pub fn add_subcomponent(&mut self, parent: ComponentId, child: ComponentId) -> bool {
        if parent == child || self.arena.get(child).is_none() {
            return false;
        }
        let Some(entry) = self.arena.get_mut(parent) else {
            return false;
        };
        if entry.core.children.contains(&Child::Plain(child)) {
            return false;
        }
        entry.core.children.push(Child::Plain(child));
        let state = entry.core.state;

        let mut success = true;
        if state.is_loaded() {
            success &= self.step_child(child, Transition::Load);
        }
        if state == ComponentState::Enabled {
            success &= self.step_child(child, Transition::Enable);
        }
        success
    }

    /// Detach a plain child and take it down, ignoring failures
    pub fn remove_subcomponent(&mut self, parent: ComponentId, child: ComponentId) -> bool {
        let Some(entry) = self.arena.get_mut(parent) else {
            return false;
        };
        let before = entry.core.children.len();
        entry.core.children.retain(|c| *c != Child::Plain(child));
        if entry.core.children.len() == before {
            return false;
        }

        for op in [Transition::Disable, Transition::Unload] {
            if let Err(err) = self.try_transition(child, op) {
                debug!(target: "modules", "Ignoring error {} removed component {}: {}", op.verb(), child, err);
            }
        }
        true
    }

    /// Add a module child. The module is driven through the manager, never by the cascade.
    pub fn add_submodule(&mut self, parent: ComponentId, module: ModuleId) -> bool {
        let Some(entry) = self.arena.get_mut(parent) else {
            return false;
        };
        if entry.core.children.contains(&Child::Managed(module)) {
            return false;
        }
        entry.core.children.push(Child::Managed(module));
        let state = entry.core.state;

        match self.arena.get_mut(module.component()) {
            Some(child) => child.parent = Some(parent),
            None => return false,
        }
        self.register_module(module);

        let mut success = true;
        if state.is_loaded() {
            success &= self.load_module(module);
        }
        if state == ComponentState::Enabled {
            success &= self.enable_module(module);
        }
        success
    }

    pub fn remove_submodule(&mut self, parent: ComponentId, module: ModuleId) -> bool {
        let Some(entry) = self.arena.get_mut(parent) else {
            return false;
        };
        let before = entry.core.children.len();
        entry.core.children.retain(|c| *c != Child::Managed(module));
        if entry.core.children.len() == before {
            return false;
        }

        self.disable_module(module);
        self.unload_module(module);
        if let Some(child) = self.arena.get_mut(module.component()) {
            if child.parent == Some(parent) {
                child.parent = None;
            }
        }
        true
    }

    /// Expand a tickable's tick methods into tasks owned by `owner` and bind its tick fields.
    /// Returns false if the tickable is already added or is currently borrowed.
    pub fn add_tickable<T: Tickable + 'static>(
        &mut self,
        owner: ComponentId,
        tickable: &Rc<RefCell<T>>,
    ) -> bool {
        let erased: Rc<RefCell<dyn Tickable>> = tickable.clone();
        let address = object_address(&erased);
        let Some(entry) = self.arena.get(owner) else {
            return false;
        };
        if entry
            .core
            .tickables
            .iter()
            .any(|(existing, _)| object_address(existing) == address)
        {
            return false;
        }

        let Ok(mut object) = tickable.try_borrow_mut() else {
            warn!(target: "ticking",
                "Cannot add tickable {} to {}: it is already borrowed",
                short_type_name(type_name::<T>()),
                owner
            );
            return false;
        };
        {
            let mut counters = self.field_counters.borrow_mut();
            for slot in object.tick_fields() {
                counters.push(track_field(owner, Some(address), slot));
            }
        }
        drop(object);

        let descriptors = self.registry.tick_methods.get::<T>();
        let tasks = self.expand_tick_methods(
            owner,
            TickTarget::Object(Rc::clone(&erased)),
            &descriptors,
            type_name::<T>(),
        );

        if let Some(entry) = self.arena.get_mut(owner) {
            entry.core.tickables.push((erased, tasks));
        }
        true
    }

    pub fn remove_tickable<T: Tickable + 'static>(
        &mut self,
        owner: ComponentId,
        tickable: &Rc<RefCell<T>>,
    ) -> bool {
        let erased: Rc<RefCell<dyn Tickable>> = tickable.clone();
        let address = object_address(&erased);
        let Some(entry) = self.arena.get_mut(owner) else {
            return false;
        };
        let Some(position) = entry
            .core
            .tickables
            .iter()
            .position(|(existing, _)| object_address(existing) == address)
        else {
            return false;
        };

        let (_, tasks) = entry.core.tickables.remove(position);
        entry.core.tasks.retain(|task| !tasks.contains(task));
        for task in tasks {
            self.scheduler.remove(task);
        }
        self.field_counters
            .borrow_mut()
            .retain(|tracked| tracked.source != Some(address));
        true
    }

    pub(crate) fn expand_tick_methods(
        &mut self,
        owner: ComponentId,
        target: TickTarget,
        descriptors: &[TickDescriptor],
        type_name: &'static str,
    ) -> Vec<TaskId> {
        let tps = self.scheduler.ticks_per_second();
        let mut tasks = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let repeat = match descriptor.repeat {
                Some(interval) => Repeat::Every(interval.to_ticks(tps)),
                None => Repeat::Once,
            };
            let name = format!("{}::{}", short_type_name(type_name), descriptor.name);
            if descriptor.action.is_async() {
                debug!(target: "ticking", "Tick method {} runs off the main thread", name);
            }
            tasks.push(self.adopt_task(
                Some(owner),
                name,
                descriptor.delay.to_ticks(tps),
                repeat,
                TaskBody::Tick {
                    target: target.clone(),
                    action: descriptor.action.clone(),
                },
            ));
        }
        tasks
    }

    /// Hand a new task to its owner. It starts now if the owner is loaded, or at once when
    /// there is no owner.
    pub(crate) fn adopt_task(
        &mut self,
        owner: Option<ComponentId>,
        name: String,
        delay: u64,
        repeat: Repeat,
        body: TaskBody,
    ) -> TaskId {
        let id = self.scheduler.insert(name, owner, delay, repeat, body);
        match owner {
            Some(owner) => {
                if let Some(entry) = self.arena.get_mut(owner) {
                    entry.core.tasks.push(id);
                    if entry.core.state.is_loaded() {
                        self.scheduler.start(id);
                    }
                }
            }
            None => {
                self.scheduler.start(id);
            }
        }
        id
    }

    /// Remove a task owned by `owner`
    pub fn cancel_task(&mut self, owner: ComponentId, task: TaskId) -> bool {
        let Some(entry) = self.arena.get_mut(owner) else {
            return false;
        };
        let before = entry.core.tasks.len();
        entry.core.tasks.retain(|t| *t != task);
        if entry.core.tasks.len() == before {
            return false;
        }
        for (_, tasks) in entry.core.tickables.iter_mut() {
            tasks.retain(|t| *t != task);
        }
        self.scheduler.remove(task)
    }

    pub fn add_listener(
        &mut self,
        owner: ComponentId,
        listener: Rc<RefCell<dyn EventListener>>,
    ) -> bool {
        let Some(entry) = self.arena.get_mut(owner) else {
            return false;
        };
        if entry
            .core
            .listeners
            .iter()
            .any(|existing| same_listener(existing, &listener))
        {
            return false;
        }
        entry.core.listeners.push(Rc::clone(&listener));
        if entry.core.state.is_loaded() {
            self.bus
                .register(Some(owner), ListenerTarget::Handler(listener));
        }
        true
    }

    pub fn remove_listener(
        &mut self,
        owner: ComponentId,
        listener: &Rc<RefCell<dyn EventListener>>,
    ) -> bool {
        let Some(entry) = self.arena.get_mut(owner) else {
            return false;
        };
        let before = entry.core.listeners.len();
        entry
            .core
            .listeners
            .retain(|existing| !same_listener(existing, listener));
        if entry.core.listeners.len() == before {
            return false;
        }
        self.bus.unregister_handler(Some(owner), listener);
        true
    }
}

fn object_address(object: &Rc<RefCell<dyn Tickable>>) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
