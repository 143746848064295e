use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use skirmish_events::{EventListener, SessionEvent, StageChangeData, StageSnapshot};
use tracing::{debug, error, warn};

use crate::bus::{EventBus, ListenerTarget};
use crate::component::{
    panic_message, Arena, Child, Component, ComponentContext, ComponentId, Spawn,
};
use crate::error::{LifecycleError, RegistryError};
use crate::internal::{Extent, ExtentFilter, ExtentManager, Filter, FilterManager, TeamManager};
use crate::stage::StageManager;
use crate::state::{ComponentState, Transition};
use crate::ticking::{
    spawn_offthread, FieldCounters, TaskBody, TaskBuilder, TaskContext, TaskId, TickAction,
    TickFieldHolder, TickScheduler, TickTarget,
};

use super::{Module, ModuleId, ModuleInfo, ModuleLoadType, Registry};

// Internal modules are created first, in this order, by every manager
const TICK_FIELD_HOLDER: ModuleId = ModuleId(ComponentId(0));
const FILTER_MANAGER: ModuleId = ModuleId(ComponentId(1));
const EXTENT_MANAGER: ModuleId = ModuleId(ComponentId(2));
const TEAM_MANAGER: ModuleId = ModuleId(ComponentId(3));
const STAGE_MANAGER: ModuleId = ModuleId(ComponentId(4));

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub ticks_per_second: u32,
    /// Above 0, failures are logged with their full error chain
    pub debug_level: u8,
    /// Name of the session this manager's session was created from. Set only on child
    /// managers; the parent session owns its children, so they refer back to it by name.
    pub parent_session: Option<String>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            ticks_per_second: 20,
            debug_level: 0,
            parent_session: None,
        }
    }
}

/// Owns every component and module of one session.
///
/// No lifecycle failure escapes the manager: the per-module operations log the failure and
/// report `false`, and bulk sweeps keep going past failing modules.
pub struct ModuleManager {
    pub(crate) registry: Rc<Registry>,
    pub(crate) arena: Arena,
    pub(crate) bus: EventBus,
    pub(crate) scheduler: TickScheduler,
    pub(crate) field_counters: FieldCounters,
    /// Modules in registration order
    modules: Vec<ModuleId>,
    by_type: HashMap<TypeId, Vec<ModuleId>>,
    options: ManagerOptions,
    stop_requested: bool,
}

impl ModuleManager {
    pub fn new(registry: Rc<Registry>, options: ManagerOptions) -> Self {
        let field_counters = FieldCounters::default();
        let mut manager = Self {
            registry,
            arena: Arena::default(),
            bus: EventBus::default(),
            scheduler: TickScheduler::new(options.ticks_per_second),
            field_counters: Rc::clone(&field_counters),
            modules: Vec::new(),
            by_type: HashMap::new(),
            options,
            stop_requested: false,
        };

        let holder = manager.add_module(TickFieldHolder::new(field_counters));
        let filters = manager.add_module(FilterManager::default());
        let extents = manager.add_module(ExtentManager::default());
        let teams = manager.add_module(TeamManager::default());
        let stages = manager.add_module(StageManager::default());
        debug_assert_eq!(
            [holder, filters, extents, teams, stages],
            [
                TICK_FIELD_HOLDER,
                FILTER_MANAGER,
                EXTENT_MANAGER,
                TEAM_MANAGER,
                STAGE_MANAGER
            ]
        );

        manager
    }

    /// A manager for a nested session.
    ///
    /// The child shares this manager's [`Registry`], so both build modules from the same loader
    /// and tick method cache, and records `parent_session` as its parent.
    pub fn child(&self, parent_session: &str) -> Self {
        Self::new(
            Rc::clone(&self.registry),
            ManagerOptions {
                parent_session: Some(parent_session.to_string()),
                ..self.options.clone()
            },
        )
    }

    pub fn registry(&self) -> Rc<Registry> {
        Rc::clone(&self.registry)
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn debug_level(&self) -> u8 {
        self.options.debug_level
    }

    pub fn set_debug_level(&mut self, level: u8) {
        self.options.debug_level = level;
    }

    /// True for managers created with [`child`](Self::child)
    pub fn is_child(&self) -> bool {
        self.options.parent_session.is_some()
    }

    pub fn parent_session(&self) -> Option<&str> {
        self.options.parent_session.as_deref()
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TickScheduler {
        &mut self.scheduler
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add a module to the session
    pub fn add_module<M: Module + 'static>(&mut self, module: M) -> ModuleId {
        let spawn = Spawn::of(module, &self.registry);
        self.insert_module(spawn, M::info(), false)
    }

    /// Add a module that belongs to a stage. It stays dormant until the stage activates it.
    pub fn add_stage_module<M: Module + 'static>(&mut self, module: M) -> ModuleId {
        let spawn = Spawn::of(module, &self.registry);
        self.insert_module(spawn, M::info(), true)
    }

    pub(crate) fn insert_module(
        &mut self,
        spawn: Spawn,
        info: ModuleInfo,
        stage_scoped: bool,
    ) -> ModuleId {
        let id = ModuleId(self.insert(spawn, Some(info)));
        if let Some(entry) = self.arena.get_mut(id.0) {
            entry.stage_scoped = stage_scoped;
        }
        self.register_module(id);
        if !info.internal {
            debug!(target: "modules", "Registered module {} ({})", info.name, id);
        }
        id
    }

    /// Place a plain component in the session
    pub fn spawn_component<C: Component + 'static>(&mut self, component: C) -> ComponentId {
        let spawn = Spawn::of(component, &self.registry);
        self.insert(spawn, None)
    }

    fn insert(&mut self, spawn: Spawn, module: Option<ModuleInfo>) -> ComponentId {
        let ticks = Rc::clone(&spawn.ticks);
        let type_name = spawn.type_name;
        let id = self.arena.insert(spawn, module);
        self.expand_tick_methods(id, TickTarget::Component(id), &ticks, type_name);
        id
    }

    pub(crate) fn register_module(&mut self, id: ModuleId) {
        if self.modules.contains(&id) {
            return;
        }
        let Some(entry) = self.arena.get(id.0) else {
            return;
        };
        self.by_type.entry(entry.type_id).or_default().push(id);
        self.modules.push(id);
    }

    /// Take a module down and remove it from the session. Internal modules cannot be destroyed.
    pub fn destroy_module(&mut self, id: ModuleId) -> bool {
        let Some(entry) = self.arena.get(id.0) else {
            return false;
        };
        if entry.module.is_some_and(|info| info.internal) {
            return false;
        }
        if let Some(parent) = entry.parent {
            self.remove_submodule(parent, id);
        }
        self.disable_module(id);
        self.unload_module(id);
        self.discard(id.0);
        true
    }

    /// Take a plain component down and remove it, along with its plain children
    pub fn destroy_component(&mut self, id: ComponentId) -> bool {
        match self.arena.get(id) {
            Some(entry) if entry.module.is_none() => {}
            _ => return false,
        }
        for op in [Transition::Disable, Transition::Unload] {
            if let Err(err) = self.try_transition(id, op) {
                debug!(target: "modules", "Ignoring error {} destroyed component {}: {}", op.verb(), id, err);
            }
        }
        for entry in self.arena.iter_mut() {
            entry.core.children.retain(|child| *child != Child::Plain(id));
        }
        self.discard(id);
        true
    }

    fn discard(&mut self, id: ComponentId) {
        let Some(entry) = self.arena.remove(id) else {
            return;
        };
        for task in &entry.core.tasks {
            self.scheduler.remove(*task);
        }
        self.bus.unregister_owner(id);
        self.field_counters
            .borrow_mut()
            .retain(|tracked| tracked.owner != id);
        self.modules.retain(|module| module.0 != id);
        if let Some(modules) = self.by_type.get_mut(&entry.type_id) {
            modules.retain(|module| module.0 != id);
        }
        for child in entry.core.children {
            if let Child::Plain(child) = child {
                self.discard(child);
            }
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn modules(&self) -> &[ModuleId] {
        &self.modules
    }

    /// Live instances of `M`, in registration order
    pub fn get_modules<M: Module + 'static>(&self) -> Vec<ModuleId> {
        self.by_type
            .get(&TypeId::of::<M>())
            .cloned()
            .unwrap_or_default()
    }

    pub fn first_module<M: Module + 'static>(&self) -> Option<ModuleId> {
        self.by_type
            .get(&TypeId::of::<M>())
            .and_then(|modules| modules.first().copied())
    }

    /// Find a module by its configured name, ignoring case
    pub fn find_module(&self, name: &str) -> Option<ModuleId> {
        self.modules.iter().copied().find(|id| {
            self.arena
                .get(id.0)
                .and_then(|entry| entry.module)
                .is_some_and(|info| info.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn module_id(&self, id: ComponentId) -> Option<ModuleId> {
        self.arena
            .get(id)
            .filter(|entry| entry.module.is_some())
            .map(|_| ModuleId(id))
    }

    pub fn module_info(&self, id: ModuleId) -> Option<ModuleInfo> {
        self.arena.get(id.0).and_then(|entry| entry.module)
    }

    pub fn state_of(&self, id: ComponentId) -> Option<ComponentState> {
        self.arena.get(id).map(|entry| entry.core.state)
    }

    pub fn module_state(&self, id: ModuleId) -> Option<ComponentState> {
        self.state_of(id.0)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.arena.get(id).is_some()
    }

    pub fn component_count(&self) -> usize {
        self.arena.len()
    }

    pub fn children(&self, id: ComponentId) -> Vec<Child> {
        self.arena
            .get(id)
            .map(|entry| entry.core.children.clone())
            .unwrap_or_default()
    }

    /// Tasks owned by a component
    pub fn tasks_of(&self, id: ComponentId) -> Vec<TaskId> {
        self.arena
            .get(id)
            .map(|entry| entry.core.tasks.clone())
            .unwrap_or_default()
    }

    /// Module or type name used in logs
    pub fn display_name(&self, id: ComponentId) -> &'static str {
        self.arena
            .get(id)
            .map(|entry| entry.display_name())
            .unwrap_or("<destroyed>")
    }

    pub fn get<C: Component + 'static>(&self, id: ComponentId) -> Option<&C> {
        self.arena
            .get(id)?
            .behavior
            .as_deref()?
            .as_any()
            .downcast_ref::<C>()
    }

    pub fn get_mut<C: Component + 'static>(&mut self, id: ComponentId) -> Option<&mut C> {
        self.arena
            .get_mut(id)?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<C>()
    }

    pub fn module<M: Module + 'static>(&self, id: ModuleId) -> Option<&M> {
        self.get::<M>(id.0)
    }

    pub fn module_mut<M: Module + 'static>(&mut self, id: ModuleId) -> Option<&mut M> {
        self.get_mut::<M>(id.0)
    }

    /// Run `f` against a component with a context for it
    pub fn with_component<C, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut C, &mut ComponentContext<'_>) -> R,
    ) -> Result<R, LifecycleError>
    where
        C: Component + 'static,
    {
        let mut behavior = self.arena.take_behavior(id)?;
        let result = match (*behavior).as_any_mut().downcast_mut::<C>() {
            Some(component) => {
                let mut ctx = ComponentContext::new(self, id);
                Ok(f(component, &mut ctx))
            }
            None => Err(LifecycleError::WrongType {
                id,
                expected: type_name::<C>(),
            }),
        };
        self.arena.put_behavior(id, behavior);
        result
    }

    pub fn with_module<M, R>(
        &mut self,
        id: ModuleId,
        f: impl FnOnce(&mut M, &mut ComponentContext<'_>) -> R,
    ) -> Result<R, LifecycleError>
    where
        M: Module + 'static,
    {
        self.with_component(id.0, f)
    }

    // ========================================================================
    // Internal modules
    // ========================================================================

    pub fn tick_field_holder(&self) -> Option<&TickFieldHolder> {
        self.module(TICK_FIELD_HOLDER)
    }

    pub fn filters(&mut self) -> Option<&mut FilterManager> {
        self.module_mut(FILTER_MANAGER)
    }

    pub fn extents(&mut self) -> Option<&mut ExtentManager> {
        self.module_mut(EXTENT_MANAGER)
    }

    pub fn teams(&mut self) -> Option<&mut TeamManager> {
        self.module_mut(TEAM_MANAGER)
    }

    /// Add a named extent and a filter named `extent-<id>` testing points against it
    pub fn add_extent(&mut self, id: &str, extent: Rc<dyn Extent>) -> Result<(), RegistryError> {
        let extents = self
            .module_mut::<ExtentManager>(EXTENT_MANAGER)
            .ok_or(RegistryError::Unavailable("extent"))?;
        extents.add_extent(Some(id), Rc::clone(&extent))?;
        self.add_filter(
            &format!("{}{}", ExtentManager::FILTER_PREFIX, id),
            Rc::new(ExtentFilter(extent)),
        )
    }

    /// Create a team and a filter named `team-<id>` allowing its members
    pub fn create_team(&mut self, id: &str) -> Result<(), RegistryError> {
        let teams = self
            .module_mut::<TeamManager>(TEAM_MANAGER)
            .ok_or(RegistryError::Unavailable("team"))?;
        teams.create_team(id)?;
        let filter = teams
            .team(id)
            .map(|team| team.filter())
            .ok_or(RegistryError::Unavailable("team"))?;
        self.add_filter(&format!("{}{}", TeamManager::FILTER_PREFIX, id), filter)
    }

    pub fn add_filter(&mut self, id: &str, filter: Rc<dyn Filter>) -> Result<(), RegistryError> {
        self.module_mut::<FilterManager>(FILTER_MANAGER)
            .ok_or(RegistryError::Unavailable("filter"))?
            .add_filter(Some(id), filter)
            .map(|_| ())
    }

    pub fn stage_manager_id(&self) -> ModuleId {
        STAGE_MANAGER
    }

    pub fn stage_manager(&self) -> Option<&StageManager> {
        self.module(STAGE_MANAGER)
    }

    /// Append a stage. Its modules stay dormant until the stage becomes current.
    pub fn add_stage(&mut self, name: impl Into<String>, modules: Vec<ModuleId>) -> bool {
        let name = name.into();
        for module in &modules {
            if let Some(entry) = self.arena.get_mut(module.0) {
                entry.stage_scoped = true;
            }
        }
        match self.module_mut::<StageManager>(STAGE_MANAGER) {
            Some(stages) => {
                stages.add_stage(STAGE_MANAGER, name, modules);
                true
            }
            None => false,
        }
    }

    pub fn next_stage(&mut self, change: StageChangeData) -> Result<bool, LifecycleError> {
        self.with_module::<StageManager, _>(STAGE_MANAGER, |stages, ctx| {
            stages.next_stage(change, ctx)
        })?
    }

    /// Cursor of the stage manager, -1 when no stage is active
    pub fn stage_index(&self) -> isize {
        self.stage_manager()
            .map(StageManager::stage_index)
            .unwrap_or(-1)
    }

    pub fn current_stage(&self) -> Option<StageSnapshot> {
        self.stage_manager()?.current_snapshot()
    }

    /// Ask the owning session to stop after the current tick
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }

    // ========================================================================
    // Sweeps
    // ========================================================================

    /// Load every unloaded module, pre-world modules first.
    ///
    /// The stage manager starts the first stage as soon as it loads, so an empty default stage
    /// is added when none are configured.
    pub fn load(&mut self) -> bool {
        let needs_stage = self
            .stage_manager()
            .is_some_and(|stages| stages.stages().is_empty());
        if needs_stage {
            self.add_stage("", Vec::new());
        }
        self.sweep(Transition::Load)
    }

    pub fn unload(&mut self) -> bool {
        self.sweep(Transition::Unload)
    }

    pub fn enable(&mut self) -> bool {
        self.sweep(Transition::Enable)
    }

    pub fn disable(&mut self) -> bool {
        self.sweep(Transition::Disable)
    }

    fn sweep(&mut self, op: Transition) -> bool {
        let mut targets: Vec<ModuleId> = self
            .modules
            .iter()
            .copied()
            .filter(|id| self.sweepable(*id, op))
            .collect();
        if op == Transition::Load {
            targets.sort_by_key(|id| {
                self.module_info(*id)
                    .map(|info| info.load == ModuleLoadType::PostWorld)
            });
        }

        let mut success = true;
        for id in targets {
            // Earlier modules in the sweep may already have moved this one
            if self.sweepable(id, op) {
                success &= self.transition_module(id, op);
            }
        }
        success
    }

    fn sweepable(&self, id: ModuleId, op: Transition) -> bool {
        self.arena
            .get(id.0)
            .is_some_and(|entry| entry.core.state == op.source() && !entry.is_dormant())
    }

    pub fn load_module(&mut self, id: ModuleId) -> bool {
        self.transition_module(id, Transition::Load)
    }

    pub fn unload_module(&mut self, id: ModuleId) -> bool {
        self.transition_module(id, Transition::Unload)
    }

    pub fn enable_module(&mut self, id: ModuleId) -> bool {
        self.transition_module(id, Transition::Enable)
    }

    pub fn disable_module(&mut self, id: ModuleId) -> bool {
        self.transition_module(id, Transition::Disable)
    }

    fn transition_module(&mut self, id: ModuleId, op: Transition) -> bool {
        let Some(entry) = self.arena.get(id.0) else {
            return false;
        };
        if entry.core.state != op.source() {
            return false;
        }
        let name = entry.display_name();
        if !entry.module.is_some_and(|info| info.internal) {
            debug!(target: "modules", "{} module {}", op.verb(), name);
        }

        match self.try_transition(id.0, op) {
            Ok(success) => success,
            Err(err) => {
                if self.options.debug_level > 0 {
                    error!(target: "modules", "Error {} Module {}: {}", op.verb(), name, err.detail());
                } else {
                    error!(target: "modules", "Error {} Module {}: {}", op.verb(), name, err);
                }
                false
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register a listener that is not owned by any component
    pub fn add_session_listener(&mut self, listener: Rc<RefCell<dyn EventListener>>) {
        self.bus.register(None, ListenerTarget::Handler(listener));
    }

    pub fn remove_session_listener(&mut self, listener: &Rc<RefCell<dyn EventListener>>) -> bool {
        self.bus.unregister_handler(None, listener)
    }

    /// Deliver an event to every subscribed listener and return it.
    ///
    /// Components whose hooks are running do not receive events fired from inside them.
    pub fn fire(&mut self, mut event: SessionEvent) -> SessionEvent {
        for target in self.bus.targets() {
            match target {
                ListenerTarget::Component(id) => self.deliver(id, &mut event),
                ListenerTarget::Handler(handler) => {
                    let Ok(mut listener) = handler.try_borrow_mut() else {
                        continue;
                    };
                    if !listener
                        .subscribed_events()
                        .iter()
                        .any(|filter| filter.matches(&event))
                    {
                        continue;
                    }
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| listener.on_event(&mut event)));
                    if let Err(payload) = outcome {
                        error!(target: "events",
                            "Listener panicked while handling {}: {}",
                            event.name(),
                            panic_message(&*payload)
                        );
                    }
                }
            }
        }
        event
    }

    fn deliver(&mut self, id: ComponentId, event: &mut SessionEvent) {
        let Ok(mut behavior) = self.arena.take_behavior(id) else {
            return;
        };
        if behavior
            .subscribed_events()
            .iter()
            .any(|filter| filter.matches(event))
        {
            let name = self.display_name(id);
            let mut ctx = ComponentContext::new(self, id);
            let outcome = catch_unwind(AssertUnwindSafe(|| behavior.on_event(event, &mut ctx)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(target: "events", "Error handling {} in {}: {:#}", event.name(), name, err)
                }
                Err(payload) => error!(target: "events",
                    "{} panicked while handling {}: {}",
                    name,
                    event.name(),
                    panic_message(&*payload)
                ),
            }
        }
        self.arena.put_behavior(id, behavior);
    }

    // ========================================================================
    // Ticking
    // ========================================================================

    /// Schedule a task not owned by any component. It starts immediately.
    pub fn new_task(&mut self) -> TaskBuilder<'_> {
        TaskBuilder::new(self, None)
    }

    /// Advance the session by one tick.
    ///
    /// Work posted by off-thread tasks is applied first, then every due task runs.
    pub fn tick(&mut self) {
        while let Some(job) = self.scheduler.next_main_thread_job() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(self))) {
                error!(target: "ticking",
                    "Main thread job panicked: {}",
                    panic_message(&*payload)
                );
            }
        }

        for task in self.scheduler.advance() {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: TaskId) {
        let Some((body, name, owner)) = self.scheduler.begin_run(task) else {
            return;
        };
        let body = match body {
            TaskBody::Main(mut f) => {
                let mut ctx = TaskContext::new(self, task, owner);
                let outcome = catch_unwind(AssertUnwindSafe(|| f(&mut ctx)));
                self.report_task(&name, outcome);
                TaskBody::Main(f)
            }
            TaskBody::Async(work) => {
                let job = Arc::clone(&work);
                let context = self.scheduler.async_context(&name);
                spawn_offthread(name.clone(), Box::new(move |ctx| job(ctx)), context);
                TaskBody::Async(work)
            }
            TaskBody::Tick { target, action } => {
                self.run_tick_method(task, owner, &name, &target, &action);
                TaskBody::Tick { target, action }
            }
        };
        self.scheduler.finish_run(task, body);
    }

    fn run_tick_method(
        &mut self,
        task: TaskId,
        owner: Option<ComponentId>,
        name: &str,
        target: &TickTarget,
        action: &TickAction,
    ) {
        match target {
            TickTarget::Component(id) => {
                let Ok(mut behavior) = self.arena.take_behavior(*id) else {
                    debug!(target: "ticking", "Skipping {}: component is busy", name);
                    return;
                };
                self.apply_tick_action(task, owner, name, (*behavior).as_any_mut(), action);
                self.arena.put_behavior(*id, behavior);
            }
            TickTarget::Object(object) => {
                let Ok(mut tickable) = object.try_borrow_mut() else {
                    debug!(target: "ticking", "Skipping {}: tickable is borrowed", name);
                    return;
                };
                self.apply_tick_action(task, owner, name, (*tickable).as_any_mut(), action);
            }
        }
    }

    fn apply_tick_action(
        &mut self,
        task: TaskId,
        owner: Option<ComponentId>,
        name: &str,
        target: &mut dyn std::any::Any,
        action: &TickAction,
    ) {
        match action {
            TickAction::Main(method) => {
                let mut ctx = TaskContext::new(self, task, owner);
                let outcome = catch_unwind(AssertUnwindSafe(|| method(target, &mut ctx)));
                match outcome {
                    Ok(Some(result)) => self.report_task(name, Ok(result)),
                    Ok(None) => warn!(target: "ticking", "Tick method {} was given the wrong target", name),
                    Err(payload) => self.report_task(name, Err(payload)),
                }
            }
            TickAction::Offload(prepare) => match prepare(target) {
                Some(job) => {
                    let context = self.scheduler.async_context(name);
                    spawn_offthread(name.to_string(), job, context);
                }
                None => warn!(target: "ticking", "Tick method {} was given the wrong target", name),
            },
        }
    }

    fn report_task(&self, name: &str, outcome: std::thread::Result<anyhow::Result<()>>) {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) if self.options.debug_level > 0 => {
                error!(target: "ticking", "Error running task {}: {:?}", name, err)
            }
            Ok(Err(err)) => error!(target: "ticking", "Error running task {}: {:#}", name, err),
            Err(payload) => error!(target: "ticking",
                "Task {} panicked: {}",
                name,
                panic_message(&*payload)
            ),
        }
    }
}
