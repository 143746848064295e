//! Components are the unit of lifecycle in a session.
//!
//! Every component lives in the [`ModuleManager`](crate::module::ModuleManager)'s arena and is
//! addressed by a [`ComponentId`]. The arena splits an entry into the bookkeeping the framework
//! owns ([`ComponentCore`]) and the behavior the author wrote (`Box<dyn Component>`). While a hook
//! runs, the behavior is taken out of its slot so the hook can be handed the whole manager.

mod context;
mod lifecycle;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use skirmish_events::{EventFilter, EventListener, SessionEvent};

use crate::error::LifecycleError;
use crate::module::{ModuleId, ModuleInfo, Registry};
use crate::state::ComponentState;
use crate::ticking::{TaskId, TickDescriptor, Tickable};

pub use context::ComponentContext;
pub(crate) use lifecycle::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Downcasting support for component behaviors
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behavior of a component. All hooks default to doing nothing.
///
/// Hooks receive a [`ComponentContext`] that can reach the rest of the session. An error returned
/// from a hook rolls the transition back and is reported by the manager.
pub trait Component: Tickable {
    fn on_load(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_unload(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Events this component receives while it is loaded
    fn subscribed_events(&self) -> &[EventFilter] {
        &[]
    }

    fn on_event(
        &mut self,
        _event: &mut SessionEvent,
        _ctx: &mut ComponentContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A child of a component.
///
/// Plain children follow their parent through every transition. Managed children are modules and
/// are only ever driven through the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Plain(ComponentId),
    Managed(ModuleId),
}

/// Framework-owned bookkeeping for one component
#[derive(Default)]
pub(crate) struct ComponentCore {
    pub state: ComponentState,
    pub listeners: Vec<Rc<RefCell<dyn EventListener>>>,
    pub tasks: Vec<TaskId>,
    /// Tickable objects and the tasks expanded from them
    pub tickables: Vec<(Rc<RefCell<dyn Tickable>>, Vec<TaskId>)>,
    pub children: Vec<Child>,
    pub fields_bound: bool,
}

impl ComponentCore {
    pub fn plain_children(&self) -> Vec<ComponentId> {
        self.children
            .iter()
            .filter_map(|child| match child {
                Child::Plain(id) => Some(*id),
                Child::Managed(_) => None,
            })
            .collect()
    }
}

pub(crate) struct Entry {
    pub core: ComponentCore,
    /// `None` while one of the component's hooks is running
    pub behavior: Option<Box<dyn Component>>,
    pub module: Option<ModuleInfo>,
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Held by a stage and only swept while that stage is active
    pub stage_scoped: bool,
    /// Component that holds this one as a managed child
    pub parent: Option<ComponentId>,
}

impl Entry {
    pub fn display_name(&self) -> &'static str {
        match &self.module {
            Some(info) => info.name,
            None => short_type_name(self.type_name),
        }
    }

    /// Stage modules are dormant until their stage hands them to the stage manager
    pub fn is_dormant(&self) -> bool {
        self.stage_scoped && self.parent.is_none()
    }
}

/// A component ready to be placed in the arena
pub(crate) struct Spawn {
    pub behavior: Box<dyn Component>,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub ticks: Rc<[TickDescriptor]>,
}

impl Spawn {
    pub fn of<C: Component + 'static>(component: C, registry: &Registry) -> Self {
        Self {
            behavior: Box::new(component),
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            ticks: registry.tick_methods.get::<C>(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Arena {
    entries: Vec<Option<Entry>>,
}

impl Arena {
    pub fn insert(&mut self, spawn: Spawn, module: Option<ModuleInfo>) -> ComponentId {
        let id = ComponentId(self.entries.len() as u32);
        self.entries.push(Some(Entry {
            core: ComponentCore::default(),
            behavior: Some(spawn.behavior),
            module,
            type_id: spawn.type_id,
            type_name: spawn.type_name,
            stage_scoped: false,
            parent: None,
        }));
        id
    }

    pub fn get(&self, id: ComponentId) -> Option<&Entry> {
        self.entries.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Entry> {
        self.entries.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn entry(&self, id: ComponentId) -> Result<&Entry, LifecycleError> {
        self.get(id).ok_or(LifecycleError::Missing(id))
    }

    pub fn entry_mut(&mut self, id: ComponentId) -> Result<&mut Entry, LifecycleError> {
        self.get_mut(id).ok_or(LifecycleError::Missing(id))
    }

    pub fn remove(&mut self, id: ComponentId) -> Option<Entry> {
        self.entries.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn take_behavior(&mut self, id: ComponentId) -> Result<Box<dyn Component>, LifecycleError> {
        self.entry_mut(id)?
            .behavior
            .take()
            .ok_or(LifecycleError::Busy(id))
    }

    /// Put a behavior back. Dropped if the component was destroyed meanwhile.
    pub fn put_behavior(&mut self, id: ComponentId, behavior: Box<dyn Component>) {
        if let Some(entry) = self.get_mut(id) {
            entry.behavior = Some(behavior);
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }
}

pub(crate) fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}
