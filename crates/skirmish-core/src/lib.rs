//! Skirmish: a framework for composing minigames out of modules.
//!
//! A [`Session`] owns a [`ModuleManager`], which owns every component of the session and drives
//! their lifecycle (`Unloaded -> Loaded -> Enabled`). Modules are built by name from
//! configuration through the [`Registry`], grouped into stages that the [`StageManager`]
//! activates one at a time, and scheduled on the session's tick loop.

pub mod builtin;
mod bus;
pub mod component;
pub mod config;
pub mod duration;
pub mod error;
pub mod internal;
pub mod listeners;
pub mod module;
pub mod session;
pub mod stage;
pub mod state;
pub mod ticking;

pub use bus::EventBus;
pub use component::{Child, Component, ComponentContext, ComponentId};
pub use config::SessionConfig;
pub use error::{LifecycleError, ModuleParseError};
pub use module::{
    FromModuleData, ManagerOptions, Module, ModuleId, ModuleInfo, ModuleLoadType, ModuleLoader,
    ModuleManager, NoData, Registry,
};
pub use session::Session;
pub use stage::{Stage, StageManager};
pub use state::{ComponentState, Transition};

pub use skirmish_events as events;
