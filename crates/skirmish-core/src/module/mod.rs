//! Modules: components that are registered by name and built from configuration.

mod loader;
mod manager;
mod registry;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::component::{Component, ComponentId};
use crate::error::ModuleParseError;

pub use loader::ModuleLoader;
pub use manager::{ManagerOptions, ModuleManager};
pub use registry::{ModuleRegistry, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub(crate) ComponentId);

impl ModuleId {
    pub fn component(self) -> ComponentId {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// When a module is loaded relative to the session's world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModuleLoadType {
    PreWorld,
    #[default]
    PostWorld,
}

/// Static metadata describing a module type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Display and configuration name
    pub name: &'static str,
    pub load: ModuleLoadType,
    /// Names of modules that must exist before this one is built
    pub depends: &'static [&'static str],
    /// Name of the configuration data type, if the module takes any
    pub data_type: Option<&'static str>,
    /// Framework-provided module. Transitions are not logged.
    pub internal: bool,
}

impl ModuleInfo {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            load: ModuleLoadType::PostWorld,
            depends: &[],
            data_type: None,
            internal: false,
        }
    }

    pub const fn internal(name: &'static str) -> Self {
        Self {
            name,
            load: ModuleLoadType::PreWorld,
            depends: &[],
            data_type: None,
            internal: true,
        }
    }

    pub const fn load_type(mut self, load: ModuleLoadType) -> Self {
        self.load = load;
        self
    }

    pub const fn depends(mut self, depends: &'static [&'static str]) -> Self {
        self.depends = depends;
        self
    }

    pub const fn data_type(mut self, data_type: &'static str) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// A component with module metadata
pub trait Module: Component {
    fn info() -> ModuleInfo
    where
        Self: Sized;
}

/// A module that can be built from a configuration node
pub trait FromModuleData: Module + Sized {
    type Data: DeserializeOwned;

    fn from_data(data: Self::Data, loader: &mut ModuleLoader<'_>) -> Result<Self, ModuleParseError>;
}

/// Configuration data for modules that take none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NoData {}
