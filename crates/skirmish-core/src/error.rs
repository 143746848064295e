use std::path::PathBuf;

use crate::component::ComponentId;

/// Failure of a lifecycle operation on a single component
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("component {0} does not exist")]
    Missing(ComponentId),
    /// The component is already running one of its own hooks
    #[error("component {0} is busy")]
    Busy(ComponentId),
    #[error("component {id} is not a {expected}")]
    WrongType {
        id: ComponentId,
        expected: &'static str,
    },
    #[error("{hook} failed: {error:#}")]
    Hook {
        hook: &'static str,
        error: anyhow::Error,
    },
    #[error("{hook} panicked: {message}")]
    Panicked { hook: &'static str, message: String },
    #[error("a stage transition was requested but no stages are configured")]
    NoStages,
}

impl LifecycleError {
    /// Full detail for verbose logging
    pub fn detail(&self) -> String {
        match self {
            LifecycleError::Hook { hook, error } => format!("{} failed: {:?}", hook, error),
            other => format!("{:?}", other),
        }
    }
}

/// Error produced while building a module from configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ModuleParseError {
    /// Module being parsed, when known
    pub module: Option<String>,
    pub message: String,
}

impl ModuleParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            module: None,
            message: message.into(),
        }
    }

    /// Attach the module name unless one is already set
    pub fn in_module(mut self, module: &str) -> Self {
        if self.module.is_none() {
            self.module = Some(module.to_string());
        }
        self
    }

    /// Fail with `message` unless `condition` holds
    pub fn require(condition: bool, message: impl Into<String>) -> Result<(), Self> {
        if condition {
            Ok(())
        } else {
            Err(Self::new(message))
        }
    }

    pub fn require_some<T>(value: Option<T>, message: impl Into<String>) -> Result<T, Self> {
        value.ok_or_else(|| Self::new(message))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationParseError {
    pub input: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TickFieldError {
    #[error("counter overflow: {value} by {amount}")]
    Overflow { value: i32, amount: i32 },
}

/// Failure to add an entry to one of the session registries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} with id '{id}' already exists")]
    Duplicate { kind: &'static str, id: String },
    #[error("no {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },
    /// The registry module is running one of its own hooks
    #[error("the {0} registry is busy")]
    Unavailable(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}
