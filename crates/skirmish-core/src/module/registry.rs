use std::collections::BTreeMap;

use crate::error::ModuleParseError;
use crate::ticking::TickMethodsCache;

use super::{FromModuleData, ModuleId, ModuleInfo, ModuleLoader};

/// Builds a module from its configuration data and places it in the loader's manager
pub type ModuleFactory =
    fn(toml::Value, &mut ModuleLoader<'_>) -> Result<ModuleId, ModuleParseError>;

#[derive(Clone, Copy)]
struct Registration {
    info: ModuleInfo,
    factory: ModuleFactory,
}

/// Module types known by name, for building modules from configuration
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Registration>,
}

impl ModuleRegistry {
    /// Register `M` under its configured name. Names are case-insensitive; returns false if the
    /// name is taken.
    pub fn register<M: FromModuleData + 'static>(&mut self) -> bool {
        let info = M::info();
        let key = info.name.to_lowercase();
        if self.modules.contains_key(&key) {
            return false;
        }
        self.modules.insert(
            key,
            Registration {
                info,
                factory: build::<M>,
            },
        );
        true
    }

    pub fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.modules
            .get(&name.to_lowercase())
            .map(|registration| registration.info)
    }

    pub fn factory(&self, name: &str) -> Option<ModuleFactory> {
        self.modules
            .get(&name.to_lowercase())
            .map(|registration| registration.factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(&name.to_lowercase())
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> Vec<&'static str> {
        self.modules
            .values()
            .map(|registration| registration.info.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered names that look like a misspelling of `name`
    pub fn suggestions(&self, name: &str) -> Vec<&'static str> {
        let wanted = name.to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.modules
            .iter()
            .filter(|(key, _)| {
                let shared_prefix = wanted.len() >= 3
                    && (key.starts_with(wanted.as_str()) || wanted.starts_with(key.as_str()));
                shared_prefix || edit_distance(key, &wanted) <= 2
            })
            .map(|(_, registration)| registration.info.name)
            .collect()
    }
}

fn build<M: FromModuleData + 'static>(
    data: toml::Value,
    loader: &mut ModuleLoader<'_>,
) -> Result<ModuleId, ModuleParseError> {
    let data: M::Data = data
        .try_into()
        .map_err(|err: toml::de::Error| ModuleParseError::new(err.message().to_string()))?;
    let module = M::from_data(data, loader)?;
    Ok(loader.insert(module))
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }
    previous[b.len()]
}

/// Everything a session needs to build modules: the module registry and the cache of declared
/// tick methods. Shared by a manager and all of its child managers.
#[derive(Default)]
pub struct Registry {
    modules: ModuleRegistry,
    pub(crate) tick_methods: TickMethodsCache,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in module registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register<M: FromModuleData + 'static>(&mut self) -> bool {
        self.modules.register::<M>()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }
}
