use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::component::Spawn;
use crate::error::ModuleParseError;

use super::{Module, ModuleId, ModuleManager, Registry};

/// Builds modules from configuration nodes into a manager.
///
/// A node is either a module name or a table with a single entry mapping the name to the
/// module's data. Failures are logged and the module is skipped; its siblings are still built.
pub struct ModuleLoader<'m> {
    manager: &'m mut ModuleManager,
    registry: Rc<Registry>,
    /// Modules being built, innermost last
    building: Vec<&'static str>,
    stage_scoped: bool,
}

impl<'m> ModuleLoader<'m> {
    pub fn new(manager: &'m mut ModuleManager) -> Self {
        let registry = manager.registry();
        Self {
            manager,
            registry,
            building: Vec::new(),
            stage_scoped: false,
        }
    }

    pub fn manager(&mut self) -> &mut ModuleManager {
        self.manager
    }

    /// Build every node, returning the modules that were created
    pub fn load_all(&mut self, nodes: &[toml::Value]) -> Vec<ModuleId> {
        let mut loaded = Vec::new();
        for node in nodes {
            match self.load_node(node) {
                Ok(Some(id)) => loaded.push(id),
                Ok(None) => {}
                Err(err) => self.report(&err),
            }
        }
        loaded
    }

    /// Build modules for a stage. They stay dormant until the stage is activated.
    pub fn load_stage_modules(&mut self, nodes: &[toml::Value]) -> Vec<ModuleId> {
        let previous = std::mem::replace(&mut self.stage_scoped, true);
        let loaded = self.load_all(nodes);
        self.stage_scoped = previous;
        loaded
    }

    /// Build one node. Returns `Ok(None)` for nodes that name no module.
    pub fn load_node(&mut self, node: &toml::Value) -> Result<Option<ModuleId>, ModuleParseError> {
        let (name, data) = match node {
            toml::Value::String(name) => (name.as_str(), empty_data()),
            toml::Value::Table(table) => {
                let mut entries = table.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, data)), None) => (name.as_str(), data.clone()),
                    _ => {
                        return Err(ModuleParseError::new(format!(
                            "a module table needs exactly one entry, found {}",
                            table.len()
                        )))
                    }
                }
            }
            other => {
                return Err(ModuleParseError::new(format!(
                    "expected a module name or table, found {}",
                    other.type_str()
                )))
            }
        };

        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        self.load_named(name, data).map(Some)
    }

    /// Build the module registered as `name` from `data`
    pub fn load_named(
        &mut self,
        name: &str,
        data: toml::Value,
    ) -> Result<ModuleId, ModuleParseError> {
        let modules = self.registry.modules();
        let (Some(info), Some(factory)) = (modules.info(name), modules.factory(name)) else {
            let suggestions = modules.suggestions(name);
            let message = if suggestions.is_empty() {
                format!("Unknown module '{}'.", name)
            } else {
                format!(
                    "Unknown module '{}'. Did you mean: {}",
                    name,
                    suggestions.join(", ")
                )
            };
            return Err(ModuleParseError::new(message));
        };

        if self.building.contains(&info.name) {
            let mut chain = self.building.clone();
            chain.push(info.name);
            return Err(
                ModuleParseError::new(format!("dependency cycle: {}", chain.join(" -> ")))
                    .in_module(info.name),
            );
        }

        self.building.push(info.name);
        let built = self
            .load_dependencies(info.depends)
            .and_then(|()| factory(data, self));
        self.building.pop();

        let id = built.map_err(|err| err.in_module(info.name))?;
        debug!(target: "modules", "Created module {} ({})", info.name, id);
        Ok(id)
    }

    /// Create declared dependencies that have no instance yet
    fn load_dependencies(&mut self, depends: &[&str]) -> Result<(), ModuleParseError> {
        for dependency in depends {
            if self.manager.find_module(dependency).is_some() {
                continue;
            }
            // Dependencies live outside any stage
            let previous = std::mem::replace(&mut self.stage_scoped, false);
            let built = self.load_named(dependency, empty_data());
            self.stage_scoped = previous;
            built?;
        }
        Ok(())
    }

    pub(crate) fn insert<M: Module + 'static>(&mut self, module: M) -> ModuleId {
        let spawn = Spawn::of(module, &self.registry);
        self.manager
            .insert_module(spawn, M::info(), self.stage_scoped)
    }

    fn report(&self, err: &ModuleParseError) {
        let module = err.module.as_deref().unwrap_or("<unknown>");
        if err.message.starts_with("Unknown module") && err.module.is_none() {
            warn!(target: "modules", "{}", err.message);
        } else if self.manager.debug_level() > 0 {
            error!(target: "modules", "Error loading Module {}: {:?}", module, err);
        } else {
            error!(target: "modules", "Error loading Module {}: {}", module, err.message);
        }
    }
}

fn empty_data() -> toml::Value {
    toml::Value::Table(toml::Table::new())
}
