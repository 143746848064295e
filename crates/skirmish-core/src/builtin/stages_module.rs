use serde::Deserialize;

use crate::component::Component;
use crate::error::ModuleParseError;
use crate::module::{FromModuleData, Module, ModuleInfo, ModuleLoader};
use crate::ticking::Tickable;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub name: String,
    /// Module nodes, in the same form as the session's top-level modules
    #[serde(default)]
    pub modules: Vec<toml::Value>,
}

/// Declares the session's stages. Each stage's modules are built here and stay dormant until
/// the stage manager activates the stage.
#[derive(Debug, Default)]
pub struct StagesModule {
    stages: Vec<String>,
}

impl StagesModule {
    pub fn stage_names(&self) -> &[String] {
        &self.stages
    }
}

impl Tickable for StagesModule {}
impl Component for StagesModule {}

impl Module for StagesModule {
    fn info() -> ModuleInfo {
        ModuleInfo::new("Stages").data_type("StageConfig")
    }
}

impl FromModuleData for StagesModule {
    type Data = Vec<StageConfig>;

    fn from_data(
        data: Vec<StageConfig>,
        loader: &mut ModuleLoader<'_>,
    ) -> Result<Self, ModuleParseError> {
        ModuleParseError::require(!data.is_empty(), "at least one stage is required")?;

        let mut stages = Vec::with_capacity(data.len());
        for stage in data {
            let modules = loader.load_stage_modules(&stage.modules);
            loader.manager().add_stage(stage.name.clone(), modules);
            stages.push(stage.name);
        }
        Ok(Self { stages })
    }
}
