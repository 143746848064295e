use serde::Deserialize;
use skirmish_events::{StageChangeData, StageChangeReason};
use tracing::debug;

use crate::component::{Component, ComponentContext};
use crate::duration::parse_duration_ms;
use crate::error::ModuleParseError;
use crate::module::{FromModuleData, Module, ModuleInfo, ModuleLoader};
use crate::ticking::{TaskId, Tickable};

#[derive(Debug, Clone, Deserialize)]
pub struct StageTimerData {
    pub duration: String,
}

/// Moves to the next stage once it has been enabled for `duration`
#[derive(Debug)]
pub struct StageTimerModule {
    duration_ms: u64,
    task: Option<TaskId>,
}

impl StageTimerModule {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            task: None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl Tickable for StageTimerModule {}

impl Component for StageTimerModule {
    fn on_enable(&mut self, ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        let duration_ms = self.duration_ms;
        let task = ctx
            .new_task()
            .name("StageTimer")
            .delay_ms(duration_ms)
            .once()
            .run(move |task| {
                debug!(target: "stages", "Stage time limit of {}ms reached", duration_ms);
                task.manager()
                    .next_stage(StageChangeData::new(StageChangeReason::TimeLimit))?;
                Ok(())
            });
        self.task = Some(task);
        Ok(())
    }

    fn on_disable(&mut self, ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        if let Some(task) = self.task.take() {
            ctx.cancel_task(task);
        }
        Ok(())
    }
}

impl Module for StageTimerModule {
    fn info() -> ModuleInfo {
        ModuleInfo::new("StageTimer").data_type("StageTimerData")
    }
}

impl FromModuleData for StageTimerModule {
    type Data = StageTimerData;

    fn from_data(
        data: StageTimerData,
        _loader: &mut ModuleLoader<'_>,
    ) -> Result<Self, ModuleParseError> {
        let duration_ms = parse_duration_ms(&data.duration)
            .map_err(|err| ModuleParseError::new(err.to_string()))?;
        ModuleParseError::require(duration_ms > 0, "duration must be positive")?;
        Ok(Self::new(duration_ms))
    }
}
