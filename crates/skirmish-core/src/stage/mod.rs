//! Stages: ordered sets of modules that are active one at a time.

use std::rc::Rc;

use skirmish_events::{SessionEvent, StageChangeData, StageChangeReason, StageSnapshot};
use tracing::{debug, info};

use crate::component::{Component, ComponentContext};
use crate::error::LifecycleError;
use crate::module::{Module, ModuleId, ModuleInfo};
use crate::ticking::Tickable;

/// A named set of modules. Fixed once created.
#[derive(Debug)]
pub struct Stage {
    index: usize,
    name: String,
    manager: ModuleId,
    modules: Vec<ModuleId>,
}

impl Stage {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stage manager holding this stage
    pub fn manager(&self) -> ModuleId {
        self.manager
    }

    pub fn modules(&self) -> &[ModuleId] {
        &self.modules
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            index: self.index,
            name: self.name.clone(),
        }
    }
}

/// Internal module that owns the stages of a session and the cursor of the active one.
///
/// Activating a stage hands its modules to the manager as children of the stage manager, and
/// deactivating it takes them back, so stage modules follow the normal submodule rules.
#[derive(Debug, Default)]
pub struct StageManager {
    stages: Vec<Rc<Stage>>,
    current: Option<Rc<Stage>>,
    cursor: Option<usize>,
}

impl StageManager {
    pub(crate) fn add_stage(&mut self, manager: ModuleId, name: String, modules: Vec<ModuleId>) {
        let index = self.stages.len();
        self.stages.push(Rc::new(Stage {
            index,
            name,
            manager,
            modules,
        }));
    }

    pub fn stages(&self) -> &[Rc<Stage>] {
        &self.stages
    }

    pub fn current_stage(&self) -> Option<&Rc<Stage>> {
        self.current.as_ref()
    }

    pub fn current_snapshot(&self) -> Option<StageSnapshot> {
        self.current.as_deref().map(Stage::snapshot)
    }

    /// Index of the active stage, or -1 when none is active
    pub fn stage_index(&self) -> isize {
        self.cursor.map_or(-1, |cursor| cursor as isize)
    }

    /// Move to the next stage.
    ///
    /// When the last stage is active this completes the stages instead: listeners are told,
    /// the cursor goes back before the first stage and the session is asked to stop. Returns
    /// false when the transition was cancelled or was a no-op.
    pub fn next_stage(
        &mut self,
        change: StageChangeData,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<bool, LifecycleError> {
        if self.stages.is_empty() {
            return Err(LifecycleError::NoStages);
        }

        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        if next >= self.stages.len() {
            self.complete(change, ctx);
            return Ok(true);
        }
        Ok(self.set_current_stage(Some(next), change, ctx))
    }

    /// Make the stage at `index` current, or deactivate all stages with `None`.
    ///
    /// Listeners may cancel the change, in which case nothing is touched. An index past the last
    /// stage is rejected.
    pub fn set_current_stage(
        &mut self,
        index: Option<usize>,
        change: StageChangeData,
        ctx: &mut ComponentContext<'_>,
    ) -> bool {
        let new_stage = match index {
            Some(index) => match self.stages.get(index) {
                Some(stage) => Some(Rc::clone(stage)),
                None => {
                    debug!(target: "stages", "No stage at index {}", index);
                    return false;
                }
            },
            None => None,
        };
        let unchanged = match (&self.current, &new_stage) {
            (None, None) => true,
            (Some(current), Some(new)) => Rc::ptr_eq(current, new),
            _ => false,
        };
        if unchanged {
            return false;
        }

        let event = ctx.fire(SessionEvent::PreStageChange {
            change: change.clone(),
            new_stage: new_stage.as_deref().map(Stage::snapshot),
            cancelled: false,
        });
        if event.is_cancelled() {
            debug!(target: "stages", "Stage change ({}) was cancelled", change.reason);
            return false;
        }

        let old_stage = self.swap_stage(new_stage, ctx);
        let new_snapshot = self.current_snapshot();
        if let Some(stage) = &new_snapshot {
            info!(target: "stages", "Stage {} '{}' started ({})", stage.index, stage.name, change.reason);
        }
        ctx.fire(SessionEvent::StageChanged {
            change,
            old_stage,
            new_stage: new_snapshot,
        });
        true
    }

    fn complete(&mut self, change: StageChangeData, ctx: &mut ComponentContext<'_>) {
        let last_stage = self.current_snapshot();
        info!(target: "stages", "All stages complete ({})", change.reason);
        ctx.fire(SessionEvent::StagesComplete {
            change: change.clone(),
            last_stage,
        });

        let old_stage = self.swap_stage(None, ctx);
        ctx.fire(SessionEvent::StageChanged {
            change,
            old_stage,
            new_stage: None,
        });
        ctx.manager().request_stop();
    }

    /// Deactivate the current stage's modules and activate the new stage's
    fn swap_stage(
        &mut self,
        new_stage: Option<Rc<Stage>>,
        ctx: &mut ComponentContext<'_>,
    ) -> Option<StageSnapshot> {
        let old_stage = self.current.take();
        if let Some(old) = &old_stage {
            for module in old.modules() {
                ctx.remove_submodule(*module);
            }
        }

        self.cursor = new_stage.as_ref().map(|stage| stage.index);
        self.current = new_stage;
        if let Some(new) = self.current.clone() {
            for module in new.modules() {
                ctx.add_submodule(*module);
            }
        }
        old_stage.as_deref().map(Stage::snapshot)
    }
}

impl Tickable for StageManager {}

impl Component for StageManager {
    fn on_load(&mut self, ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        self.next_stage(StageChangeData::new(StageChangeReason::StagesStart), ctx)?;
        Ok(())
    }

    fn on_unload(&mut self, ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        self.swap_stage(None, ctx);
        Ok(())
    }
}

impl Module for StageManager {
    fn info() -> ModuleInfo {
        ModuleInfo::internal("StageManager")
    }
}
