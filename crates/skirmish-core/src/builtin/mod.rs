//! Modules and components shipped with the framework.

mod countdown;
mod dummy;
mod stage_timer;
mod stages_module;

pub use countdown::Countdown;
pub use dummy::DummyModule;
pub use stage_timer::{StageTimerData, StageTimerModule};
pub use stages_module::{StageConfig, StagesModule};

use crate::module::Registry;

pub fn register_builtins(registry: &mut Registry) {
    registry.register::<StagesModule>();
    registry.register::<StageTimerModule>();
    registry.register::<DummyModule>();
}
