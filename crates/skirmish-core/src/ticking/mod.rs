//! Tick scheduling: tasks, declared tick methods, and auto-ticking counter fields.

mod fields;
mod methods;
mod scheduler;

pub use fields::{AutoInt, TickCounter, TickField, TickFieldHolder, TickFieldSlot};
pub use methods::{TickSpec, TickTable, Tickable};
pub use scheduler::{
    AsyncContext, AsyncJob, MainThreadJob, Repeat, TaskBuilder, TaskContext, TaskId,
    TickScheduler,
};

pub(crate) use fields::{track_field, FieldCounters};
pub(crate) use methods::{TickAction, TickAmount, TickDescriptor, TickMethodsCache};
pub(crate) use scheduler::{spawn_offthread, TaskBody, TickTarget};
