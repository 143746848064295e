use tracing::info;

use crate::component::{Component, ComponentContext};
use crate::error::ModuleParseError;
use crate::module::{FromModuleData, Module, ModuleInfo, ModuleLoader, NoData};
use crate::ticking::{AutoInt, TickField, TickFieldSlot, TickSpec, TickTable, Tickable};

/// Example module exercising tick fields and tick methods. Not meant for real sessions.
#[derive(Debug, Default)]
pub struct DummyModule {
    /// Goes up by one every tick
    ticks: AutoInt,
    /// Subtracts -10 every tick, so it goes up by ten
    ticks2: AutoInt,
    reports: u32,
}

impl DummyModule {
    pub fn ticks(&self) -> i32 {
        self.ticks.get()
    }

    pub fn ticks2(&self) -> i32 {
        self.ticks2.get()
    }

    pub fn reports(&self) -> u32 {
        self.reports
    }

    fn display_ticks(&mut self) {
        self.reports += 1;
        info!(target: "modules", "ticks: {}, ticks2: {}", self.ticks.get(), self.ticks2.get());
    }
}

impl Tickable for DummyModule {
    fn tick_methods() -> TickTable<Self> {
        TickTable::new().method(
            "display_ticks",
            TickSpec::every("10s").delay("1s"),
            |dummy: &mut DummyModule, _| {
                dummy.display_ticks();
                Ok(())
            },
        )
    }

    fn tick_fields(&mut self) -> Vec<TickFieldSlot<'_>> {
        vec![
            TickFieldSlot::new("ticks", &mut self.ticks, TickField::new().increment(true)),
            TickFieldSlot::new("ticks2", &mut self.ticks2, TickField::new().amount(-10)),
        ]
    }
}

impl Component for DummyModule {
    fn on_load(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        info!(target: "modules", "Dummy loaded");
        self.display_ticks();
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        info!(target: "modules", "Dummy enabled");
        self.display_ticks();
        Ok(())
    }
}

impl Module for DummyModule {
    fn info() -> ModuleInfo {
        ModuleInfo::new("Dummy")
    }
}

impl FromModuleData for DummyModule {
    type Data = NoData;

    fn from_data(_data: NoData, _loader: &mut ModuleLoader<'_>) -> Result<Self, ModuleParseError> {
        Ok(Self::default())
    }
}
