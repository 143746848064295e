use crate::component::{Component, ComponentContext};
use crate::ticking::{TaskContext, TickSpec, TickTable, Tickable};

type Callback = Box<dyn FnMut(&mut TaskContext<'_>) -> anyhow::Result<()>>;

/// Counts down one step per tick and runs `on_end` when it reaches zero.
///
/// Start it by adding it as a subcomponent of a loaded component. Its tick task stops once the
/// countdown ends; loading it again starts over.
pub struct Countdown {
    initial: u32,
    remaining: u32,
    on_tick: Option<Callback>,
    on_end: Option<Callback>,
}

impl Countdown {
    /// A countdown of at least one tick
    pub fn new(ticks: u32) -> Self {
        let initial = ticks.max(1);
        Self {
            initial,
            remaining: initial,
            on_tick: None,
            on_end: None,
        }
    }

    pub fn on_tick<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.on_tick = Some(Box::new(f));
        self
    }

    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.on_end = Some(Box::new(f));
        self
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    fn tick(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        if let Some(on_tick) = self.on_tick.as_mut() {
            on_tick(ctx)?;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ctx.stop();
            if let Some(on_end) = self.on_end.as_mut() {
                on_end(ctx)?;
            }
        }
        Ok(())
    }
}

impl Tickable for Countdown {
    fn tick_methods() -> TickTable<Self> {
        TickTable::new().method("tick", TickSpec::every("1t"), Countdown::tick)
    }
}

impl Component for Countdown {
    fn on_load(&mut self, _ctx: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        self.remaining = self.initial;
        Ok(())
    }
}
