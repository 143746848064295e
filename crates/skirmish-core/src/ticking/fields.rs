use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::error;

use crate::component::{Component, ComponentId};
use crate::error::TickFieldError;
use crate::module::{Module, ModuleInfo};

use super::methods::{TickSpec, TickTable, Tickable};

/// Declaration of an auto-ticking counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickField {
    /// Ticks between updates
    pub interval: u32,
    /// Add `amount` on each update instead of subtracting it
    pub increment: bool,
    /// Starting value, unless the field already holds one
    pub initial: i32,
    pub amount: i32,
}

impl Default for TickField {
    fn default() -> Self {
        Self {
            interval: 1,
            increment: false,
            initial: 0,
            amount: 1,
        }
    }
}

impl TickField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn increment(mut self, increment: bool) -> Self {
        self.increment = increment;
        self
    }

    pub fn initial(mut self, initial: i32) -> Self {
        self.initial = initial;
        self
    }

    pub fn amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }
}

/// A generated counter driving one tick field
#[derive(Debug)]
pub struct TickCounter {
    value: Cell<i32>,
    next_update: Cell<u32>,
    reset_value: i32,
    spec: TickField,
}

impl TickCounter {
    fn new(spec: TickField, preset: Option<i32>) -> Self {
        let reset_value = preset.unwrap_or(spec.initial);
        Self {
            value: Cell::new(reset_value),
            next_update: Cell::new(spec.interval.max(1)),
            reset_value,
            spec,
        }
    }

    pub fn get(&self) -> i32 {
        self.value.get()
    }

    pub fn set(&self, value: i32) {
        self.value.set(value);
    }

    pub fn spec(&self) -> TickField {
        self.spec
    }

    /// Count down one tick and apply the step when the countdown runs out.
    ///
    /// Decrementing counters go back to their starting value instead of going negative.
    pub fn update(&self) -> Result<(), TickFieldError> {
        let remaining = self.next_update.get().saturating_sub(1);
        if remaining > 0 {
            self.next_update.set(remaining);
            return Ok(());
        }
        self.next_update.set(self.spec.interval.max(1));

        let value = self.value.get();
        let overflow = TickFieldError::Overflow {
            value,
            amount: self.spec.amount,
        };
        let next = if self.spec.increment {
            value.checked_add(self.spec.amount).ok_or(overflow)?
        } else {
            match value.checked_sub(self.spec.amount).ok_or(overflow)? {
                next if next < 0 => self.reset_value,
                next => next,
            }
        };
        self.value.set(next);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum AutoIntValue {
    Plain(Option<i32>),
    Bound(Rc<TickCounter>),
}

/// Integer field that becomes an auto-ticking counter when its component loads.
///
/// Before binding it behaves as a plain integer. A value set before binding becomes the
/// counter's starting value.
#[derive(Debug, Clone)]
pub struct AutoInt(AutoIntValue);

impl AutoInt {
    pub fn new() -> Self {
        Self(AutoIntValue::Plain(None))
    }

    pub fn with_value(value: i32) -> Self {
        Self(AutoIntValue::Plain(Some(value)))
    }

    pub fn get(&self) -> i32 {
        match &self.0 {
            AutoIntValue::Plain(value) => value.unwrap_or(0),
            AutoIntValue::Bound(counter) => counter.get(),
        }
    }

    pub fn set(&mut self, value: i32) {
        match &mut self.0 {
            AutoIntValue::Plain(slot) => *slot = Some(value),
            AutoIntValue::Bound(counter) => counter.set(value),
        }
    }

    pub fn add(&mut self, amount: i32) -> i32 {
        let value = self.get().saturating_add(amount);
        self.set(value);
        value
    }

    pub fn subtract(&mut self, amount: i32) -> i32 {
        let value = self.get().saturating_sub(amount);
        self.set(value);
        value
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.0, AutoIntValue::Bound(_))
    }

    pub(crate) fn bind(&mut self, spec: TickField) -> Rc<TickCounter> {
        match &self.0 {
            AutoIntValue::Bound(counter) => Rc::clone(counter),
            AutoIntValue::Plain(preset) => {
                let counter = Rc::new(TickCounter::new(spec, *preset));
                self.0 = AutoIntValue::Bound(Rc::clone(&counter));
                counter
            }
        }
    }
}

impl Default for AutoInt {
    fn default() -> Self {
        Self::new()
    }
}

/// A tick field exposed by a [`Tickable`]
pub struct TickFieldSlot<'a> {
    pub name: &'static str,
    pub field: &'a mut AutoInt,
    pub spec: TickField,
}

impl<'a> TickFieldSlot<'a> {
    pub fn new(name: &'static str, field: &'a mut AutoInt, spec: TickField) -> Self {
        Self { name, field, spec }
    }
}

pub(crate) struct TrackedCounter {
    pub owner: ComponentId,
    /// Address of the tickable object the field lives on, if it is not the component itself
    pub source: Option<usize>,
    pub name: &'static str,
    pub counter: Rc<TickCounter>,
}

/// Bind a field to a fresh counter and track it for `owner`
pub(crate) fn track_field(
    owner: ComponentId,
    source: Option<usize>,
    slot: TickFieldSlot<'_>,
) -> TrackedCounter {
    TrackedCounter {
        owner,
        source,
        name: slot.name,
        counter: slot.field.bind(slot.spec),
    }
}

/// Every bound counter in a session, shared between the manager and the holder
pub(crate) type FieldCounters = Rc<RefCell<Vec<TrackedCounter>>>;

/// Internal module that updates every tick field of the session from one per-tick task
pub struct TickFieldHolder {
    counters: FieldCounters,
}

impl TickFieldHolder {
    pub(crate) fn new(counters: FieldCounters) -> Self {
        Self { counters }
    }

    pub fn len(&self) -> usize {
        self.counters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.borrow().is_empty()
    }

    /// Update all counters whose owner is accepted by `is_live`
    pub(crate) fn update(&self, is_live: impl Fn(ComponentId) -> bool) {
        for tracked in self.counters.borrow().iter() {
            if !is_live(tracked.owner) {
                continue;
            }
            if let Err(err) = tracked.counter.update() {
                error!(target: "ticking",
                    "Failed to update tick field {} of {}: {}",
                    tracked.name,
                    tracked.owner,
                    err
                );
            }
        }
    }
}

impl Tickable for TickFieldHolder {
    fn tick_methods() -> TickTable<Self> {
        TickTable::new().method(
            "update_fields",
            TickSpec::every("1t"),
            |holder: &mut TickFieldHolder, ctx| {
                let manager = ctx.manager();
                holder.update(|owner| {
                    manager.state_of(owner).is_some_and(|state| state.is_loaded())
                });
                Ok(())
            },
        )
    }
}

impl Component for TickFieldHolder {}

impl Module for TickFieldHolder {
    fn info() -> ModuleInfo {
        ModuleInfo::internal("TickFieldHolder")
    }
}
