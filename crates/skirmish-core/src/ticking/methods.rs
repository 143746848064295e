use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use crate::component::AsAny;
use crate::duration::{ms_to_ticks, parse_duration_ms};
use crate::error::DurationParseError;

use super::fields::TickFieldSlot;
use super::scheduler::{AsyncJob, TaskContext};

/// An object with declared tick methods and tick fields.
///
/// Registering a tickable with a component expands its tick methods into tasks owned by that
/// component. Every component is registered as its own tickable.
pub trait Tickable: AsAny {
    fn tick_methods() -> TickTable<Self>
    where
        Self: Sized + 'static,
    {
        TickTable::new()
    }

    /// Counter fields to be driven by the session's tick field holder
    fn tick_fields(&mut self) -> Vec<TickFieldSlot<'_>> {
        Vec::new()
    }
}

/// Timing of a tick method.
///
/// Both values are durations (`"500ms"`, `"1s"`) or tick counts (`"3t"`). An interval that is
/// empty or negative makes the method run once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSpec {
    pub delay: &'static str,
    pub interval: &'static str,
}

impl TickSpec {
    pub const fn every(interval: &'static str) -> Self {
        Self {
            delay: "0",
            interval,
        }
    }

    pub const fn once_after(delay: &'static str) -> Self {
        Self {
            delay,
            interval: "-1",
        }
    }

    pub const fn delay(mut self, delay: &'static str) -> Self {
        self.delay = delay;
        self
    }
}

type MainMethod<T> = Rc<dyn Fn(&mut T, &mut TaskContext<'_>) -> anyhow::Result<()>>;
type OffloadMethod<T> = Rc<dyn Fn(&mut T) -> AsyncJob>;

enum MethodKind<T> {
    Main(MainMethod<T>),
    /// Prepares a job on the main thread that then runs off it
    Offload(OffloadMethod<T>),
}

struct TickMethod<T> {
    name: &'static str,
    spec: TickSpec,
    kind: MethodKind<T>,
}

/// Declared tick methods of a type.
///
/// Methods are identified by name. Declaring a name twice keeps the last declaration, and
/// [`inherit`](Self::inherit) never replaces a name the table already has, so a type's own
/// declarations always override the ones it pulls in.
pub struct TickTable<T> {
    entries: Vec<TickMethod<T>>,
}

impl<T: 'static> TickTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn method<F>(mut self, name: &'static str, spec: TickSpec, f: F) -> Self
    where
        F: Fn(&mut T, &mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.entries.retain(|entry| entry.name != name);
        self.entries.push(TickMethod {
            name,
            spec,
            kind: MethodKind::Main(main_method(f)),
        });
        self
    }

    /// Declare a method whose work runs off the main thread.
    ///
    /// `prepare` runs on the main thread and returns the job to run elsewhere. The job can only
    /// hand results back through [`AsyncContext::post`](super::AsyncContext::post).
    pub fn offload<F>(mut self, name: &'static str, spec: TickSpec, prepare: F) -> Self
    where
        F: Fn(&mut T) -> AsyncJob + 'static,
    {
        self.entries.retain(|entry| entry.name != name);
        self.entries.push(TickMethod {
            name,
            spec,
            kind: MethodKind::Offload(offload_method(prepare)),
        });
        self
    }

    /// Pull in the tick methods of an embedded `P`, reached through `project`
    pub fn inherit<P: Tickable + 'static>(mut self, project: fn(&mut T) -> &mut P) -> Self {
        for parent in P::tick_methods().entries {
            if self.contains(parent.name) {
                continue;
            }
            let kind = match parent.kind {
                MethodKind::Main(f) => MethodKind::Main(main_method(
                    move |target: &mut T, ctx: &mut TaskContext<'_>| f(project(target), ctx),
                )),
                MethodKind::Offload(f) => {
                    MethodKind::Offload(offload_method(move |target: &mut T| f(project(target))))
                }
            };
            self.entries.push(TickMethod {
                name: parent.name,
                spec: parent.spec,
                kind,
            });
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn spec(&self, name: &str) -> Option<TickSpec> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: 'static> Default for TickTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn main_method<T: 'static, F>(f: F) -> MainMethod<T>
where
    F: Fn(&mut T, &mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

fn offload_method<T: 'static, F>(f: F) -> OffloadMethod<T>
where
    F: Fn(&mut T) -> AsyncJob + 'static,
{
    Rc::new(f)
}

/// A tick amount before conversion to scheduler ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickAmount {
    Ticks(u64),
    Millis(u64),
}

impl TickAmount {
    pub fn parse(text: &str) -> Result<Self, DurationParseError> {
        let text = text.trim();
        if let Some(count) = text.strip_suffix('t') {
            if !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()) {
                return count.parse().map(TickAmount::Ticks).map_err(|_| {
                    DurationParseError {
                        input: text.to_string(),
                        reason: "number out of range",
                    }
                });
            }
        }
        parse_duration_ms(text).map(TickAmount::Millis)
    }

    /// `None` means run once
    pub fn parse_repeat(text: &str) -> Result<Option<Self>, DurationParseError> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('-') {
            Ok(None)
        } else {
            Self::parse(text).map(Some)
        }
    }

    pub fn to_ticks(self, ticks_per_second: u32) -> u64 {
        match self {
            TickAmount::Ticks(ticks) => ticks,
            TickAmount::Millis(ms) => ms_to_ticks(ms, ticks_per_second),
        }
    }
}

type ErasedMain = Rc<dyn Fn(&mut dyn Any, &mut TaskContext<'_>) -> Option<anyhow::Result<()>>>;
type ErasedOffload = Rc<dyn Fn(&mut dyn Any) -> Option<AsyncJob>>;

/// A tick method with its target type erased. Returns `None` when handed the wrong type.
#[derive(Clone)]
pub(crate) enum TickAction {
    Main(ErasedMain),
    Offload(ErasedOffload),
}

impl TickAction {
    pub fn is_async(&self) -> bool {
        matches!(self, TickAction::Offload(_))
    }
}

pub(crate) struct TickDescriptor {
    pub name: &'static str,
    pub delay: TickAmount,
    /// `None` for one-shot methods
    pub repeat: Option<TickAmount>,
    pub action: TickAction,
}

fn erase<T: 'static>(kind: MethodKind<T>) -> TickAction {
    match kind {
        MethodKind::Main(f) => TickAction::Main(erased_main(
            move |target: &mut dyn Any, ctx: &mut TaskContext<'_>| {
                target.downcast_mut::<T>().map(|target| f(target, ctx))
            },
        )),
        MethodKind::Offload(f) => TickAction::Offload(erased_offload(
            move |target: &mut dyn Any| target.downcast_mut::<T>().map(|target| f(target)),
        )),
    }
}

fn erased_main<F>(f: F) -> ErasedMain
where
    F: Fn(&mut dyn Any, &mut TaskContext<'_>) -> Option<anyhow::Result<()>> + 'static,
{
    Rc::new(f)
}

fn erased_offload<F>(f: F) -> ErasedOffload
where
    F: Fn(&mut dyn Any) -> Option<AsyncJob> + 'static,
{
    Rc::new(f)
}

/// Tick descriptors per type, computed once on first use
#[derive(Default)]
pub(crate) struct TickMethodsCache {
    types: RefCell<HashMap<TypeId, Rc<[TickDescriptor]>>>,
}

impl TickMethodsCache {
    pub fn get<T: Tickable + 'static>(&self) -> Rc<[TickDescriptor]> {
        if let Some(found) = self.types.borrow().get(&TypeId::of::<T>()) {
            return Rc::clone(found);
        }
        let descriptors: Rc<[TickDescriptor]> = Rc::from(Self::describe::<T>());
        self.types
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::clone(&descriptors));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    fn describe<T: Tickable + 'static>() -> Vec<TickDescriptor> {
        T::tick_methods()
            .entries
            .into_iter()
            .filter_map(|method| {
                match (
                    TickAmount::parse(method.spec.delay),
                    TickAmount::parse_repeat(method.spec.interval),
                ) {
                    (Ok(delay), Ok(repeat)) => Some(TickDescriptor {
                        name: method.name,
                        delay,
                        repeat,
                        action: erase(method.kind),
                    }),
                    (Err(err), _) | (_, Err(err)) => {
                        warn!(target: "ticking",
                            "Skipping tick method {}::{}: {}",
                            type_name::<T>(),
                            method.name,
                            err
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
