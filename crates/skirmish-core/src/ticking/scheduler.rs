use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use crate::component::{ComponentContext, ComponentId};
use crate::module::ModuleManager;

use super::methods::{TickAction, TickAmount, Tickable};

/// Unique identifier for a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// How often a task runs once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Runs once. A one-shot that has fired is never started again.
    Once,
    /// Runs every `n` ticks
    Every(u64),
}

/// Work queued for the main thread by an off-thread task
pub type MainThreadJob = Box<dyn FnOnce(&mut ModuleManager) + Send>;

/// Work that runs off the main thread
pub type AsyncJob = Box<dyn FnOnce(AsyncContext) -> anyhow::Result<()> + Send>;

type MainBody = Box<dyn FnMut(&mut TaskContext<'_>) -> anyhow::Result<()>>;
type AsyncBody = Arc<dyn Fn(AsyncContext) -> anyhow::Result<()> + Send + Sync>;

/// What a tick method runs against
#[derive(Clone)]
pub(crate) enum TickTarget {
    /// The behavior of a component in the arena
    Component(ComponentId),
    /// An object registered with [`ComponentContext::add_tickable`]
    Object(Rc<RefCell<dyn Tickable>>),
}

pub(crate) enum TaskBody {
    Main(MainBody),
    Async(AsyncBody),
    Tick {
        target: TickTarget,
        action: TickAction,
    },
}

struct Task {
    name: String,
    owner: Option<ComponentId>,
    delay: u64,
    repeat: Repeat,
    running: bool,
    next_run: u64,
    fired: bool,
    /// Taken out while the task runs
    body: Option<TaskBody>,
}

impl Task {
    fn is_spent(&self) -> bool {
        self.repeat == Repeat::Once && self.fired
    }
}

/// Tick-driven task scheduler for one session.
///
/// The scheduler only keeps the books. Tasks are run by [`ModuleManager::tick`], which hands each
/// task body the manager.
pub struct TickScheduler {
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
    current_tick: u64,
    ticks_per_second: u32,
    queue_tx: UnboundedSender<MainThreadJob>,
    queue_rx: UnboundedReceiver<MainThreadJob>,
}

impl TickScheduler {
    pub fn new(ticks_per_second: u32) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            tasks: BTreeMap::new(),
            next_id: 0,
            current_tick: 0,
            ticks_per_second: ticks_per_second.max(1),
            queue_tx,
            queue_rx,
        }
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub(crate) fn insert(
        &mut self,
        name: String,
        owner: Option<ComponentId>,
        delay: u64,
        repeat: Repeat,
        body: TaskBody,
    ) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            Task {
                name,
                owner,
                delay,
                repeat,
                running: false,
                next_run: 0,
                fired: false,
                body: Some(body),
            },
        );
        id
    }

    /// Start a task. Running tasks and spent one-shots are left alone.
    pub fn start(&mut self, id: TaskId) -> bool {
        let now = self.current_tick;
        match self.tasks.get_mut(&id) {
            Some(task) if !task.running && !task.is_spent() => {
                task.running = true;
                task.next_run = now + task.delay.max(1);
                true
            }
            _ => false,
        }
    }

    /// Stop a task. It will not fire again until started.
    pub fn stop(&mut self, id: TaskId) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) if task.running => {
                task.running = false;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|task| task.running)
    }

    pub fn has_fired(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|task| task.fired)
    }

    pub fn name(&self, id: TaskId) -> Option<&str> {
        self.tasks.get(&id).map(|task| task.name.as_str())
    }

    pub fn running_count(&self) -> usize {
        self.tasks.values().filter(|task| task.running).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Move to the next tick and list the tasks due on it
    pub(crate) fn advance(&mut self) -> Vec<TaskId> {
        self.current_tick += 1;
        let now = self.current_tick;
        self.tasks
            .iter()
            .filter(|(_, task)| task.running && task.next_run <= now)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Claim a due task's body and re-arm or retire it
    pub(crate) fn begin_run(
        &mut self,
        id: TaskId,
    ) -> Option<(TaskBody, String, Option<ComponentId>)> {
        let now = self.current_tick;
        let task = self.tasks.get_mut(&id)?;
        if !task.running || task.next_run > now {
            return None;
        }
        let body = task.body.take()?;
        task.fired = true;
        match task.repeat {
            Repeat::Once => task.running = false,
            Repeat::Every(interval) => task.next_run = now + interval.max(1),
        }
        Some((body, task.name.clone(), task.owner))
    }

    pub(crate) fn finish_run(&mut self, id: TaskId, body: TaskBody) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.body = Some(body);
        }
    }

    pub(crate) fn next_main_thread_job(&mut self) -> Option<MainThreadJob> {
        self.queue_rx.try_recv().ok()
    }

    pub fn async_context(&self, task: &str) -> AsyncContext {
        AsyncContext {
            task: task.to_string(),
            sender: self.queue_tx.clone(),
        }
    }
}

/// Handle given to task bodies running on the main thread
pub struct TaskContext<'a> {
    manager: &'a mut ModuleManager,
    task: TaskId,
    owner: Option<ComponentId>,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        manager: &'a mut ModuleManager,
        task: TaskId,
        owner: Option<ComponentId>,
    ) -> Self {
        Self {
            manager,
            task,
            owner,
        }
    }

    pub fn manager(&mut self) -> &mut ModuleManager {
        self.manager
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn owner(&self) -> Option<ComponentId> {
        self.owner
    }

    pub fn current_tick(&self) -> u64 {
        self.manager.scheduler().current_tick()
    }

    /// Stop this task after the current run
    pub fn stop(&mut self) {
        self.manager.scheduler_mut().stop(self.task);
    }

    /// Context of the owning component, for tasks that need to change it
    pub fn component(&mut self) -> Option<ComponentContext<'_>> {
        let owner = self.owner?;
        Some(ComponentContext::new(self.manager, owner))
    }
}

/// Handle given to off-thread work. It cannot touch session state directly; results go back
/// through [`post`](Self::post) and are applied at the start of the next tick.
#[derive(Clone)]
pub struct AsyncContext {
    task: String,
    sender: UnboundedSender<MainThreadJob>,
}

impl AsyncContext {
    pub fn task_name(&self) -> &str {
        &self.task
    }

    /// Queue `job` to run on the main thread. Returns false if the session is gone.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut ModuleManager) + Send + 'static,
    {
        self.sender.send(Box::new(job)).is_ok()
    }
}

/// Run `job` on the tokio blocking pool when a runtime is available, otherwise on a new thread
pub(crate) fn spawn_offthread(name: String, job: AsyncJob, context: AsyncContext) {
    let work = move || {
        debug!(target: "ticking", "Running async task {}", name);
        if let Err(err) = job(context) {
            error!(target: "ticking", "Async task {} failed: {:#}", name, err);
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => drop(handle.spawn_blocking(work)),
        Err(_) => drop(std::thread::spawn(work)),
    }
}

/// Builder for tasks. Obtained from [`ComponentContext::new_task`] or
/// [`ModuleManager::new_task`].
pub struct TaskBuilder<'a> {
    manager: &'a mut ModuleManager,
    owner: Option<ComponentId>,
    name: String,
    delay: TickAmount,
    repeat: Option<TickAmount>,
}

impl<'a> TaskBuilder<'a> {
    pub(crate) fn new(manager: &'a mut ModuleManager, owner: Option<ComponentId>) -> Self {
        Self {
            manager,
            owner,
            name: "task".to_string(),
            delay: TickAmount::Ticks(0),
            repeat: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = TickAmount::Millis(ms);
        self
    }

    pub fn delay_ticks(mut self, ticks: u64) -> Self {
        self.delay = TickAmount::Ticks(ticks);
        self
    }

    pub fn every_ms(mut self, ms: u64) -> Self {
        self.repeat = Some(TickAmount::Millis(ms));
        self
    }

    pub fn every_ticks(mut self, ticks: u64) -> Self {
        self.repeat = Some(TickAmount::Ticks(ticks));
        self
    }

    /// Run once (the default)
    pub fn once(mut self) -> Self {
        self.repeat = None;
        self
    }

    /// Schedule `f` on the main thread
    pub fn run<F>(self, f: F) -> TaskId
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.build(TaskBody::Main(Box::new(f)))
    }

    /// Schedule `f` off the main thread
    pub fn run_async<F>(self, f: F) -> TaskId
    where
        F: Fn(AsyncContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.build(TaskBody::Async(Arc::new(f)))
    }

    fn build(self, body: TaskBody) -> TaskId {
        let tps = self.manager.scheduler().ticks_per_second();
        let delay = self.delay.to_ticks(tps);
        let repeat = match self.repeat {
            Some(interval) => Repeat::Every(interval.to_ticks(tps)),
            None => Repeat::Once,
        };
        self.manager
            .adopt_task(self.owner, self.name, delay, repeat, body)
    }
}
