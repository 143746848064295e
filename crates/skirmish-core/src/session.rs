use std::rc::Rc;
use std::time::Instant;

use skirmish_events::SessionEvent;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::module::{ManagerOptions, ModuleLoader, ModuleManager, Registry};
use crate::state::ComponentState;

type StopCallback = Box<dyn FnOnce(&Session)>;

/// One running minigame: a module manager plus the loop that drives it.
///
/// Starting a session loads and enables its modules; stopping it disables and unloads them. A
/// session stops on its own when its stages complete.
pub struct Session {
    name: String,
    manager: ModuleManager,
    state: ComponentState,
    started: bool,
    paused: bool,
    started_at: Option<Instant>,
    played_ticks: u64,
    children: Vec<Session>,
    on_stop: Vec<StopCallback>,
}

impl Session {
    pub fn new(name: impl Into<String>, registry: Rc<Registry>, options: ManagerOptions) -> Self {
        Self::with_manager(name.into(), ModuleManager::new(registry, options))
    }

    /// Build a session and its modules from a session file
    pub fn from_config(config: &SessionConfig, registry: Rc<Registry>) -> Self {
        let mut session = Self::new(config.name.clone(), registry, config.manager_options());
        let created = ModuleLoader::new(&mut session.manager).load_all(&config.modules);
        debug!(target: "session", "{} created {} modules", session.name, created.len());
        session
    }

    fn with_manager(name: String, manager: ModuleManager) -> Self {
        Self {
            name,
            manager,
            state: ComponentState::Unloaded,
            started: false,
            paused: false,
            started_at: None,
            played_ticks: 0,
            children: Vec::new(),
            on_stop: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ModuleManager {
        &mut self.manager
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Paused sessions keep ticking but do not count played ticks
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn played_ticks(&self) -> u64 {
        self.played_ticks
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn children(&self) -> &[Session] {
        &self.children
    }

    /// Create a nested session sharing this session's registry. It is stopped with its parent.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut Session {
        let manager = self.manager.child(&self.name);
        self.children.push(Self::with_manager(name.into(), manager));
        let index = self.children.len() - 1;
        &mut self.children[index]
    }

    pub fn on_stop<F>(&mut self, f: F)
    where
        F: FnOnce(&Session) + 'static,
    {
        self.on_stop.push(Box::new(f));
    }

    pub fn load(&mut self) -> bool {
        if self.state != ComponentState::Unloaded {
            return false;
        }
        self.state = ComponentState::Loaded;
        debug!(target: "session", "Loading {}", self.name);
        let begin = Instant::now();

        self.fire(SessionEvent::SessionPreLoad {
            session: self.name.clone(),
        });
        self.manager.load();
        self.fire(SessionEvent::SessionLoaded {
            session: self.name.clone(),
        });
        debug!(target: "session", "{} loaded in {}ms", self.name, begin.elapsed().as_millis());
        true
    }

    /// Enable the modules. Listeners hear about it one tick later, once the session is running.
    pub fn enable(&mut self) -> bool {
        if self.state != ComponentState::Loaded {
            return false;
        }
        self.state = ComponentState::Enabled;
        debug!(target: "session", "Enabling {}", self.name);

        self.manager.enable();
        let session = self.name.clone();
        self.manager
            .new_task()
            .name("session-enabled")
            .delay_ticks(1)
            .run(move |ctx| {
                ctx.manager().fire(SessionEvent::SessionEnabled {
                    session: session.clone(),
                });
                Ok(())
            });
        true
    }

    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        if !self.state.is_loaded() {
            self.load();
        }
        if self.state != ComponentState::Enabled {
            self.enable();
        }
        self.started = true;
        self.started_at = Some(Instant::now());
        self.fire(SessionEvent::SessionStarted {
            session: self.name.clone(),
        });
        info!(target: "session", "Started {}", self.name);
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.started {
            return false;
        }
        self.started = false;
        let begin = Instant::now();

        for child in &mut self.children {
            child.stop();
        }
        self.children.clear();

        self.fire(SessionEvent::SessionStopped {
            session: self.name.clone(),
        });
        self.manager.disable();
        self.manager.unload();
        self.state = ComponentState::Unloaded;

        for callback in std::mem::take(&mut self.on_stop) {
            callback(self);
        }
        info!(target: "session",
            "Stopped {} after {} ticks in {}ms",
            self.name,
            self.played_ticks,
            begin.elapsed().as_millis()
        );
        true
    }

    /// Run one tick of this session and its children. Returns false once the session has stopped.
    pub fn tick(&mut self) -> bool {
        if !self.started {
            return false;
        }
        for child in &mut self.children {
            child.tick();
        }
        self.manager.tick();
        if !self.paused {
            self.played_ticks += 1;
        }

        if self.manager.take_stop_request() {
            debug!(target: "session", "{} requested to stop", self.name);
            self.stop();
        }
        self.started
    }

    fn fire(&mut self, event: SessionEvent) -> SessionEvent {
        self.manager.fire(event)
    }
}
