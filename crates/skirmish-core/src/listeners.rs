use skirmish_events::{EventFilter, EventListener, SessionEvent};
use tracing::{debug, info};

/// Logs every session event under the `events` target
#[derive(Debug, Default)]
pub struct LoggingListener {
    seen: usize,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events logged so far
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl EventListener for LoggingListener {
    fn subscribed_events(&self) -> &[EventFilter] {
        &[EventFilter::All]
    }

    fn on_event(&mut self, event: &mut SessionEvent) {
        self.seen += 1;
        let name = event.name();
        match &*event {
            SessionEvent::SessionPreLoad { session }
            | SessionEvent::SessionLoaded { session }
            | SessionEvent::SessionEnabled { session }
            | SessionEvent::SessionStarted { session }
            | SessionEvent::SessionStopped { session } => {
                info!(target: "events", "{} {}", name, session)
            }
            SessionEvent::PreStageChange { change, new_stage, .. } => {
                debug!(target: "events",
                    "PreStageChange to {:?} ({})",
                    new_stage.as_ref().map(|stage| stage.name.as_str()),
                    change.reason
                )
            }
            SessionEvent::StageChanged {
                change,
                old_stage,
                new_stage,
            } => info!(target: "events",
                "StageChanged {:?} -> {:?} ({})",
                old_stage.as_ref().map(|stage| stage.name.as_str()),
                new_stage.as_ref().map(|stage| stage.name.as_str()),
                change.reason
            ),
            SessionEvent::StagesComplete { change, last_stage } => info!(target: "events",
                "StagesComplete after {:?} ({})",
                last_stage.as_ref().map(|stage| stage.name.as_str()),
                change.reason
            ),
        }
    }
}
