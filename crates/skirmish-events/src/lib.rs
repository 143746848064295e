//! Event types shared between the skirmish core and its listeners
//!
//! Kept in a separate crate so listeners can be written without depending on the
//! module framework itself.

pub mod session_events;
pub mod stage_events;

pub use session_events::SessionEvent;
pub use stage_events::{StageChangeData, StageChangeReason, StageSnapshot};

// ============================================================================
// Subscriptions
// ============================================================================

/// Event filter for listener subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Subscribe to all events
    All,

    // Session lifecycle
    SessionPreLoad,
    SessionLoaded,
    SessionEnabled,
    SessionStarted,
    SessionStopped,

    // Stage protocol
    /// Any of the three stage events
    Stages,
    PreStageChange,
    StageChanged,
    StagesComplete,
}

impl EventFilter {
    /// Check if this filter matches the given event
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::SessionPreLoad => matches!(event, SessionEvent::SessionPreLoad { .. }),
            EventFilter::SessionLoaded => matches!(event, SessionEvent::SessionLoaded { .. }),
            EventFilter::SessionEnabled => matches!(event, SessionEvent::SessionEnabled { .. }),
            EventFilter::SessionStarted => matches!(event, SessionEvent::SessionStarted { .. }),
            EventFilter::SessionStopped => matches!(event, SessionEvent::SessionStopped { .. }),
            EventFilter::Stages => event.stage_change().is_some(),
            EventFilter::PreStageChange => matches!(event, SessionEvent::PreStageChange { .. }),
            EventFilter::StageChanged => matches!(event, SessionEvent::StageChanged { .. }),
            EventFilter::StagesComplete => matches!(event, SessionEvent::StagesComplete { .. }),
        }
    }
}

/// A listener that can be registered on a session's event bus.
///
/// Listeners receive events mutably so they can cancel cancellable events.
pub trait EventListener {
    /// Events this listener wants to receive
    fn subscribed_events(&self) -> &[EventFilter] {
        &[EventFilter::All]
    }

    fn on_event(&mut self, event: &mut SessionEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_changed() -> SessionEvent {
        SessionEvent::StageChanged {
            change: StageChangeData::new(StageChangeReason::StagesStart),
            old_stage: None,
            new_stage: Some(StageSnapshot {
                index: 0,
                name: "warmup".to_string(),
            }),
        }
    }

    #[test]
    fn test_filter_matches() {
        let event = stage_changed();
        assert!(EventFilter::All.matches(&event));
        assert!(EventFilter::Stages.matches(&event));
        assert!(EventFilter::StageChanged.matches(&event));
        assert!(!EventFilter::PreStageChange.matches(&event));
        assert!(!EventFilter::SessionLoaded.matches(&event));
    }

    #[test]
    fn test_only_pre_change_is_cancellable() {
        let mut changed = stage_changed();
        assert!(!changed.cancel());
        assert!(!changed.is_cancelled());

        let mut pre = SessionEvent::PreStageChange {
            change: StageChangeData::new(StageChangeReason::TimeLimit),
            new_stage: None,
            cancelled: false,
        };
        assert!(pre.cancel());
        assert!(pre.is_cancelled());
    }

    #[test]
    fn test_session_events_carry_no_stage_change() {
        let event = SessionEvent::SessionStarted {
            session: "demo".to_string(),
        };
        assert!(event.stage_change().is_none());
        assert!(!EventFilter::Stages.matches(&event));
        assert_eq!(event.name(), "SessionStarted");
    }
}
