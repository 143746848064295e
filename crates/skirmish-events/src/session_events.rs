use crate::stage_events::{StageChangeData, StageSnapshot};

/// Events fired on a session's event bus
#[derive(Debug, Clone)]
pub enum SessionEvent {
    // Session lifecycle
    SessionPreLoad { session: String },
    SessionLoaded { session: String },
    SessionEnabled { session: String },
    SessionStarted { session: String },
    SessionStopped { session: String },

    // Stage protocol
    /// Fired before a stage transition is applied. Cancelling it aborts the transition.
    PreStageChange {
        change: StageChangeData,
        new_stage: Option<StageSnapshot>,
        cancelled: bool,
    },
    /// Fired after a stage transition was applied
    StageChanged {
        change: StageChangeData,
        old_stage: Option<StageSnapshot>,
        new_stage: Option<StageSnapshot>,
    },
    /// Fired when a transition is requested while the last stage is active
    StagesComplete {
        change: StageChangeData,
        last_stage: Option<StageSnapshot>,
    },
}

impl SessionEvent {
    /// Cancel the event. Only pre-change events can be cancelled; returns false otherwise.
    pub fn cancel(&mut self) -> bool {
        match self {
            SessionEvent::PreStageChange { cancelled, .. } => {
                *cancelled = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SessionEvent::PreStageChange {
                cancelled: true,
                ..
            }
        )
    }

    /// The stage change carried by stage events
    pub fn stage_change(&self) -> Option<&StageChangeData> {
        match self {
            SessionEvent::PreStageChange { change, .. }
            | SessionEvent::StageChanged { change, .. }
            | SessionEvent::StagesComplete { change, .. } => Some(change),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionPreLoad { .. } => "SessionPreLoad",
            SessionEvent::SessionLoaded { .. } => "SessionLoaded",
            SessionEvent::SessionEnabled { .. } => "SessionEnabled",
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::SessionStopped { .. } => "SessionStopped",
            SessionEvent::PreStageChange { .. } => "PreStageChange",
            SessionEvent::StageChanged { .. } => "StageChanged",
            SessionEvent::StagesComplete { .. } => "StagesComplete",
        }
    }
}
