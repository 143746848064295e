/// Lifecycle state of a component. Ordered by maturity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display,
)]
pub enum ComponentState {
    #[default]
    Unloaded,
    Loaded,
    Enabled,
}

impl ComponentState {
    /// True once the component has been loaded (it may also be enabled)
    pub fn is_loaded(self) -> bool {
        self >= ComponentState::Loaded
    }
}

/// One step of the lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Load,
    Unload,
    Enable,
    Disable,
}

impl Transition {
    /// The only state this transition may start from
    pub fn source(self) -> ComponentState {
        match self {
            Transition::Load => ComponentState::Unloaded,
            Transition::Unload | Transition::Enable => ComponentState::Loaded,
            Transition::Disable => ComponentState::Enabled,
        }
    }

    pub fn target(self) -> ComponentState {
        match self {
            Transition::Unload => ComponentState::Unloaded,
            Transition::Load | Transition::Disable => ComponentState::Loaded,
            Transition::Enable => ComponentState::Enabled,
        }
    }

    /// The state reached by applying this transition to `state`, if it is valid
    pub fn apply(self, state: ComponentState) -> Option<ComponentState> {
        (state == self.source()).then_some(self.target())
    }

    pub fn verb(self) -> &'static str {
        match self {
            Transition::Load => "loading",
            Transition::Unload => "unloading",
            Transition::Enable => "enabling",
            Transition::Disable => "disabling",
        }
    }

    pub fn hook(self) -> &'static str {
        match self {
            Transition::Load => "on_load",
            Transition::Unload => "on_unload",
            Transition::Enable => "on_enable",
            Transition::Disable => "on_disable",
        }
    }
}
