use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Why a stage transition was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum StageChangeReason {
    /// First transition after the stage manager loads
    StagesStart,
    /// An objective in the current stage was met
    ObjectiveSuccess,
    /// An objective in the current stage can no longer be met
    ObjectiveFailed,
    /// A stage time limit ran out
    TimeLimit,
    /// Some module asked for the transition
    ModuleTriggered,
    /// The session is shutting down
    Shutdown,
    Unknown,
}

/// Reason plus arbitrary typed payload attached by whoever requested the change.
///
/// Payloads are keyed by their type, so each type can be attached at most once.
#[derive(Clone)]
pub struct StageChangeData {
    pub reason: StageChangeReason,
    custom: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl StageChangeData {
    pub fn new(reason: StageChangeReason) -> Self {
        Self {
            reason,
            custom: HashMap::new(),
        }
    }

    /// Attach a payload. Returns false if a payload of this type is already present.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) -> bool {
        let key = TypeId::of::<T>();
        if self.custom.contains_key(&key) {
            return false;
        }
        self.custom.insert(key, Arc::new(value));
        true
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.put(value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.custom.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> bool {
        self.custom.remove(&TypeId::of::<T>()).is_some()
    }
}

impl From<StageChangeReason> for StageChangeData {
    fn from(reason: StageChangeReason) -> Self {
        Self::new(reason)
    }
}

impl fmt::Debug for StageChangeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageChangeData")
            .field("reason", &self.reason)
            .field("custom", &self.custom.len())
            .finish()
    }
}

/// Identity of a stage as seen by listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Position of the stage in the configured order
    pub index: usize,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Winner(&'static str);

    #[test]
    fn test_custom_payload_is_keyed_by_type() {
        let mut data = StageChangeData::new(StageChangeReason::ObjectiveSuccess);
        assert!(data.put(Winner("red")));
        assert!(!data.put(Winner("blue")));
        assert_eq!(data.get::<Winner>(), Some(&Winner("red")));
        assert!(data.get::<u32>().is_none());
    }

    #[test]
    fn test_remove_payload() {
        let mut data = StageChangeData::new(StageChangeReason::Unknown).with(7u32);
        assert!(data.contains::<u32>());
        assert!(data.remove::<u32>());
        assert!(!data.remove::<u32>());
    }

    #[test]
    fn test_clone_shares_payload() {
        let data = StageChangeData::new(StageChangeReason::TimeLimit).with(Winner("red"));
        let copy = data.clone();
        assert_eq!(copy.reason, StageChangeReason::TimeLimit);
        assert_eq!(copy.get::<Winner>(), Some(&Winner("red")));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(StageChangeReason::TimeLimit.to_string(), "TimeLimit");
    }
}
