//! Substrate notifications for newly created definitions.
//!
//! Tracing and profiling backends learn about a definition the first time it
//! is created in the local manager. Duplicates are never reported.

use crate::definitions::HandleType;
use crate::types::AnyHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Receiver of "new definition" events.
pub trait SubstrateNotifier: Send + Sync {
    /// Called once per newly created, substrate-aware definition.
    ///
    /// Called after the definitions lock has been released, so
    /// implementations may create further definitions.
    fn new_definition_handle(&self, handle: AnyHandle, kind: HandleType);
}

/// A recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedDefinition {
    /// The new local handle.
    pub handle: AnyHandle,
    /// Its kind.
    pub kind: HandleType,
}

/// Notifier that records every event, for tests and offline consumers.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: RwLock<Vec<RecordedDefinition>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in notification order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedDefinition> {
        self.events.read().clone()
    }

    /// Number of events for one kind.
    #[must_use]
    pub fn count_of(&self, kind: HandleType) -> usize {
        self.events
            .read()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }

    /// Check if `handle` was reported.
    #[must_use]
    pub fn contains(&self, handle: AnyHandle) -> bool {
        self.events.read().iter().any(|event| event.handle == handle)
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl SubstrateNotifier for RecordingNotifier {
    fn new_definition_handle(&self, handle: AnyHandle, kind: HandleType) {
        self.events.write().push(RecordedDefinition { handle, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MovableOffset;

    #[test]
    fn recorder_counts_by_kind() {
        let recorder = RecordingNotifier::new();
        let a = AnyHandle::new(MovableOffset::new(8));
        let b = AnyHandle::new(MovableOffset::new(16));
        recorder.new_definition_handle(a, HandleType::Region);
        recorder.new_definition_handle(b, HandleType::String);

        assert_eq!(recorder.count_of(HandleType::Region), 1);
        assert_eq!(recorder.events().len(), 2);
        assert!(recorder.contains(b));

        recorder.clear();
        assert!(recorder.events().is_empty());
    }
}
