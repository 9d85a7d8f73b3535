//! Header shared by every definition record.

use crate::types::AnyHandle;

/// Chaining and identity fields common to all definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionHeader {
    /// Next definition of the same kind, in creation order.
    pub next: AnyHandle,
    /// Next definition in the same hash bucket.
    pub hash_next: AnyHandle,
    /// Folded hash of the identity fields. Zero for kinds that never deduplicate.
    pub hash_value: u32,
    /// Position in creation order, assigned once the definition is accepted.
    pub sequence_number: u32,
    /// Counterpart in the unified manager, once unified.
    pub unified: AnyHandle,
}

impl DefinitionHeader {
    /// Sequence number of a definition that was not accepted yet.
    pub const UNASSIGNED: u32 = u32::MAX;

    /// A fresh, unlinked header.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AnyHandle::INVALID,
            hash_next: AnyHandle::INVALID,
            hash_value: 0,
            sequence_number: Self::UNASSIGNED,
            unified: AnyHandle::INVALID,
        }
    }

    /// Check if the definition has been accepted into a manager.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        self.sequence_number != Self::UNASSIGNED
    }
}

impl Default for DefinitionHeader {
    fn default() -> Self {
        Self::new()
    }
}
