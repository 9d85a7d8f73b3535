//! Error types for the definitions store.
//!
//! Every condition that leaves a definitions table unusable is reported as a
//! [`DefinitionsError`]. None of them are retriable: an instrumented runtime is
//! expected to print the diagnostic and stop measuring.

use crate::definitions::HandleType;
use crate::types::AnyHandle;
use thiserror::Error;

/// The main error type for definition operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionsError {
    // =========================================================================
    // Arena Errors (E001-E099)
    // =========================================================================
    /// The definition arena has no room left for a new record.
    #[error("E001: Definition arena exhausted: requested {requested} bytes, available {available} bytes")]
    ArenaExhausted {
        /// Number of bytes requested.
        requested: u64,
        /// Number of bytes still available.
        available: u64,
    },

    // =========================================================================
    // Unification Errors (E100-E199)
    // =========================================================================
    /// A referenced definition was visited after the definition referencing it.
    #[error(
        "E101: Invalid unification order of {kind} definition: {field} {handle} not yet unified"
    )]
    UnificationOrder {
        /// Kind of the definition being unified.
        kind: HandleType,
        /// Name of the field holding the reference.
        field: &'static str,
        /// The referenced local handle.
        handle: AnyHandle,
    },

    /// The unified slot of a definition was written twice.
    #[error("E102: {kind} definition {handle} already has a unified counterpart")]
    UnifiedAlreadySet {
        /// Kind of the definition.
        kind: HandleType,
        /// The local handle.
        handle: AnyHandle,
    },

    /// An interim communicator reference has no resolved communicator.
    #[error("E103: Interim communicator {handle} was not unified by its creator")]
    InterimNotResolved {
        /// The interim communicator handle.
        handle: AnyHandle,
    },

    // =========================================================================
    // Definition Errors (E200-E299)
    // =========================================================================
    /// A set-once property was assigned a second time.
    #[error("E201: Property '{property}' of {owner} already set")]
    PropertyAlreadySet {
        /// Kind of the definition carrying the property.
        owner: HandleType,
        /// Name of the property.
        property: String,
    },

    /// An I/O handle was completed twice.
    #[error("E202: Completing an already completed I/O handle {handle}")]
    IoHandleAlreadyCompleted {
        /// The I/O handle.
        handle: AnyHandle,
    },

    /// An equality callback was given for a table that does not hash.
    #[error("E203: No hash table allocated for {kind}, even though an equal function was provided")]
    MissingHashTable {
        /// Kind of the table.
        kind: HandleType,
    },

    /// A required argument was missing or malformed.
    #[error("E204: Invalid argument to {operation}: {cause}")]
    InvalidArgument {
        /// The operation that rejected the argument.
        operation: &'static str,
        /// Why it was rejected.
        cause: String,
    },

    // =========================================================================
    // Clock Offset Errors (E300-E399)
    // =========================================================================
    /// A clock offset was recorded with a timestamp earlier than its predecessor.
    #[error("E301: Clock offset at time {time} recorded after offset at time {previous}")]
    ClockOffsetOutOfOrder {
        /// Timestamp of the rejected offset.
        time: u64,
        /// Timestamp of the last accepted offset.
        previous: u64,
    },

    /// Fewer clock offsets exist than were requested.
    #[error("E302: Requested {requested} clock offsets, but only {available} recorded")]
    ClockOffsetsUnavailable {
        /// Number of offsets requested.
        requested: usize,
        /// Number of offsets recorded.
        available: usize,
    },

    // =========================================================================
    // Configuration Errors (E400-E499)
    // =========================================================================
    /// A configuration value is out of range.
    #[error("E401: Invalid configuration for '{field}': {cause}")]
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        cause: String,
    },
}

impl DefinitionsError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArenaExhausted { .. } => "E001",
            Self::UnificationOrder { .. } => "E101",
            Self::UnifiedAlreadySet { .. } => "E102",
            Self::InterimNotResolved { .. } => "E103",
            Self::PropertyAlreadySet { .. } => "E201",
            Self::IoHandleAlreadyCompleted { .. } => "E202",
            Self::MissingHashTable { .. } => "E203",
            Self::InvalidArgument { .. } => "E204",
            Self::ClockOffsetOutOfOrder { .. } => "E301",
            Self::ClockOffsetsUnavailable { .. } => "E302",
            Self::InvalidConfig { .. } => "E401",
        }
    }

    /// Check if this error comes from visiting definitions in the wrong order.
    #[must_use]
    pub fn is_ordering_violation(&self) -> bool {
        matches!(
            self,
            Self::UnificationOrder { .. } | Self::InterimNotResolved { .. }
        )
    }

    /// Check if the definitions table must be considered broken after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. })
    }
}

/// Result type alias for definition operations.
pub type Result<T> = std::result::Result<T, DefinitionsError>;
