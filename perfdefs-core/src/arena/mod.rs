//! Movable-memory arena backing a definition manager.
//!
//! Every manager owns one [`PageManager`]. Definitions are appended to it and
//! addressed by their byte offset, never by pointer, so the backing storage
//! may grow without invalidating any handle.
//!
//! # Layout
//!
//! ```text
//! offset 0          8                                         write position
//! ┌─────────────────┬──────────────┬──────────────┬─────┬──────────────┐
//! │ reserved (NULL) │ definition 0 │ definition 1 │ ... │ definition n │ free
//! └─────────────────┴──────────────┴──────────────┴─────┴──────────────┘
//!                    ▲ handle = offset of the first byte
//! ```
//!
//! # Rollback
//!
//! Interning allocates the candidate definition before it knows whether an
//! equal one exists. On a duplicate hit the candidate is released with
//! [`PageManager::rollback`], which is only valid for the most recent
//! allocation and restores the write position exactly.

mod allocation;
mod page_manager;

pub use allocation::{AllocationEntry, AllocationStats};
pub use page_manager::{PageManager, ARENA_BASE_OFFSET, ENTRY_ALIGNMENT};
