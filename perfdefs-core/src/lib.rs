//! perfdefs core library
//!
//! A deduplicating store for the definitions of a performance-measurement
//! runtime: strings, regions, locations, communicators, metrics and the
//! other records that trace and profile events refer to by handle.
//!
//! # Overview
//!
//! Every process keeps a *local* definition manager. Defining something
//! that already exists returns the existing handle, so instrumentation can
//! define eagerly. At the end of a measurement the local managers are
//! *unified* into one manager in which equal definitions of all processes
//! collapse into one, and every local definition learns its unified id.
//!
//! # Key Components
//!
//! - **Arena**: Relocatable page storage addressed by movable offsets
//! - **Manager**: Per-kind hash tables, creation-ordered lists and mappings
//! - **Definitions**: One module per kind with its identity and unify rules
//! - **Context**: The lock-guarded local manager and substrate notification
//! - **Unify**: The driver that merges local managers into a unified one
//!
//! # Example
//!
//! ```ignore
//! use perfdefs_core::prelude::*;
//!
//! let definitions = Definitions::new(DefinitionsConfig::from_env())?;
//! let main = definitions.new_region(
//!     Some("main"),
//!     None,
//!     Handle::INVALID,
//!     1,
//!     42,
//!     ParadigmType::User,
//!     RegionType::Function,
//! )?;
//!
//! let mut local = definitions.into_local();
//! let unified = unify_locally(&mut local, &DefinitionsConfig::default())?;
//! let id = local.unified_id(main);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod config;
pub mod context;
pub mod definitions;
pub mod error;
pub mod hash;
pub mod manager;
pub mod paths;
pub mod prelude;
pub mod substrate;
pub mod types;
pub mod unify;

// Re-export key types at crate root for convenience
pub use config::DefinitionsConfig;
pub use context::Definitions;
pub use error::{DefinitionsError, Result};
pub use manager::{DefinitionHeader, DefinitionManager, Interned, ManagerRole};
pub use substrate::{RecordingNotifier, SubstrateNotifier};
pub use types::{AnyHandle, Handle, MovableOffset};
pub use unify::{copy_definitions_to_unified, create_mappings, unify_locally};
