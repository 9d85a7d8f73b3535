//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use perfdefs_core::prelude::*;
//! ```

// Handles and value types
pub use crate::types::*;

// Error handling
pub use crate::error::{DefinitionsError, Result};

// Managers
pub use crate::config::DefinitionsConfig;
pub use crate::context::Definitions;
pub use crate::manager::{DefinitionManager, Interned, ManagerRole};
pub use crate::substrate::{RecordingNotifier, SubstrateNotifier};

// Definition kinds
pub use crate::definitions::{
    AttributeHandle, CallingContextHandle, CallpathHandle, CallpathParameter, CartesianDimension,
    CartesianTopologyHandle, CommunicatorHandle, Definition, GroupHandle, HandleType,
    InterimCommunicatorHandle, InterruptGeneratorHandle, IoFileHandle, IoHandleFields,
    IoHandleHandle, IoParadigmHandle, LocationGroupHandle, LocationHandle, MetricHandle,
    ParadigmHandle, ParameterHandle, ParameterValue, PropertyHandle, RegionHandle,
    RmaWindowHandle, SamplingSetHandle, SourceCodeLocationHandle, SourceFileHandle,
    StringHandle, SystemTreeNodeHandle,
};

// Unification
pub use crate::unify::{
    assign_empty_string_to_names, copy_definitions_to_unified, create_mappings,
    create_region_groups, resolve_interim_definitions, unify_locally,
};
