//! Core types for the definitions store.
//!
//! This module provides the value types shared by every definition kind:
//! - `MovableOffset`: Byte offset of a record inside a definition arena
//! - `Handle<D>` / `AnyHandle`: Typed and untyped references to definitions
//! - Closed enumerations and flag sets stored in definitions

mod enums;
mod handle;

pub use enums::{
    AttributeType, CommunicatorFlags, GroupType, InterruptGeneratorMode, IoAccessMode,
    IoHandleFlags, IoParadigmClass, IoParadigmFlags, IoParadigmProperty, IoParadigmType,
    IoStatusFlags, LocationGroupType, LocationType, MetricBase, MetricMode, MetricOccurrence,
    MetricProfilingType, MetricScope, MetricSourceType, MetricValueType, ParadigmClass,
    ParadigmFlags, ParadigmProperty, ParadigmType, ParameterType, PropertyCondition,
    PropertyKind, RegionType, RmaWindowFlags, SamplingSetClass, SystemTreeDomain, TopologyType,
};
pub use handle::{AnyHandle, Handle, MovableOffset};
