//! Per-kind definition records.
//!
//! Each submodule owns one kind (or a tightly coupled pair of kinds) and
//! provides:
//!
//! - the record type and its accessors
//! - key hashing and the equality predicate ([`Definition`])
//! - a `define_*` routine on [`DefinitionManager`](crate::DefinitionManager)
//! - `new_*` entry points on [`Definitions`](crate::Definitions) for the
//!   measurement side
//! - a `unify_*` routine that re-creates a local definition in the unified
//!   manager

mod attribute;
mod calling_context;
mod callpath;
mod clock_offset;
mod communicator;
mod group;
mod io_file;
mod io_handle;
mod io_paradigm;
mod location;
mod location_group;
mod metric;
mod paradigm;
mod parameter;
mod property;
mod region;
mod rma_window;
mod sampling_set;
mod source_code_location;
mod source_file;
mod strings;
mod system_tree_node;
mod topology;

pub use attribute::{unify_attribute, AttributeDef, AttributeHandle};
pub use calling_context::{
    unify_calling_context, unify_interrupt_generator, CallingContextDef, CallingContextHandle,
    InterruptGeneratorDef, InterruptGeneratorHandle,
};
pub use callpath::{
    unify_callpath, CallpathDef, CallpathHandle, CallpathParameter, ParameterValue,
};
pub use clock_offset::{ClockOffsetDef, ClockOffsetHandle};
pub use communicator::{
    unify_communicator, CommunicatorDef, CommunicatorHandle, EqualPayloadsFn, InitPayloadFn,
    InterimCommunicatorDef, InterimCommunicatorHandle, InterimCommunicatorRequest,
    InterimCommunicatorTable,
};
pub use group::{unify_group, GroupDef, GroupHandle};
pub use io_file::{
    unify_io_file, unify_io_file_property, IoFileDef, IoFileHandle, IoFilePropertyDef,
    IoFilePropertyHandle,
};
pub use io_handle::{unify_io_handle, IoHandleDef, IoHandleFields, IoHandleHandle};
pub use io_paradigm::{unify_io_paradigm, IoParadigmDef, IoParadigmHandle};
pub use location::{
    unify_location, unify_location_property, LocationDef, LocationHandle, LocationPropertyDef,
    LocationPropertyHandle, UNASSIGNED_GLOBAL_LOCATION_ID,
};
pub use location_group::{unify_location_group, LocationGroupDef, LocationGroupHandle};
pub use metric::{unify_metric, MetricDef, MetricHandle};
pub use paradigm::{unify_paradigm, ParadigmDef, ParadigmHandle};
pub use parameter::{unify_parameter, ParameterDef, ParameterHandle};
pub use property::{unify_property, PropertyDef, PropertyHandle};
pub use region::{unify_region, RegionDef, RegionHandle};
pub use rma_window::{unify_rma_window, RmaWindowDef, RmaWindowHandle};
pub use sampling_set::{
    unify_sampling_set, unify_sampling_set_recorder, SamplingSetDef, SamplingSetHandle,
    SamplingSetRecorderDef, SamplingSetRecorderHandle, SamplingSetVariant,
};
pub use source_code_location::{
    unify_source_code_location, SourceCodeLocationDef, SourceCodeLocationHandle,
};
pub use source_file::{unify_source_file, SourceFileDef, SourceFileHandle};
pub use strings::{unify_string, StringDef, StringHandle};
pub use system_tree_node::{
    unify_system_tree_node, unify_system_tree_node_property, SystemTreeNodeDef,
    SystemTreeNodeHandle, SystemTreeNodePropertyDef, SystemTreeNodePropertyHandle,
};
pub use topology::{
    unify_cartesian_coords, unify_cartesian_topology, CartesianCoordsDef, CartesianCoordsHandle,
    CartesianDimension, CartesianTopologyDef, CartesianTopologyHandle,
};

use crate::arena::PageManager;
use crate::manager::DefinitionHeader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-level view of a definition kind.
///
/// Implemented for every record type by `definition_kinds!`.
pub trait RecordKind: Sized + fmt::Debug + 'static {
    /// The kind tag.
    const KIND: HandleType;

    /// The common header.
    fn header(&self) -> &DefinitionHeader;

    /// The common header, mutably.
    fn header_mut(&mut self) -> &mut DefinitionHeader;

    /// Downcast a record.
    fn from_record(record: &Record) -> Option<&Self>;

    /// Downcast a record, mutably.
    fn from_record_mut(record: &mut Record) -> Option<&mut Self>;

    /// Wrap into a record.
    fn into_record(self) -> Record;
}

/// Identity semantics of a definition kind.
pub trait Definition: RecordKind {
    /// Whether first-time creation is reported to substrates.
    const SUBSTRATE_AWARE: bool = true;

    /// Fold the identity fields into a hash.
    ///
    /// Kinds that never deduplicate keep the default of zero.
    fn key_hash(&self, _arena: &PageManager) -> u32 {
        0
    }

    /// Compare the identity fields of two definitions of the same manager.
    ///
    /// Must be true only if `key_hash` agrees.
    fn equal(existing: &Self, candidate: &Self) -> bool;

    /// Decide whether `candidate` is a duplicate of `existing`, merging into
    /// `existing` where the kind defines a merge rule.
    fn resolve_duplicate(existing: &mut Self, candidate: &Self) -> bool {
        Self::equal(existing, candidate)
    }

    /// Bytes of variable-length data owned by the record.
    fn variable_size(&self) -> usize {
        0
    }

    /// Bytes this definition consumes in its arena.
    fn allocation_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.variable_size()
    }
}

macro_rules! definition_kinds {
    ($($(#[$doc:meta])* $kind:ident => $def:ty),+ $(,)?) => {
        /// Kind tag of a definition.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum HandleType {
            $($(#[$doc])* $kind),+
        }

        impl HandleType {
            /// All kinds, in declaration order.
            pub const ALL: &'static [HandleType] = &[$(HandleType::$kind),+];

            /// Number of kinds.
            pub const COUNT: usize = Self::ALL.len();

            /// Position of this kind in [`HandleType::ALL`].
            #[must_use]
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Name of the kind.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(HandleType::$kind => stringify!($kind)),+
                }
            }
        }

        /// A definition of any kind, as stored in an arena.
        #[derive(Debug, Clone)]
        pub enum Record {
            $($(#[$doc])* $kind($def)),+
        }

        impl Record {
            /// Kind of the stored definition.
            #[must_use]
            pub fn kind(&self) -> HandleType {
                match self {
                    $(Record::$kind(_) => HandleType::$kind),+
                }
            }

            /// The common header.
            #[must_use]
            pub fn header(&self) -> &DefinitionHeader {
                match self {
                    $(Record::$kind(definition) => &definition.header),+
                }
            }

            pub(crate) fn header_mut(&mut self) -> &mut DefinitionHeader {
                match self {
                    $(Record::$kind(definition) => &mut definition.header),+
                }
            }
        }

        $(
            impl RecordKind for $def {
                const KIND: HandleType = HandleType::$kind;

                fn header(&self) -> &DefinitionHeader {
                    &self.header
                }

                fn header_mut(&mut self) -> &mut DefinitionHeader {
                    &mut self.header
                }

                fn from_record(record: &Record) -> Option<&Self> {
                    match record {
                        Record::$kind(definition) => Some(definition),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
                    match record {
                        Record::$kind(definition) => Some(definition),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn into_record(self) -> Record {
                    Record::$kind(self)
                }
            }
        )+
    };
}

definition_kinds! {
    /// Interned strings.
    String => StringDef,
    /// Source files.
    SourceFile => SourceFileDef,
    /// Source code locations.
    SourceCodeLocation => SourceCodeLocationDef,
    /// Instrumentation paradigms.
    Paradigm => ParadigmDef,
    /// I/O paradigms.
    IoParadigm => IoParadigmDef,
    /// System tree nodes.
    SystemTreeNode => SystemTreeNodeDef,
    /// Properties of system tree nodes.
    SystemTreeNodeProperty => SystemTreeNodePropertyDef,
    /// Location groups.
    LocationGroup => LocationGroupDef,
    /// Locations.
    Location => LocationDef,
    /// Properties of locations.
    LocationProperty => LocationPropertyDef,
    /// Code regions.
    Region => RegionDef,
    /// Groups of ids.
    Group => GroupDef,
    /// Interim communicators.
    InterimCommunicator => InterimCommunicatorDef,
    /// Communicators.
    Communicator => CommunicatorDef,
    /// RMA windows.
    RmaWindow => RmaWindowDef,
    /// Metrics.
    Metric => MetricDef,
    /// Sampling sets, plain and scoped.
    SamplingSet => SamplingSetDef,
    /// Recorders of sampling sets.
    SamplingSetRecorder => SamplingSetRecorderDef,
    /// Parameters.
    Parameter => ParameterDef,
    /// Call paths.
    Callpath => CallpathDef,
    /// Calling contexts.
    CallingContext => CallingContextDef,
    /// Interrupt generators.
    InterruptGenerator => InterruptGeneratorDef,
    /// Measurement properties.
    Property => PropertyDef,
    /// Attributes.
    Attribute => AttributeDef,
    /// Cartesian topologies.
    CartesianTopology => CartesianTopologyDef,
    /// Cartesian coordinates.
    CartesianCoords => CartesianCoordsDef,
    /// I/O files.
    IoFile => IoFileDef,
    /// Properties of I/O files.
    IoFileProperty => IoFilePropertyDef,
    /// I/O handles.
    IoHandle => IoHandleDef,
    /// Clock offsets.
    ClockOffset => ClockOffsetDef,
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::metric::MetricFields;
    use super::region::RegionFields;
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::manager::DefinitionManager;
    use crate::types::{
        AnyHandle, CommunicatorFlags, GroupType, Handle, MetricBase, MetricMode,
        MetricOccurrence, MetricProfilingType, MetricSourceType, MetricValueType, ParadigmType,
        ParameterType, RegionType, SamplingSetClass, SystemTreeDomain, TopologyType,
    };

    /// Define twice with the same identity and once with one field changed.
    fn assert_interns_by_identity<D: Definition>(
        manager: &mut DefinitionManager,
        define: impl Fn(&mut DefinitionManager, bool) -> Handle<D>,
    ) {
        let before = manager.count::<D>();
        let first = define(manager, false);
        let again = define(manager, false);
        let changed = define(manager, true);
        assert_eq!(first, again, "{}", D::KIND);
        assert_ne!(first, changed, "{}", D::KIND);
        assert_eq!(manager.count::<D>(), before + 2, "{}", D::KIND);
    }

    #[test]
    fn kind_indices_are_dense() {
        for (position, kind) in HandleType::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
        assert_eq!(HandleType::COUNT, HandleType::ALL.len());
    }

    #[test]
    fn kind_display() {
        assert_eq!(HandleType::Region.to_string(), "Region");
        assert_eq!(HandleType::IoFileProperty.name(), "IoFileProperty");
    }

    #[test]
    fn record_downcasts_by_kind() {
        let record = StringDef::new("x".into()).into_record();
        assert_eq!(record.kind(), HandleType::String);
        assert!(StringDef::from_record(&record).is_some());
        assert!(RegionDef::from_record(&record).is_none());
    }

    #[test]
    fn unified_kinds_intern_by_identity() {
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        let name = unified.define_string("name").unwrap().handle();
        let other = unified.define_string("other").unwrap().handle();
        let group = unified
            .define_group(GroupType::CommGroup, name, &[0, 1])
            .unwrap()
            .handle();
        let region = unified
            .define_region(RegionFields {
                name,
                canonical_name: name,
                description: name,
                file_name: StringHandle::INVALID,
                begin_line: 1,
                end_line: 2,
                paradigm: ParadigmType::User,
                region_type: RegionType::Function,
                group_name: StringHandle::INVALID,
            })
            .unwrap()
            .handle();
        let parameter = unified
            .define_parameter(name, ParameterType::Int64)
            .unwrap()
            .handle();
        let node = unified
            .define_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, name, other)
            .unwrap()
            .handle();
        let metric_fields = move |exponent| MetricFields {
            name,
            description: name,
            source_type: MetricSourceType::Papi,
            mode: MetricMode::AccumulatedStart,
            value_type: MetricValueType::Uint64,
            base: MetricBase::Decimal,
            exponent,
            unit: name,
            profiling_type: MetricProfilingType::Exclusive,
            parent: Handle::INVALID,
        };
        let metric = unified.define_metric(metric_fields(0)).unwrap().handle();

        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let unify_key = if changed { 1 } else { 0 };
            manager
                .define_communicator(
                    group,
                    group,
                    name,
                    Handle::INVALID,
                    unify_key,
                    CommunicatorFlags::empty(),
                )
                .unwrap()
                .handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let exponent = if changed { 3 } else { 0 };
            manager.define_metric(metric_fields(exponent)).unwrap().handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let occurrence = if changed {
                MetricOccurrence::Asynchronous
            } else {
                MetricOccurrence::Synchronous
            };
            manager
                .define_sampling_set(&[metric], occurrence, SamplingSetClass::Cpu)
                .unwrap()
                .handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let value = ParameterValue::Int(if changed { 2 } else { 1 });
            let parameters = [CallpathParameter::new(parameter, value)];
            manager
                .define_callpath(Handle::INVALID, region, &parameters)
                .unwrap()
                .handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let ip_offset = if changed { 0x20 } else { 0x10 };
            manager
                .define_calling_context(
                    0x4000,
                    ip_offset,
                    StringHandle::INVALID,
                    region,
                    Handle::INVALID,
                    Handle::INVALID,
                )
                .unwrap()
                .handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let file_name = if changed { other } else { name };
            manager.define_io_file(file_name, node).unwrap().handle()
        });
        assert_interns_by_identity(&mut unified, move |manager, changed| {
            let dimension = CartesianDimension {
                name,
                processes: 2,
                periodic: false,
            };
            let rank = if changed { 3 } else { 2 };
            manager
                .define_cartesian_topology(
                    name,
                    AnyHandle::INVALID,
                    TopologyType::Process,
                    &vec![dimension; rank],
                )
                .unwrap()
                .handle()
        });
    }
}
