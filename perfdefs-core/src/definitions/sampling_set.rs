//! Sampling sets and their recorders.
//!
//! A plain sampling set groups metrics that are read together. A scoped
//! sampling set binds a plain one to the location that records it and the
//! entity (location, location group, system tree node or group) the values
//! are valid for. Both share one kind and one sequence of numbers.

use super::{Definition, HandleType, LocationHandle, MetricHandle, Record};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AnyHandle, Handle, MetricOccurrence, MetricScope, SamplingSetClass};

/// Handle to a [`SamplingSetDef`].
pub type SamplingSetHandle = Handle<SamplingSetDef>;

/// Handle to a [`SamplingSetRecorderDef`].
pub type SamplingSetRecorderHandle = Handle<SamplingSetRecorderDef>;

/// The two shapes of a sampling set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingSetVariant {
    /// Metrics recorded together.
    Plain {
        /// The metrics, in recording order.
        metrics: Box<[MetricHandle]>,
        /// When the set is recorded.
        occurrence: MetricOccurrence,
        /// Hardware class.
        class: SamplingSetClass,
    },
    /// A plain set recorded by one location on behalf of a scope.
    Scoped {
        /// The plain set.
        sampling_set: SamplingSetHandle,
        /// The recording location.
        recorder: LocationHandle,
        /// Kind of the scope.
        scope_type: MetricScope,
        /// The scope.
        scope: AnyHandle,
    },
}

/// A sampling set definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingSetDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) variant: SamplingSetVariant,
    pub(crate) recorders: SamplingSetRecorderHandle,
    pub(crate) recorders_tail: SamplingSetRecorderHandle,
}

impl SamplingSetDef {
    /// The set's shape.
    #[must_use]
    pub fn variant(&self) -> &SamplingSetVariant {
        &self.variant
    }

    /// Check if this is a scoped set.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        matches!(self.variant, SamplingSetVariant::Scoped { .. })
    }

    /// First recorder, `INVALID` if there is none.
    #[must_use]
    pub fn first_recorder(&self) -> SamplingSetRecorderHandle {
        self.recorders
    }
}

impl Definition for SamplingSetDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        let hasher = KeyHasher::new(arena).pod(self.is_scoped());
        match &self.variant {
            SamplingSetVariant::Plain {
                metrics,
                occurrence,
                class,
            } => metrics
                .iter()
                .fold(hasher.pod(metrics.len() as u32), |hasher, &metric| {
                    hasher.handle(metric)
                })
                .pod(*occurrence)
                .pod(*class),
            SamplingSetVariant::Scoped {
                sampling_set,
                recorder,
                scope_type,
                scope,
            } => hasher
                .handle(*sampling_set)
                .handle(*recorder)
                .pod(*scope_type)
                .any_handle(*scope),
        }
        .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.variant == candidate.variant
    }

    fn variable_size(&self) -> usize {
        match &self.variant {
            SamplingSetVariant::Plain { metrics, .. } => {
                std::mem::size_of_val::<[MetricHandle]>(metrics)
            }
            SamplingSetVariant::Scoped { .. } => 0,
        }
    }
}

/// A location that records a sampling set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingSetRecorderDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) sampling_set: SamplingSetHandle,
    pub(crate) recorder: LocationHandle,
    pub(crate) next_recorder: SamplingSetRecorderHandle,
}

impl SamplingSetRecorderDef {
    /// The recorded set.
    #[must_use]
    pub fn sampling_set(&self) -> SamplingSetHandle {
        self.sampling_set
    }

    /// The recording location.
    #[must_use]
    pub fn recorder(&self) -> LocationHandle {
        self.recorder
    }

    /// Next recorder of the same set.
    #[must_use]
    pub fn next_recorder(&self) -> SamplingSetRecorderHandle {
        self.next_recorder
    }
}

impl Definition for SamplingSetRecorderDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.sampling_set)
            .handle(self.recorder)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.sampling_set == candidate.sampling_set && existing.recorder == candidate.recorder
    }
}

impl DefinitionManager {
    /// Intern a plain sampling set.
    pub fn define_sampling_set(
        &mut self,
        metrics: &[MetricHandle],
        occurrence: MetricOccurrence,
        class: SamplingSetClass,
    ) -> Result<Interned<SamplingSetDef>> {
        self.intern(SamplingSetDef {
            header: DefinitionHeader::new(),
            variant: SamplingSetVariant::Plain {
                metrics: metrics.into(),
                occurrence,
                class,
            },
            recorders: Handle::INVALID,
            recorders_tail: Handle::INVALID,
        })
    }

    /// Intern a scoped sampling set.
    pub fn define_scoped_sampling_set(
        &mut self,
        sampling_set: SamplingSetHandle,
        recorder: LocationHandle,
        scope_type: MetricScope,
        scope: AnyHandle,
    ) -> Result<Interned<SamplingSetDef>> {
        self.intern(SamplingSetDef {
            header: DefinitionHeader::new(),
            variant: SamplingSetVariant::Scoped {
                sampling_set,
                recorder,
                scope_type,
                scope,
            },
            recorders: Handle::INVALID,
            recorders_tail: Handle::INVALID,
        })
    }

    /// Intern a recorder and chain it onto its set.
    pub fn define_sampling_set_recorder(
        &mut self,
        sampling_set: SamplingSetHandle,
        recorder: LocationHandle,
    ) -> Result<Interned<SamplingSetRecorderDef>> {
        let interned = self.intern(SamplingSetRecorderDef {
            header: DefinitionHeader::new(),
            sampling_set,
            recorder,
            next_recorder: Handle::INVALID,
        })?;
        if let Interned::Created(handle) = interned {
            let tail = self.get(sampling_set).recorders_tail;
            if tail.is_valid() {
                self.get_mut(tail).next_recorder = handle;
            } else {
                self.get_mut(sampling_set).recorders = handle;
            }
            self.get_mut(sampling_set).recorders_tail = handle;
        }
        Ok(interned)
    }

    /// The plain set behind `sampling_set`: itself if plain, its base if scoped.
    #[must_use]
    pub fn base_sampling_set(&self, sampling_set: SamplingSetHandle) -> SamplingSetHandle {
        match self.get(sampling_set).variant {
            SamplingSetVariant::Scoped { sampling_set, .. } => sampling_set,
            SamplingSetVariant::Plain { .. } => sampling_set,
        }
    }

    fn plain_sampling_set(
        &self,
        sampling_set: SamplingSetHandle,
    ) -> (&[MetricHandle], MetricOccurrence, SamplingSetClass) {
        match &self.get(self.base_sampling_set(sampling_set)).variant {
            SamplingSetVariant::Plain {
                metrics,
                occurrence,
                class,
            } => (metrics, *occurrence, *class),
            // Scoped sets are only ever built over plain ones.
            SamplingSetVariant::Scoped { .. } => {
                (&[], MetricOccurrence::Asynchronous, SamplingSetClass::Abstract)
            }
        }
    }

    /// Recorders of a set, in insertion order.
    #[must_use]
    pub fn sampling_set_recorders(
        &self,
        sampling_set: SamplingSetHandle,
    ) -> Vec<SamplingSetRecorderHandle> {
        std::iter::successors(
            Some(self.get(sampling_set).recorders).filter(Handle::is_valid),
            |&recorder| Some(self.get(recorder).next_recorder).filter(Handle::is_valid),
        )
        .collect()
    }
}

impl Definitions {
    /// Define a plain sampling set. At least one metric is required.
    pub fn new_sampling_set(
        &self,
        metrics: &[MetricHandle],
        occurrence: MetricOccurrence,
        class: SamplingSetClass,
    ) -> Result<SamplingSetHandle> {
        if metrics.is_empty() || metrics.iter().any(|metric| !metric.is_valid()) {
            return Err(DefinitionsError::InvalidArgument {
                operation: "new_sampling_set",
                cause: "a sampling set needs at least one valid metric".into(),
            });
        }
        self.define(|local| local.define_sampling_set(metrics, occurrence, class))
    }

    /// Define a scoped sampling set over a plain one.
    pub fn new_scoped_sampling_set(
        &self,
        sampling_set: SamplingSetHandle,
        recorder: LocationHandle,
        scope_type: MetricScope,
        scope: AnyHandle,
    ) -> Result<SamplingSetHandle> {
        if !sampling_set.is_valid() || !recorder.is_valid() || !scope.is_valid() {
            return Err(DefinitionsError::InvalidArgument {
                operation: "new_scoped_sampling_set",
                cause: "sampling set, recorder and scope are required".into(),
            });
        }
        self.define(|local| {
            if local.get(sampling_set).is_scoped() {
                return Err(DefinitionsError::InvalidArgument {
                    operation: "new_scoped_sampling_set",
                    cause: format!("{sampling_set} is already scoped"),
                });
            }
            local.define_scoped_sampling_set(sampling_set, recorder, scope_type, scope)
        })
    }

    /// Declare that `recorder` records the plain set `sampling_set`.
    pub fn sampling_set_add_recorder(
        &self,
        sampling_set: SamplingSetHandle,
        recorder: LocationHandle,
    ) -> Result<SamplingSetRecorderHandle> {
        self.define(|local| {
            if local.get(sampling_set).is_scoped() {
                return Err(DefinitionsError::InvalidArgument {
                    operation: "sampling_set_add_recorder",
                    cause: "recorders can only be added to plain sampling sets".into(),
                });
            }
            local.define_sampling_set_recorder(sampling_set, recorder)
        })
    }

    /// Metrics of a set; scoped sets answer for their base.
    #[must_use]
    pub fn sampling_set_metrics(&self, sampling_set: SamplingSetHandle) -> Vec<MetricHandle> {
        self.lock().plain_sampling_set(sampling_set).0.to_vec()
    }

    /// Number of metrics of a set; scoped sets answer for their base.
    #[must_use]
    pub fn sampling_set_number_of_metrics(&self, sampling_set: SamplingSetHandle) -> usize {
        self.lock().plain_sampling_set(sampling_set).0.len()
    }

    /// Occurrence of a set; scoped sets answer for their base.
    #[must_use]
    pub fn sampling_set_occurrence(&self, sampling_set: SamplingSetHandle) -> MetricOccurrence {
        self.lock().plain_sampling_set(sampling_set).1
    }

    /// Class of a set; scoped sets answer for their base.
    #[must_use]
    pub fn sampling_set_class(&self, sampling_set: SamplingSetHandle) -> SamplingSetClass {
        self.lock().plain_sampling_set(sampling_set).2
    }

    /// Check if a set is scoped.
    #[must_use]
    pub fn sampling_set_is_scoped(&self, sampling_set: SamplingSetHandle) -> bool {
        self.lock().get(sampling_set).is_scoped()
    }

    /// Scope kind of a scoped set, `None` for plain sets.
    #[must_use]
    pub fn sampling_set_scope(&self, sampling_set: SamplingSetHandle) -> Option<MetricScope> {
        match self.lock().get(sampling_set).variant {
            SamplingSetVariant::Scoped { scope_type, .. } => Some(scope_type),
            SamplingSetVariant::Plain { .. } => None,
        }
    }

    /// Recorders of a set; scoped sets answer for their base.
    #[must_use]
    pub fn sampling_set_recorders(
        &self,
        sampling_set: SamplingSetHandle,
    ) -> Vec<SamplingSetRecorderHandle> {
        let local = self.lock();
        local.sampling_set_recorders(local.base_sampling_set(sampling_set))
    }
}

/// Check if the scope of a scoped set will have a unified counterpart.
fn scope_is_used(source: &DefinitionManager, scope: AnyHandle) -> bool {
    match source.arena().record(scope) {
        Some(Record::LocationGroup(group)) => group.has_children,
        Some(Record::SystemTreeNode(node)) => node.has_children,
        _ => true,
    }
}

/// Re-create a local sampling set in the unified manager.
///
/// Scoped sets whose scope never led to a location are skipped.
pub fn unify_sampling_set(
    source: &mut DefinitionManager,
    handle: SamplingSetHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let kind = HandleType::SamplingSet;
    let counterpart = match source.get(handle).variant.clone() {
        SamplingSetVariant::Plain {
            metrics,
            occurrence,
            class,
        } => {
            let metrics = metrics
                .iter()
                .map(|&metric| source.unified_handle(kind, "metric", metric))
                .collect::<Result<Vec<_>>>()?;
            unified.define_sampling_set(&metrics, occurrence, class)?
        }
        SamplingSetVariant::Scoped {
            sampling_set,
            recorder,
            scope_type,
            scope,
        } => {
            if !scope_is_used(source, scope) {
                tracing::trace!(
                    handle = %handle,
                    scope = %scope,
                    "Skipping scoped sampling set of unused scope"
                );
                return Ok(());
            }
            let sampling_set = source.unified_handle(kind, "sampling set", sampling_set)?;
            let recorder = source.unified_handle(kind, "recorder", recorder)?;
            let scope = source.optional_unified_any(kind, "scope", scope)?;
            unified.define_scoped_sampling_set(sampling_set, recorder, scope_type, scope)?
        }
    }
    .handle();
    source.set_unified(handle, counterpart)
}

/// Re-create a local recorder under the unified set.
pub fn unify_sampling_set_recorder(
    source: &mut DefinitionManager,
    handle: SamplingSetRecorderHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (sampling_set, recorder) = (definition.sampling_set, definition.recorder);
    let kind = HandleType::SamplingSetRecorder;
    let sampling_set = source.unified_handle(kind, "sampling set", sampling_set)?;
    let recorder = source.unified_handle(kind, "recorder", recorder)?;

    let counterpart = unified
        .define_sampling_set_recorder(sampling_set, recorder)?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::types::{
        LocationGroupType, LocationType, MetricBase, MetricMode, MetricProfilingType,
        MetricSourceType, MetricValueType, ParadigmType, SystemTreeDomain,
    };

    struct Fixture {
        definitions: Definitions,
        metrics: [MetricHandle; 2],
        location: LocationHandle,
    }

    fn fixture() -> Fixture {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let metric = |name| {
            definitions
                .new_metric(
                    Some(name),
                    None,
                    MetricSourceType::Papi,
                    MetricMode::AccumulatedStart,
                    MetricValueType::Uint64,
                    MetricBase::Decimal,
                    0,
                    None,
                    MetricProfilingType::Exclusive,
                    Handle::INVALID,
                )
                .unwrap()
        };
        let metrics = [metric("PAPI_TOT_INS"), metric("PAPI_L2_DCM")];
        let node = definitions
            .new_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, "machine", "m")
            .unwrap();
        let process = definitions
            .new_location_group(
                Some("rank 0"),
                LocationGroupType::Process,
                node,
                Handle::INVALID,
            )
            .unwrap();
        let location = definitions
            .new_location(
                LocationType::CpuThread,
                ParadigmType::Measurement,
                Some("main"),
                process,
                0,
            )
            .unwrap();
        Fixture {
            definitions,
            metrics,
            location,
        }
    }

    #[test]
    fn scoped_getters_resolve_to_base() {
        let f = fixture();
        let plain = f
            .definitions
            .new_sampling_set(&f.metrics, MetricOccurrence::Synchronous, SamplingSetClass::Cpu)
            .unwrap();
        let scoped = f
            .definitions
            .new_scoped_sampling_set(plain, f.location, MetricScope::Location, f.location.any())
            .unwrap();

        assert!(f.definitions.sampling_set_is_scoped(scoped));
        assert_eq!(f.definitions.sampling_set_metrics(scoped), f.metrics.to_vec());
        assert_eq!(f.definitions.sampling_set_number_of_metrics(scoped), 2);
        assert_eq!(
            f.definitions.sampling_set_occurrence(scoped),
            MetricOccurrence::Synchronous
        );
        assert_eq!(f.definitions.sampling_set_class(scoped), SamplingSetClass::Cpu);
        assert_eq!(
            f.definitions.sampling_set_scope(scoped),
            Some(MetricScope::Location)
        );
        assert_eq!(f.definitions.sampling_set_scope(plain), None);
        assert_eq!(f.definitions.lock().base_sampling_set(scoped), plain);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let f = fixture();
        let err = f
            .definitions
            .new_sampling_set(&[], MetricOccurrence::Synchronous, SamplingSetClass::Cpu)
            .unwrap_err();
        assert_eq!(err.code(), "E204");

        let plain = f
            .definitions
            .new_sampling_set(&f.metrics, MetricOccurrence::Asynchronous, SamplingSetClass::Abstract)
            .unwrap();
        let scoped = f
            .definitions
            .new_scoped_sampling_set(plain, f.location, MetricScope::Location, f.location.any())
            .unwrap();
        assert!(f
            .definitions
            .sampling_set_add_recorder(scoped, f.location)
            .is_err());
        assert!(f
            .definitions
            .new_scoped_sampling_set(scoped, f.location, MetricScope::Location, f.location.any())
            .is_err());
    }

    #[test]
    fn recorders_chain_onto_their_set() {
        let f = fixture();
        let plain = f
            .definitions
            .new_sampling_set(&f.metrics, MetricOccurrence::Asynchronous, SamplingSetClass::Gpu)
            .unwrap();
        let recorder = f
            .definitions
            .sampling_set_add_recorder(plain, f.location)
            .unwrap();
        assert_eq!(f.definitions.sampling_set_recorders(plain), vec![recorder]);

        let local = f.definitions.lock();
        assert_eq!(local.get(recorder).recorder(), f.location);
        assert_eq!(local.get(plain).first_recorder(), recorder);
    }

    #[test]
    fn plain_sets_merge_by_metric_order() {
        let f = fixture();
        let [ins, dcm] = f.metrics;
        let occurrence = MetricOccurrence::Synchronous;
        let class = SamplingSetClass::Cpu;
        let forward = f.definitions.new_sampling_set(&[ins, dcm], occurrence, class).unwrap();
        let again = f.definitions.new_sampling_set(&[ins, dcm], occurrence, class).unwrap();
        let backward = f.definitions.new_sampling_set(&[dcm, ins], occurrence, class).unwrap();
        assert_ne!(forward, again);

        let mut source = f.definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        crate::unify::copy_definitions_to_unified(&mut source, &mut unified).unwrap();
        assert_eq!(source.unified(forward), source.unified(again));
        assert_ne!(source.unified(forward), source.unified(backward));
    }

    #[test]
    fn scoped_sets_of_unused_scopes_are_skipped() {
        let f = fixture();
        let spare = f
            .definitions
            .new_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, "machine", "idle")
            .unwrap();
        let plain = f
            .definitions
            .new_sampling_set(&f.metrics, MetricOccurrence::Asynchronous, SamplingSetClass::Cpu)
            .unwrap();
        let scoped = f
            .definitions
            .new_scoped_sampling_set(plain, f.location, MetricScope::SystemTreeNode, spare.any())
            .unwrap();

        let mut source = f.definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        crate::unify::copy_definitions_to_unified(&mut source, &mut unified).unwrap();
        assert!(source.unified(plain).is_valid());
        assert!(!source.unified(scoped).is_valid());
    }
}
