//! Metric definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{
    Handle, MetricBase, MetricMode, MetricProfilingType, MetricSourceType, MetricValueType,
};
use std::sync::Arc;

/// Handle to a [`MetricDef`].
pub type MetricHandle = Handle<MetricDef>;

/// A performance metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) description: StringHandle,
    pub(crate) source_type: MetricSourceType,
    pub(crate) mode: MetricMode,
    pub(crate) value_type: MetricValueType,
    pub(crate) base: MetricBase,
    pub(crate) exponent: i64,
    pub(crate) unit: StringHandle,
    pub(crate) profiling_type: MetricProfilingType,
    pub(crate) parent: MetricHandle,
}

impl MetricDef {
    /// Metric name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> StringHandle {
        self.description
    }

    /// Where the values come from.
    #[must_use]
    pub fn source_type(&self) -> MetricSourceType {
        self.source_type
    }

    /// Sampling mode.
    #[must_use]
    pub fn mode(&self) -> MetricMode {
        self.mode
    }

    /// Value storage type.
    #[must_use]
    pub fn value_type(&self) -> MetricValueType {
        self.value_type
    }

    /// Base of the unit exponent.
    #[must_use]
    pub fn base(&self) -> MetricBase {
        self.base
    }

    /// Unit exponent.
    #[must_use]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Unit name.
    #[must_use]
    pub fn unit(&self) -> StringHandle {
        self.unit
    }

    /// Profile aggregation.
    #[must_use]
    pub fn profiling_type(&self) -> MetricProfilingType {
        self.profiling_type
    }

    /// Parent metric, `INVALID` for top-level metrics.
    #[must_use]
    pub fn parent(&self) -> MetricHandle {
        self.parent
    }
}

impl Definition for MetricDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .handle(self.description)
            .pod(self.source_type)
            .pod(self.mode)
            .pod(self.value_type)
            .pod(self.base)
            .pod(self.exponent)
            .handle(self.unit)
            .pod(self.profiling_type)
            .optional_handle(self.parent)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
            && existing.description == candidate.description
            && existing.source_type == candidate.source_type
            && existing.mode == candidate.mode
            && existing.value_type == candidate.value_type
            && existing.base == candidate.base
            && existing.exponent == candidate.exponent
            && existing.unit == candidate.unit
            && existing.profiling_type == candidate.profiling_type
            && existing.parent == candidate.parent
    }
}

/// Field values of a metric, as passed to [`DefinitionManager::define_metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MetricFields {
    pub(crate) name: StringHandle,
    pub(crate) description: StringHandle,
    pub(crate) source_type: MetricSourceType,
    pub(crate) mode: MetricMode,
    pub(crate) value_type: MetricValueType,
    pub(crate) base: MetricBase,
    pub(crate) exponent: i64,
    pub(crate) unit: StringHandle,
    pub(crate) profiling_type: MetricProfilingType,
    pub(crate) parent: MetricHandle,
}

impl DefinitionManager {
    pub(crate) fn define_metric(&mut self, fields: MetricFields) -> Result<Interned<MetricDef>> {
        self.intern(MetricDef {
            header: DefinitionHeader::new(),
            name: fields.name,
            description: fields.description,
            source_type: fields.source_type,
            mode: fields.mode,
            value_type: fields.value_type,
            base: fields.base,
            exponent: fields.exponent,
            unit: fields.unit,
            profiling_type: fields.profiling_type,
            parent: fields.parent,
        })
    }
}

impl Definitions {
    /// Define a metric.
    ///
    /// Missing strings default to `"<unknown metric>"` for the name, `""` for
    /// the description and `"#"` for the unit.
    #[allow(clippy::too_many_arguments)]
    pub fn new_metric(
        &self,
        name: Option<&str>,
        description: Option<&str>,
        source_type: MetricSourceType,
        mode: MetricMode,
        value_type: MetricValueType,
        base: MetricBase,
        exponent: i64,
        unit: Option<&str>,
        profiling_type: MetricProfilingType,
        parent: MetricHandle,
    ) -> Result<MetricHandle> {
        self.define(|local| {
            let fields = MetricFields {
                name: local.define_string_or(name, "<unknown metric>")?,
                description: local.define_string_or(description, "")?,
                source_type,
                mode,
                value_type,
                base,
                exponent,
                unit: local.define_string_or(unit, "#")?,
                profiling_type,
                parent,
            };
            local.define_metric(fields)
        })
    }

    /// Value type of a metric.
    #[must_use]
    pub fn metric_value_type(&self, metric: MetricHandle) -> MetricValueType {
        self.lock().get(metric).value_type
    }

    /// Name of a metric.
    #[must_use]
    pub fn metric_name(&self, metric: MetricHandle) -> Arc<str> {
        let local = self.lock();
        Arc::clone(&local.get(local.get(metric).name).value)
    }

    /// Profiling type of a metric.
    #[must_use]
    pub fn metric_profiling_type(&self, metric: MetricHandle) -> MetricProfilingType {
        self.lock().get(metric).profiling_type
    }

    /// Parent of a metric.
    #[must_use]
    pub fn metric_parent(&self, metric: MetricHandle) -> MetricHandle {
        self.lock().get(metric).parent
    }

    /// Sampling mode of a metric.
    #[must_use]
    pub fn metric_mode(&self, metric: MetricHandle) -> MetricMode {
        self.lock().get(metric).mode
    }

    /// Source type of a metric.
    #[must_use]
    pub fn metric_source_type(&self, metric: MetricHandle) -> MetricSourceType {
        self.lock().get(metric).source_type
    }

    /// Unified counterpart of a metric, `INVALID` before unification.
    #[must_use]
    pub fn metric_unified(&self, metric: MetricHandle) -> MetricHandle {
        self.lock().unified(metric)
    }
}

/// Re-create a local metric in the unified manager.
pub fn unify_metric(
    source: &mut DefinitionManager,
    handle: MetricHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::Metric;
    let fields = MetricFields {
        name: source.unified_handle(kind, "name", definition.name)?,
        description: source.unified_handle(kind, "description", definition.description)?,
        source_type: definition.source_type,
        mode: definition.mode,
        value_type: definition.value_type,
        base: definition.base,
        exponent: definition.exponent,
        unit: source.unified_handle(kind, "unit", definition.unit)?,
        profiling_type: definition.profiling_type,
        parent: source.optional_unified(kind, "parent", definition.parent)?,
    };
    let counterpart = unified.define_metric(fields)?.handle();
    source.set_unified(handle, counterpart)
}
