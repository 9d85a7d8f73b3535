//! Call path definitions.
//!
//! Call paths are created by profile post-processing rather than during
//! measurement, so substrates are not told about them.

use super::{Definition, HandleType, ParameterHandle, RegionHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::Handle;

/// Handle to a [`CallpathDef`].
pub type CallpathHandle = Handle<CallpathDef>;

/// Value of a call path parameter. The variant matches the parameter's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterValue {
    /// Value of an `Int64` parameter.
    Int(i64),
    /// Value of a `Uint64` parameter.
    Uint(u64),
    /// Value of a `String` parameter.
    String(StringHandle),
}

/// One parameter/value pair of a call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallpathParameter {
    /// The parameter.
    pub parameter: ParameterHandle,
    /// Its value.
    pub value: ParameterValue,
}

impl CallpathParameter {
    /// Pair a parameter with a value.
    #[must_use]
    pub fn new(parameter: ParameterHandle, value: ParameterValue) -> Self {
        Self { parameter, value }
    }
}

/// A node of the call tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallpathDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) parent: CallpathHandle,
    pub(crate) region: RegionHandle,
    pub(crate) parameters: Box<[CallpathParameter]>,
}

impl CallpathDef {
    /// Parent call path, `INVALID` for roots.
    #[must_use]
    pub fn parent(&self) -> CallpathHandle {
        self.parent
    }

    /// The region, `INVALID` for parameter nodes.
    #[must_use]
    pub fn region(&self) -> RegionHandle {
        self.region
    }

    /// Parameter/value pairs, in order.
    #[must_use]
    pub fn parameters(&self) -> &[CallpathParameter] {
        &self.parameters
    }
}

impl Definition for CallpathDef {
    const SUBSTRATE_AWARE: bool = false;

    fn key_hash(&self, arena: &PageManager) -> u32 {
        let hasher = KeyHasher::new(arena)
            .optional_handle(self.parent)
            .optional_handle(self.region)
            .pod(self.parameters.len() as u32);
        self.parameters
            .iter()
            .fold(hasher, |hasher, pair| {
                let hasher = hasher.handle(pair.parameter);
                match pair.value {
                    ParameterValue::Int(value) => hasher.pod(value),
                    ParameterValue::Uint(value) => hasher.pod(value),
                    ParameterValue::String(value) => hasher.handle(value),
                }
            })
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.parent == candidate.parent
            && existing.region == candidate.region
            && existing.parameters == candidate.parameters
    }

    fn variable_size(&self) -> usize {
        std::mem::size_of_val::<[CallpathParameter]>(&self.parameters)
    }
}

impl DefinitionManager {
    /// Intern a call path.
    pub fn define_callpath(
        &mut self,
        parent: CallpathHandle,
        region: RegionHandle,
        parameters: &[CallpathParameter],
    ) -> Result<Interned<CallpathDef>> {
        self.intern(CallpathDef {
            header: DefinitionHeader::new(),
            parent,
            region,
            parameters: parameters.into(),
        })
    }
}

impl Definitions {
    /// Define a call path.
    pub fn new_callpath(
        &self,
        parent: CallpathHandle,
        region: RegionHandle,
        parameters: &[CallpathParameter],
    ) -> Result<CallpathHandle> {
        self.define(|local| local.define_callpath(parent, region, parameters))
    }
}

/// Re-create a local call path in the unified manager.
pub fn unify_callpath(
    source: &mut DefinitionManager,
    handle: CallpathHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::Callpath;
    let parent = source.optional_unified(kind, "parent", definition.parent)?;
    let region = source.optional_unified(kind, "region", definition.region)?;
    let parameters = definition
        .parameters
        .iter()
        .map(|pair| {
            let parameter = source.unified_handle(kind, "parameter", pair.parameter)?;
            let value = match pair.value {
                ParameterValue::String(value) => {
                    ParameterValue::String(source.unified_handle(kind, "parameter value", value)?)
                }
                integer => integer,
            };
            Ok(CallpathParameter::new(parameter, value))
        })
        .collect::<Result<Vec<_>>>()?;

    let counterpart = unified
        .define_callpath(parent, region, &parameters)?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::substrate::RecordingNotifier;
    use crate::types::{ParadigmType, ParameterType, RegionType};
    use std::sync::Arc;

    #[test]
    fn parameters_take_part_in_identity() {
        let recorder = Arc::new(RecordingNotifier::new());
        let definitions = Definitions::new(DefinitionsConfig::default())
            .unwrap()
            .with_substrate(recorder.clone());
        let region = definitions
            .new_region(
                Some("solve"),
                None,
                Handle::INVALID,
                1,
                9,
                ParadigmType::User,
                RegionType::Function,
            )
            .unwrap();
        let level = definitions
            .new_parameter(Some("level"), ParameterType::Int64)
            .unwrap();
        let mode = definitions
            .new_parameter(Some("mode"), ParameterType::String)
            .unwrap();
        let fast = definitions.new_string("fast").unwrap();

        let root = definitions
            .new_callpath(Handle::INVALID, region, &[])
            .unwrap();
        let pairs = [
            CallpathParameter::new(level, ParameterValue::Int(3)),
            CallpathParameter::new(mode, ParameterValue::String(fast)),
        ];
        let child = definitions.new_callpath(root, region, &pairs).unwrap();
        let twin = definitions.new_callpath(root, region, &pairs).unwrap();
        assert_ne!(child, twin);
        assert_eq!(recorder.count_of(HandleType::Callpath), 0);

        let mut source = definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        crate::unify::copy_definitions_to_unified(&mut source, &mut unified).unwrap();

        assert_eq!(source.unified(child), source.unified(twin));
        let unified_child = unified.get(source.unified(child));
        assert_eq!(unified_child.parent(), source.unified(root));
        assert_eq!(
            unified_child.parameters()[1].value,
            ParameterValue::String(source.unified(fast))
        );
        assert_eq!(unified.count::<CallpathDef>(), 2);
    }
}
