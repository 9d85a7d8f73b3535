//! Parameter definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, ParameterType};

/// Handle to a [`ParameterDef`].
pub type ParameterHandle = Handle<ParameterDef>;

/// A named parameter whose values refine call paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) parameter_type: ParameterType,
}

impl ParameterDef {
    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Value type.
    #[must_use]
    pub fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }
}

impl Definition for ParameterDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .pod(self.parameter_type)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name && existing.parameter_type == candidate.parameter_type
    }
}

impl DefinitionManager {
    /// Intern a parameter.
    pub fn define_parameter(
        &mut self,
        name: StringHandle,
        parameter_type: ParameterType,
    ) -> Result<Interned<ParameterDef>> {
        self.intern(ParameterDef {
            header: DefinitionHeader::new(),
            name,
            parameter_type,
        })
    }
}

impl Definitions {
    /// Define a parameter. A missing name becomes `"<unknown parameter>"`.
    pub fn new_parameter(
        &self,
        name: Option<&str>,
        parameter_type: ParameterType,
    ) -> Result<ParameterHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "<unknown parameter>")?;
            local.define_parameter(name, parameter_type)
        })
    }
}

/// Re-create a local parameter in the unified manager.
pub fn unify_parameter(
    source: &mut DefinitionManager,
    handle: ParameterHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let parameter_type = definition.parameter_type;
    let name = source.unified_handle(HandleType::Parameter, "name", definition.name)?;
    let counterpart = unified.define_parameter(name, parameter_type)?.handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    #[test]
    fn name_and_type_identify_a_parameter() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let size = definitions
            .new_parameter(Some("size"), ParameterType::Uint64)
            .unwrap();
        let again = definitions
            .new_parameter(Some("size"), ParameterType::Uint64)
            .unwrap();
        let signed = definitions
            .new_parameter(Some("size"), ParameterType::Int64)
            .unwrap();
        assert_eq!(size, again);
        assert_ne!(size, signed);

        let unknown = definitions.new_parameter(None, ParameterType::String).unwrap();
        let local = definitions.lock();
        assert_eq!(local.string(local.get(unknown).name()), "<unknown parameter>");
    }
}
