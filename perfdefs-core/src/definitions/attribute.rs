//! Attribute definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AttributeType, Handle};

/// Handle to an [`AttributeDef`].
pub type AttributeHandle = Handle<AttributeDef>;

/// A typed key that events can carry values for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) description: StringHandle,
    pub(crate) attribute_type: AttributeType,
}

impl AttributeDef {
    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> StringHandle {
        self.description
    }

    /// Value type.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }
}

impl Definition for AttributeDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .handle(self.description)
            .pod(self.attribute_type)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
            && existing.description == candidate.description
            && existing.attribute_type == candidate.attribute_type
    }
}

impl DefinitionManager {
    /// Intern an attribute.
    pub fn define_attribute(
        &mut self,
        name: StringHandle,
        description: StringHandle,
        attribute_type: AttributeType,
    ) -> Result<Interned<AttributeDef>> {
        self.intern(AttributeDef {
            header: DefinitionHeader::new(),
            name,
            description,
            attribute_type,
        })
    }
}

impl Definitions {
    /// Define an attribute.
    ///
    /// A missing name becomes `"<unknown attribute>"`, a missing description `""`.
    pub fn new_attribute(
        &self,
        name: Option<&str>,
        description: Option<&str>,
        attribute_type: AttributeType,
    ) -> Result<AttributeHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "<unknown attribute>")?;
            let description = local.define_string_or(description, "")?;
            local.define_attribute(name, description, attribute_type)
        })
    }
}

/// Re-create a local attribute in the unified manager.
pub fn unify_attribute(
    source: &mut DefinitionManager,
    handle: AttributeHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (name, description, attribute_type) =
        (definition.name, definition.description, definition.attribute_type);
    let kind = HandleType::Attribute;
    let name = source.unified_handle(kind, "name", name)?;
    let description = source.unified_handle(kind, "description", description)?;

    let counterpart = unified
        .define_attribute(name, description, attribute_type)?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::substrate::RecordingNotifier;
    use std::sync::Arc;

    #[test]
    fn duplicates_are_reported_once() {
        let recorder = Arc::new(RecordingNotifier::new());
        let definitions = Definitions::new(DefinitionsConfig::default())
            .unwrap()
            .with_substrate(recorder.clone());
        let first = definitions
            .new_attribute(Some("bytes"), Some("transferred"), AttributeType::Uint64)
            .unwrap();
        let second = definitions
            .new_attribute(Some("bytes"), Some("transferred"), AttributeType::Uint64)
            .unwrap();
        let other = definitions
            .new_attribute(Some("bytes"), None, AttributeType::Uint64)
            .unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(recorder.count_of(HandleType::Attribute), 2);
    }
}
