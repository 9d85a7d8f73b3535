//! Paradigm definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AnyHandle, Handle, ParadigmClass, ParadigmFlags, ParadigmProperty, ParadigmType};

/// Handle to a [`ParadigmDef`].
pub type ParadigmHandle = Handle<ParadigmDef>;

/// An instrumentation paradigm. Identified by its type alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParadigmDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) paradigm_type: ParadigmType,
    pub(crate) paradigm_class: ParadigmClass,
    pub(crate) flags: ParadigmFlags,
    pub(crate) properties: [AnyHandle; ParadigmProperty::COUNT],
}

impl ParadigmDef {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// The paradigm type.
    #[must_use]
    pub fn paradigm_type(&self) -> ParadigmType {
        self.paradigm_type
    }

    /// The paradigm class.
    #[must_use]
    pub fn paradigm_class(&self) -> ParadigmClass {
        self.paradigm_class
    }

    /// Paradigm flags.
    #[must_use]
    pub fn flags(&self) -> ParadigmFlags {
        self.flags
    }

    /// Value of a property, `INVALID` if unset.
    #[must_use]
    pub fn property(&self, property: ParadigmProperty) -> AnyHandle {
        self.properties[property.index()]
    }
}

impl Definition for ParadigmDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena).pod(self.paradigm_type).finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.paradigm_type == candidate.paradigm_type
    }
}

impl DefinitionManager {
    /// Intern a paradigm.
    pub fn define_paradigm(
        &mut self,
        paradigm_type: ParadigmType,
        paradigm_class: ParadigmClass,
        name: StringHandle,
        flags: ParadigmFlags,
    ) -> Result<Interned<ParadigmDef>> {
        self.intern(ParadigmDef {
            header: DefinitionHeader::new(),
            name,
            paradigm_type,
            paradigm_class,
            flags,
            properties: [AnyHandle::INVALID; ParadigmProperty::COUNT],
        })
    }

    /// Set a paradigm property. Each property can be set once.
    pub fn set_paradigm_property(
        &mut self,
        paradigm: ParadigmHandle,
        property: ParadigmProperty,
        value: AnyHandle,
    ) -> Result<()> {
        let slot = &mut self.get_mut(paradigm).properties[property.index()];
        if slot.is_valid() {
            return Err(DefinitionsError::PropertyAlreadySet {
                owner: HandleType::Paradigm,
                property: property.to_string(),
            });
        }
        *slot = value;
        Ok(())
    }
}

impl Definitions {
    /// Define a paradigm.
    pub fn new_paradigm(
        &self,
        paradigm_type: ParadigmType,
        paradigm_class: ParadigmClass,
        name: &str,
        flags: ParadigmFlags,
    ) -> Result<ParadigmHandle> {
        self.define(|local| {
            let name = local.define_string(name)?.handle();
            local.define_paradigm(paradigm_type, paradigm_class, name, flags)
        })
    }

    /// Set a paradigm property, e.g. the communicator name template.
    pub fn paradigm_set_property(
        &self,
        paradigm: ParadigmHandle,
        property: ParadigmProperty,
        value: AnyHandle,
    ) -> Result<()> {
        self.lock().set_paradigm_property(paradigm, property, value)
    }
}

/// Re-create a local paradigm, and its properties, in the unified manager.
pub fn unify_paradigm(
    source: &mut DefinitionManager,
    handle: ParadigmHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let name = source.unified_handle(HandleType::Paradigm, "name", definition.name)?;
    let counterpart = unified
        .define_paradigm(
            definition.paradigm_type,
            definition.paradigm_class,
            name,
            definition.flags,
        )?
        .handle();

    for property in ParadigmProperty::ALL {
        let value = source.optional_unified_any(
            HandleType::Paradigm,
            "property",
            definition.property(property),
        )?;
        // Another process may already have carried the same value over.
        if value.is_valid() && unified.get(counterpart).property(property) != value {
            unified.set_paradigm_property(counterpart, property, value)?;
        }
    }

    source.set_unified(handle, counterpart)
}
