//! I/O paradigm definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{
    AnyHandle, Handle, IoParadigmClass, IoParadigmFlags, IoParadigmProperty, IoParadigmType,
};

/// Handle to an [`IoParadigmDef`].
pub type IoParadigmHandle = Handle<IoParadigmDef>;

/// An I/O paradigm such as POSIX or ISO C I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoParadigmDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) paradigm_type: IoParadigmType,
    pub(crate) identification: StringHandle,
    pub(crate) name: StringHandle,
    pub(crate) paradigm_class: IoParadigmClass,
    pub(crate) flags: IoParadigmFlags,
    pub(crate) properties: [AnyHandle; IoParadigmProperty::COUNT],
}

impl IoParadigmDef {
    /// The paradigm type.
    #[must_use]
    pub fn paradigm_type(&self) -> IoParadigmType {
        self.paradigm_type
    }

    /// Machine-readable identification, e.g. `"POSIX"`.
    #[must_use]
    pub fn identification(&self) -> StringHandle {
        self.identification
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Serial or parallel I/O.
    #[must_use]
    pub fn paradigm_class(&self) -> IoParadigmClass {
        self.paradigm_class
    }

    /// Paradigm flags.
    #[must_use]
    pub fn flags(&self) -> IoParadigmFlags {
        self.flags
    }

    /// Value of a property, `INVALID` if unset.
    #[must_use]
    pub fn property(&self, property: IoParadigmProperty) -> AnyHandle {
        self.properties[property.index()]
    }
}

impl Definition for IoParadigmDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .pod(self.paradigm_type)
            .handle(self.identification)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.paradigm_type == candidate.paradigm_type
            && existing.identification == candidate.identification
    }
}

impl DefinitionManager {
    /// Intern an I/O paradigm.
    pub fn define_io_paradigm(
        &mut self,
        paradigm_type: IoParadigmType,
        identification: StringHandle,
        name: StringHandle,
        paradigm_class: IoParadigmClass,
        flags: IoParadigmFlags,
    ) -> Result<Interned<IoParadigmDef>> {
        self.intern(IoParadigmDef {
            header: DefinitionHeader::new(),
            paradigm_type,
            identification,
            name,
            paradigm_class,
            flags,
            properties: [AnyHandle::INVALID; IoParadigmProperty::COUNT],
        })
    }

    /// Set an I/O paradigm property. Each property can be set once.
    pub fn set_io_paradigm_property(
        &mut self,
        paradigm: IoParadigmHandle,
        property: IoParadigmProperty,
        value: AnyHandle,
    ) -> Result<()> {
        let slot = &mut self.get_mut(paradigm).properties[property.index()];
        if slot.is_valid() {
            return Err(DefinitionsError::PropertyAlreadySet {
                owner: HandleType::IoParadigm,
                property: property.to_string(),
            });
        }
        *slot = value;
        Ok(())
    }
}

impl Definitions {
    /// Define an I/O paradigm.
    pub fn new_io_paradigm(
        &self,
        paradigm_type: IoParadigmType,
        identification: &str,
        name: &str,
        paradigm_class: IoParadigmClass,
        flags: IoParadigmFlags,
    ) -> Result<IoParadigmHandle> {
        self.define(|local| {
            let identification = local.define_string(identification)?.handle();
            let name = local.define_string(name)?.handle();
            local.define_io_paradigm(paradigm_type, identification, name, paradigm_class, flags)
        })
    }

    /// Set an I/O paradigm property to a string value.
    pub fn io_paradigm_set_property(
        &self,
        paradigm: IoParadigmHandle,
        property: IoParadigmProperty,
        value: &str,
    ) -> Result<()> {
        let value = self.new_string(value)?;
        self.lock()
            .set_io_paradigm_property(paradigm, property, value.any())
    }
}

/// Re-create a local I/O paradigm, and its properties, in the unified manager.
pub fn unify_io_paradigm(
    source: &mut DefinitionManager,
    handle: IoParadigmHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::IoParadigm;
    let identification = source.unified_handle(kind, "identification", definition.identification)?;
    let name = source.unified_handle(kind, "name", definition.name)?;
    let counterpart = unified
        .define_io_paradigm(
            definition.paradigm_type,
            identification,
            name,
            definition.paradigm_class,
            definition.flags,
        )?
        .handle();

    for property in IoParadigmProperty::ALL {
        let value = source.optional_unified_any(kind, "property", definition.property(property))?;
        if value.is_valid() && unified.get(counterpart).property(property) != value {
            unified.set_io_paradigm_property(counterpart, property, value)?;
        }
    }

    source.set_unified(handle, counterpart)
}
