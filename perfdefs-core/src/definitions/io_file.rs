//! I/O files and their properties.

use super::{Definition, HandleType, StringHandle, SystemTreeNodeHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::Handle;

/// Handle to an [`IoFileDef`].
pub type IoFileHandle = Handle<IoFileDef>;

/// Handle to an [`IoFilePropertyDef`].
pub type IoFilePropertyHandle = Handle<IoFilePropertyDef>;

/// A file accessed through an I/O paradigm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFileDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) file_name: StringHandle,
    pub(crate) scope: SystemTreeNodeHandle,
    pub(crate) properties: IoFilePropertyHandle,
    pub(crate) properties_tail: IoFilePropertyHandle,
}

impl IoFileDef {
    /// File name.
    #[must_use]
    pub fn file_name(&self) -> StringHandle {
        self.file_name
    }

    /// System tree node the file name is valid on, `INVALID` if global.
    #[must_use]
    pub fn scope(&self) -> SystemTreeNodeHandle {
        self.scope
    }

    /// First property, `INVALID` if there is none.
    #[must_use]
    pub fn first_property(&self) -> IoFilePropertyHandle {
        self.properties
    }
}

impl Definition for IoFileDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.file_name)
            .optional_handle(self.scope)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.file_name == candidate.file_name && existing.scope == candidate.scope
    }
}

/// A key/value property of an I/O file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFilePropertyDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) io_file: IoFileHandle,
    pub(crate) key: StringHandle,
    pub(crate) value: StringHandle,
    pub(crate) next_property: IoFilePropertyHandle,
}

impl IoFilePropertyDef {
    /// The owning file.
    #[must_use]
    pub fn io_file(&self) -> IoFileHandle {
        self.io_file
    }

    /// Property key.
    #[must_use]
    pub fn key(&self) -> StringHandle {
        self.key
    }

    /// Property value.
    #[must_use]
    pub fn value(&self) -> StringHandle {
        self.value
    }

    /// Next property of the same file.
    #[must_use]
    pub fn next_property(&self) -> IoFilePropertyHandle {
        self.next_property
    }
}

impl Definition for IoFilePropertyDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.io_file)
            .handle(self.key)
            .handle(self.value)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.io_file == candidate.io_file
            && existing.key == candidate.key
            && existing.value == candidate.value
    }
}

impl DefinitionManager {
    /// Intern an I/O file.
    pub fn define_io_file(
        &mut self,
        file_name: StringHandle,
        scope: SystemTreeNodeHandle,
    ) -> Result<Interned<IoFileDef>> {
        self.intern(IoFileDef {
            header: DefinitionHeader::new(),
            file_name,
            scope,
            properties: Handle::INVALID,
            properties_tail: Handle::INVALID,
        })
    }

    /// Intern a file property and chain it onto its file.
    pub fn define_io_file_property(
        &mut self,
        io_file: IoFileHandle,
        key: StringHandle,
        value: StringHandle,
    ) -> Result<Interned<IoFilePropertyDef>> {
        let interned = self.intern(IoFilePropertyDef {
            header: DefinitionHeader::new(),
            io_file,
            key,
            value,
            next_property: Handle::INVALID,
        })?;
        if let Interned::Created(property) = interned {
            let tail = self.get(io_file).properties_tail;
            if tail.is_valid() {
                self.get_mut(tail).next_property = property;
            } else {
                self.get_mut(io_file).properties = property;
            }
            self.get_mut(io_file).properties_tail = property;
        }
        Ok(interned)
    }

    /// Properties of a file, in insertion order.
    #[must_use]
    pub fn io_file_properties(&self, io_file: IoFileHandle) -> Vec<IoFilePropertyHandle> {
        std::iter::successors(
            Some(self.get(io_file).properties).filter(Handle::is_valid),
            |&property| Some(self.get(property).next_property).filter(Handle::is_valid),
        )
        .collect()
    }
}

impl Definitions {
    /// Define an I/O file.
    pub fn new_io_file(&self, file_name: &str, scope: SystemTreeNodeHandle) -> Result<IoFileHandle> {
        self.define(|local| {
            let file_name = local.define_string(file_name)?.handle();
            local.define_io_file(file_name, scope)
        })
    }

    /// Attach a key/value property to an I/O file.
    pub fn new_io_file_property(
        &self,
        io_file: IoFileHandle,
        key: &str,
        value: &str,
    ) -> Result<IoFilePropertyHandle> {
        self.define(|local| {
            let key = local.define_string(key)?.handle();
            let value = local.define_string(value)?.handle();
            local.define_io_file_property(io_file, key, value)
        })
    }
}

/// Re-create a local I/O file in the unified manager.
pub fn unify_io_file(
    source: &mut DefinitionManager,
    handle: IoFileHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (file_name, scope) = (definition.file_name, definition.scope);
    let kind = HandleType::IoFile;
    let file_name = source.unified_handle(kind, "file name", file_name)?;
    let scope = source.optional_unified(kind, "scope", scope)?;

    let counterpart = unified.define_io_file(file_name, scope)?.handle();
    source.set_unified(handle, counterpart)
}

/// Re-create a local file property under the unified file.
pub fn unify_io_file_property(
    source: &mut DefinitionManager,
    handle: IoFilePropertyHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (io_file, key, value) = (definition.io_file, definition.key, definition.value);
    let kind = HandleType::IoFileProperty;
    let io_file = source.unified_handle(kind, "I/O file", io_file)?;
    let key = source.unified_handle(kind, "key", key)?;
    let value = source.unified_handle(kind, "value", value)?;

    let counterpart = unified
        .define_io_file_property(io_file, key, value)?
        .handle();
    source.set_unified(handle, counterpart)
}
