//! Source file definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::paths::simplify_path;
use crate::types::Handle;

/// Handle to a [`SourceFileDef`].
pub type SourceFileHandle = Handle<SourceFileDef>;

/// A source file, identified by its simplified path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
}

impl SourceFileDef {
    /// The simplified file path.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }
}

impl Definition for SourceFileDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena).handle(self.name).finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
    }
}

impl DefinitionManager {
    /// Intern a source file whose name string already exists in this manager.
    pub fn define_source_file(&mut self, name: StringHandle) -> Result<Interned<SourceFileDef>> {
        self.intern(SourceFileDef {
            header: DefinitionHeader::new(),
            name,
        })
    }
}

impl Definitions {
    /// Define a source file. The path is simplified before interning.
    pub fn new_source_file(&self, name: Option<&str>) -> Result<SourceFileHandle> {
        let path = simplify_path(name.unwrap_or("<unknown source file>"));
        self.define(|local| {
            let name = local.define_string(&path)?.handle();
            local.define_source_file(name)
        })
    }
}

/// Re-create a local source file in the unified manager.
pub fn unify_source_file(
    source: &mut DefinitionManager,
    handle: SourceFileHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let name = source.unified_handle(HandleType::SourceFile, "name", definition.name)?;
    let counterpart = unified.define_source_file(name)?.handle();
    source.set_unified(handle, counterpart)
}
