//! Source code location definitions.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::paths::simplify_path;
use crate::types::Handle;

/// Handle to a [`SourceCodeLocationDef`].
pub type SourceCodeLocationHandle = Handle<SourceCodeLocationDef>;

/// A (file, line) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCodeLocationDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) file: StringHandle,
    pub(crate) line: u32,
}

impl SourceCodeLocationDef {
    /// The simplified file path.
    #[must_use]
    pub fn file(&self) -> StringHandle {
        self.file
    }

    /// The line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Definition for SourceCodeLocationDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.file)
            .pod(self.line)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.file == candidate.file && existing.line == candidate.line
    }
}

impl DefinitionManager {
    /// Intern a source code location.
    pub fn define_source_code_location(
        &mut self,
        file: StringHandle,
        line: u32,
    ) -> Result<Interned<SourceCodeLocationDef>> {
        self.intern(SourceCodeLocationDef {
            header: DefinitionHeader::new(),
            file,
            line,
        })
    }
}

impl Definitions {
    /// Define a source code location. The path is simplified before interning.
    pub fn new_source_code_location(
        &self,
        file: Option<&str>,
        line: u32,
    ) -> Result<SourceCodeLocationHandle> {
        let path = simplify_path(file.unwrap_or("<unknown source file>"));
        self.define(|local| {
            let file = local.define_string(&path)?.handle();
            local.define_source_code_location(file, line)
        })
    }
}

/// Re-create a local source code location in the unified manager.
pub fn unify_source_code_location(
    source: &mut DefinitionManager,
    handle: SourceCodeLocationHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let line = definition.line;
    let file = source.unified_handle(HandleType::SourceCodeLocation, "file", definition.file)?;
    let counterpart = unified.define_source_code_location(file, line)?.handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    #[test]
    fn line_is_part_of_identity() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let a = definitions.new_source_code_location(Some("x/../a.c"), 10).unwrap();
        let b = definitions.new_source_code_location(Some("a.c"), 10).unwrap();
        let c = definitions.new_source_code_location(Some("a.c"), 11).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let local = definitions.lock();
        assert_eq!(local.get(c).line(), 11);
        assert_eq!(local.string(local.get(c).file()), "a.c");
    }
}
