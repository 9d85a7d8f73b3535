//! Region definitions.

use super::{Definition, HandleType, SourceFileHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, ParadigmType, RegionType};

/// Handle to a [`RegionDef`].
pub type RegionHandle = Handle<RegionDef>;

/// A code region.
///
/// The group name can be assigned after creation and is not part of the
/// region's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) canonical_name: StringHandle,
    pub(crate) description: StringHandle,
    pub(crate) region_type: RegionType,
    pub(crate) file_name: StringHandle,
    pub(crate) begin_line: u32,
    pub(crate) end_line: u32,
    pub(crate) paradigm: ParadigmType,
    pub(crate) group_name: StringHandle,
}

impl RegionDef {
    /// Demangled name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Mangled name.
    #[must_use]
    pub fn canonical_name(&self) -> StringHandle {
        self.canonical_name
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> StringHandle {
        self.description
    }

    /// Role of the region.
    #[must_use]
    pub fn region_type(&self) -> RegionType {
        self.region_type
    }

    /// File the region is defined in, if known.
    #[must_use]
    pub fn file_name(&self) -> Option<StringHandle> {
        self.file_name.is_valid().then_some(self.file_name)
    }

    /// First line.
    #[must_use]
    pub fn begin_line(&self) -> u32 {
        self.begin_line
    }

    /// Last line.
    #[must_use]
    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    /// Paradigm that instruments the region.
    #[must_use]
    pub fn paradigm(&self) -> ParadigmType {
        self.paradigm
    }

    /// Group the region was assigned to, if any.
    #[must_use]
    pub fn group_name(&self) -> Option<StringHandle> {
        self.group_name.is_valid().then_some(self.group_name)
    }
}

impl Definition for RegionDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .handle(self.canonical_name)
            .handle(self.description)
            .pod(self.region_type)
            .optional_handle(self.file_name)
            .pod(self.begin_line)
            .pod(self.end_line)
            .pod(self.paradigm)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
            && existing.canonical_name == candidate.canonical_name
            && existing.description == candidate.description
            && existing.region_type == candidate.region_type
            && existing.file_name == candidate.file_name
            && existing.begin_line == candidate.begin_line
            && existing.end_line == candidate.end_line
            && existing.paradigm == candidate.paradigm
    }
}

/// Field values of a region, as passed to [`DefinitionManager::define_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegionFields {
    pub(crate) name: StringHandle,
    pub(crate) canonical_name: StringHandle,
    pub(crate) description: StringHandle,
    pub(crate) file_name: StringHandle,
    pub(crate) begin_line: u32,
    pub(crate) end_line: u32,
    pub(crate) paradigm: ParadigmType,
    pub(crate) region_type: RegionType,
    pub(crate) group_name: StringHandle,
}

impl DefinitionManager {
    pub(crate) fn define_region(&mut self, fields: RegionFields) -> Result<Interned<RegionDef>> {
        self.intern(RegionDef {
            header: DefinitionHeader::new(),
            name: fields.name,
            canonical_name: fields.canonical_name,
            description: fields.description,
            region_type: fields.region_type,
            file_name: fields.file_name,
            begin_line: fields.begin_line,
            end_line: fields.end_line,
            paradigm: fields.paradigm,
            group_name: fields.group_name,
        })
    }
}

impl Definitions {
    /// Define a region.
    ///
    /// A missing name becomes `"<unknown region>"`; a missing canonical name
    /// defaults to the name.
    #[allow(clippy::too_many_arguments)]
    pub fn new_region(
        &self,
        name: Option<&str>,
        canonical_name: Option<&str>,
        file: SourceFileHandle,
        begin_line: u32,
        end_line: u32,
        paradigm: ParadigmType,
        region_type: RegionType,
    ) -> Result<RegionHandle> {
        let name = name.unwrap_or("<unknown region>");
        let canonical_name = canonical_name.unwrap_or(name);
        self.define(|local| {
            let file_name = if file.is_valid() {
                local.get(file).name
            } else {
                StringHandle::INVALID
            };
            let fields = RegionFields {
                name: local.define_string(name)?.handle(),
                canonical_name: local.define_string(canonical_name)?.handle(),
                description: local.define_string("")?.handle(),
                file_name,
                begin_line,
                end_line,
                paradigm,
                region_type,
                group_name: StringHandle::INVALID,
            };
            local.define_region(fields)
        })
    }

    /// Assign a region to a named group.
    pub fn region_set_group(&self, region: RegionHandle, group_name: &str) -> Result<()> {
        let mut local = self.lock();
        let group_name = local.define_string(group_name)?.handle();
        local.get_mut(region).group_name = group_name;
        Ok(())
    }
}

/// Re-create a local region in the unified manager.
pub fn unify_region(
    source: &mut DefinitionManager,
    handle: RegionHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::Region;
    let fields = RegionFields {
        name: source.unified_handle(kind, "name", definition.name)?,
        canonical_name: source.unified_handle(kind, "canonical name", definition.canonical_name)?,
        description: source.unified_handle(kind, "description", definition.description)?,
        file_name: source.optional_unified(kind, "file name", definition.file_name)?,
        begin_line: definition.begin_line,
        end_line: definition.end_line,
        paradigm: definition.paradigm,
        region_type: definition.region_type,
        group_name: source.optional_unified(kind, "group name", definition.group_name)?,
    };
    let counterpart = unified.define_region(fields)?.handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    fn region(
        definitions: &Definitions,
        file: SourceFileHandle,
        end_line: u32,
    ) -> RegionHandle {
        definitions
            .new_region(
                Some("foo"),
                None,
                file,
                10,
                end_line,
                ParadigmType::User,
                RegionType::Function,
            )
            .unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let handle = definitions
            .new_region(
                None,
                None,
                Handle::INVALID,
                0,
                0,
                ParadigmType::Compiler,
                RegionType::Unknown,
            )
            .unwrap();

        let local = definitions.lock();
        let region = local.get(handle);
        assert_eq!(local.string(region.name()), "<unknown region>");
        assert_eq!(region.canonical_name(), region.name());
        assert_eq!(local.string(region.description()), "");
        assert_eq!(region.file_name(), None);
    }

    #[test]
    fn group_name_does_not_affect_identity() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let file = definitions.new_source_file(Some("a.c")).unwrap();
        let first = region(&definitions, file, 20);
        definitions.region_set_group(first, "solvers").unwrap();
        assert_eq!(region(&definitions, file, 20), first);
        assert_ne!(region(&definitions, file, 21), first);

        let local = definitions.lock();
        let group = local.get(first).group_name().unwrap();
        assert_eq!(local.string(group), "solvers");
    }

    #[test]
    fn unify_reports_missing_file_name() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let file = definitions.new_source_file(Some("a.c")).unwrap();
        let handle = region(&definitions, file, 20);

        let mut source = definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        let name = source.get(handle).name();
        let description = source.get(handle).description();
        for string in [name, description] {
            crate::definitions::unify_string(&mut source, string, &mut unified).unwrap();
        }

        let err = unify_region(&mut source, handle, &mut unified).unwrap_err();
        assert!(err.to_string().contains("file name"));
    }
}
