//! Group definitions: typed, named lists of 64-bit ids.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{GroupType, Handle};

/// Handle to a [`GroupDef`].
pub type GroupHandle = Handle<GroupDef>;

/// A group of ids, e.g. the ranks of a communicator or the regions of a
/// region group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) group_type: GroupType,
    pub(crate) name: StringHandle,
    pub(crate) members: Box<[u64]>,
}

impl GroupDef {
    /// What the member ids refer to.
    #[must_use]
    pub fn group_type(&self) -> GroupType {
        self.group_type
    }

    /// Group name. `INVALID` until named.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Member ids.
    #[must_use]
    pub fn members(&self) -> &[u64] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn number_of_members(&self) -> usize {
        self.members.len()
    }
}

impl Definition for GroupDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .pod(self.group_type)
            .optional_handle(self.name)
            .pod(self.members.len() as u64)
            .array(&self.members)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.group_type == candidate.group_type
            && existing.name == candidate.name
            && existing.members == candidate.members
    }

    fn variable_size(&self) -> usize {
        std::mem::size_of_val(&*self.members)
    }
}

fn widen(members: &[u32]) -> Vec<u64> {
    members.iter().map(|&member| u64::from(member)).collect()
}

impl DefinitionManager {
    /// Intern a group.
    pub fn define_group(
        &mut self,
        group_type: GroupType,
        name: StringHandle,
        members: &[u64],
    ) -> Result<Interned<GroupDef>> {
        self.intern(GroupDef {
            header: DefinitionHeader::new(),
            group_type,
            name,
            members: members.into(),
        })
    }

    /// Define a group directly in a unified manager.
    ///
    /// Used to add groups that have no local counterpart, such as region
    /// groups collected during unification.
    pub fn new_unified_group(
        &mut self,
        group_type: GroupType,
        name: &str,
        members: &[u64],
    ) -> Result<GroupHandle> {
        let name = self.define_string(name)?.handle();
        Ok(self.define_group(group_type, name, members)?.handle())
    }

    /// Like [`new_unified_group`](Self::new_unified_group), with 32-bit ids.
    pub fn new_unified_group_from_32(
        &mut self,
        group_type: GroupType,
        name: &str,
        members: &[u32],
    ) -> Result<GroupHandle> {
        self.new_unified_group(group_type, name, &widen(members))
    }
}

impl Definitions {
    /// Define a group of 64-bit ids.
    pub fn new_group(
        &self,
        group_type: GroupType,
        name: Option<&str>,
        members: &[u64],
    ) -> Result<GroupHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "")?;
            local.define_group(group_type, name, members)
        })
    }

    /// Define a group of 32-bit ids, zero-extended to 64 bits.
    pub fn new_group_from_32(
        &self,
        group_type: GroupType,
        name: Option<&str>,
        members: &[u32],
    ) -> Result<GroupHandle> {
        self.new_group(group_type, name, &widen(members))
    }
}

/// Re-create a local group in the unified manager.
pub fn unify_group(
    source: &mut DefinitionManager,
    handle: GroupHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let name = source.optional_unified(HandleType::Group, "name", definition.name)?;
    let counterpart = unified
        .define_group(definition.group_type, name, &definition.members)?
        .handle();
    source.set_unified(handle, counterpart)
}
