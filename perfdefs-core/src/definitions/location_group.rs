//! Location group definitions (processes and accelerator contexts).

use super::{Definition, HandleType, StringHandle, SystemTreeNodeHandle};
use crate::context::Definitions;
use crate::error::Result;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, LocationGroupType};

/// Handle to a [`LocationGroupDef`].
pub type LocationGroupHandle = Handle<LocationGroupDef>;

/// A group of locations sharing an address space.
///
/// Never deduplicated: every call creates a new group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationGroupDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) group_type: LocationGroupType,
    pub(crate) system_tree_parent: SystemTreeNodeHandle,
    pub(crate) creating_location_group: LocationGroupHandle,
    pub(crate) has_children: bool,
}

impl LocationGroupDef {
    /// Group name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Process or accelerator.
    #[must_use]
    pub fn group_type(&self) -> LocationGroupType {
        self.group_type
    }

    /// The system tree node this group runs on.
    #[must_use]
    pub fn system_tree_parent(&self) -> SystemTreeNodeHandle {
        self.system_tree_parent
    }

    /// The group that created this one, e.g. the host process of a GPU context.
    #[must_use]
    pub fn creating_location_group(&self) -> LocationGroupHandle {
        self.creating_location_group
    }

    /// Check if any location was created in this group.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.has_children
    }
}

impl Definition for LocationGroupDef {
    fn equal(_existing: &Self, _candidate: &Self) -> bool {
        false
    }
}

impl DefinitionManager {
    /// Append a location group.
    pub fn define_location_group(
        &mut self,
        name: StringHandle,
        group_type: LocationGroupType,
        system_tree_parent: SystemTreeNodeHandle,
        creating_location_group: LocationGroupHandle,
    ) -> Result<Interned<LocationGroupDef>> {
        self.intern(LocationGroupDef {
            header: DefinitionHeader::new(),
            name,
            group_type,
            system_tree_parent,
            creating_location_group,
            has_children: false,
        })
    }

    /// Flag a location group, its creator chain and its system tree
    /// ancestors as leading to a location.
    pub(crate) fn mark_location_group_used(&mut self, group: LocationGroupHandle) {
        let mut cursor = group;
        while cursor.is_valid() {
            let definition = self.get_mut(cursor);
            if definition.has_children {
                break;
            }
            definition.has_children = true;
            let (creator, node) = (
                definition.creating_location_group,
                definition.system_tree_parent,
            );
            self.mark_system_tree_node_used(node);
            cursor = creator;
        }
    }
}

impl Definitions {
    /// Define a location group.
    pub fn new_location_group(
        &self,
        name: Option<&str>,
        group_type: LocationGroupType,
        system_tree_parent: SystemTreeNodeHandle,
        creating_location_group: LocationGroupHandle,
    ) -> Result<LocationGroupHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "")?;
            local.define_location_group(
                name,
                group_type,
                system_tree_parent,
                creating_location_group,
            )
        })
    }
}

/// Re-create a local location group in the unified manager.
///
/// Groups that never received a location are skipped.
pub fn unify_location_group(
    source: &mut DefinitionManager,
    handle: LocationGroupHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    if !definition.has_children {
        tracing::trace!(handle = %handle, "Skipping location group without locations");
        return Ok(());
    }
    let kind = HandleType::LocationGroup;
    let name = source.unified_handle(kind, "name", definition.name)?;
    let parent =
        source.optional_unified(kind, "system tree parent", definition.system_tree_parent)?;
    let creator = source.optional_unified(
        kind,
        "creating location group",
        definition.creating_location_group,
    )?;

    let counterpart = unified
        .define_location_group(name, definition.group_type, parent, creator)?
        .handle();
    unified.get_mut(counterpart).has_children = true;
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::types::SystemTreeDomain;

    #[test]
    fn location_groups_are_never_merged() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let a = definitions
            .new_location_group(Some("rank 0"), LocationGroupType::Process, Handle::INVALID, Handle::INVALID)
            .unwrap();
        let b = definitions
            .new_location_group(Some("rank 0"), LocationGroupType::Process, Handle::INVALID, Handle::INVALID)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn marking_follows_creator_and_system_tree() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let machine = definitions
            .new_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, "machine", "m")
            .unwrap();
        let host = definitions
            .new_location_group(Some("host"), LocationGroupType::Process, machine, Handle::INVALID)
            .unwrap();
        let gpu = definitions
            .new_location_group(Some("gpu"), LocationGroupType::Accelerator, Handle::INVALID, host)
            .unwrap();

        let mut local = definitions.lock();
        local.mark_location_group_used(gpu);
        assert!(local.get(gpu).has_children());
        assert!(local.get(host).has_children());
        assert!(local.get(machine).has_children());
    }

    #[test]
    fn marking_stops_at_flagged_group() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let machine = definitions
            .new_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, "machine", "m")
            .unwrap();
        let host = definitions
            .new_location_group(Some("host"), LocationGroupType::Process, machine, Handle::INVALID)
            .unwrap();
        let gpu = definitions
            .new_location_group(Some("gpu"), LocationGroupType::Accelerator, Handle::INVALID, host)
            .unwrap();

        let mut local = definitions.lock();
        local.mark_location_group_used(gpu);
        local.get_mut(host).has_children = false;
        local.get_mut(machine).has_children = false;

        local.mark_location_group_used(gpu);
        assert!(local.get(gpu).has_children());
        assert!(!local.get(host).has_children());
        assert!(!local.get(machine).has_children());
    }
}
