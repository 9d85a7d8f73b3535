//! System tree nodes and their properties.
//!
//! The system tree describes the hardware hierarchy (machine, node, socket,
//! ...) that location groups live in. A node is only unified if a location
//! was ever created beneath it, which is tracked by `has_children`.

use super::{Definition, HandleType, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, SystemTreeDomain};

/// Handle to a [`SystemTreeNodeDef`].
pub type SystemTreeNodeHandle = Handle<SystemTreeNodeDef>;

/// Handle to a [`SystemTreeNodePropertyDef`].
pub type SystemTreeNodePropertyHandle = Handle<SystemTreeNodePropertyDef>;

/// A node of the system tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTreeNodeDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) parent: SystemTreeNodeHandle,
    pub(crate) domains: SystemTreeDomain,
    pub(crate) class: StringHandle,
    pub(crate) name: StringHandle,
    pub(crate) properties: SystemTreeNodePropertyHandle,
    pub(crate) properties_tail: SystemTreeNodePropertyHandle,
    pub(crate) has_children: bool,
}

impl SystemTreeNodeDef {
    /// Parent node, `INVALID` for a root.
    #[must_use]
    pub fn parent(&self) -> SystemTreeNodeHandle {
        self.parent
    }

    /// Hardware domains this node spans.
    #[must_use]
    pub fn domains(&self) -> SystemTreeDomain {
        self.domains
    }

    /// Node class, e.g. `"machine"`.
    #[must_use]
    pub fn class(&self) -> StringHandle {
        self.class
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// First property, `INVALID` if there is none.
    #[must_use]
    pub fn first_property(&self) -> SystemTreeNodePropertyHandle {
        self.properties
    }

    /// Check if any location was created beneath this node.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.has_children
    }
}

impl Definition for SystemTreeNodeDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .optional_handle(self.parent)
            .pod(self.domains)
            .handle(self.class)
            .handle(self.name)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.parent == candidate.parent
            && existing.domains == candidate.domains
            && existing.class == candidate.class
            && existing.name == candidate.name
    }
}

/// A name/value property attached to a system tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTreeNodePropertyDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) node: SystemTreeNodeHandle,
    pub(crate) name: StringHandle,
    pub(crate) value: StringHandle,
    pub(crate) next_property: SystemTreeNodePropertyHandle,
}

impl SystemTreeNodePropertyDef {
    /// The owning node.
    #[must_use]
    pub fn node(&self) -> SystemTreeNodeHandle {
        self.node
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Property value.
    #[must_use]
    pub fn value(&self) -> StringHandle {
        self.value
    }

    /// Next property of the same node.
    #[must_use]
    pub fn next_property(&self) -> SystemTreeNodePropertyHandle {
        self.next_property
    }
}

impl Definition for SystemTreeNodePropertyDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.node)
            .handle(self.name)
            .handle(self.value)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.node == candidate.node
            && existing.name == candidate.name
            && existing.value == candidate.value
    }
}

impl DefinitionManager {
    /// Intern a system tree node.
    pub fn define_system_tree_node(
        &mut self,
        parent: SystemTreeNodeHandle,
        domains: SystemTreeDomain,
        class: StringHandle,
        name: StringHandle,
    ) -> Result<Interned<SystemTreeNodeDef>> {
        self.intern(SystemTreeNodeDef {
            header: DefinitionHeader::new(),
            parent,
            domains,
            class,
            name,
            properties: Handle::INVALID,
            properties_tail: Handle::INVALID,
            has_children: false,
        })
    }

    /// Intern a node property and chain it onto its node.
    pub fn define_system_tree_node_property(
        &mut self,
        node: SystemTreeNodeHandle,
        name: StringHandle,
        value: StringHandle,
    ) -> Result<Interned<SystemTreeNodePropertyDef>> {
        let interned = self.intern(SystemTreeNodePropertyDef {
            header: DefinitionHeader::new(),
            node,
            name,
            value,
            next_property: Handle::INVALID,
        })?;
        if let Interned::Created(property) = interned {
            let tail = self.get(node).properties_tail;
            if tail.is_valid() {
                self.get_mut(tail).next_property = property;
            } else {
                self.get_mut(node).properties = property;
            }
            self.get_mut(node).properties_tail = property;
        }
        Ok(interned)
    }

    /// Flag `node` and its ancestors as leading to a location.
    ///
    /// Stops at the first ancestor that is already flagged.
    pub(crate) fn mark_system_tree_node_used(&mut self, node: SystemTreeNodeHandle) {
        let mut cursor = node;
        while cursor.is_valid() {
            let definition = self.get_mut(cursor);
            if definition.has_children {
                break;
            }
            definition.has_children = true;
            cursor = definition.parent;
        }
    }

    /// Properties of a node, in insertion order.
    #[must_use]
    pub fn system_tree_node_properties(
        &self,
        node: SystemTreeNodeHandle,
    ) -> Vec<SystemTreeNodePropertyHandle> {
        let mut properties = Vec::new();
        let mut cursor = self.get(node).properties;
        while cursor.is_valid() {
            properties.push(cursor);
            cursor = self.get(cursor).next_property;
        }
        properties
    }
}

impl Definitions {
    /// Define a system tree node.
    pub fn new_system_tree_node(
        &self,
        parent: SystemTreeNodeHandle,
        domains: SystemTreeDomain,
        class: &str,
        name: &str,
    ) -> Result<SystemTreeNodeHandle> {
        self.define(|local| {
            let class = local.define_string(class)?.handle();
            let name = local.define_string(name)?.handle();
            local.define_system_tree_node(parent, domains, class, name)
        })
    }

    /// Attach a name/value property to a system tree node.
    pub fn new_system_tree_node_property(
        &self,
        node: SystemTreeNodeHandle,
        name: &str,
        value: &str,
    ) -> Result<SystemTreeNodePropertyHandle> {
        self.define(|local| {
            let name = local.define_string(name)?.handle();
            let value = local.define_string(value)?.handle();
            local.define_system_tree_node_property(node, name, value)
        })
    }
}

/// Re-create a local system tree node in the unified manager.
///
/// Nodes without any location beneath them are skipped.
pub fn unify_system_tree_node(
    source: &mut DefinitionManager,
    handle: SystemTreeNodeHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    if !definition.has_children {
        return Ok(());
    }
    let (domains, parent, class, name) = (
        definition.domains,
        definition.parent,
        definition.class,
        definition.name,
    );
    let kind = HandleType::SystemTreeNode;
    let parent = source.optional_unified(kind, "parent", parent)?;
    let class = source.unified_handle(kind, "class", class)?;
    let name = source.unified_handle(kind, "name", name)?;

    let counterpart = unified
        .define_system_tree_node(parent, domains, class, name)?
        .handle();
    unified.get_mut(counterpart).has_children = true;
    source.set_unified(handle, counterpart)
}

/// Re-create a local node property under the unified node.
///
/// Properties of skipped nodes are skipped as well.
pub fn unify_system_tree_node_property(
    source: &mut DefinitionManager,
    handle: SystemTreeNodePropertyHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (node, name, value) = (definition.node, definition.name, definition.value);
    if !source.get(node).has_children {
        return Ok(());
    }
    let kind = HandleType::SystemTreeNodeProperty;
    let node = source.unified_handle(kind, "system tree node", node)?;
    let name = source.unified_handle(kind, "name", name)?;
    let value = source.unified_handle(kind, "value", value)?;

    let counterpart = unified
        .define_system_tree_node_property(node, name, value)?
        .handle();
    source.set_unified(handle, counterpart)
}
