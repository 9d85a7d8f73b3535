//! RMA window definitions.

use super::{Definition, HandleType, InterimCommunicatorHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AnyHandle, Handle, RmaWindowFlags};

/// Handle to an [`RmaWindowDef`].
pub type RmaWindowHandle = Handle<RmaWindowDef>;

/// A window for one-sided communication.
///
/// A window is identified by its communicator and its creation id within
/// that communicator. The name is not part of the identity: a window keeps
/// its creation-time name until a user name arrives, either through
/// [`Definitions::rma_window_set_name`] or from a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmaWindowDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) communicator: AnyHandle,
    pub(crate) creation_id: u32,
    pub(crate) has_default_name: bool,
    pub(crate) flags: RmaWindowFlags,
}

impl RmaWindowDef {
    /// Name, `INVALID` if none was given.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// The communicator: an interim communicator until resolved, a
    /// communicator afterwards.
    #[must_use]
    pub fn communicator(&self) -> AnyHandle {
        self.communicator
    }

    /// Position among the windows created on the communicator.
    #[must_use]
    pub fn creation_id(&self) -> u32 {
        self.creation_id
    }

    /// Check if the name is still the one given at creation.
    #[must_use]
    pub fn has_default_name(&self) -> bool {
        self.has_default_name
    }

    /// Flags.
    #[must_use]
    pub fn flags(&self) -> RmaWindowFlags {
        self.flags
    }
}

impl Definition for RmaWindowDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .any_handle(self.communicator)
            .pod(self.creation_id)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.communicator == candidate.communicator
            && existing.creation_id == candidate.creation_id
    }

    fn resolve_duplicate(existing: &mut Self, candidate: &Self) -> bool {
        if !Self::equal(existing, candidate) {
            return false;
        }
        if existing.has_default_name && candidate.name.is_valid() {
            existing.name = candidate.name;
            existing.has_default_name = false;
        }
        true
    }
}

impl DefinitionManager {
    /// Intern an RMA window.
    pub fn define_rma_window(
        &mut self,
        name: StringHandle,
        communicator: AnyHandle,
        creation_id: u32,
        flags: RmaWindowFlags,
    ) -> Result<Interned<RmaWindowDef>> {
        self.intern(RmaWindowDef {
            header: DefinitionHeader::new(),
            name,
            communicator,
            creation_id,
            has_default_name: true,
            flags,
        })
    }
}

impl Definitions {
    /// Define a window on an interim communicator.
    ///
    /// The creation id is drawn from the communicator's window counter.
    pub fn new_rma_window(
        &self,
        name: Option<&str>,
        communicator: InterimCommunicatorHandle,
        flags: RmaWindowFlags,
    ) -> Result<RmaWindowHandle> {
        self.define(|local| {
            let name = match name {
                Some(name) => local.define_string(name)?.handle(),
                None => StringHandle::INVALID,
            };
            let creation_id = local.next_rma_window_creation_id(communicator);
            local.define_rma_window(name, communicator.any(), creation_id, flags)
        })
    }

    /// Replace the creation-time name with a user name. Only the first call
    /// has an effect.
    pub fn rma_window_set_name(&self, window: RmaWindowHandle, name: Option<&str>) -> Result<()> {
        let mut local = self.lock();
        if !local.get(window).has_default_name {
            return Ok(());
        }
        let name = local.define_string(name.unwrap_or(""))?.handle();
        let definition = local.get_mut(window);
        definition.name = name;
        definition.has_default_name = false;
        Ok(())
    }

    /// Recompute the hash of a window whose communicator changed.
    pub fn rma_window_rehash(&self, window: RmaWindowHandle) {
        self.lock().rehash(window);
    }
}

/// Re-create a local window in the unified manager.
///
/// The window's communicator must have been resolved from its interim
/// communicator.
pub fn unify_rma_window(
    source: &mut DefinitionManager,
    handle: RmaWindowHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::RmaWindow;
    let name = source.optional_unified(kind, "name", definition.name)?;
    let communicator = source.unified_communicator(kind, "communicator", definition.communicator)?;

    let counterpart = unified
        .define_rma_window(name, communicator, definition.creation_id, definition.flags)?
        .handle();
    source.set_unified(handle, counterpart)
}
