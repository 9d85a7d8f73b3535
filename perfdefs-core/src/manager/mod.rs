//! Definition managers.
//!
//! A [`DefinitionManager`] owns one arena and one [`ManagerEntry`] per
//! definition kind. Two roles exist:
//!
//! - the *local* manager, written during measurement and deduplicating only
//!   the kinds adapters commonly re-define
//! - the *unified* manager, populated by unification and deduplicating every
//!   kind that can meet a duplicate from another process
//!
//! ```text
//!  DefinitionManager
//!  ├── arena: PageManager ─────────────── records addressed by handle
//!  └── entries[HandleType::COUNT]
//!        ├── head ──► def ──next──► def ──next──► def   (creation order)
//!        └── hash_table[mask + 1]
//!              bucket ──► def ──hash_next──► def        (dedup lookup)
//! ```

mod entry;
mod header;

pub use entry::{DefinitionIter, Interned, ManagerEntry, MAX_HASH_TABLE_POWER};
pub use header::DefinitionHeader;

use crate::arena::{AllocationStats, PageManager};
use crate::config::DefinitionsConfig;
use crate::definitions::{Definition, HandleType, StringDef, StringHandle};
use crate::error::{DefinitionsError, Result};
use crate::types::{AnyHandle, Handle};

/// Which table a manager plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerRole {
    /// Per-process table written during measurement.
    Local,
    /// Merged table produced by unification.
    Unified,
}

/// Kinds deduplicated by a local manager.
const LOCAL_HASHED: &[HandleType] = &[
    HandleType::String,
    HandleType::SourceFile,
    HandleType::Region,
    HandleType::Parameter,
    HandleType::Attribute,
    HandleType::SourceCodeLocation,
    HandleType::Paradigm,
    HandleType::IoParadigm,
    HandleType::Group,
];

/// Kinds a unified manager never deduplicates.
const UNIFIED_UNHASHED: &[HandleType] = &[
    HandleType::Location,
    HandleType::LocationGroup,
    HandleType::ClockOffset,
];

/// A definitions table: one arena plus one entry per kind.
#[derive(Debug, Clone)]
pub struct DefinitionManager {
    role: ManagerRole,
    pub(crate) arena: PageManager,
    pub(crate) entries: Vec<ManagerEntry>,
    pub(crate) location_global_ids: Option<Vec<u64>>,
}

impl DefinitionManager {
    /// Create a local manager.
    ///
    /// The empty string is defined first, so it always has sequence number 0.
    pub fn new_local(config: &DefinitionsConfig) -> Result<Self> {
        Self::with_role(ManagerRole::Local, config)
    }

    /// Create an empty unified manager.
    ///
    /// The empty string is defined first, so it always has sequence number 0.
    pub fn new_unified(config: &DefinitionsConfig) -> Result<Self> {
        Self::with_role(ManagerRole::Unified, config)
    }

    fn with_role(role: ManagerRole, config: &DefinitionsConfig) -> Result<Self> {
        config.validate()?;

        let entries = HandleType::ALL
            .iter()
            .map(|&kind| {
                let hashed = match role {
                    ManagerRole::Local => LOCAL_HASHED.contains(&kind),
                    ManagerRole::Unified => !UNIFIED_UNHASHED.contains(&kind),
                };
                if hashed {
                    ManagerEntry::with_hash_table(kind, config.hash_table_power)
                } else {
                    Ok(ManagerEntry::new(kind))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut manager = Self {
            role,
            arena: PageManager::new(config.arena_capacity),
            entries,
            location_global_ids: None,
        };
        manager.define_string("")?;

        tracing::debug!(
            role = ?role,
            capacity = config.arena_capacity,
            hash_table_power = config.hash_table_power,
            "Created definition manager"
        );
        Ok(manager)
    }

    /// The manager's role.
    #[must_use]
    pub fn role(&self) -> ManagerRole {
        self.role
    }

    /// The arena holding this manager's definitions.
    #[must_use]
    pub fn arena(&self) -> &PageManager {
        &self.arena
    }

    /// Bytes consumed by accepted definitions.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.arena.used_bytes()
    }

    /// Arena allocation counters.
    #[must_use]
    pub fn stats(&self) -> AllocationStats {
        self.arena.stats()
    }

    /// The entry of one kind.
    #[must_use]
    pub fn entry(&self, kind: HandleType) -> &ManagerEntry {
        &self.entries[kind.index()]
    }

    pub(crate) fn entry_mut(&mut self, kind: HandleType) -> &mut ManagerEntry {
        &mut self.entries[kind.index()]
    }

    /// The arena and one entry, borrowed together.
    pub(crate) fn arena_and_entry_mut(
        &mut self,
        kind: HandleType,
    ) -> (&mut PageManager, &mut ManagerEntry) {
        (&mut self.arena, &mut self.entries[kind.index()])
    }

    /// Hash-cons a definition using the kind's own duplicate rule.
    pub(crate) fn intern<D: Definition>(&mut self, definition: D) -> Result<Interned<D>> {
        self.intern_with(definition, &mut |existing, candidate| {
            D::resolve_duplicate(existing, candidate)
        })
    }

    /// Hash-cons a definition with an explicit duplicate rule.
    pub(crate) fn intern_with<D: Definition>(
        &mut self,
        mut definition: D,
        resolve: &mut dyn FnMut(&mut D, &D) -> bool,
    ) -> Result<Interned<D>> {
        let hash_value = definition.key_hash(&self.arena);
        let header = definition.header_mut();
        *header = DefinitionHeader::new();
        header.hash_value = hash_value;

        let candidate = self.arena.alloc(definition)?;
        Ok(self.entries[D::KIND.index()].add_definition(&mut self.arena, candidate, resolve))
    }

    /// Dereference a handle.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not refer to a `D` of this manager.
    #[must_use]
    #[track_caller]
    pub fn get<D: Definition>(&self, handle: Handle<D>) -> &D {
        self.arena.get(handle)
    }

    /// Dereference a handle, returning `None` if it is not a `D` of this manager.
    #[must_use]
    pub fn try_get<D: Definition>(&self, handle: Handle<D>) -> Option<&D> {
        self.arena.try_get(handle)
    }

    #[track_caller]
    pub(crate) fn get_mut<D: Definition>(&mut self, handle: Handle<D>) -> &mut D {
        self.arena.get_mut(handle)
    }

    /// Iterate the definitions of kind `D` in creation order.
    pub fn iter<D: Definition>(&self) -> DefinitionIter<'_, D> {
        self.entries[D::KIND.index()].iter(&self.arena)
    }

    /// Handles of kind `D` in creation order.
    #[must_use]
    pub fn handles<D: Definition>(&self) -> Vec<Handle<D>> {
        self.iter::<D>().map(|(handle, _)| handle).collect()
    }

    /// Number of accepted definitions of kind `D`.
    #[must_use]
    pub fn count<D: Definition>(&self) -> u32 {
        self.entries[D::KIND.index()].counter()
    }

    /// Sequence number of a definition.
    #[must_use]
    #[track_caller]
    pub fn sequence_number<D: Definition>(&self, handle: Handle<D>) -> u32 {
        self.get(handle).header().sequence_number
    }

    /// Hash value of a definition.
    #[must_use]
    #[track_caller]
    pub fn hash_value<D: Definition>(&self, handle: Handle<D>) -> u32 {
        self.get(handle).header().hash_value
    }

    /// Unified counterpart of a definition, `INVALID` if not unified (yet).
    #[must_use]
    #[track_caller]
    pub fn unified<D: Definition>(&self, handle: Handle<D>) -> Handle<D> {
        Handle::from_any(self.get(handle).header().unified)
    }

    /// Record the unified counterpart of a definition.
    pub(crate) fn set_unified<D: Definition>(
        &mut self,
        handle: Handle<D>,
        unified: Handle<D>,
    ) -> Result<()> {
        let header = self.get_mut(handle).header_mut();
        if header.unified.is_valid() {
            return Err(DefinitionsError::UnifiedAlreadySet {
                kind: D::KIND,
                handle: handle.any(),
            });
        }
        header.unified = unified.any();
        Ok(())
    }

    /// Unified counterpart of a required reference held by a `kind` definition.
    pub(crate) fn unified_handle<R: Definition>(
        &self,
        kind: HandleType,
        field: &'static str,
        handle: Handle<R>,
    ) -> Result<Handle<R>> {
        let unified = self
            .try_get(handle)
            .map_or(AnyHandle::INVALID, |definition| definition.header().unified);
        if unified.is_valid() {
            Ok(Handle::from_any(unified))
        } else {
            Err(DefinitionsError::UnificationOrder {
                kind,
                field,
                handle: handle.any(),
            })
        }
    }

    /// Like [`unified_handle`](Self::unified_handle), but an invalid reference
    /// passes through as invalid.
    pub(crate) fn optional_unified<R: Definition>(
        &self,
        kind: HandleType,
        field: &'static str,
        handle: Handle<R>,
    ) -> Result<Handle<R>> {
        if handle.is_valid() {
            self.unified_handle(kind, field, handle)
        } else {
            Ok(Handle::INVALID)
        }
    }

    /// Unified counterpart of an untyped reference. Invalid passes through.
    pub(crate) fn optional_unified_any(
        &self,
        kind: HandleType,
        field: &'static str,
        handle: AnyHandle,
    ) -> Result<AnyHandle> {
        if !handle.is_valid() {
            return Ok(AnyHandle::INVALID);
        }
        let unified = self
            .arena
            .record(handle)
            .map_or(AnyHandle::INVALID, |record| record.header().unified);
        if unified.is_valid() {
            Ok(unified)
        } else {
            Err(DefinitionsError::UnificationOrder {
                kind,
                field,
                handle,
            })
        }
    }

    /// Recompute a definition's hash value and move it to its new bucket.
    pub(crate) fn rehash<D: Definition>(&mut self, handle: Handle<D>) {
        let hash_value = self.get(handle).key_hash(&self.arena);
        self.entries[D::KIND.index()].rehash(&mut self.arena, handle.any(), hash_value);
    }

    /// The content of a string definition.
    #[must_use]
    #[track_caller]
    pub fn string(&self, handle: StringHandle) -> &str {
        &self.get(handle).value
    }

    /// The empty string, which every manager defines first.
    #[must_use]
    pub fn empty_string(&self) -> StringHandle {
        self.iter::<StringDef>()
            .next()
            .map_or(StringHandle::INVALID, |(handle, _)| handle)
    }

    /// Unified sequence number of a mapped local definition.
    ///
    /// Available after [`create_mappings`](crate::unify::create_mappings).
    #[must_use]
    pub fn unified_id<D: Definition>(&self, handle: Handle<D>) -> Option<u32> {
        let sequence_number = self.try_get(handle)?.header().sequence_number;
        self.entries[D::KIND.index()].mapping(sequence_number)
    }

    /// Global id of the local location with sequence number `sequence_number`.
    ///
    /// Available after [`create_mappings`](crate::unify::create_mappings).
    #[must_use]
    pub fn location_global_id(&self, sequence_number: u32) -> Option<u64> {
        self.location_global_ids
            .as_ref()?
            .get(sequence_number as usize)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::RegionDef;

    fn local() -> DefinitionManager {
        DefinitionManager::new_local(&DefinitionsConfig::default()).unwrap()
    }

    #[test]
    fn empty_string_comes_first() {
        let manager = local();
        let empty = manager.empty_string();
        assert!(empty.is_valid());
        assert_eq!(manager.string(empty), "");
        assert_eq!(manager.sequence_number(empty), 0);
        assert_eq!(manager.count::<StringDef>(), 1);
    }

    #[test]
    fn local_and_unified_hash_different_kinds() {
        let config = DefinitionsConfig::default();
        let local = DefinitionManager::new_local(&config).unwrap();
        let unified = DefinitionManager::new_unified(&config).unwrap();

        assert!(local.entry(HandleType::Region).has_hash_table());
        assert!(local.entry(HandleType::Group).has_hash_table());
        assert!(!local.entry(HandleType::Communicator).has_hash_table());
        assert!(unified.entry(HandleType::Group).has_hash_table());
        assert!(!unified.entry(HandleType::Location).has_hash_table());
        assert_eq!(unified.role(), ManagerRole::Unified);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DefinitionsConfig::default().with_hash_table_power(20);
        let err = DefinitionManager::new_local(&config).unwrap_err();
        assert_eq!(err.code(), "E401");
    }

    #[test]
    fn unified_slot_is_write_once() {
        let mut source = local();
        let mut target = local();
        let handle = source.define_string("x").unwrap().handle();
        let counterpart = target.define_string("x").unwrap().handle();

        source.set_unified(handle, counterpart).unwrap();
        assert_eq!(source.unified(handle), counterpart);
        let err = source.set_unified(handle, counterpart).unwrap_err();
        assert_eq!(err.code(), "E102");
    }

    #[test]
    fn missing_unified_reference_is_an_ordering_error() {
        let mut manager = local();
        let handle = manager.define_string("main").unwrap().handle();
        let err = manager
            .unified_handle(HandleType::Region, "name", handle)
            .unwrap_err();
        assert!(err.is_ordering_violation());
        let absent = manager
            .optional_unified(HandleType::Region, "file name", StringHandle::INVALID)
            .unwrap();
        assert!(!absent.is_valid());
    }

    #[test]
    fn iteration_follows_creation_order() {
        let mut manager = local();
        for name in ["a", "b", "c"] {
            manager.define_string(name).unwrap();
        }
        let values: Vec<_> = manager
            .iter::<StringDef>()
            .map(|(_, definition)| definition.value.to_string())
            .collect();
        assert_eq!(values, ["", "a", "b", "c"]);
        assert_eq!(manager.handles::<RegionDef>().len(), 0);
    }
}
