//! Per-kind table: creation-order chain, optional hash buckets, counter.

use crate::arena::PageManager;
use crate::definitions::{Definition, HandleType};
use crate::error::{DefinitionsError, Result};
use crate::types::{AnyHandle, Handle};
use std::fmt;
use std::marker::PhantomData;

/// Largest supported hash table power (32768 buckets).
pub const MAX_HASH_TABLE_POWER: u32 = 15;

/// Outcome of an intern call.
pub enum Interned<D> {
    /// The definition was new and has been linked in.
    Created(Handle<D>),
    /// An equal definition existed; the candidate was rolled back.
    Existing(Handle<D>),
}

impl<D> Interned<D> {
    /// The resulting handle, whichever way it was obtained.
    #[must_use]
    pub fn handle(&self) -> Handle<D> {
        match *self {
            Self::Created(handle) | Self::Existing(handle) => handle,
        }
    }

    /// Check if the definition was created by this call.
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl<D> Clone for Interned<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Interned<D> {}

impl<D> PartialEq for Interned<D> {
    fn eq(&self, other: &Self) -> bool {
        self.is_created() == other.is_created() && self.handle() == other.handle()
    }
}

impl<D> Eq for Interned<D> {}

impl<D> fmt::Debug for Interned<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(handle) => f.debug_tuple("Created").field(handle).finish(),
            Self::Existing(handle) => f.debug_tuple("Existing").field(handle).finish(),
        }
    }
}

/// Table of all definitions of one kind inside one manager.
#[derive(Debug, Clone)]
pub struct ManagerEntry {
    kind: HandleType,
    head: AnyHandle,
    tail: AnyHandle,
    hash_table: Option<Box<[AnyHandle]>>,
    hash_table_mask: u32,
    counter: u32,
    mapping: Option<Vec<u32>>,
}

impl ManagerEntry {
    /// Create an entry without a hash table. Every definition is appended.
    #[must_use]
    pub fn new(kind: HandleType) -> Self {
        Self {
            kind,
            head: AnyHandle::INVALID,
            tail: AnyHandle::INVALID,
            hash_table: None,
            hash_table_mask: 0,
            counter: 0,
            mapping: None,
        }
    }

    /// Create an entry with `1 << power` hash buckets.
    pub fn with_hash_table(kind: HandleType, power: u32) -> Result<Self> {
        let mut entry = Self::new(kind);
        entry.alloc_hash_table(power)?;
        Ok(entry)
    }

    /// Allocate (or replace) the hash table.
    ///
    /// Only valid while the entry is empty, since existing definitions would
    /// not be found in the new buckets.
    pub fn alloc_hash_table(&mut self, power: u32) -> Result<()> {
        if power > MAX_HASH_TABLE_POWER {
            return Err(DefinitionsError::InvalidConfig {
                field: "hash_table_power",
                cause: format!("hash table too big: {power} > {MAX_HASH_TABLE_POWER}"),
            });
        }
        let size = 1usize << power;
        self.hash_table = Some(vec![AnyHandle::INVALID; size].into_boxed_slice());
        self.hash_table_mask = (size - 1) as u32;
        Ok(())
    }

    /// Kind of the definitions in this entry.
    #[must_use]
    pub fn kind(&self) -> HandleType {
        self.kind
    }

    /// First definition in creation order.
    #[must_use]
    pub fn head(&self) -> AnyHandle {
        self.head
    }

    /// Last definition in creation order.
    #[must_use]
    pub fn tail(&self) -> AnyHandle {
        self.tail
    }

    /// Number of sequence numbers handed out.
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Check if definitions of this kind are deduplicated.
    #[must_use]
    pub fn has_hash_table(&self) -> bool {
        self.hash_table.is_some()
    }

    fn bucket(&self, hash_value: u32) -> Option<usize> {
        self.hash_table
            .as_ref()
            .map(|_| (hash_value & self.hash_table_mask) as usize)
    }

    /// Walk the candidate's bucket and return the first existing definition
    /// that `resolve` accepts.
    ///
    /// Candidates whose hash value differs are skipped without calling
    /// `resolve`. `resolve` may update the existing definition when it
    /// accepts it.
    pub(crate) fn find_duplicate<D: Definition>(
        &self,
        arena: &mut PageManager,
        candidate: Handle<D>,
        resolve: &mut dyn FnMut(&mut D, &D) -> bool,
    ) -> Option<Handle<D>> {
        let table = self.hash_table.as_ref()?;
        let hash_value = arena.header(candidate.any()).hash_value;
        let mut cursor = table[(hash_value & self.hash_table_mask) as usize];
        while cursor.is_valid() {
            let header = *arena.header(cursor);
            if header.hash_value == hash_value {
                let existing = Handle::<D>::from_any(cursor);
                let (existing_def, candidate_def) = arena.pair_mut(existing, candidate);
                if resolve(existing_def, candidate_def) {
                    return Some(existing);
                }
            }
            cursor = header.hash_next;
        }
        None
    }

    /// Link an accepted definition into its bucket and at the list tail.
    pub(crate) fn link(&mut self, arena: &mut PageManager, handle: AnyHandle, sequence_number: u32) {
        if let Some(bucket) = self.bucket(arena.header(handle).hash_value) {
            if let Some(table) = self.hash_table.as_mut() {
                arena.header_mut(handle).hash_next = table[bucket];
                table[bucket] = handle;
            }
        }

        if self.tail.is_valid() {
            arena.header_mut(self.tail).next = handle;
        } else {
            self.head = handle;
        }
        self.tail = handle;

        arena.header_mut(handle).sequence_number = sequence_number;
        self.counter = self.counter.max(sequence_number.saturating_add(1));
    }

    /// Hash-cons a freshly allocated candidate.
    ///
    /// The candidate must be the most recent allocation of `arena` and must
    /// already carry its hash value.
    pub(crate) fn add_definition<D: Definition>(
        &mut self,
        arena: &mut PageManager,
        candidate: Handle<D>,
        resolve: &mut dyn FnMut(&mut D, &D) -> bool,
    ) -> Interned<D> {
        if let Some(existing) = self.find_duplicate(arena, candidate, resolve) {
            arena.rollback(candidate.any());
            tracing::trace!(kind = %self.kind, handle = %existing, "Duplicate definition");
            return Interned::Existing(existing);
        }
        let sequence_number = self.counter;
        self.link(arena, candidate.any(), sequence_number);
        Interned::Created(candidate)
    }

    /// Move a definition to the bucket of its new hash value.
    pub(crate) fn rehash(&mut self, arena: &mut PageManager, handle: AnyHandle, hash_value: u32) {
        let old_hash = arena.header(handle).hash_value;
        if let (Some(old_bucket), Some(table)) = (self.bucket(old_hash), self.hash_table.as_mut()) {
            let mut cursor = table[old_bucket];
            let mut previous = AnyHandle::INVALID;
            while cursor.is_valid() && cursor != handle {
                previous = cursor;
                cursor = arena.header(cursor).hash_next;
            }
            if cursor == handle {
                let next = arena.header(handle).hash_next;
                if previous.is_valid() {
                    arena.header_mut(previous).hash_next = next;
                } else {
                    table[old_bucket] = next;
                }
                let new_bucket = (hash_value & self.hash_table_mask) as usize;
                arena.header_mut(handle).hash_next = table[new_bucket];
                table[new_bucket] = handle;
            }
        }
        arena.header_mut(handle).hash_value = hash_value;
    }

    /// Iterate the entry in creation order.
    pub fn iter<'a, D: Definition>(&self, arena: &'a PageManager) -> DefinitionIter<'a, D> {
        DefinitionIter {
            arena,
            cursor: self.head,
            _marker: PhantomData,
        }
    }

    /// Allocate the local-to-unified mapping table, sized by the counter.
    pub(crate) fn alloc_mapping(&mut self) {
        self.mapping = Some(vec![u32::MAX; self.counter as usize]);
    }

    pub(crate) fn set_mapping(&mut self, sequence_number: u32, unified_id: u32) {
        if let Some(slot) = self
            .mapping
            .as_mut()
            .and_then(|mapping| mapping.get_mut(sequence_number as usize))
        {
            *slot = unified_id;
        }
    }

    /// Unified sequence number of the local definition `sequence_number`.
    #[must_use]
    pub fn mapping(&self, sequence_number: u32) -> Option<u32> {
        self.mapping
            .as_ref()
            .and_then(|mapping| mapping.get(sequence_number as usize))
            .copied()
            .filter(|&id| id != u32::MAX)
    }

    /// Drop the mapping table.
    pub fn free_mapping(&mut self) {
        self.mapping = None;
    }
}

/// Iterator over one kind's definitions in creation order.
pub struct DefinitionIter<'a, D> {
    arena: &'a PageManager,
    cursor: AnyHandle,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, D: Definition> Iterator for DefinitionIter<'a, D> {
    type Item = (Handle<D>, &'a D);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cursor.is_valid() {
            return None;
        }
        let handle = Handle::<D>::from_any(self.cursor);
        let definition = self.arena.get(handle);
        self.cursor = definition.header().next;
        Some((handle, definition))
    }
}
