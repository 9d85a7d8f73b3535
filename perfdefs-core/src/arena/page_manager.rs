//! Bump allocator addressed by movable offsets.

use super::{AllocationEntry, AllocationStats};
use crate::definitions::{Definition, HandleType, Record};
use crate::error::{DefinitionsError, Result};
use crate::manager::DefinitionHeader;
use crate::types::{AnyHandle, Handle, MovableOffset};

/// Offset of the first allocation. Offset 0 is the invalid handle.
pub const ARENA_BASE_OFFSET: u32 = 8;

/// Alignment of every allocation.
pub const ENTRY_ALIGNMENT: u32 = 8;

#[derive(Debug, Clone)]
struct Slot {
    entry: AllocationEntry,
    record: Record,
}

/// Append-only arena of definition records.
///
/// Records are stored in allocation order; a handle is the record's byte
/// offset, so lookups are a binary search over the slot table.
#[derive(Debug, Clone)]
pub struct PageManager {
    slots: Vec<Slot>,
    capacity: u64,
    stats: AllocationStats,
}

impl PageManager {
    /// Create an arena that can hold `capacity` bytes of definitions.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            slots: Vec::new(),
            capacity: capacity.min(u64::from(u32::MAX - ARENA_BASE_OFFSET)),
            stats: AllocationStats::default(),
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes consumed by live allocations.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.stats.used_bytes
    }

    /// Bytes still available.
    #[must_use]
    pub fn available(&self) -> u64 {
        self.capacity - self.stats.used_bytes
    }

    /// Allocation counters.
    #[must_use]
    pub fn stats(&self) -> AllocationStats {
        self.stats
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the arena holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn write_position(&self) -> u32 {
        // used_bytes never exceeds capacity, which is clamped below u32::MAX.
        ARENA_BASE_OFFSET + self.stats.used_bytes as u32
    }

    /// Append a definition and return its handle.
    pub(crate) fn alloc<D: Definition>(&mut self, definition: D) -> Result<Handle<D>> {
        let available = self.available();
        let size = align_up(definition.allocation_size());
        let size = match u32::try_from(size) {
            Ok(size) if u64::from(size) <= available => size,
            _ => {
                return Err(DefinitionsError::ArenaExhausted {
                    requested: size,
                    available,
                })
            }
        };

        let offset = MovableOffset::new(self.write_position());
        self.slots.push(Slot {
            entry: AllocationEntry::new(offset, size),
            record: definition.into_record(),
        });
        self.stats.record_allocation(size);
        Ok(Handle::new(offset))
    }

    /// Release the most recent allocation.
    ///
    /// Returns the released record, or `None` if `handle` is not the most
    /// recent allocation (in which case nothing is released).
    pub(crate) fn rollback(&mut self, handle: AnyHandle) -> Option<Record> {
        let is_last = self
            .slots
            .last()
            .is_some_and(|slot| slot.entry.offset == handle.offset());
        debug_assert!(is_last, "rollback of {handle}, which is not the last allocation");
        if !is_last {
            return None;
        }
        let slot = self.slots.pop()?;
        self.stats.record_rollback(slot.entry.size);
        tracing::trace!(handle = %handle, size = slot.entry.size, "Rolled back allocation");
        Some(slot.record)
    }

    fn index_of(&self, handle: AnyHandle) -> Option<usize> {
        self.slots
            .binary_search_by_key(&handle.offset(), |slot| slot.entry.offset)
            .ok()
    }

    /// Look up a definition, returning `None` for foreign or mistyped handles.
    #[must_use]
    pub fn try_get<D: Definition>(&self, handle: Handle<D>) -> Option<&D> {
        let index = self.index_of(handle.any())?;
        D::from_record(&self.slots[index].record)
    }

    /// Dereference a handle.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not refer to a `D` in this arena.
    #[must_use]
    #[track_caller]
    pub fn get<D: Definition>(&self, handle: Handle<D>) -> &D {
        match self.try_get(handle) {
            Some(definition) => definition,
            None => invalid_handle(D::KIND, handle.any()),
        }
    }

    #[track_caller]
    pub(crate) fn get_mut<D: Definition>(&mut self, handle: Handle<D>) -> &mut D {
        let record = self
            .index_of(handle.any())
            .map(|index| &mut self.slots[index].record);
        match record.and_then(D::from_record_mut) {
            Some(definition) => definition,
            None => invalid_handle(D::KIND, handle.any()),
        }
    }

    /// The record behind an untyped handle.
    #[must_use]
    pub fn record(&self, handle: AnyHandle) -> Option<&Record> {
        self.index_of(handle).map(|index| &self.slots[index].record)
    }

    /// The allocation behind a handle.
    #[must_use]
    pub fn allocation(&self, handle: AnyHandle) -> Option<AllocationEntry> {
        self.index_of(handle).map(|index| self.slots[index].entry)
    }

    /// The header of any definition.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not refer to a record in this arena.
    #[must_use]
    #[track_caller]
    pub fn header(&self, handle: AnyHandle) -> &DefinitionHeader {
        match self.record(handle) {
            Some(record) => record.header(),
            None => invalid_any_handle(handle),
        }
    }

    #[track_caller]
    pub(crate) fn header_mut(&mut self, handle: AnyHandle) -> &mut DefinitionHeader {
        match self.index_of(handle) {
            Some(index) => self.slots[index].record.header_mut(),
            None => invalid_any_handle(handle),
        }
    }

    /// Borrow an existing definition mutably together with the most recent
    /// allocation, which must be `candidate`.
    #[track_caller]
    pub(crate) fn pair_mut<D: Definition>(
        &mut self,
        existing: Handle<D>,
        candidate: Handle<D>,
    ) -> (&mut D, &D) {
        let last = self.slots.len().saturating_sub(1);
        let existing_index = self.index_of(existing.any());
        let candidate_index = self.index_of(candidate.any());
        let existing_index = match (existing_index, candidate_index) {
            (Some(existing_index), Some(candidate_index))
                if candidate_index == last && existing_index < last =>
            {
                existing_index
            }
            _ => invalid_handle(D::KIND, existing.any()),
        };

        let (head, tail) = self.slots.split_at_mut(last);
        let existing_def = D::from_record_mut(&mut head[existing_index].record);
        let candidate_def = D::from_record(&tail[0].record);
        match (existing_def, candidate_def) {
            (Some(existing_def), Some(candidate_def)) => (existing_def, candidate_def),
            _ => invalid_handle(D::KIND, existing.any()),
        }
    }

    /// Iterate all records in allocation order.
    pub fn records(&self) -> impl Iterator<Item = (AnyHandle, &Record)> + '_ {
        self.slots
            .iter()
            .map(|slot| (AnyHandle::new(slot.entry.offset), &slot.record))
    }
}

fn align_up(size: usize) -> u64 {
    let align = u64::from(ENTRY_ALIGNMENT);
    (size as u64).div_ceil(align) * align
}

#[cold]
#[track_caller]
fn invalid_handle(kind: HandleType, handle: AnyHandle) -> ! {
    panic!("invalid {kind} handle {handle} for this definition manager")
}

#[cold]
#[track_caller]
fn invalid_any_handle(handle: AnyHandle) -> ! {
    panic!("invalid handle {handle} for this definition manager")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{SourceFileDef, StringDef};

    fn string(value: &str) -> StringDef {
        StringDef::new(value.into())
    }

    #[test]
    fn first_handle_follows_reserved_prefix() {
        let mut arena = PageManager::new(1024);
        let handle = arena.alloc(string("main")).unwrap();
        assert_eq!(handle.offset().as_u32(), ARENA_BASE_OFFSET);
        assert!(handle.is_valid());
    }

    #[test]
    fn allocations_are_aligned() {
        let mut arena = PageManager::new(4096);
        let a = arena.alloc(string("a")).unwrap();
        let b = arena.alloc(string("bcdefgh")).unwrap();
        assert_eq!(a.offset().as_u32() % ENTRY_ALIGNMENT, 0);
        assert_eq!(b.offset().as_u32() % ENTRY_ALIGNMENT, 0);
        let entry = arena.allocation(a.any()).unwrap();
        assert_eq!(entry.end_offset(), b.offset());
    }

    #[test]
    fn rollback_restores_write_position() {
        let mut arena = PageManager::new(4096);
        arena.alloc(string("keep")).unwrap();
        let used = arena.used_bytes();

        let tentative = arena.alloc(string("drop")).unwrap();
        assert!(arena.rollback(tentative.any()).is_some());
        assert_eq!(arena.used_bytes(), used);
        assert_eq!(arena.len(), 1);

        let next = arena.alloc(string("next")).unwrap();
        assert_eq!(next.offset(), tentative.offset());
        assert_eq!(arena.stats().rollbacks, 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut arena = PageManager::new(8);
        let err = arena.alloc(string("too large")).unwrap_err();
        assert_eq!(err.code(), "E001");
        assert!(arena.is_empty());
    }

    #[test]
    fn typed_lookup_checks_kind() {
        let mut arena = PageManager::new(4096);
        let handle = arena.alloc(string("main.c")).unwrap();
        assert_eq!(&*arena.get(handle).value, "main.c");

        let mistyped = Handle::<SourceFileDef>::from_any(handle.any());
        assert!(arena.try_get(mistyped).is_none());
        assert!(arena.try_get(Handle::<StringDef>::INVALID).is_none());
    }

    #[test]
    #[should_panic(expected = "invalid String handle")]
    fn foreign_handle_panics() {
        let arena = PageManager::new(4096);
        let _ = arena.get(Handle::<StringDef>::new(MovableOffset::new(64)));
    }

    #[test]
    fn pair_mut_splits_existing_and_candidate() {
        let mut arena = PageManager::new(4096);
        let existing = arena.alloc(string("a")).unwrap();
        let candidate = arena.alloc(string("b")).unwrap();
        let (old, new) = arena.pair_mut(existing, candidate);
        assert_eq!(&*old.value, "a");
        assert_eq!(&*new.value, "b");
    }
}
