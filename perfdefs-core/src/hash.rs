//! Fold-hash primitives for definition keys.
//!
//! A definition's `hash_value` is built by folding its identity fields, one at
//! a time, into a running 32-bit value:
//!
//! - scalar fields are folded by value ([`KeyHasher::pod`])
//! - arrays are folded element by element ([`KeyHasher::array`])
//! - handles fold the *referenced* definition's own hash value
//!   ([`KeyHasher::handle`]), so equal keys hash equally regardless of where
//!   the referenced records were allocated
//!
//! The mixing function is `FxHasher` seeded with the running value, with the
//! 64-bit result folded down to 32 bits. Hash values are only compared within
//! one process and are never persisted.

use crate::arena::PageManager;
use crate::types::{
    AnyHandle, AttributeType, CommunicatorFlags, GroupType, Handle, InterruptGeneratorMode,
    IoAccessMode, IoHandleFlags, IoParadigmClass, IoParadigmFlags, IoParadigmType, IoStatusFlags,
    LocationGroupType, LocationType, MetricBase, MetricMode, MetricOccurrence,
    MetricProfilingType, MetricScope, MetricSourceType, MetricValueType, ParadigmClass,
    ParadigmFlags, ParadigmType, ParameterType, PropertyCondition, PropertyKind, RegionType,
    RmaWindowFlags, SamplingSetClass, SystemTreeDomain, TopologyType,
};
use rustc_hash::FxHasher;
use std::hash::Hasher;

#[inline]
fn fold64(value: u64) -> u32 {
    (value ^ (value >> 32)) as u32
}

/// Hash a byte buffer, continuing from `initval`.
#[must_use]
pub fn hash_bytes(bytes: &[u8], initval: u32) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(initval);
    hasher.write_usize(bytes.len());
    hasher.write(bytes);
    fold64(hasher.finish())
}

/// Hash a single 32-bit word, continuing from `initval`.
#[must_use]
pub fn hash_word(word: u32, initval: u32) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(initval);
    hasher.write_u32(word);
    fold64(hasher.finish())
}

/// Plain values that can be folded into a hash by value.
pub trait HashPod: Copy {
    /// Fold `self` into `hash`.
    fn fold_into(self, hash: u32) -> u32;
}

impl HashPod for u32 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_word(self, hash)
    }
}

impl HashPod for u8 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_word(u32::from(self), hash)
    }
}

impl HashPod for u16 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_word(u32::from(self), hash)
    }
}

impl HashPod for bool {
    fn fold_into(self, hash: u32) -> u32 {
        hash_word(u32::from(self), hash)
    }
}

impl HashPod for u64 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_bytes(&self.to_ne_bytes(), hash)
    }
}

impl HashPod for i32 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_bytes(&self.to_ne_bytes(), hash)
    }
}

impl HashPod for i64 {
    fn fold_into(self, hash: u32) -> u32 {
        hash_bytes(&self.to_ne_bytes(), hash)
    }
}

macro_rules! hash_pod_enums {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HashPod for $ty {
                fn fold_into(self, hash: u32) -> u32 {
                    hash_word(self as u32, hash)
                }
            }
        )+
    };
}

macro_rules! hash_pod_flags {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HashPod for $ty {
                fn fold_into(self, hash: u32) -> u32 {
                    hash_word(self.bits(), hash)
                }
            }
        )+
    };
}

hash_pod_enums!(
    AttributeType,
    GroupType,
    InterruptGeneratorMode,
    IoAccessMode,
    IoParadigmClass,
    IoParadigmType,
    LocationGroupType,
    LocationType,
    MetricBase,
    MetricMode,
    MetricOccurrence,
    MetricProfilingType,
    MetricScope,
    MetricSourceType,
    MetricValueType,
    ParadigmClass,
    ParadigmType,
    ParameterType,
    PropertyCondition,
    PropertyKind,
    RegionType,
    SamplingSetClass,
    TopologyType,
);

hash_pod_flags!(
    CommunicatorFlags,
    IoHandleFlags,
    IoParadigmFlags,
    IoStatusFlags,
    ParadigmFlags,
    RmaWindowFlags,
    SystemTreeDomain,
);

/// Accumulates a definition's key hash.
///
/// Handle fields are resolved against `arena`, which must be the arena of the
/// manager the definition is being interned into.
#[derive(Debug, Clone, Copy)]
pub struct KeyHasher<'a> {
    arena: &'a PageManager,
    value: u32,
}

impl<'a> KeyHasher<'a> {
    /// Start a fresh hash.
    #[must_use]
    pub fn new(arena: &'a PageManager) -> Self {
        Self { arena, value: 0 }
    }

    /// Fold a scalar value.
    #[must_use]
    pub fn pod<P: HashPod>(mut self, value: P) -> Self {
        self.value = value.fold_into(self.value);
        self
    }

    /// Fold every element of an array, in order.
    #[must_use]
    pub fn array<P: HashPod>(mut self, values: &[P]) -> Self {
        self.value = values
            .iter()
            .fold(self.value, |hash, value| value.fold_into(hash));
        self
    }

    /// Fold raw bytes.
    #[must_use]
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.value = hash_bytes(bytes, self.value);
        self
    }

    /// Fold the hash value of the referenced definition.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not belong to the hasher's arena.
    #[must_use]
    pub fn handle<D>(self, handle: Handle<D>) -> Self {
        self.any_handle(handle.any())
    }

    /// Fold the hash value of the referenced definition, if there is one.
    #[must_use]
    pub fn optional_handle<D>(self, handle: Handle<D>) -> Self {
        if handle.is_valid() {
            self.handle(handle)
        } else {
            self
        }
    }

    /// Fold the hash value of an untyped reference.
    #[must_use]
    pub fn any_handle(mut self, handle: AnyHandle) -> Self {
        let referenced = self.arena.header(handle).hash_value;
        self.value = hash_word(referenced, self.value);
        self
    }

    /// Fold an untyped reference, if there is one.
    #[must_use]
    pub fn optional_any_handle(self, handle: AnyHandle) -> Self {
        if handle.is_valid() {
            self.any_handle(handle)
        } else {
            self
        }
    }

    /// Fold a value computed by an external callback.
    #[must_use]
    pub fn with(mut self, fold: impl FnOnce(u32) -> u32) -> Self {
        self.value = fold(self.value);
        self
    }

    /// The accumulated hash.
    #[must_use]
    pub fn finish(self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_bytes(b"main", 0), hash_bytes(b"main", 0));
        assert_eq!(hash_word(42, 7), hash_word(42, 7));
    }

    #[test]
    fn hash_depends_on_seed() {
        assert_ne!(hash_bytes(b"main", 0), hash_bytes(b"main", 1));
        assert_ne!(hash_word(42, 0), hash_word(42, 1));
    }

    #[test]
    fn hash_distinguishes_prefixes() {
        assert_ne!(hash_bytes(b"", 0), hash_bytes(b"\0", 0));
        assert_ne!(hash_bytes(b"ab", 0), hash_bytes(b"abc", 0));
    }

    #[test]
    fn key_hasher_folds_in_order() {
        let arena = PageManager::new(1024);
        let ab = KeyHasher::new(&arena).pod(1u32).pod(2u32).finish();
        let ba = KeyHasher::new(&arena).pod(2u32).pod(1u32).finish();
        assert_ne!(ab, ba);
        assert_eq!(
            KeyHasher::new(&arena).array(&[1u64, 2, 3]).finish(),
            KeyHasher::new(&arena).pod(1u64).pod(2u64).pod(3u64).finish()
        );
    }

    #[test]
    fn absent_optional_handle_does_not_fold() {
        let arena = PageManager::new(1024);
        let plain = KeyHasher::new(&arena).pod(5u32).finish();
        let with_absent = KeyHasher::new(&arena)
            .pod(5u32)
            .optional_any_handle(AnyHandle::INVALID)
            .finish();
        assert_eq!(plain, with_absent);
    }
}
