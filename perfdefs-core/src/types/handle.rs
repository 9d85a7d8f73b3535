//! Movable handles into a definition arena.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Byte offset of a record inside a definition arena.
///
/// Offsets stay valid when the arena's backing storage grows, which is what
/// makes them usable as long-lived references between definitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct MovableOffset(u32);

impl MovableOffset {
    /// The null offset. No record ever lives here.
    pub const NULL: Self = Self(0);

    /// Create a new movable offset.
    #[must_use]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Get the raw offset value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Check if this is the null offset.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MovableOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for MovableOffset {
    fn from(offset: u32) -> Self {
        Self(offset)
    }
}

/// A handle whose definition kind is only known at runtime.
///
/// Used by the definition header and by fields that may reference several
/// kinds, such as the scope of a scoped sampling set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct AnyHandle(MovableOffset);

impl AnyHandle {
    /// The invalid handle.
    pub const INVALID: Self = Self(MovableOffset::NULL);

    /// Create a handle from a raw offset.
    #[must_use]
    pub const fn new(offset: MovableOffset) -> Self {
        Self(offset)
    }

    /// Get the arena offset.
    #[must_use]
    pub const fn offset(&self) -> MovableOffset {
        self.0
    }

    /// Check if this handle refers to a definition.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.0.is_null()
    }

    /// Reinterpret as a handle of kind `D`.
    #[must_use]
    pub const fn typed<D>(self) -> Handle<D> {
        Handle::from_any(self)
    }
}

impl fmt::Display for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("<invalid>")
        }
    }
}

/// A typed handle to a definition of kind `D`.
///
/// The handle is only meaningful for the manager that produced it. Handles
/// from a local manager must be translated through their `unified` slot
/// before they can be used against the unified manager.
#[repr(transparent)]
pub struct Handle<D> {
    offset: MovableOffset,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Handle<D> {
    /// The invalid handle of this kind.
    pub const INVALID: Self = Self {
        offset: MovableOffset::NULL,
        _marker: PhantomData,
    };

    /// Create a handle from a raw offset.
    #[must_use]
    pub const fn new(offset: MovableOffset) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Reinterpret an untyped handle.
    #[must_use]
    pub const fn from_any(handle: AnyHandle) -> Self {
        Self::new(handle.offset())
    }

    /// Erase the kind.
    #[must_use]
    pub const fn any(&self) -> AnyHandle {
        AnyHandle::new(self.offset)
    }

    /// Get the arena offset.
    #[must_use]
    pub const fn offset(&self) -> MovableOffset {
        self.offset
    }

    /// Check if this handle refers to a definition.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.offset.is_null()
    }
}

impl<D> Clone for Handle<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Handle<D> {}

impl<D> PartialEq for Handle<D> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<D> Eq for Handle<D> {}

impl<D> Hash for Handle<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
    }
}

impl<D> Default for Handle<D> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<D> fmt::Debug for Handle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<D>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Handle<{}>({})", short, self.offset)
    }
}

impl<D> fmt::Display for Handle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.any(), f)
    }
}

impl<D> From<Handle<D>> for AnyHandle {
    fn from(handle: Handle<D>) -> Self {
        handle.any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    #[test]
    fn movable_offset_basic() {
        let offset = MovableOffset::new(128);
        assert_eq!(offset.as_u32(), 128);
        assert!(!offset.is_null());
        assert!(MovableOffset::NULL.is_null());
        assert_eq!(offset.to_string(), "0x00000080");
    }

    #[test]
    fn handle_invalid_sentinel() {
        let handle: Handle<Dummy> = Handle::INVALID;
        assert!(!handle.is_valid());
        assert_eq!(handle, Handle::default());
        assert_eq!(handle.any(), AnyHandle::INVALID);
        assert_eq!(handle.to_string(), "<invalid>");
    }

    #[test]
    fn handle_any_round_trip() {
        let handle: Handle<Dummy> = Handle::new(MovableOffset::new(64));
        let any: AnyHandle = handle.into();
        assert!(any.is_valid());
        assert_eq!(any.typed::<Dummy>(), handle);
        assert_eq!(Handle::<Dummy>::from_any(any), handle);
    }

    #[test]
    fn handle_debug_names_kind() {
        let handle: Handle<Dummy> = Handle::new(MovableOffset::new(16));
        assert_eq!(format!("{:?}", handle), "Handle<Dummy>(0x00000010)");
    }
}
