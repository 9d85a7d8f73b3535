//! String definitions.

use super::Definition;
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::paths::simplify_path;
use crate::types::Handle;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Handle to a [`StringDef`].
pub type StringHandle = Handle<StringDef>;

/// An interned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringDef {
    pub(crate) header: DefinitionHeader,
    /// The string content.
    pub value: Arc<str>,
}

impl StringDef {
    pub(crate) fn new(value: Arc<str>) -> Self {
        Self {
            header: DefinitionHeader::new(),
            value,
        }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check if the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Definition for StringDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena).bytes(self.value.as_bytes()).finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.value == candidate.value
    }

    fn variable_size(&self) -> usize {
        // Content plus terminator.
        self.value.len() + 1
    }
}

impl DefinitionManager {
    /// Intern a string.
    pub fn define_string(&mut self, value: &str) -> Result<Interned<StringDef>> {
        self.intern(StringDef::new(value.into()))
    }

    /// Intern a string produced by `generate`, which writes into an empty buffer.
    pub fn define_string_with(
        &mut self,
        generate: impl FnOnce(&mut String),
    ) -> Result<Interned<StringDef>> {
        let mut buffer = String::new();
        generate(&mut buffer);
        self.intern(StringDef::new(buffer.into()))
    }

    /// Intern the lexically simplified form of a path.
    pub fn define_string_path(&mut self, path: &str) -> Result<Interned<StringDef>> {
        self.define_string_with(|buffer| buffer.push_str(&simplify_path(path)))
    }

    /// Intern formatted text.
    pub fn define_string_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<Interned<StringDef>> {
        let mut buffer = String::new();
        buffer
            .write_fmt(args)
            .map_err(|_| DefinitionsError::InvalidArgument {
                operation: "define_string_fmt",
                cause: "formatting trait implementation returned an error".to_string(),
            })?;
        self.intern(StringDef::new(buffer.into()))
    }

    /// Intern `value`, or `default` if it is `None`.
    pub(crate) fn define_string_or(
        &mut self,
        value: Option<&str>,
        default: &str,
    ) -> Result<Handle<StringDef>> {
        Ok(self.define_string(value.unwrap_or(default))?.handle())
    }
}

impl Definitions {
    /// Define a string.
    pub fn new_string(&self, value: &str) -> Result<StringHandle> {
        self.define(|local| local.define_string(value))
    }

    /// Define the simplified form of a file path.
    pub fn new_string_path(&self, path: &str) -> Result<StringHandle> {
        let simplified = simplify_path(path);
        self.define(|local| local.define_string(&simplified))
    }

    /// Define formatted text, e.g. `new_string_fmt(format_args!("rank {}", 3))`.
    pub fn new_string_fmt(&self, args: fmt::Arguments<'_>) -> Result<StringHandle> {
        self.define(|local| local.define_string_fmt(args))
    }

    /// The content of a local string.
    #[must_use]
    #[track_caller]
    pub fn string(&self, handle: StringHandle) -> Arc<str> {
        Arc::clone(&self.lock().get(handle).value)
    }
}

/// Re-create a local string in the unified manager.
pub fn unify_string(
    source: &mut DefinitionManager,
    handle: StringHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let value = Arc::clone(&source.get(handle).value);
    let counterpart = unified.intern(StringDef::new(value))?.handle();
    source.set_unified(handle, counterpart)
}
