//! The measurement-side definitions context.
//!
//! [`Definitions`] owns the local [`DefinitionManager`] behind a process-wide
//! lock. Every `new_*` entry point acquires the lock for exactly one intern
//! call, releases it, and then notifies the registered substrates if a new
//! definition was created.

use crate::config::DefinitionsConfig;
use crate::definitions::{Definition, HandleType};
use crate::error::Result;
use crate::manager::{DefinitionManager, Interned};
use crate::substrate::SubstrateNotifier;
use crate::types::{AnyHandle, Handle};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Lock-guarded local definitions plus the substrates observing them.
pub struct Definitions {
    config: DefinitionsConfig,
    local: Mutex<DefinitionManager>,
    substrates: Vec<Arc<dyn SubstrateNotifier>>,
    interim_sequence: AtomicU32,
}

impl Definitions {
    /// Create the context with a fresh local manager.
    pub fn new(config: DefinitionsConfig) -> Result<Self> {
        let local = DefinitionManager::new_local(&config)?;
        Ok(Self {
            config,
            local: Mutex::new(local),
            substrates: Vec::new(),
            interim_sequence: AtomicU32::new(0),
        })
    }

    /// Register a substrate to be told about new definitions.
    #[must_use]
    pub fn with_substrate(mut self, substrate: Arc<dyn SubstrateNotifier>) -> Self {
        self.substrates.push(substrate);
        self
    }

    /// The configuration the local manager was built with.
    #[must_use]
    pub fn config(&self) -> &DefinitionsConfig {
        &self.config
    }

    /// Acquire the definitions lock.
    ///
    /// Holding the guard blocks every `new_*` entry point.
    pub fn lock(&self) -> MutexGuard<'_, DefinitionManager> {
        self.local.lock()
    }

    /// Run one intern call under the lock, then notify if it created something.
    pub(crate) fn define<D: Definition>(
        &self,
        define: impl FnOnce(&mut DefinitionManager) -> Result<Interned<D>>,
    ) -> Result<Handle<D>> {
        let interned = {
            let mut local = self.local.lock();
            define(&mut local)?
        };
        if interned.is_created() && D::SUBSTRATE_AWARE {
            self.notify(interned.handle().any(), D::KIND);
        }
        Ok(interned.handle())
    }

    /// Tell every substrate about a new definition.
    pub(crate) fn notify(&self, handle: AnyHandle, kind: HandleType) {
        for substrate in &self.substrates {
            substrate.new_definition_handle(handle, kind);
        }
    }

    /// Draw the next interim communicator sequence number.
    ///
    /// Shared by the local table and every caller-owned table.
    pub(crate) fn next_interim_sequence(&self) -> u32 {
        self.interim_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// End measurement and take the local manager.
    #[must_use]
    pub fn into_local(self) -> DefinitionManager {
        self.local.into_inner()
    }
}

impl fmt::Debug for Definitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definitions")
            .field("config", &self.config)
            .field("substrates", &self.substrates.len())
            .finish_non_exhaustive()
    }
}
