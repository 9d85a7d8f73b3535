//! I/O handles.
//!
//! A handle may be created before the file it refers to is known. Such an
//! incomplete handle becomes visible to substrates only when it is completed,
//! and is never unified if completion never happens.

use super::{Definition, HandleType, InterimCommunicatorHandle, IoFileHandle, Record, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AnyHandle, Handle, IoAccessMode, IoHandleFlags, IoParadigmType, IoStatusFlags};

/// Handle to an [`IoHandleDef`].
pub type IoHandleHandle = Handle<IoHandleDef>;

/// An I/O handle (file descriptor, `FILE*`, MPI file ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoHandleDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) file: IoFileHandle,
    pub(crate) paradigm: IoParadigmType,
    pub(crate) flags: IoHandleFlags,
    pub(crate) scope: AnyHandle,
    pub(crate) parent: IoHandleHandle,
    pub(crate) unify_key: u32,
    pub(crate) access_mode: IoAccessMode,
    pub(crate) status_flags: IoStatusFlags,
    pub(crate) is_completed: bool,
    pub(crate) payload: Box<[u8]>,
}

impl IoHandleDef {
    /// Handle name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// The file, `INVALID` until known.
    #[must_use]
    pub fn file(&self) -> IoFileHandle {
        self.file
    }

    /// I/O paradigm.
    #[must_use]
    pub fn paradigm(&self) -> IoParadigmType {
        self.paradigm
    }

    /// Flags.
    #[must_use]
    pub fn flags(&self) -> IoHandleFlags {
        self.flags
    }

    /// Communicator scope of a collective handle: an interim communicator
    /// until resolved, a communicator afterwards.
    #[must_use]
    pub fn scope(&self) -> AnyHandle {
        self.scope
    }

    /// Handle this one was derived from, e.g. by `dup`.
    #[must_use]
    pub fn parent(&self) -> IoHandleHandle {
        self.parent
    }

    /// Key that lets handles of different processes unify; 0 never unifies.
    #[must_use]
    pub fn unify_key(&self) -> u32 {
        self.unify_key
    }

    /// Access mode of a pre-created handle.
    #[must_use]
    pub fn access_mode(&self) -> IoAccessMode {
        self.access_mode
    }

    /// Status flags of a pre-created handle.
    #[must_use]
    pub fn status_flags(&self) -> IoStatusFlags {
        self.status_flags
    }

    /// Check if the handle is complete.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// The paradigm's payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Definition for IoHandleDef {
    // Notified on completion rather than creation.
    const SUBSTRATE_AWARE: bool = false;

    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .optional_handle(self.name)
            .optional_handle(self.file)
            .pod(self.paradigm)
            .pod(self.flags)
            .optional_any_handle(self.scope)
            .optional_handle(self.parent)
            .pod(self.access_mode)
            .pod(self.status_flags)
            .pod(self.unify_key)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        if existing.unify_key == 0 && candidate.unify_key == 0 {
            return false;
        }
        existing.name == candidate.name
            && existing.file == candidate.file
            && existing.paradigm == candidate.paradigm
            && existing.flags == candidate.flags
            && existing.scope == candidate.scope
            && existing.parent == candidate.parent
            && existing.access_mode == candidate.access_mode
            && existing.status_flags == candidate.status_flags
            && existing.unify_key == candidate.unify_key
            && existing.is_completed == candidate.is_completed
    }

    fn variable_size(&self) -> usize {
        self.payload.len()
    }
}

/// Field values of an I/O handle, as passed to [`DefinitionManager::define_io_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoHandleFields {
    /// Handle name.
    pub name: StringHandle,
    /// The file, `INVALID` if not known yet.
    pub file: IoFileHandle,
    /// I/O paradigm.
    pub paradigm: IoParadigmType,
    /// Flags.
    pub flags: IoHandleFlags,
    /// Communicator scope.
    pub scope: AnyHandle,
    /// Parent handle.
    pub parent: IoHandleHandle,
    /// Unification key.
    pub unify_key: u32,
    /// Access mode.
    pub access_mode: IoAccessMode,
    /// Status flags.
    pub status_flags: IoStatusFlags,
    /// Whether the handle is complete.
    pub is_completed: bool,
}

impl DefinitionManager {
    /// Intern an I/O handle with `payload_size` bytes of zeroed payload.
    pub fn define_io_handle(
        &mut self,
        fields: IoHandleFields,
        payload_size: usize,
    ) -> Result<Interned<IoHandleDef>> {
        self.intern(IoHandleDef {
            header: DefinitionHeader::new(),
            name: fields.name,
            file: fields.file,
            paradigm: fields.paradigm,
            flags: fields.flags,
            scope: fields.scope,
            parent: fields.parent,
            unify_key: fields.unify_key,
            access_mode: fields.access_mode,
            status_flags: fields.status_flags,
            is_completed: fields.is_completed,
            payload: vec![0; payload_size].into_boxed_slice(),
        })
    }
}

impl Definitions {
    /// Define an I/O handle.
    ///
    /// `pre_created` supplies the access mode and status flags of a handle
    /// that existed before measurement; it is only honored if `flags`
    /// contains [`IoHandleFlags::PRE_CREATED`]. Complete handles are reported
    /// to substrates right away, incomplete ones on
    /// [`io_handle_complete`](Self::io_handle_complete).
    ///
    /// `scope` must be `INVALID` or an interim communicator of the shared
    /// table. Interim communicators living in a caller-owned arena are
    /// rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn new_io_handle(
        &self,
        name: Option<&str>,
        file: IoFileHandle,
        paradigm: IoParadigmType,
        flags: IoHandleFlags,
        scope: InterimCommunicatorHandle,
        parent: IoHandleHandle,
        unify_key: u32,
        is_completed: bool,
        payload_size: usize,
        pre_created: (IoAccessMode, IoStatusFlags),
    ) -> Result<IoHandleHandle> {
        let (access_mode, status_flags) = if flags.contains(IoHandleFlags::PRE_CREATED) {
            pre_created
        } else {
            (IoAccessMode::None, IoStatusFlags::empty())
        };
        let handle = self.define(|local| {
            if scope.is_valid()
                && !matches!(local.arena.record(scope.any()), Some(Record::InterimCommunicator(_)))
            {
                return Err(DefinitionsError::InvalidArgument {
                    operation: "new_io_handle",
                    cause: format!("scope {scope} is not an interim communicator of this table"),
                });
            }
            let name = local.define_string(name.unwrap_or(""))?.handle();
            let fields = IoHandleFields {
                name,
                file,
                paradigm,
                flags,
                scope: scope.any(),
                parent,
                unify_key,
                access_mode,
                status_flags,
                is_completed,
            };
            local.define_io_handle(fields, payload_size)
        })?;
        if is_completed {
            self.notify(handle.any(), HandleType::IoHandle);
        }
        Ok(handle)
    }

    /// Complete an I/O handle with its file.
    ///
    /// A unify key given at creation is kept. Fails if the handle was
    /// already complete.
    pub fn io_handle_complete(
        &self,
        handle: IoHandleHandle,
        file: IoFileHandle,
        unify_key: u32,
    ) -> Result<()> {
        {
            let mut local = self.lock();
            let definition = local.get_mut(handle);
            if definition.is_completed {
                return Err(DefinitionsError::IoHandleAlreadyCompleted {
                    handle: handle.any(),
                });
            }
            if definition.unify_key == 0 {
                definition.unify_key = unify_key;
            }
            definition.file = file;
            definition.is_completed = true;
        }
        self.notify(handle.any(), HandleType::IoHandle);
        Ok(())
    }

    /// Recompute the hash of a handle whose identity changed.
    pub fn io_handle_rehash(&self, handle: IoHandleHandle) {
        self.lock().rehash(handle);
    }

    /// The file of a handle.
    #[must_use]
    pub fn io_handle_file(&self, handle: IoHandleHandle) -> IoFileHandle {
        self.lock().get(handle).file
    }

    /// The parent of a handle.
    #[must_use]
    pub fn io_handle_parent(&self, handle: IoHandleHandle) -> IoHandleHandle {
        self.lock().get(handle).parent
    }

    /// The paradigm of a handle.
    #[must_use]
    pub fn io_handle_paradigm(&self, handle: IoHandleHandle) -> IoParadigmType {
        self.lock().get(handle).paradigm
    }

    /// Run `access` on the payload of a handle.
    pub fn io_handle_payload<R>(
        &self,
        handle: IoHandleHandle,
        access: impl FnOnce(&mut [u8]) -> R,
    ) -> R {
        access(&mut self.lock().get_mut(handle).payload)
    }
}

/// Re-create a local I/O handle in the unified manager.
///
/// Incomplete handles are left without a unified counterpart.
pub fn unify_io_handle(
    source: &mut DefinitionManager,
    handle: IoHandleHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    if !definition.is_completed {
        tracing::trace!(handle = %handle, "Skipping incomplete I/O handle");
        return Ok(());
    }
    let kind = HandleType::IoHandle;
    let fields = IoHandleFields {
        name: source.optional_unified(kind, "name", definition.name)?,
        file: source.optional_unified(kind, "file", definition.file)?,
        paradigm: definition.paradigm,
        flags: definition.flags,
        scope: source.unified_communicator(kind, "scope", definition.scope)?,
        parent: source.optional_unified(kind, "parent", definition.parent)?,
        unify_key: definition.unify_key,
        access_mode: definition.access_mode,
        status_flags: definition.status_flags,
        is_completed: true,
    };
    let counterpart = unified.define_io_handle(fields, 0)?.handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::substrate::RecordingNotifier;
    use std::sync::Arc;

    fn new_handle(
        definitions: &Definitions,
        flags: IoHandleFlags,
        is_completed: bool,
    ) -> IoHandleHandle {
        definitions
            .new_io_handle(
                Some("fd"),
                Handle::INVALID,
                IoParadigmType::Posix,
                flags,
                Handle::INVALID,
                Handle::INVALID,
                0,
                is_completed,
                4,
                (IoAccessMode::ReadOnly, IoStatusFlags::APPEND),
            )
            .unwrap()
    }

    #[test]
    fn completion_notifies_once() {
        let recorder = Arc::new(RecordingNotifier::new());
        let definitions = Definitions::new(DefinitionsConfig::default())
            .unwrap()
            .with_substrate(recorder.clone());
        let handle = new_handle(&definitions, IoHandleFlags::empty(), false);
        assert_eq!(recorder.count_of(HandleType::IoHandle), 0);

        let file = definitions.new_io_file("/dev/null", Handle::INVALID).unwrap();
        definitions.io_handle_complete(handle, file, 17).unwrap();
        assert_eq!(recorder.count_of(HandleType::IoHandle), 1);
        assert_eq!(definitions.io_handle_file(handle), file);

        let err = definitions.io_handle_complete(handle, file, 18).unwrap_err();
        assert_eq!(err.code(), "E202");
        assert_eq!(recorder.count_of(HandleType::IoHandle), 1);
        assert_eq!(definitions.lock().get(handle).unify_key(), 17);
    }

    #[test]
    fn complete_handles_notify_at_creation() {
        let recorder = Arc::new(RecordingNotifier::new());
        let definitions = Definitions::new(DefinitionsConfig::default())
            .unwrap()
            .with_substrate(recorder.clone());
        let handle = new_handle(&definitions, IoHandleFlags::empty(), true);
        assert!(recorder.contains(handle.any()));
    }

    #[test]
    fn access_mode_requires_pre_created() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let plain = new_handle(&definitions, IoHandleFlags::empty(), true);
        let pre = new_handle(&definitions, IoHandleFlags::PRE_CREATED, true);

        let local = definitions.lock();
        assert_eq!(local.get(plain).access_mode(), IoAccessMode::None);
        assert_eq!(local.get(pre).access_mode(), IoAccessMode::ReadOnly);
        assert_eq!(local.get(pre).status_flags(), IoStatusFlags::APPEND);
        assert_eq!(local.get(pre).payload().len(), 4);
    }

    #[test]
    fn zero_unify_keys_never_match() {
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        let fields = IoHandleFields {
            name: unified.empty_string(),
            file: Handle::INVALID,
            paradigm: IoParadigmType::Isoc,
            flags: IoHandleFlags::empty(),
            scope: AnyHandle::INVALID,
            parent: Handle::INVALID,
            unify_key: 0,
            access_mode: IoAccessMode::None,
            status_flags: IoStatusFlags::empty(),
            is_completed: true,
        };
        let a = unified.define_io_handle(fields, 0).unwrap();
        let b = unified.define_io_handle(fields, 0).unwrap();
        assert_ne!(a.handle(), b.handle());

        let keyed = IoHandleFields { unify_key: 1, ..fields };
        let c = unified.define_io_handle(keyed, 0).unwrap();
        let d = unified.define_io_handle(keyed, 0).unwrap();
        assert_eq!(d, Interned::Existing(c.handle()));
    }

    #[test]
    fn incomplete_handles_are_not_unified() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let handle = new_handle(&definitions, IoHandleFlags::empty(), false);
        let mut source = definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        unify_io_handle(&mut source, handle, &mut unified).unwrap();
        assert!(!source.unified(handle).is_valid());
    }

    #[test]
    fn scope_must_be_a_shared_interim_communicator() {
        use crate::definitions::{InterimCommunicatorRequest, InterimCommunicatorTable};
        use crate::types::ParadigmType;

        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let mut arena = PageManager::new(4096);
        let mut table = InterimCommunicatorTable::new();
        let foreign = definitions
            .new_interim_communicator_custom(
                Some(&mut arena),
                &mut table,
                InterimCommunicatorRequest::new(Handle::INVALID, ParadigmType::Io, 0),
            )
            .unwrap()
            .handle();
        let shared = definitions
            .new_interim_communicator(Handle::INVALID, ParadigmType::Mpi, 0)
            .unwrap();

        let define = |scope| {
            definitions.new_io_handle(
                Some("fd"),
                Handle::INVALID,
                IoParadigmType::Posix,
                IoHandleFlags::empty(),
                scope,
                Handle::INVALID,
                0,
                true,
                0,
                (IoAccessMode::None, IoStatusFlags::empty()),
            )
        };
        let err = define(foreign).unwrap_err();
        assert_eq!(err.code(), "E204");
        assert!(define(shared).is_ok());
        assert!(define(Handle::INVALID).is_ok());
    }
}
