//! Communicators and interim communicators.
//!
//! During measurement, paradigms create *interim* communicators: cheap,
//! per-process objects with a paradigm-defined payload. Before unification
//! the paradigm turns them into proper [`CommunicatorDef`]s and records the
//! result in each interim's `unified` slot with
//! [`DefinitionManager::set_interim_communicator_unified`]. Definitions that
//! referenced an interim (RMA windows, topologies, I/O handles) are then
//! redirected by [`resolve_interim_definitions`](crate::unify::resolve_interim_definitions).

use super::{Definition, GroupHandle, HandleType, Record, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned, ManagerEntry};
use crate::types::{AnyHandle, CommunicatorFlags, Handle, ParadigmType};
use std::fmt;

/// Handle to a [`CommunicatorDef`].
pub type CommunicatorHandle = Handle<CommunicatorDef>;

/// Handle to an [`InterimCommunicatorDef`].
pub type InterimCommunicatorHandle = Handle<InterimCommunicatorDef>;

/// A communicator spanning one group (intra) or two groups (inter).
///
/// The name and the parent are not part of the identity. On a duplicate hit
/// the latest valid name wins, and an intercommunicator without a parent
/// adopts the parent of its duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicatorDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) group_a: GroupHandle,
    pub(crate) group_b: GroupHandle,
    pub(crate) name: StringHandle,
    pub(crate) parent: CommunicatorHandle,
    pub(crate) unify_key: u32,
    pub(crate) flags: CommunicatorFlags,
}

impl CommunicatorDef {
    /// The (local) group.
    #[must_use]
    pub fn group_a(&self) -> GroupHandle {
        self.group_a
    }

    /// The remote group; equal to [`group_a`](Self::group_a) for intracommunicators.
    #[must_use]
    pub fn group_b(&self) -> GroupHandle {
        self.group_b
    }

    /// Check if the communicator spans two distinct groups.
    #[must_use]
    pub fn is_inter(&self) -> bool {
        self.group_a != self.group_b
    }

    /// Display name, `INVALID` if unnamed.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Parent communicator.
    #[must_use]
    pub fn parent(&self) -> CommunicatorHandle {
        self.parent
    }

    /// Paradigm-chosen key that disambiguates communicators over equal groups.
    #[must_use]
    pub fn unify_key(&self) -> u32 {
        self.unify_key
    }

    /// Flags.
    #[must_use]
    pub fn flags(&self) -> CommunicatorFlags {
        self.flags
    }
}

impl Definition for CommunicatorDef {
    // Only materialized right before unification.
    const SUBSTRATE_AWARE: bool = false;

    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.group_a)
            .handle(self.group_b)
            .pod(self.unify_key)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.group_a == candidate.group_a
            && existing.group_b == candidate.group_b
            && existing.unify_key == candidate.unify_key
            && existing.parent == candidate.parent
    }

    fn resolve_duplicate(existing: &mut Self, candidate: &Self) -> bool {
        if existing.group_a != candidate.group_a
            || existing.group_b != candidate.group_b
            || existing.unify_key != candidate.unify_key
        {
            return false;
        }

        let is_equal = if candidate.is_inter() {
            // Intercommunicators may legitimately differ in their parent.
            if !existing.parent.is_valid() && candidate.parent.is_valid() {
                existing.parent = candidate.parent;
            }
            true
        } else {
            existing.parent == candidate.parent
        };

        if is_equal && candidate.name.is_valid() {
            existing.name = candidate.name;
        }
        is_equal
    }
}

/// A paradigm-level communicator carrying an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterimCommunicatorDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) parent: InterimCommunicatorHandle,
    pub(crate) paradigm: ParadigmType,
    pub(crate) rma_window_creation_counter: u32,
    pub(crate) payload: Box<[u8]>,
}

impl InterimCommunicatorDef {
    /// Name, `INVALID` until set.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Parent interim communicator.
    #[must_use]
    pub fn parent(&self) -> InterimCommunicatorHandle {
        self.parent
    }

    /// The paradigm that created it.
    #[must_use]
    pub fn paradigm(&self) -> ParadigmType {
        self.paradigm
    }

    /// The paradigm's payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Communicator this interim was resolved to, `INVALID` until then.
    #[must_use]
    pub fn communicator(&self) -> CommunicatorHandle {
        Handle::from_any(self.header.unified)
    }
}

impl Definition for InterimCommunicatorDef {
    /// Hash of the fixed fields. Payload hashes are folded on top by the
    /// creating paradigm.
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .optional_handle(self.parent)
            .pod(self.paradigm)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
            && existing.parent == candidate.parent
            && existing.paradigm == candidate.paradigm
            && existing.payload == candidate.payload
    }

    fn variable_size(&self) -> usize {
        self.payload.len()
    }
}

/// Folds the payload into the definition's hash: `(payload, hash) -> hash`.
pub type InitPayloadFn<'a> = &'a mut dyn FnMut(&mut [u8], u32) -> u32;

/// Compares two payloads for equality.
pub type EqualPayloadsFn = fn(&[u8], &[u8]) -> bool;

/// Arguments of an interim communicator definition.
pub struct InterimCommunicatorRequest<'a> {
    /// Parent interim communicator, `INVALID` for a root.
    pub parent: InterimCommunicatorHandle,
    /// Creating paradigm.
    pub paradigm: ParadigmType,
    /// Bytes of zeroed payload to allocate.
    pub payload_size: usize,
    /// Fills the payload and folds it into the hash.
    pub init_payload: Option<InitPayloadFn<'a>>,
    /// Enables deduplication. Requires a table with a hash table.
    pub equal_payloads: Option<EqualPayloadsFn>,
}

impl<'a> InterimCommunicatorRequest<'a> {
    /// A request without payload callbacks; the result is never deduplicated.
    #[must_use]
    pub fn new(
        parent: InterimCommunicatorHandle,
        paradigm: ParadigmType,
        payload_size: usize,
    ) -> Self {
        Self {
            parent,
            paradigm,
            payload_size,
            init_payload: None,
            equal_payloads: None,
        }
    }

    /// Set the payload initializer.
    #[must_use]
    pub fn with_init_payload(mut self, init_payload: InitPayloadFn<'a>) -> Self {
        self.init_payload = Some(init_payload);
        self
    }

    /// Set the payload comparison.
    #[must_use]
    pub fn with_equal_payloads(mut self, equal_payloads: EqualPayloadsFn) -> Self {
        self.equal_payloads = Some(equal_payloads);
        self
    }
}

impl fmt::Debug for InterimCommunicatorRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterimCommunicatorRequest")
            .field("parent", &self.parent)
            .field("paradigm", &self.paradigm)
            .field("payload_size", &self.payload_size)
            .field("init_payload", &self.init_payload.is_some())
            .field("equal_payloads", &self.equal_payloads.is_some())
            .finish()
    }
}

/// A caller-owned table of interim communicators.
///
/// Paradigms keep their own tables to look up communicator-like objects by
/// payload. Sequence numbers are still drawn from the shared counter of the
/// [`Definitions`] context, so they are unique across all tables.
#[derive(Debug, Clone)]
pub struct InterimCommunicatorTable {
    entry: ManagerEntry,
}

impl InterimCommunicatorTable {
    /// A table that never deduplicates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entry: ManagerEntry::new(HandleType::InterimCommunicator),
        }
    }

    /// A table with `1 << power` buckets, required for payload deduplication.
    pub fn with_hash_table(power: u32) -> Result<Self> {
        Ok(Self {
            entry: ManagerEntry::with_hash_table(HandleType::InterimCommunicator, power)?,
        })
    }

    /// The underlying entry.
    #[must_use]
    pub fn entry(&self) -> &ManagerEntry {
        &self.entry
    }

    /// Handles in creation order, resolved against the arena they live in.
    #[must_use]
    pub fn handles(&self, arena: &PageManager) -> Vec<InterimCommunicatorHandle> {
        self.entry
            .iter::<InterimCommunicatorDef>(arena)
            .map(|(handle, _)| handle)
            .collect()
    }
}

impl Default for InterimCommunicatorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate an interim communicator and link it into `entry`.
///
/// The payload participates in deduplication only if the request carries
/// `equal_payloads`.
fn define_interim_communicator(
    arena: &mut PageManager,
    entry: &mut ManagerEntry,
    request: InterimCommunicatorRequest<'_>,
    next_sequence: impl FnOnce() -> u32,
) -> Result<Interned<InterimCommunicatorDef>> {
    if request.equal_payloads.is_some() && !entry.has_hash_table() {
        return Err(DefinitionsError::MissingHashTable {
            kind: HandleType::InterimCommunicator,
        });
    }

    let mut definition = InterimCommunicatorDef {
        header: DefinitionHeader::new(),
        name: StringHandle::INVALID,
        parent: request.parent,
        paradigm: request.paradigm,
        rma_window_creation_counter: 0,
        payload: vec![0; request.payload_size].into_boxed_slice(),
    };
    let mut hash_value = definition.key_hash(arena);
    if let Some(init_payload) = request.init_payload {
        hash_value = init_payload(&mut definition.payload, hash_value);
    }
    definition.header.hash_value = hash_value;

    let candidate = arena.alloc(definition)?;
    if let Some(equal_payloads) = request.equal_payloads {
        let duplicate = entry.find_duplicate(
            arena,
            candidate,
            &mut |existing: &mut InterimCommunicatorDef, candidate: &InterimCommunicatorDef| {
                existing.name == candidate.name
                    && existing.parent == candidate.parent
                    && existing.paradigm == candidate.paradigm
                    && equal_payloads(&existing.payload, &candidate.payload)
            },
        );
        if let Some(existing) = duplicate {
            arena.rollback(candidate.any());
            tracing::trace!(handle = %existing, "Duplicate interim communicator");
            return Ok(Interned::Existing(existing));
        }
    }

    entry.link(arena, candidate.any(), next_sequence());
    Ok(Interned::Created(candidate))
}

impl DefinitionManager {
    /// Intern a communicator, applying the intercommunicator merge rule.
    pub fn define_communicator(
        &mut self,
        group_a: GroupHandle,
        group_b: GroupHandle,
        name: StringHandle,
        parent: CommunicatorHandle,
        unify_key: u32,
        flags: CommunicatorFlags,
    ) -> Result<Interned<CommunicatorDef>> {
        self.intern(CommunicatorDef {
            header: DefinitionHeader::new(),
            group_a,
            group_b,
            name,
            parent,
            unify_key,
            flags,
        })
    }

    /// Record the communicator an interim communicator was resolved to.
    pub fn set_interim_communicator_unified(
        &mut self,
        interim: InterimCommunicatorHandle,
        communicator: CommunicatorHandle,
    ) -> Result<()> {
        let header = &mut self.get_mut(interim).header;
        if header.unified.is_valid() {
            return Err(DefinitionsError::UnifiedAlreadySet {
                kind: HandleType::InterimCommunicator,
                handle: interim.any(),
            });
        }
        header.unified = communicator.any();
        Ok(())
    }

    /// The communicator a reference stands for.
    ///
    /// Communicator references pass through; interim references resolve to
    /// the communicator recorded for them. A reference to any other record
    /// is rejected.
    pub(crate) fn resolve_communicator_reference(&self, reference: AnyHandle) -> Result<AnyHandle> {
        if !reference.is_valid() {
            return Ok(reference);
        }
        match self.arena.record(reference) {
            Some(Record::InterimCommunicator(interim)) => {
                let communicator = interim.header.unified;
                if communicator.is_valid() {
                    Ok(communicator)
                } else {
                    Err(DefinitionsError::InterimNotResolved { handle: reference })
                }
            }
            Some(Record::Communicator(_)) => Ok(reference),
            other => Err(not_a_communicator(reference, other)),
        }
    }

    /// Unified counterpart of a communicator reference held by a `kind`
    /// definition. Fails if the reference was never resolved from its
    /// interim communicator.
    pub(crate) fn unified_communicator(
        &self,
        kind: HandleType,
        field: &'static str,
        reference: AnyHandle,
    ) -> Result<AnyHandle> {
        if reference.is_valid() {
            match self.arena.record(reference) {
                Some(Record::Communicator(_)) => {}
                Some(Record::InterimCommunicator(_)) => {
                    return Err(DefinitionsError::InterimNotResolved { handle: reference });
                }
                other => return Err(not_a_communicator(reference, other)),
            }
        }
        self.optional_unified_any(kind, field, reference)
    }

    /// Post-increment the RMA window creation counter of an interim communicator.
    pub(crate) fn next_rma_window_creation_id(&mut self, interim: InterimCommunicatorHandle) -> u32 {
        let definition = self.get_mut(interim);
        let creation_id = definition.rma_window_creation_counter;
        definition.rma_window_creation_counter = creation_id.wrapping_add(1);
        creation_id
    }
}

fn not_a_communicator(reference: AnyHandle, record: Option<&Record>) -> DefinitionsError {
    let cause = match record {
        Some(record) => format!("{reference} is a {} definition, not a communicator", record.kind()),
        None => format!("{reference} is not a definition of this table"),
    };
    DefinitionsError::InvalidArgument {
        operation: "resolve communicator reference",
        cause,
    }
}

impl Definitions {
    /// Define an intracommunicator over `group`.
    pub fn new_communicator(
        &self,
        group: GroupHandle,
        name: Option<&str>,
        parent: CommunicatorHandle,
        unify_key: u32,
        flags: CommunicatorFlags,
    ) -> Result<CommunicatorHandle> {
        self.new_inter_communicator(group, group, name, parent, unify_key, flags)
    }

    /// Define an intercommunicator between two groups.
    pub fn new_inter_communicator(
        &self,
        group_a: GroupHandle,
        group_b: GroupHandle,
        name: Option<&str>,
        parent: CommunicatorHandle,
        unify_key: u32,
        flags: CommunicatorFlags,
    ) -> Result<CommunicatorHandle> {
        self.define(|local| {
            let name = match name {
                Some(name) => local.define_string(name)?.handle(),
                None => StringHandle::INVALID,
            };
            local.define_communicator(group_a, group_b, name, parent, unify_key, flags)
        })
    }

    /// Define an interim communicator in the shared table.
    pub fn new_interim_communicator(
        &self,
        parent: InterimCommunicatorHandle,
        paradigm: ParadigmType,
        payload_size: usize,
    ) -> Result<InterimCommunicatorHandle> {
        let request = InterimCommunicatorRequest::new(parent, paradigm, payload_size);
        let interned = {
            let mut local = self.lock();
            let (arena, entry) = local.arena_and_entry_mut(HandleType::InterimCommunicator);
            define_interim_communicator(arena, entry, request, || self.next_interim_sequence())?
        };
        self.notify_interim(interned);
        Ok(interned.handle())
    }

    /// Define an interim communicator in a caller-owned table.
    ///
    /// Without an `arena` the shared local arena is used under the
    /// definitions lock. With an `arena` (e.g. a per-location one) the
    /// caller is responsible for serializing access to `table`.
    ///
    /// An [`Interned::Existing`] result means the payload was not initialized
    /// again.
    pub fn new_interim_communicator_custom(
        &self,
        arena: Option<&mut PageManager>,
        table: &mut InterimCommunicatorTable,
        request: InterimCommunicatorRequest<'_>,
    ) -> Result<Interned<InterimCommunicatorDef>> {
        let next_sequence = || self.next_interim_sequence();
        let interned = match arena {
            Some(arena) => define_interim_communicator(arena, &mut table.entry, request, next_sequence)?,
            None => {
                let mut local = self.lock();
                define_interim_communicator(&mut local.arena, &mut table.entry, request, next_sequence)?
            }
        };
        self.notify_interim(interned);
        Ok(interned)
    }

    fn notify_interim(&self, interned: Interned<InterimCommunicatorDef>) {
        if interned.is_created() {
            self.notify(interned.handle().any(), HandleType::InterimCommunicator);
        }
    }

    /// Name an interim communicator of the shared arena, unless already named.
    pub fn interim_communicator_set_name(
        &self,
        interim: InterimCommunicatorHandle,
        name: Option<&str>,
    ) -> Result<()> {
        let mut local = self.lock();
        if local.get(interim).name.is_valid() {
            return Ok(());
        }
        let name = local.define_string(name.unwrap_or(""))?.handle();
        local.get_mut(interim).name = name;
        Ok(())
    }

    /// Parent of an interim communicator of the shared arena.
    #[must_use]
    pub fn interim_communicator_parent(
        &self,
        interim: InterimCommunicatorHandle,
    ) -> InterimCommunicatorHandle {
        self.lock().get(interim).parent
    }

    /// Run `access` on the payload of an interim communicator of the shared arena.
    pub fn interim_communicator_payload<R>(
        &self,
        interim: InterimCommunicatorHandle,
        access: impl FnOnce(&mut [u8]) -> R,
    ) -> R {
        access(&mut self.lock().get_mut(interim).payload)
    }

    /// Record the communicator an interim communicator was resolved to.
    pub fn set_interim_communicator_unified(
        &self,
        interim: InterimCommunicatorHandle,
        communicator: CommunicatorHandle,
    ) -> Result<()> {
        self.lock()
            .set_interim_communicator_unified(interim, communicator)
    }
}

/// Re-create a local communicator in the unified manager.
pub fn unify_communicator(
    source: &mut DefinitionManager,
    handle: CommunicatorHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::Communicator;
    let group_a = source.unified_handle(kind, "group A", definition.group_a)?;
    let group_b = source.unified_handle(kind, "group B", definition.group_b)?;
    let name = source.optional_unified(kind, "name", definition.name)?;
    let parent = source.optional_unified(kind, "parent", definition.parent)?;

    let counterpart = unified
        .define_communicator(
            group_a,
            group_b,
            name,
            parent,
            definition.unify_key,
            definition.flags,
        )?
        .handle();
    source.set_unified(handle, counterpart)
}
