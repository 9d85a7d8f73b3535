//! Locations (threads, GPU streams, metric sources) and their properties.

use super::{Definition, HandleType, LocationGroupHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, LocationType, ParadigmType};
use std::fmt;

/// Handle to a [`LocationDef`].
pub type LocationHandle = Handle<LocationDef>;

/// Handle to a [`LocationPropertyDef`].
pub type LocationPropertyHandle = Handle<LocationPropertyDef>;

/// Global id of a location that has not been assigned one yet.
pub const UNASSIGNED_GLOBAL_LOCATION_ID: u64 = u64::MAX;

/// A location: the unit events are recorded on.
///
/// Never deduplicated. Creating a location marks its group and the group's
/// system tree ancestors as used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) global_location_id: u64,
    pub(crate) name: StringHandle,
    pub(crate) location_type: LocationType,
    pub(crate) paradigm: ParadigmType,
    pub(crate) parent: LocationGroupHandle,
    pub(crate) number_of_events: u64,
    pub(crate) payload: Box<[u8]>,
}

impl LocationDef {
    /// Global id, [`UNASSIGNED_GLOBAL_LOCATION_ID`] until assigned.
    #[must_use]
    pub fn global_location_id(&self) -> u64 {
        self.global_location_id
    }

    /// Location name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Kind of location.
    #[must_use]
    pub fn location_type(&self) -> LocationType {
        self.location_type
    }

    /// Paradigm that created the location.
    #[must_use]
    pub fn paradigm(&self) -> ParadigmType {
        self.paradigm
    }

    /// The location group.
    #[must_use]
    pub fn parent(&self) -> LocationGroupHandle {
        self.parent
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn number_of_events(&self) -> u64 {
        self.number_of_events
    }

    /// Zero-initialized scratch space requested at creation.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Definition for LocationDef {
    fn equal(_existing: &Self, _candidate: &Self) -> bool {
        false
    }

    fn variable_size(&self) -> usize {
        self.payload.len()
    }
}

/// A formatted name/value property of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPropertyDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) location: LocationHandle,
    pub(crate) name: StringHandle,
    pub(crate) value: StringHandle,
}

impl LocationPropertyDef {
    /// The owning location.
    #[must_use]
    pub fn location(&self) -> LocationHandle {
        self.location
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Property value.
    #[must_use]
    pub fn value(&self) -> StringHandle {
        self.value
    }
}

impl Definition for LocationPropertyDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.location)
            .handle(self.name)
            .handle(self.value)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.location == candidate.location
            && existing.name == candidate.name
            && existing.value == candidate.value
    }
}

impl DefinitionManager {
    /// Append a location and mark its group as used.
    #[allow(clippy::too_many_arguments)]
    pub fn define_location(
        &mut self,
        global_location_id: u64,
        name: StringHandle,
        location_type: LocationType,
        paradigm: ParadigmType,
        parent: LocationGroupHandle,
        number_of_events: u64,
        payload_size: usize,
    ) -> Result<Interned<LocationDef>> {
        let interned = self.intern(LocationDef {
            header: DefinitionHeader::new(),
            global_location_id,
            name,
            location_type,
            paradigm,
            parent,
            number_of_events,
            payload: vec![0; payload_size].into_boxed_slice(),
        })?;
        self.mark_location_group_used(parent);
        Ok(interned)
    }

    /// Intern a location property.
    pub fn define_location_property(
        &mut self,
        location: LocationHandle,
        name: StringHandle,
        value: StringHandle,
    ) -> Result<Interned<LocationPropertyDef>> {
        self.intern(LocationPropertyDef {
            header: DefinitionHeader::new(),
            location,
            name,
            value,
        })
    }
}

impl Definitions {
    /// Define a location with `payload_size` bytes of zeroed scratch space.
    pub fn new_location(
        &self,
        location_type: LocationType,
        paradigm: ParadigmType,
        name: Option<&str>,
        parent: LocationGroupHandle,
        payload_size: usize,
    ) -> Result<LocationHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "")?;
            local.define_location(
                UNASSIGNED_GLOBAL_LOCATION_ID,
                name,
                location_type,
                paradigm,
                parent,
                0,
                payload_size,
            )
        })
    }

    /// Name a location that has not been named yet.
    ///
    /// Returns `false` and leaves the name untouched if it was already set.
    pub fn location_set_name(&self, location: LocationHandle, name: &str) -> Result<bool> {
        let mut local = self.lock();
        let empty = local.empty_string();
        if local.get(location).name != empty {
            return Ok(false);
        }
        let name = local.define_string(name)?.handle();
        local.get_mut(location).name = name;
        Ok(true)
    }

    /// Assign the global id of a location.
    pub fn location_set_global_id(&self, location: LocationHandle, global_id: u64) {
        self.lock().get_mut(location).global_location_id = global_id;
    }

    /// Account for `events` more recorded events.
    pub fn location_add_events(&self, location: LocationHandle, events: u64) {
        let mut local = self.lock();
        let definition = local.get_mut(location);
        definition.number_of_events = definition.number_of_events.saturating_add(events);
    }

    /// Run `access` on the location's payload.
    pub fn location_payload<R>(
        &self,
        location: LocationHandle,
        access: impl FnOnce(&mut [u8]) -> R,
    ) -> R {
        access(&mut self.lock().get_mut(location).payload)
    }

    /// Define a location property whose value is formatted text.
    pub fn new_location_property(
        &self,
        location: LocationHandle,
        name: &str,
        value: fmt::Arguments<'_>,
    ) -> Result<LocationPropertyHandle> {
        self.define(|local| {
            let name = local.define_string(name)?.handle();
            let value = local.define_string_fmt(value)?.handle();
            local.define_location_property(location, name, value)
        })
    }
}

/// Re-create a local location in the unified manager.
pub fn unify_location(
    source: &mut DefinitionManager,
    handle: LocationHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (global_id, name, location_type, paradigm, parent, events) = (
        definition.global_location_id,
        definition.name,
        definition.location_type,
        definition.paradigm,
        definition.parent,
        definition.number_of_events,
    );
    let kind = HandleType::Location;
    let parent = source.optional_unified(kind, "location group", parent)?;
    let name = source.unified_handle(kind, "name", name)?;

    let counterpart = unified
        .define_location(global_id, name, location_type, paradigm, parent, events, 0)?
        .handle();
    source.set_unified(handle, counterpart)
}

/// Re-create a local location property in the unified manager.
pub fn unify_location_property(
    source: &mut DefinitionManager,
    handle: LocationPropertyHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle);
    let (location, name, value) = (definition.location, definition.name, definition.value);
    let kind = HandleType::LocationProperty;
    let location = source.unified_handle(kind, "location", location)?;
    let name = source.unified_handle(kind, "name", name)?;
    let value = source.unified_handle(kind, "value", value)?;

    let counterpart = unified
        .define_location_property(location, name, value)?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::types::LocationGroupType;

    fn setup() -> (Definitions, LocationGroupHandle) {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let group = definitions
            .new_location_group(
                Some("rank 0"),
                LocationGroupType::Process,
                Handle::INVALID,
                Handle::INVALID,
            )
            .unwrap();
        (definitions, group)
    }

    #[test]
    fn creating_a_location_marks_its_group() {
        let (definitions, group) = setup();
        let thread = definitions
            .new_location(LocationType::CpuThread, ParadigmType::Measurement, None, group, 16)
            .unwrap();

        let local = definitions.lock();
        assert!(local.get(group).has_children());
        assert_eq!(local.get(thread).payload().len(), 16);
        assert_eq!(
            local.get(thread).global_location_id(),
            UNASSIGNED_GLOBAL_LOCATION_ID
        );
    }

    #[test]
    fn set_name_only_once() {
        let (definitions, group) = setup();
        let thread = definitions
            .new_location(LocationType::CpuThread, ParadigmType::Pthread, None, group, 0)
            .unwrap();
        assert!(definitions.location_set_name(thread, "worker").unwrap());
        assert!(!definitions.location_set_name(thread, "other").unwrap());

        let local = definitions.lock();
        assert_eq!(local.string(local.get(thread).name()), "worker");
    }

    #[test]
    fn events_payload_and_global_id() {
        let (definitions, group) = setup();
        let thread = definitions
            .new_location(LocationType::CpuThread, ParadigmType::Openmp, Some("t"), group, 4)
            .unwrap();
        definitions.location_add_events(thread, 10);
        definitions.location_add_events(thread, 5);
        definitions.location_set_global_id(thread, 42);
        definitions.location_payload(thread, |payload| payload[0] = 7);

        let local = definitions.lock();
        let definition = local.get(thread);
        assert_eq!(definition.number_of_events(), 15);
        assert_eq!(definition.global_location_id(), 42);
        assert_eq!(definition.payload()[0], 7);
    }

    #[test]
    fn property_value_is_formatted() {
        let (definitions, group) = setup();
        let thread = definitions
            .new_location(LocationType::CpuThread, ParadigmType::Openmp, None, group, 0)
            .unwrap();
        let property = definitions
            .new_location_property(thread, "CPU", format_args!("core {}", 3))
            .unwrap();
        let again = definitions
            .new_location_property(thread, "CPU", format_args!("core {}", 3))
            .unwrap();
        // Location properties are only deduplicated by the unified manager.
        assert_ne!(property, again);

        let local = definitions.lock();
        assert_eq!(local.string(local.get(property).value()), "core 3");
    }
}
