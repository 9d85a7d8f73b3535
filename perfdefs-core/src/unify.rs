//! The unification driver.
//!
//! Unification turns one or more local managers into a single unified
//! manager in which every definition appears once:
//!
//! 1. [`resolve_interim_definitions`] replaces interim communicator
//!    references by the communicators recorded for them.
//! 2. [`copy_definitions_to_unified`] re-creates every local definition in
//!    the unified manager, visiting kinds so that each reference is unified
//!    before the definitions holding it.
//! 3. [`create_mappings`] records, per kind, which unified sequence number
//!    each local sequence number became.
//!
//! On the root process, [`assign_empty_string_to_names`] and
//! [`create_region_groups`] finish the unified manager.

use crate::config::DefinitionsConfig;
use crate::definitions::{
    unify_attribute, unify_calling_context, unify_callpath, unify_cartesian_coords,
    unify_cartesian_topology, unify_communicator, unify_group, unify_interrupt_generator,
    unify_io_file, unify_io_file_property, unify_io_handle, unify_io_paradigm, unify_location,
    unify_location_group, unify_location_property, unify_metric, unify_paradigm,
    unify_parameter, unify_property, unify_region, unify_rma_window, unify_sampling_set,
    unify_sampling_set_recorder, unify_source_code_location, unify_source_file, unify_string,
    unify_system_tree_node, unify_system_tree_node_property, AttributeDef, CallingContextDef,
    CallpathDef, CartesianTopologyDef, CommunicatorDef, Definition, GroupDef,
    InterruptGeneratorDef, IoFileDef, IoHandleDef, LocationDef, LocationGroupDef, MetricDef,
    ParameterDef, RegionDef, RmaWindowDef, SamplingSetDef, SourceCodeLocationDef, StringDef,
    StringHandle,
};
use crate::error::Result;
use crate::manager::DefinitionManager;
use crate::types::{GroupType, Handle, ParadigmType};
use rustc_hash::FxHashMap;

/// Signature shared by the per-kind unify routines.
type UnifyFn<D> = fn(&mut DefinitionManager, Handle<D>, &mut DefinitionManager) -> Result<()>;

/// Point interim communicator references at their resolved communicators.
///
/// Fails with `InterimNotResolved` if a referenced interim communicator
/// never had a communicator recorded for it.
pub fn resolve_interim_definitions(local: &mut DefinitionManager) -> Result<()> {
    let mut resolved = 0usize;

    for window in local.handles::<RmaWindowDef>() {
        let communicator = local.resolve_communicator_reference(local.get(window).communicator)?;
        local.get_mut(window).communicator = communicator;
        local.rehash(window);
        resolved += 1;
    }

    for topology in local.handles::<CartesianTopologyDef>() {
        let communicator =
            local.resolve_communicator_reference(local.get(topology).communicator)?;
        local.get_mut(topology).communicator = communicator;
        local.rehash(topology);
        resolved += 1;
    }

    for io_handle in local.handles::<IoHandleDef>() {
        let scope = local.resolve_communicator_reference(local.get(io_handle).scope)?;
        local.get_mut(io_handle).scope = scope;
        local.rehash(io_handle);
        resolved += 1;
    }

    tracing::debug!(definitions = resolved, "Resolved interim communicator references");
    Ok(())
}

fn unify_all<D: Definition>(
    source: &mut DefinitionManager,
    unified: &mut DefinitionManager,
    unify: UnifyFn<D>,
) -> Result<()> {
    let handles = source.handles::<D>();
    for &handle in &handles {
        unify(source, handle, unified)?;
    }
    tracing::debug!(
        kind = %D::KIND,
        local = handles.len(),
        unified = unified.count::<D>(),
        "Unified definitions"
    );
    Ok(())
}

/// Re-create every definition of `source` in `unified`.
///
/// May be called once per process-local manager against the same unified
/// manager; equal definitions of different sources end up as one.
pub fn copy_definitions_to_unified(
    source: &mut DefinitionManager,
    unified: &mut DefinitionManager,
) -> Result<()> {
    unify_all(source, unified, unify_string)?;
    unify_all(source, unified, unify_paradigm)?;
    unify_all(source, unified, unify_io_paradigm)?;

    unify_all(source, unified, unify_system_tree_node)?;
    unify_all(source, unified, unify_system_tree_node_property)?;
    unify_all(source, unified, unify_location_group)?;
    unify_all(source, unified, unify_location)?;
    unify_all(source, unified, unify_location_property)?;

    unify_all(source, unified, unify_source_file)?;
    unify_all(source, unified, unify_region)?;
    unify_all(source, unified, unify_group)?;
    unify_all(source, unified, unify_communicator)?;
    unify_all(source, unified, unify_rma_window)?;
    unify_all(source, unified, unify_metric)?;
    unify_all(source, unified, unify_sampling_set)?;
    unify_all(source, unified, unify_sampling_set_recorder)?;

    unify_all(source, unified, unify_parameter)?;
    unify_all(source, unified, unify_callpath)?;
    unify_all(source, unified, unify_property)?;
    unify_all(source, unified, unify_attribute)?;
    unify_all(source, unified, unify_cartesian_topology)?;
    unify_all(source, unified, unify_cartesian_coords)?;
    unify_all(source, unified, unify_source_code_location)?;
    unify_all(source, unified, unify_calling_context)?;
    unify_all(source, unified, unify_interrupt_generator)?;

    unify_all(source, unified, unify_io_file)?;
    unify_all(source, unified, unify_io_file_property)?;
    unify_all(source, unified, unify_io_handle)
}

fn map_kind<D: Definition>(local: &mut DefinitionManager, unified: &DefinitionManager) {
    let pairs: Vec<(u32, u32)> = local
        .iter::<D>()
        .filter_map(|(_, definition)| {
            let header = definition.header();
            unified
                .try_get(Handle::<D>::from_any(header.unified))
                .map(|counterpart| (header.sequence_number, counterpart.header().sequence_number))
        })
        .collect();

    let entry = local.entry_mut(D::KIND);
    entry.alloc_mapping();
    for &(local_id, unified_id) in &pairs {
        entry.set_mapping(local_id, unified_id);
    }
    tracing::debug!(kind = %D::KIND, mapped = pairs.len(), "Created mapping");
}

/// Record the unified sequence number of every unified local definition.
///
/// Locations are mapped to their global ids instead.
pub fn create_mappings(local: &mut DefinitionManager, unified: &DefinitionManager) {
    map_kind::<StringDef>(local, unified);
    map_kind::<RegionDef>(local, unified);
    map_kind::<GroupDef>(local, unified);
    map_kind::<CommunicatorDef>(local, unified);
    map_kind::<RmaWindowDef>(local, unified);
    map_kind::<MetricDef>(local, unified);
    map_kind::<SamplingSetDef>(local, unified);
    map_kind::<ParameterDef>(local, unified);
    map_kind::<CallpathDef>(local, unified);
    map_kind::<AttributeDef>(local, unified);
    map_kind::<SourceCodeLocationDef>(local, unified);
    map_kind::<CallingContextDef>(local, unified);
    map_kind::<InterruptGeneratorDef>(local, unified);
    map_kind::<CartesianTopologyDef>(local, unified);
    map_kind::<IoFileDef>(local, unified);
    map_kind::<IoHandleDef>(local, unified);
    map_kind::<LocationGroupDef>(local, unified);

    let global_ids: Vec<u64> = local
        .iter::<LocationDef>()
        .map(|(_, location)| location.global_location_id)
        .collect();
    tracing::debug!(locations = global_ids.len(), "Created location mapping");
    local.location_global_ids = Some(global_ids);
}

/// Unify a single local manager into a fresh unified manager.
pub fn unify_locally(
    local: &mut DefinitionManager,
    config: &DefinitionsConfig,
) -> Result<DefinitionManager> {
    let mut unified = DefinitionManager::new_unified(config)?;
    resolve_interim_definitions(local)?;
    copy_definitions_to_unified(local, &mut unified)?;
    create_mappings(local, &unified);
    tracing::debug!(
        used_bytes = unified.used_bytes(),
        strings = unified.count::<StringDef>(),
        "Unified local definitions"
    );
    Ok(unified)
}

/// Give every group, communicator and window without a name the empty string.
pub fn assign_empty_string_to_names(unified: &mut DefinitionManager) {
    let empty = unified.empty_string();

    for group in unified.handles::<GroupDef>() {
        if !unified.get(group).name.is_valid() {
            unified.get_mut(group).name = empty;
            unified.rehash(group);
        }
    }
    for communicator in unified.handles::<CommunicatorDef>() {
        let definition = unified.get_mut(communicator);
        if !definition.name.is_valid() {
            definition.name = empty;
        }
    }
    for window in unified.handles::<RmaWindowDef>() {
        let definition = unified.get_mut(window);
        if !definition.name.is_valid() {
            definition.name = empty;
        }
    }
}

/// Create one `Regions` group per (group name, paradigm) of the unified
/// regions, in order of first appearance.
pub fn create_region_groups(unified: &mut DefinitionManager) -> Result<()> {
    let mut slots: FxHashMap<(StringHandle, ParadigmType), usize> = FxHashMap::default();
    let mut groups: Vec<(StringHandle, Vec<u64>)> = Vec::new();

    for (_, region) in unified.iter::<RegionDef>() {
        let Some(group_name) = region.group_name() else {
            continue;
        };
        let slot = *slots
            .entry((group_name, region.paradigm()))
            .or_insert_with(|| {
                groups.push((group_name, Vec::new()));
                groups.len() - 1
            });
        groups[slot]
            .1
            .push(u64::from(region.header.sequence_number));
    }

    for (group_name, members) in &groups {
        let name = unified.string(*group_name).to_owned();
        unified.new_unified_group(GroupType::Regions, &name, members)?;
    }
    tracing::debug!(groups = groups.len(), "Created region groups");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Definitions;
    use crate::definitions::{InterimCommunicatorHandle, RegionHandle};
    use crate::types::{
        CommunicatorFlags, LocationGroupType, LocationType, RegionType, RmaWindowFlags,
        SystemTreeDomain,
    };

    fn config() -> DefinitionsConfig {
        DefinitionsConfig::default()
    }

    fn region(definitions: &Definitions, name: &str, paradigm: ParadigmType) -> RegionHandle {
        definitions
            .new_region(
                Some(name),
                None,
                Handle::INVALID,
                0,
                0,
                paradigm,
                RegionType::Function,
            )
            .unwrap()
    }

    fn resolve(definitions: &Definitions, interim: InterimCommunicatorHandle) {
        let group = definitions
            .new_group(GroupType::CommGroup, None, &[0, 1])
            .unwrap();
        let communicator = definitions
            .new_communicator(
                group,
                Some("world"),
                Handle::INVALID,
                1,
                CommunicatorFlags::empty(),
            )
            .unwrap();
        definitions
            .set_interim_communicator_unified(interim, communicator)
            .unwrap();
    }

    #[test]
    fn unify_locally_maps_every_kind() {
        let definitions = Definitions::new(config()).unwrap();
        let node = definitions
            .new_system_tree_node(Handle::INVALID, SystemTreeDomain::MACHINE, "machine", "m")
            .unwrap();
        let process = definitions
            .new_location_group(Some("rank 0"), LocationGroupType::Process, node, Handle::INVALID)
            .unwrap();
        let thread = definitions
            .new_location(
                LocationType::CpuThread,
                ParadigmType::Measurement,
                Some("main"),
                process,
                0,
            )
            .unwrap();
        definitions.location_set_global_id(thread, 42);
        let main = region(&definitions, "main", ParadigmType::User);

        let mut local = definitions.into_local();
        let unified = unify_locally(&mut local, &config()).unwrap();

        let unified_main = local.unified(main);
        assert_eq!(
            local.unified_id(main),
            Some(unified.sequence_number(unified_main))
        );
        assert_eq!(local.unified_id(local.empty_string()), Some(0));
        assert_eq!(local.location_global_id(0), Some(42));
        assert_eq!(local.unified_id(process), Some(0));
    }

    #[test]
    fn interim_references_are_resolved_before_copying() {
        let definitions = Definitions::new(config()).unwrap();
        let interim = definitions
            .new_interim_communicator(Handle::INVALID, ParadigmType::Mpi, 0)
            .unwrap();
        let window = definitions
            .new_rma_window(Some("halo"), interim, RmaWindowFlags::empty())
            .unwrap();
        resolve(&definitions, interim);

        let mut local = definitions.into_local();
        let unified = unify_locally(&mut local, &config()).unwrap();

        let communicator = local.get(interim).communicator();
        assert_eq!(local.get(window).communicator(), communicator.any());
        let unified_window = unified.get(local.unified(window));
        assert_eq!(unified_window.communicator(), local.unified(communicator).any());
    }

    #[test]
    fn unresolved_interim_fails() {
        let definitions = Definitions::new(config()).unwrap();
        let interim = definitions
            .new_interim_communicator(Handle::INVALID, ParadigmType::Mpi, 0)
            .unwrap();
        definitions
            .new_rma_window(None, interim, RmaWindowFlags::empty())
            .unwrap();
        let mut local = definitions.into_local();
        let err = unify_locally(&mut local, &config()).unwrap_err();
        assert_eq!(err.code(), "E103");
    }

    #[test]
    fn scope_of_the_wrong_kind_fails_resolution() {
        use crate::definitions::IoHandleFields;
        use crate::types::{IoAccessMode, IoHandleFlags, IoParadigmType, IoStatusFlags};

        let mut local = DefinitionManager::new_local(&config()).unwrap();
        let empty = local.empty_string();
        local
            .define_io_handle(
                IoHandleFields {
                    name: empty,
                    file: Handle::INVALID,
                    paradigm: IoParadigmType::Posix,
                    flags: IoHandleFlags::empty(),
                    scope: empty.any(),
                    parent: Handle::INVALID,
                    unify_key: 0,
                    access_mode: IoAccessMode::None,
                    status_flags: IoStatusFlags::empty(),
                    is_completed: true,
                },
                0,
            )
            .unwrap();

        let err = unify_locally(&mut local, &config()).unwrap_err();
        assert_eq!(err.code(), "E204");
    }

    #[test]
    fn two_processes_share_definitions() {
        let mut unified = DefinitionManager::new_unified(&config()).unwrap();
        let mut locals = Vec::new();
        for rank in 0..2 {
            let definitions = Definitions::new(config()).unwrap();
            region(&definitions, "main", ParadigmType::User);
            region(&definitions, &format!("rank_{rank}"), ParadigmType::User);
            let mut local = definitions.into_local();
            copy_definitions_to_unified(&mut local, &mut unified).unwrap();
            locals.push(local);
        }
        assert_eq!(unified.count::<RegionDef>(), 3);
        let main_of = |local: &DefinitionManager| {
            let (handle, _) = local.iter::<RegionDef>().next().unwrap();
            local.unified(handle)
        };
        assert_eq!(main_of(&locals[0]), main_of(&locals[1]));
    }

    #[test]
    fn unnamed_definitions_get_the_empty_string() {
        let mut unified = DefinitionManager::new_unified(&config()).unwrap();
        let group = unified
            .define_group(GroupType::Locations, StringHandle::INVALID, &[0])
            .unwrap()
            .handle();
        assign_empty_string_to_names(&mut unified);
        assert_eq!(unified.get(group).name(), unified.empty_string());

        let again = unified
            .define_group(GroupType::Locations, unified.empty_string(), &[0])
            .unwrap();
        assert_eq!(again.handle(), group);
    }

    #[test]
    fn region_groups_split_by_paradigm() {
        let definitions = Definitions::new(config()).unwrap();
        let a = region(&definitions, "a", ParadigmType::User);
        let b = region(&definitions, "b", ParadigmType::User);
        let c = region(&definitions, "c", ParadigmType::Compiler);
        let d = region(&definitions, "d", ParadigmType::User);
        for handle in [a, b, c] {
            definitions.region_set_group(handle, "solver").unwrap();
        }

        let mut local = definitions.into_local();
        let mut unified = unify_locally(&mut local, &config()).unwrap();
        create_region_groups(&mut unified).unwrap();

        let groups: Vec<_> = unified
            .iter::<GroupDef>()
            .map(|(_, group)| (unified.string(group.name()).to_owned(), group.members().to_vec()))
            .collect();
        let seq = |handle| u64::from(unified.sequence_number(local.unified(handle)));
        assert_eq!(
            groups,
            vec![
                ("solver".to_owned(), vec![seq(a), seq(b)]),
                ("solver".to_owned(), vec![seq(c)]),
            ]
        );
        assert!(unified.get(local.unified(d)).group_name().is_none());
    }
}
