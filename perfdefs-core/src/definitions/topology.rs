//! Cartesian topologies and per-location coordinates.

use super::{Definition, HandleType, InterimCommunicatorHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{AnyHandle, Handle, TopologyType};

/// Handle to a [`CartesianTopologyDef`].
pub type CartesianTopologyHandle = Handle<CartesianTopologyDef>;

/// Handle to a [`CartesianCoordsDef`].
pub type CartesianCoordsHandle = Handle<CartesianCoordsDef>;

/// One dimension of a Cartesian topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartesianDimension {
    /// Dimension name.
    pub name: StringHandle,
    /// Number of processes along the dimension.
    pub processes: u32,
    /// Whether the dimension wraps around.
    pub periodic: bool,
}

/// A Cartesian topology.
///
/// Identity is the name, the number of dimensions and the type; MPI
/// topologies are additionally distinguished by their communicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianTopologyDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) communicator: AnyHandle,
    pub(crate) topology_type: TopologyType,
    pub(crate) dimensions: Box<[CartesianDimension]>,
}

impl CartesianTopologyDef {
    /// Topology name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// The communicator, `INVALID` for non-MPI topologies.
    #[must_use]
    pub fn communicator(&self) -> AnyHandle {
        self.communicator
    }

    /// Kind of topology.
    #[must_use]
    pub fn topology_type(&self) -> TopologyType {
        self.topology_type
    }

    /// Dimensions, in order.
    #[must_use]
    pub fn dimensions(&self) -> &[CartesianDimension] {
        &self.dimensions
    }
}

impl Definition for CartesianTopologyDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .pod(self.dimensions.len() as u32)
            .pod(self.topology_type)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        if existing.topology_type != candidate.topology_type {
            return false;
        }
        let same_shape = existing.name == candidate.name
            && existing.dimensions.len() == candidate.dimensions.len();
        if candidate.topology_type == TopologyType::Mpi {
            same_shape && existing.communicator == candidate.communicator
        } else {
            same_shape
        }
    }

    fn variable_size(&self) -> usize {
        std::mem::size_of_val(&*self.dimensions)
    }
}

/// Coordinates of one (rank, thread) in a topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianCoordsDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) topology: CartesianTopologyHandle,
    pub(crate) rank: u32,
    pub(crate) thread: u32,
    pub(crate) coords: Box<[u32]>,
}

impl CartesianCoordsDef {
    /// The topology.
    #[must_use]
    pub fn topology(&self) -> CartesianTopologyHandle {
        self.topology
    }

    /// Rank the coordinates belong to.
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Thread the coordinates belong to.
    #[must_use]
    pub fn thread(&self) -> u32 {
        self.thread
    }

    /// One coordinate per dimension.
    #[must_use]
    pub fn coords(&self) -> &[u32] {
        &self.coords
    }
}

impl Definition for CartesianCoordsDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.topology)
            .pod(self.rank)
            .pod(self.thread)
            .pod(self.coords.len() as u32)
            .array(&self.coords)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.topology == candidate.topology
            && existing.rank == candidate.rank
            && existing.thread == candidate.thread
            && existing.coords == candidate.coords
    }

    fn variable_size(&self) -> usize {
        std::mem::size_of_val(&*self.coords)
    }
}

impl DefinitionManager {
    /// Intern a topology.
    pub fn define_cartesian_topology(
        &mut self,
        name: StringHandle,
        communicator: AnyHandle,
        topology_type: TopologyType,
        dimensions: &[CartesianDimension],
    ) -> Result<Interned<CartesianTopologyDef>> {
        self.intern(CartesianTopologyDef {
            header: DefinitionHeader::new(),
            name,
            communicator,
            topology_type,
            dimensions: dimensions.into(),
        })
    }

    /// Intern coordinates.
    pub fn define_cartesian_coords(
        &mut self,
        topology: CartesianTopologyHandle,
        rank: u32,
        thread: u32,
        coords: &[u32],
    ) -> Result<Interned<CartesianCoordsDef>> {
        self.intern(CartesianCoordsDef {
            header: DefinitionHeader::new(),
            topology,
            rank,
            thread,
            coords: coords.into(),
        })
    }

    /// Add coordinates directly to a unified manager.
    pub fn new_unified_cartesian_coords(
        &mut self,
        topology: CartesianTopologyHandle,
        rank: u32,
        thread: u32,
        coords: &[u32],
    ) -> Result<CartesianCoordsHandle> {
        Ok(self
            .define_cartesian_coords(topology, rank, thread, coords)?
            .handle())
    }
}

impl Definitions {
    /// Define a Cartesian topology.
    ///
    /// `dimensions` holds `(name, processes, periodic)` per dimension.
    /// Unnamed dimensions are called `"dimension <i>"`, an unnamed topology
    /// `"unnamed topology"`.
    pub fn new_cartesian_topology(
        &self,
        name: Option<&str>,
        communicator: InterimCommunicatorHandle,
        topology_type: TopologyType,
        dimensions: &[(Option<&str>, u32, bool)],
    ) -> Result<CartesianTopologyHandle> {
        self.define(|local| {
            let dimensions = dimensions
                .iter()
                .enumerate()
                .map(|(index, &(dimension_name, processes, periodic))| {
                    let name = match dimension_name {
                        Some(name) => local.define_string(name)?,
                        None => local.define_string_fmt(format_args!("dimension {index}"))?,
                    };
                    Ok(CartesianDimension {
                        name: name.handle(),
                        processes,
                        periodic,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let name = local.define_string_or(name, "unnamed topology")?;
            local.define_cartesian_topology(name, communicator.any(), topology_type, &dimensions)
        })
    }

    /// Recompute the hash of a topology after it was filled in.
    pub fn cartesian_topology_rehash(&self, topology: CartesianTopologyHandle) {
        self.lock().rehash(topology);
    }

    /// Define the coordinates of one (rank, thread).
    pub fn new_cartesian_coords(
        &self,
        topology: CartesianTopologyHandle,
        rank: u32,
        thread: u32,
        coords: &[u32],
    ) -> Result<CartesianCoordsHandle> {
        self.define(|local| local.define_cartesian_coords(topology, rank, thread, coords))
    }
}

/// Re-create a local topology in the unified manager.
pub fn unify_cartesian_topology(
    source: &mut DefinitionManager,
    handle: CartesianTopologyHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::CartesianTopology;
    let dimensions = definition
        .dimensions
        .iter()
        .map(|dimension| {
            Ok(CartesianDimension {
                name: source.unified_handle(kind, "dimension name", dimension.name)?,
                ..*dimension
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let name = source.unified_handle(kind, "name", definition.name)?;
    let communicator =
        source.unified_communicator(kind, "communicator", definition.communicator)?;

    let counterpart = unified
        .define_cartesian_topology(name, communicator, definition.topology_type, &dimensions)?
        .handle();
    source.set_unified(handle, counterpart)
}

/// Re-create local coordinates in the unified manager.
pub fn unify_cartesian_coords(
    source: &mut DefinitionManager,
    handle: CartesianCoordsHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let topology =
        source.unified_handle(HandleType::CartesianCoords, "topology", definition.topology)?;

    let counterpart = unified
        .define_cartesian_coords(topology, definition.rank, definition.thread, &definition.coords)?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    fn definitions() -> Definitions {
        Definitions::new(DefinitionsConfig::default()).unwrap()
    }

    #[test]
    fn default_names_are_applied() {
        let definitions = definitions();
        let topology = definitions
            .new_cartesian_topology(
                None,
                Handle::INVALID,
                TopologyType::User,
                &[(Some("x"), 4, true), (None, 2, false)],
            )
            .unwrap();

        let local = definitions.lock();
        let definition = local.get(topology);
        assert_eq!(local.string(definition.name()), "unnamed topology");
        let names: Vec<_> = definition
            .dimensions()
            .iter()
            .map(|dimension| local.string(dimension.name))
            .collect();
        assert_eq!(names, ["x", "dimension 1"]);
        assert!(definition.dimensions()[0].periodic);
    }

    fn communicator(manager: &mut DefinitionManager, unify_key: u32) -> AnyHandle {
        let group = manager
            .new_unified_group(crate::types::GroupType::CommGroup, "", &[0, 1])
            .unwrap();
        manager
            .define_communicator(
                group,
                group,
                StringHandle::INVALID,
                Handle::INVALID,
                unify_key,
                crate::types::CommunicatorFlags::empty(),
            )
            .unwrap()
            .handle()
            .any()
    }

    #[test]
    fn mpi_topologies_compare_communicators() {
        let config = DefinitionsConfig::default();
        let mut manager = DefinitionManager::new_unified(&config).unwrap();
        let name = manager.define_string("grid").unwrap().handle();
        let dims = [CartesianDimension {
            name,
            processes: 2,
            periodic: false,
        }];
        let a = communicator(&mut manager, 1);
        let b = communicator(&mut manager, 2);

        let user_a = manager
            .define_cartesian_topology(name, a, TopologyType::User, &dims)
            .unwrap();
        let user_b = manager
            .define_cartesian_topology(name, b, TopologyType::User, &dims)
            .unwrap();
        assert_eq!(user_a.handle(), user_b.handle());

        let mpi_a = manager
            .define_cartesian_topology(name, a, TopologyType::Mpi, &dims)
            .unwrap();
        let mpi_b = manager
            .define_cartesian_topology(name, b, TopologyType::Mpi, &dims)
            .unwrap();
        assert_ne!(mpi_a.handle(), mpi_b.handle());
    }

    #[test]
    fn unified_coords_deduplicate() {
        let config = DefinitionsConfig::default();
        let mut manager = DefinitionManager::new_unified(&config).unwrap();
        let name = manager.define_string("grid").unwrap().handle();
        let topology = manager
            .define_cartesian_topology(name, AnyHandle::INVALID, TopologyType::Process, &[])
            .unwrap()
            .handle();

        let first = manager
            .new_unified_cartesian_coords(topology, 0, 1, &[0, 1])
            .unwrap();
        let again = manager
            .new_unified_cartesian_coords(topology, 0, 1, &[0, 1])
            .unwrap();
        let moved = manager
            .new_unified_cartesian_coords(topology, 0, 1, &[1, 0])
            .unwrap();
        assert_eq!(first, again);
        assert_ne!(first, moved);
        assert_eq!(manager.get(moved).coords(), &[1, 0]);
    }

    #[test]
    fn local_coords_are_kept_apart() {
        let definitions = definitions();
        let topology = definitions
            .new_cartesian_topology(Some("t"), Handle::INVALID, TopologyType::Platform, &[])
            .unwrap();
        let a = definitions.new_cartesian_coords(topology, 0, 0, &[]).unwrap();
        let b = definitions.new_cartesian_coords(topology, 0, 0, &[]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rehash_keeps_a_consistent_hash() {
        let definitions = definitions();
        let topology = definitions
            .new_cartesian_topology(Some("t"), Handle::INVALID, TopologyType::User, &[(None, 3, false)])
            .unwrap();
        let before = definitions.lock().hash_value(topology);
        definitions.cartesian_topology_rehash(topology);
        assert_eq!(definitions.lock().hash_value(topology), before);
    }
}
