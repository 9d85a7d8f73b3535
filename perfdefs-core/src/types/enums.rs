//! Closed enumerations and flag sets carried by definitions.
//!
//! All enums are `#[repr(u32)]` so that their discriminant can be folded into
//! a definition's hash value.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrumentation paradigm a definition originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ParadigmType {
    /// Definitions created by the measurement system itself.
    Measurement,
    /// Manual user instrumentation.
    User,
    /// Compiler instrumentation.
    Compiler,
    /// Sampling.
    Sampling,
    /// Memory allocation tracking.
    Memory,
    /// Library wrapping.
    Libwrap,
    /// MPI.
    Mpi,
    /// SHMEM.
    Shmem,
    /// OpenMP.
    Openmp,
    /// POSIX threads.
    Pthread,
    /// CUDA.
    Cuda,
    /// OpenCL.
    Opencl,
    /// OpenACC.
    Openacc,
    /// I/O wrapping.
    Io,
    /// Kokkos.
    Kokkos,
    /// HIP.
    Hip,
}

impl fmt::Display for ParadigmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Measurement => "measurement",
            Self::User => "user",
            Self::Compiler => "compiler",
            Self::Sampling => "sampling",
            Self::Memory => "memory",
            Self::Libwrap => "libwrap",
            Self::Mpi => "mpi",
            Self::Shmem => "shmem",
            Self::Openmp => "openmp",
            Self::Pthread => "pthread",
            Self::Cuda => "cuda",
            Self::Opencl => "opencl",
            Self::Openacc => "openacc",
            Self::Io => "io",
            Self::Kokkos => "kokkos",
            Self::Hip => "hip",
        };
        f.write_str(name)
    }
}

/// Execution model of a paradigm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ParadigmClass {
    /// Multi-process (message passing).
    Mpp,
    /// Fork/join threading.
    ThreadFork,
    /// Create/wait threading.
    ThreadCreateWait,
    /// Accelerator offloading.
    Accelerator,
}

bitflags! {
    /// Flags describing a paradigm.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ParadigmFlags: u32 {
        /// The paradigm only provides RMA operations.
        const RMA_ONLY = 1 << 0;
    }
}

/// Set-once properties of a paradigm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ParadigmProperty {
    /// Name template for communicators without a user name.
    CommunicatorTemplate,
    /// Name template for RMA windows without a user name.
    RmaWindowTemplate,
}

impl ParadigmProperty {
    /// All properties, in slot order.
    pub const ALL: [Self; 2] = [Self::CommunicatorTemplate, Self::RmaWindowTemplate];

    /// Number of properties.
    pub const COUNT: usize = Self::ALL.len();

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ParadigmProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommunicatorTemplate => f.write_str("COMMUNICATOR_TEMPLATE"),
            Self::RmaWindowTemplate => f.write_str("RMA_WINDOW_TEMPLATE"),
        }
    }
}

/// Role of a code region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum RegionType {
    /// Unknown role.
    Unknown,
    /// A function.
    Function,
    /// A loop.
    Loop,
    /// A user-defined region.
    UserRegion,
    /// A code block.
    Code,
    /// A phase.
    Phase,
    /// A dynamic region.
    Dynamic,
    /// A dynamic phase.
    DynamicPhase,
    /// A dynamic loop.
    DynamicLoop,
    /// A dynamic function.
    DynamicFunction,
    /// A barrier.
    Barrier,
    /// An implicit barrier.
    ImplicitBarrier,
    /// A wrapper around a library call.
    Wrapper,
    /// A task.
    Task,
    /// Creation of a task.
    TaskCreate,
    /// Point-to-point communication.
    PointToPoint,
    /// Collective communication.
    Collective,
    /// Artificial region inserted by the measurement system.
    Artificial,
}

/// Purpose of a group of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GroupType {
    /// Unknown purpose.
    Unknown,
    /// Members are location ids.
    Locations,
    /// Members are region ids.
    Regions,
    /// Members are metric ids.
    Metrics,
    /// Members are ranks of a communicator's location space.
    CommLocations,
    /// Members are ranks forming a communicator.
    CommGroup,
    /// The self-like group of a communicator.
    CommSelf,
    /// Members are locations of a topology.
    TopologyLocations,
}

bitflags! {
    /// Flags of a communicator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CommunicatorFlags: u32 {
        /// Creation and destruction events are recorded for this communicator.
        const CREATE_DESTROY_EVENTS = 1 << 0;
    }
}

bitflags! {
    /// Flags of an RMA window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RmaWindowFlags: u32 {
        /// Creation and destruction events are recorded for this window.
        const CREATE_DESTROY_EVENTS = 1 << 0;
    }
}

/// Origin of a metric's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricSourceType {
    /// Hardware counters.
    Papi,
    /// Resource usage counters.
    Rusage,
    /// User metrics.
    User,
    /// Other sources.
    Other,
    /// Per-task metrics.
    Task,
    /// Metric plugins.
    Plugin,
    /// Linux perf events.
    Perf,
}

/// Accumulation and timing semantics of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricMode {
    /// Accumulated since measurement start.
    AccumulatedStart,
    /// Accumulated, valid at a point.
    AccumulatedPoint,
    /// Accumulated since the last sample.
    AccumulatedLast,
    /// Accumulated until the next sample.
    AccumulatedNext,
    /// Absolute value at a point.
    AbsolutePoint,
    /// Absolute value since the last sample.
    AbsoluteLast,
    /// Absolute value until the next sample.
    AbsoluteNext,
    /// Relative value at a point.
    RelativePoint,
    /// Relative value since the last sample.
    RelativeLast,
    /// Relative value until the next sample.
    RelativeNext,
}

/// Storage type of metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricValueType {
    /// Signed 64-bit integers.
    Int64,
    /// Unsigned 64-bit integers.
    Uint64,
    /// Double precision floats.
    Double,
}

/// Base of a metric's unit exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricBase {
    /// Powers of two.
    Binary,
    /// Powers of ten.
    Decimal,
}

/// How the profiler aggregates a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricProfilingType {
    /// Exclusive values per call path.
    Exclusive,
    /// Inclusive values per call path.
    Inclusive,
    /// Sum and count.
    Simple,
    /// Maximum value.
    Max,
    /// Minimum value.
    Min,
}

/// When a sampling set is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricOccurrence {
    /// At every enter and leave event.
    SynchronousStrict,
    /// At some events.
    Synchronous,
    /// Independent of events.
    Asynchronous,
}

/// Hardware class measured by a sampling set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum SamplingSetClass {
    /// Not tied to hardware.
    Abstract,
    /// CPU counters.
    Cpu,
    /// GPU counters.
    Gpu,
}

/// Kind of entity a scoped sampling set is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MetricScope {
    /// A single location.
    Location,
    /// A location group.
    LocationGroup,
    /// A system tree node.
    SystemTreeNode,
    /// A group of locations.
    Group,
}

/// Execution unit represented by a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum LocationType {
    /// A CPU thread.
    CpuThread,
    /// An accelerator stream.
    Gpu,
    /// A location that only records metrics.
    Metric,
}

/// Kind of a location group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum LocationGroupType {
    /// An operating system process.
    Process,
    /// An accelerator context.
    Accelerator,
}

bitflags! {
    /// Hardware domains covered by a system tree node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SystemTreeDomain: u32 {
        /// The whole machine.
        const MACHINE = 1 << 0;
        /// A shared-memory node.
        const SHARED_MEMORY = 1 << 1;
        /// A NUMA domain.
        const NUMA = 1 << 2;
        /// A socket.
        const SOCKET = 1 << 3;
        /// A cache level.
        const CACHE = 1 << 4;
        /// A core.
        const CORE = 1 << 5;
        /// A processing unit.
        const PU = 1 << 6;
        /// An accelerator device.
        const ACCELERATOR_DEVICE = 1 << 7;
        /// A network device.
        const NETWORKING_DEVICE = 1 << 8;
    }
}

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ParameterType {
    /// Signed integer values.
    Int64,
    /// Unsigned integer values.
    Uint64,
    /// String values.
    String,
}

/// Measurement-wide properties tracked across all locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum PropertyKind {
    /// All MPI communication was recorded.
    MpiCommunicationComplete,
    /// All thread fork/join events were recorded.
    ThreadForkJoinEventComplete,
    /// All thread create/wait events were recorded.
    ThreadCreateWaitEventComplete,
    /// All thread lock events were recorded.
    ThreadLockEventComplete,
    /// Thread locations were reused.
    PthreadLocationReused,
}

/// How reports of a property from several locations are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum PropertyCondition {
    /// Invalidated only if every report invalidates it.
    All,
    /// Invalidated if any report invalidates it.
    Any,
}

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum AttributeType {
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// String handle.
    String,
    /// Location handle.
    Location,
    /// Region handle.
    Region,
    /// Group handle.
    Group,
    /// Metric handle.
    Metric,
    /// Communicator handle.
    Communicator,
    /// Parameter handle.
    Parameter,
    /// RMA window handle.
    RmaWindow,
    /// Source code location handle.
    SourceCodeLocation,
    /// Calling context handle.
    CallingContext,
    /// Interrupt generator handle.
    InterruptGenerator,
    /// I/O file handle.
    IoFile,
    /// I/O handle handle.
    IoHandle,
}

/// Kind of a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum TopologyType {
    /// Hardware platform topology.
    Platform,
    /// Process x thread topology.
    Process,
    /// MPI Cartesian topology.
    Mpi,
    /// User-defined topology.
    User,
}

/// Trigger of an interrupt generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum InterruptGeneratorMode {
    /// Interrupts driven by a timer.
    Time,
    /// Interrupts driven by an event counter.
    Count,
}

/// An I/O paradigm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum IoParadigmType {
    /// POSIX I/O.
    Posix,
    /// ISO C I/O.
    Isoc,
    /// MPI I/O.
    Mpi,
}

impl fmt::Display for IoParadigmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posix => f.write_str("POSIX"),
            Self::Isoc => f.write_str("ISOC"),
            Self::Mpi => f.write_str("MPI"),
        }
    }
}

/// Whether an I/O paradigm is serial or collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum IoParadigmClass {
    /// Serial I/O.
    Serial,
    /// Parallel I/O.
    Parallel,
}

bitflags! {
    /// Flags of an I/O paradigm.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct IoParadigmFlags: u32 {
        /// The paradigm is provided by the operating system.
        const OS = 1 << 0;
    }
}

/// Set-once properties of an I/O paradigm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum IoParadigmProperty {
    /// Version string of the I/O library.
    Version,
}

impl IoParadigmProperty {
    /// All properties, in slot order.
    pub const ALL: [Self; 1] = [Self::Version];

    /// Number of properties.
    pub const COUNT: usize = Self::ALL.len();

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IoParadigmProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => f.write_str("VERSION"),
        }
    }
}

bitflags! {
    /// Flags of an I/O handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct IoHandleFlags: u32 {
        /// The handle existed before measurement started.
        const PRE_CREATED = 1 << 0;
        /// The handle is shared by all processes.
        const ALL_PROXY = 1 << 1;
    }
}

/// Access mode an I/O handle was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum IoAccessMode {
    /// Not known.
    #[default]
    None,
    /// Read only.
    ReadOnly,
    /// Write only.
    WriteOnly,
    /// Read and write.
    ReadWrite,
    /// Execute only.
    ExecuteOnly,
    /// Search only.
    SearchOnly,
}

bitflags! {
    /// Status flags an I/O handle was opened with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct IoStatusFlags: u32 {
        /// Close the handle when executing another program.
        const CLOSE_ON_EXEC = 1 << 0;
        /// Append to the end of the file.
        const APPEND = 1 << 1;
        /// Create the file if it does not exist.
        const CREATE = 1 << 2;
        /// Non-blocking operations.
        const NON_BLOCKING = 1 << 3;
        /// Synchronous writes.
        const SYNC = 1 << 4;
        /// Truncate on open.
        const TRUNCATE = 1 << 5;
    }
}
