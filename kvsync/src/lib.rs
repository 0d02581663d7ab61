//! Coordinación de procesos pares a través de un KVS compartido:
//! reparto de rangos, barreras y map-reduce con reensamblado en el master.

pub mod allocator;
pub mod barrier;
pub mod constants;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod http;
pub mod kvs;
pub mod memory;
pub mod spill;
pub mod task;
pub mod topology;

pub use allocator::{RangeAllocator, WorkRange};
pub use barrier::BarrierReport;
pub use coordinator::Coordinator;
pub use driver::{merge_pileups, DistributeOptions, DriverKeys, Outcome, PileupBuffer};
pub use error::{CoordError, Result};
pub use http::{kvs_base_url, HttpKvs};
pub use kvs::Kvs;
pub use memory::MemoryKvs;
pub use spill::Staged;
pub use task::{IterationSpace, Task, TaskArg};
pub use topology::{Topology, TopologyOptions};
