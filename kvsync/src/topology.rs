use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::{CoordError, Result};

/// Datos estáticos del proceso dentro de la corrida.
/// Se arma una sola vez al arrancar y no cambia después.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub rank: usize,
    pub task_count: usize,
    pub node_id: usize,
    pub node_count: usize,
    pub cores_per_node: usize,
    pub is_master: bool,
}

#[derive(Debug, Clone)]
pub struct TopologyOptions {
    /// No loguear cuando una variable cae al default.
    pub suppress_warnings: bool,
    pub master_rank: usize,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            suppress_warnings: false,
            master_rank: DEFAULT_MASTER_RANK,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Rank,
    Cores,
    Tasks,
    Node,
    Nodes,
}

/// (variable, campo, default)
const SLURM_VARS: [(&str, Field, usize); 5] = [
    (ENV_RANK, Field::Rank, DEFAULT_RANK),
    (ENV_CORES_PER_NODE, Field::Cores, DEFAULT_CORES_PER_NODE),
    (ENV_TASK_COUNT, Field::Tasks, DEFAULT_TASK_COUNT),
    (ENV_NODE_ID, Field::Node, DEFAULT_NODE_ID),
    (ENV_NODE_COUNT, Field::Nodes, DEFAULT_NODE_COUNT),
];

impl Topology {
    /// Lee la topología de las variables que deja sbatch.
    pub fn from_env(opts: &TopologyOptions) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), opts)
    }

    /// Igual que `from_env` pero con una función de búsqueda arbitraria,
    /// así los tests no tocan el entorno real.
    pub fn from_lookup<F>(lookup: F, opts: &TopologyOptions) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut topo = Topology {
            rank: DEFAULT_RANK,
            task_count: DEFAULT_TASK_COUNT,
            node_id: DEFAULT_NODE_ID,
            node_count: DEFAULT_NODE_COUNT,
            cores_per_node: DEFAULT_CORES_PER_NODE,
            is_master: false,
        };

        for (var, field, default) in SLURM_VARS {
            let val = match lookup(var).and_then(|s| s.trim().parse::<usize>().ok()) {
                Some(v) => v,
                None => {
                    if !opts.suppress_warnings {
                        warn!("SBATCH no definió {}; usando {}", var, default);
                    }
                    default
                }
            };

            match field {
                Field::Rank => topo.rank = val,
                Field::Cores => topo.cores_per_node = val,
                Field::Tasks => topo.task_count = val,
                Field::Node => topo.node_id = val,
                Field::Nodes => topo.node_count = val,
            }
        }

        topo.is_master = topo.rank == opts.master_rank;
        topo.validate(opts.master_rank)?;

        debug!(
            "topología: rank={} tasks={} node={}/{} cores={} master={}",
            topo.rank,
            topo.task_count,
            topo.node_id,
            topo.node_count,
            topo.cores_per_node,
            topo.is_master
        );
        Ok(topo)
    }

    /// Topología de un solo proceso (master).
    pub fn single() -> Self {
        Self::for_rank(0, 1)
    }

    /// Topología sintética para el rank `rank` de `task_count` procesos
    /// en un solo nodo, con master en el rank 0.
    pub fn for_rank(rank: usize, task_count: usize) -> Self {
        Topology {
            rank,
            task_count,
            node_id: 0,
            node_count: 1,
            cores_per_node: task_count.max(1),
            is_master: rank == DEFAULT_MASTER_RANK,
        }
    }

    fn validate(&self, master_rank: usize) -> Result<()> {
        if self.task_count == 0 || self.node_count == 0 || self.cores_per_node == 0 {
            return Err(CoordError::config(format!(
                "tasks={}, nodes={}, cores={}: todos deben ser >= 1",
                self.task_count, self.node_count, self.cores_per_node
            )));
        }
        if self.rank >= self.task_count {
            return Err(CoordError::config(format!(
                "rank {} fuera de rango para {} tareas",
                self.rank, self.task_count
            )));
        }
        if master_rank >= self.task_count {
            return Err(CoordError::config(format!(
                "master rank {} fuera de rango para {} tareas",
                master_rank, self.task_count
            )));
        }
        Ok(())
    }
}
