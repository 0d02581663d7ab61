//! Nombres de variables de entorno, claves KVS y valores por defecto.

/* --------- Variables de SLURM (topología) --------- */

pub const ENV_RANK: &str = "SLURM_PROCID";
pub const ENV_CORES_PER_NODE: &str = "SLURM_NTASKS_PER_NODE";
pub const ENV_TASK_COUNT: &str = "SLURM_NTASKS";
pub const ENV_NODE_ID: &str = "SLURM_NODEID";
pub const ENV_NODE_COUNT: &str = "SLURM_JOB_NUM_NODES";

pub const DEFAULT_RANK: usize = 0;
pub const DEFAULT_CORES_PER_NODE: usize = 1;
pub const DEFAULT_TASK_COUNT: usize = 1;
pub const DEFAULT_NODE_ID: usize = 0;
pub const DEFAULT_NODE_COUNT: usize = 1;

/// Rank que actúa como master si no se indica otro.
pub const DEFAULT_MASTER_RANK: usize = 0;

/* --------- Conexión al KVS --------- */

pub const ENV_KVS_HOST: &str = "KVSSTCP_HOST";
pub const ENV_KVS_PORT: &str = "KVSSTCP_PORT";
pub const DEFAULT_KVS_HOST: &str = "127.0.0.1";
pub const DEFAULT_KVS_PORT: u16 = 8080;

/* --------- Claves usadas por el driver --------- */

pub const KEY_COUNT: &str = "count";
pub const KEY_WORK_COUNT: &str = "work_count";
pub const KEY_PILEUP: &str = "pileup";
pub const KEY_FINAL: &str = "final";
pub const SUFFIX_WAIT: &str = "_wait";
pub const SUFFIX_CONTINUE: &str = "_continue";

// namespaces de las dos barreras de limpieza
pub const SYNC_FINAL_READ: &str = "final_read";
pub const SYNC_POST_GET: &str = "post_get";

/// Tamaño de bloque por defecto del driver.
pub const DEFAULT_CHUNK: usize = 25;

/// Prefijo de los archivos de spill.
pub const SPILL_PREFIX: &str = "kvs";
