use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "worker")]
#[command(about = "Proceso par que se coordina con los demás a través del KVS")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// URL del KVS (por defecto sale de KVSSTCP_HOST / KVSSTCP_PORT)
    #[arg(long, value_name = "URL")]
    pub kvs_url: Option<String>,

    /// Rank que hace de master
    #[arg(long, default_value_t = 0)]
    pub master_rank: usize,

    /// No avisar cuando falta alguna variable de SLURM
    #[arg(long)]
    pub quiet_env: bool,

    /// Cortar cualquier espera del KVS después de N segundos
    #[arg(long, value_name = "SEGUNDOS")]
    pub wait_timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Reparte x² sobre 0..count y junta el resultado en el master
    Square {
        #[arg(long, value_name = "N")]
        count: usize,

        #[arg(long, default_value_t = kvsync::constants::DEFAULT_CHUNK)]
        chunk: usize,

        /// Directorio compartido para pasar los datos por archivo
        #[arg(long, value_name = "DIR")]
        spill_dir: Option<PathBuf>,

        /// Sólo el master se queda con el resultado
        #[arg(long)]
        no_broadcast: bool,

        /// Prefijo para las claves de esta ronda
        #[arg(long, default_value = "")]
        namespace: String,
    },

    /// Una ronda de barrera
    Sync {
        #[arg(long)]
        namespace: String,

        /// Valor que el master compara entre procesos
        #[arg(long, default_value = "true")]
        witness: String,
    },

    /// El master saca un valor de una clave (para limpiar a mano)
    Drain {
        #[arg(long)]
        key: String,
    },
}
