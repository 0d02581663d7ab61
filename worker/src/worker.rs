use std::time::Duration;

use anyhow::{Context, Result};
use kvsync::{
    kvs_base_url, Coordinator, DistributeOptions, HttpKvs, Kvs, Outcome, Task, TaskArg, Topology,
    TopologyOptions,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

fn square(args: &[Value]) -> Result<i64> {
    let x = args[0].as_i64().context("se esperaba un entero")?;
    x.checked_mul(x).with_context(|| format!("{}² no entra en un i64", x))
}

/// Reparte x² sobre `0..count` y loguea lo que le quedó a este proceso.
pub async fn run_square<K: Kvs>(
    coord: &Coordinator<K>,
    count: usize,
    opts: &DistributeOptions,
) -> Result<Outcome<i64>> {
    let upper = i64::try_from(count).context("--count no entra en un i64")?;
    let task = Task::new(square, vec![TaskArg::sequence(0..upper)]);

    let outcome = coord.distribute(&task, opts).await?;
    match &outcome {
        Outcome::Merged(values) => {
            let sum: i64 = values.iter().sum();
            info!(
                "rank {}: {} resultados, suma = {}",
                coord.rank(),
                values.len(),
                sum
            );
        }
        Outcome::NotBroadcast => {
            info!("rank {}: el resultado quedó sólo en el master", coord.rank());
        }
        Outcome::Direct(v) => {
            info!("rank {}: resultado directo {}", coord.rank(), v);
        }
    }
    Ok(outcome)
}

/// Arma el contexto del proceso: topología de SLURM + conexión al KVS.
pub fn connect(cli: &Cli) -> Result<Coordinator<HttpKvs>> {
    let topology = Topology::from_env(&TopologyOptions {
        suppress_warnings: cli.global.quiet_env,
        master_rank: cli.global.master_rank,
    })?;

    let url = cli.global.kvs_url.clone().unwrap_or_else(kvs_base_url);
    let kvs = HttpKvs::connect(&url)?;

    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    info!(
        "rank {}/{} en {} (nodo {}), KVS en {}{}",
        topology.rank,
        topology.task_count,
        hostname,
        topology.node_id,
        url,
        if topology.is_master { " [master]" } else { "" }
    );

    let mut coord = Coordinator::new(kvs, topology);
    if let Some(secs) = cli.global.wait_timeout_secs {
        coord = coord.with_wait_timeout(Duration::from_secs(secs));
    }
    Ok(coord)
}

/// Ejecuta el subcomando pedido contra un coordinador ya armado.
pub async fn execute<K: Kvs>(coord: &Coordinator<K>, command: Commands) -> Result<()> {
    match command {
        Commands::Square {
            count,
            chunk,
            spill_dir,
            no_broadcast,
            namespace,
        } => {
            let opts = DistributeOptions {
                chunk,
                spill_dir,
                broadcast: !no_broadcast,
                namespace,
            };
            run_square(coord, count, &opts).await?;
        }

        Commands::Sync { namespace, witness } => {
            let report = coord.sync_processes(&namespace, &witness).await?;
            if report.mismatches > 0 {
                warn!(
                    "sync '{}' terminó con {} testigos distintos",
                    namespace, report.mismatches
                );
            } else {
                info!("sync '{}' completo", namespace);
            }
        }

        Commands::Drain { key } => {
            coord.master_remove_key(&key).await?;
            if coord.is_master() {
                info!("clave {} drenada", key);
            }
        }
    }

    Ok(())
}
