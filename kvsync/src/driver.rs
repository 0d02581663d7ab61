use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::*;
use crate::coordinator::Coordinator;
use crate::error::{CoordError, Result};
use crate::kvs::Kvs;
use crate::spill::{self, Staged};
use crate::task::Task;

/// Resultados locales: posición aplanada -> resultado.
pub type PileupBuffer<R> = BTreeMap<usize, R>;

#[derive(Debug, Clone)]
pub struct DistributeOptions {
    /// Posiciones que se reclaman de a una vez.
    pub chunk: usize,
    /// Si está, los datos viajan en archivos dentro de este directorio
    /// (debe ser compartido por todos los procesos).
    pub spill_dir: Option<PathBuf>,
    /// Si es false sólo el master se queda con el resultado.
    pub broadcast: bool,
    /// Prefijo para todas las claves de la ronda.
    pub namespace: String,
}

impl Default for DistributeOptions {
    fn default() -> Self {
        Self {
            chunk: DEFAULT_CHUNK,
            spill_dir: None,
            broadcast: true,
            namespace: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    /// Ningún argumento era secuencia: la función corrió una vez, local.
    Direct(R),
    /// Secuencia completa, ordenada por posición.
    Merged(Vec<R>),
    /// Proceso no-master con `broadcast = false`.
    NotBroadcast,
}

impl<R> Outcome<R> {
    pub fn merged(self) -> Option<Vec<R>> {
        match self {
            Outcome::Merged(v) => Some(v),
            _ => None,
        }
    }

    pub fn direct(self) -> Option<R> {
        match self {
            Outcome::Direct(v) => Some(v),
            _ => None,
        }
    }
}

/// Claves de una ronda del driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverKeys {
    pub count: String,
    pub pileup: String,
    pub final_data: String,
    pub final_read_sync: String,
    pub post_get_sync: String,
}

fn namespaced(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}

impl DriverKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            count: namespaced(namespace, KEY_WORK_COUNT),
            pileup: namespaced(namespace, KEY_PILEUP),
            final_data: namespaced(namespace, KEY_FINAL),
            final_read_sync: namespaced(namespace, SYNC_FINAL_READ),
            post_get_sync: namespaced(namespace, SYNC_POST_GET),
        }
    }
}

/// Junta los pileups en una sola secuencia de largo `total`.
/// Cada posición tiene que aparecer exactamente una vez.
pub fn merge_pileups<R>(parts: Vec<PileupBuffer<R>>, total: usize) -> Result<Vec<R>> {
    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();

    for part in parts {
        for (position, value) in part {
            let slot = slots.get_mut(position).ok_or_else(|| {
                CoordError::partition(position, format!("fuera de rango (total {})", total))
            })?;
            if slot.is_some() {
                return Err(CoordError::partition(position, "calculada por más de un proceso"));
            }
            *slot = Some(value);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| CoordError::partition(position, "ningún proceso la calculó"))
        })
        .collect()
}

impl<K: Kvs> Coordinator<K> {
    /// Reparte una tarea entre todos los procesos y junta los resultados.
    ///
    /// Si ningún argumento es secuencia, cada proceso corre la función una
    /// vez y devuelve `Direct`. Si no, recorre el producto cartesiano de las
    /// secuencias, calcula las posiciones que le tocan y el master arma la
    /// lista final.
    pub async fn distribute<F, R>(&self, task: &Task<F>, opts: &DistributeOptions) -> Result<Outcome<R>>
    where
        F: Fn(&[Value]) -> anyhow::Result<R>,
        R: Serialize + DeserializeOwned,
    {
        if opts.chunk < 1 {
            return Err(CoordError::config(format!(
                "chunk debe ser >= 1 (llegó {})",
                opts.chunk
            )));
        }

        if !task.has_sequences() {
            let literal = task.literal_args();
            let value = (task.func)(&literal[..]).map_err(|e| CoordError::Task {
                position: 0,
                source: e.into(),
            })?;
            return Ok(Outcome::Direct(value));
        }

        let space = task.space()?;
        if space.is_empty() {
            return Ok(Outcome::Merged(Vec::new()));
        }
        let total = space.len();
        let keys = DriverKeys::new(&opts.namespace);

        // Fase map
        let mut pileup: PileupBuffer<R> = BTreeMap::new();
        {
            let mut alloc = self.own_check(&keys.count, opts.chunk).await?;
            for position in 0..total {
                if alloc.claim_if_needed(position).await? {
                    let args = space.args_at(position);
                    let value = (task.func)(&args[..]).map_err(|e| CoordError::Task {
                        position,
                        source: e.into(),
                    })?;
                    pileup.insert(position, value);
                }
            }
        }
        info!(
            "rank {} calculó {} de {} posiciones",
            self.rank(),
            pileup.len(),
            total
        );

        // Fase reduce
        let (outcome, final_spill) = self
            .process_results(pileup, total, opts, &keys)
            .await?;

        // Limpieza: nadie sigue hasta que todos leyeron el dato final
        self.sync_processes(&keys.final_read_sync, &true).await?;
        if self.is_master() {
            self.master_remove_key(&keys.count).await?;
            self.master_remove_key(&keys.final_data).await?;
            if let Some(path) = final_spill {
                spill::remove_spill(&path)?;
            }
        }
        self.sync_processes(&keys.post_get_sync, &true).await?;

        Ok(outcome)
    }

    /// Sube el pileup local; el master junta todos y publica el resultado.
    /// Devuelve además la ruta del spill final (sólo el master) para borrarla
    /// después de la barrera.
    async fn process_results<R>(
        &self,
        pileup: PileupBuffer<R>,
        total: usize,
        opts: &DistributeOptions,
        keys: &DriverKeys,
    ) -> Result<(Outcome<R>, Option<PathBuf>)>
    where
        R: Serialize + DeserializeOwned,
    {
        let spill_dir = opts.spill_dir.as_deref();

        {
            let staged = spill::stage(&pileup, spill_dir)?;
            self.put_key(&keys.pileup, &staged).await?;
        }
        drop(pileup);

        if !self.is_master() {
            let staged: Staged<Vec<R>> = self.view_key(&keys.final_data).await?;
            return match spill::unstage(staged, false)? {
                Some(merged) => Ok((Outcome::Merged(merged), None)),
                None => Ok((Outcome::NotBroadcast, None)),
            };
        }

        let mut parts = Vec::with_capacity(self.task_count());
        for _ in 0..self.task_count() {
            let staged: Staged<PileupBuffer<R>> = self.get_key(&keys.pileup).await?;
            if let Some(part) = spill::unstage(staged, true)? {
                parts.push(part);
            }
        }
        let merged = merge_pileups(parts, total)?;
        debug!("master juntó {} resultados", merged.len());

        let final_spill = {
            let published: Staged<&Vec<R>> = if opts.broadcast {
                spill::stage(&merged, spill_dir)?
            } else {
                Staged::Empty
            };
            self.put_key(&keys.final_data, &published).await?;
            published.spill_path().map(Path::to_path_buf)
        };

        Ok((Outcome::Merged(merged), final_spill))
    }
}
