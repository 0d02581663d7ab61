use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::constants::{SUFFIX_CONTINUE, SUFFIX_WAIT};
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::kvs::Kvs;

/// Resultado de una ronda de barrera.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierReport {
    /// Testigos distintos al del master (sólo lo cuenta el master).
    pub mismatches: usize,
}

impl<K: Kvs> Coordinator<K> {
    /// Bloquea a todos los procesos hasta que todos llegan a este punto.
    ///
    /// Cada proceso deja `witness` en `{ns}_wait`. El master junta
    /// `task_count` testigos, avisa si alguno no coincide con el suyo y
    /// después publica un token por proceso en `{ns}_continue`.
    /// Conviene usar un namespace distinto por ronda lógica.
    pub async fn sync_processes<T>(&self, namespace: &str, witness: &T) -> Result<BarrierReport>
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let wait_key = format!("{}{}", namespace, SUFFIX_WAIT);
        let continue_key = format!("{}{}", namespace, SUFFIX_CONTINUE);

        self.put_key(&wait_key, witness).await?;

        let mut report = BarrierReport::default();

        if self.is_master() {
            for _ in 0..self.task_count() {
                let other: T = self.get_key(&wait_key).await?;
                if &other != witness {
                    warn!(
                        "sync '{}': el master tiene {:?} pero un proceso tiene {:?}",
                        namespace, witness, other
                    );
                    report.mismatches += 1;
                }
            }
            debug!(
                "sync '{}': llegaron {} procesos, liberando",
                namespace,
                self.task_count()
            );
            for _ in 0..self.task_count() {
                self.put_key(&continue_key, &true).await?;
            }
        }

        let _: bool = self.get_key(&continue_key).await?;
        Ok(report)
    }
}
