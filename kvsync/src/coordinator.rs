use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::allocator::RangeAllocator;
use crate::error::{CoordError, Result};
use crate::kvs::{self, Kvs};
use crate::topology::Topology;

/// Contexto de coordinación de un proceso: conexión al KVS + topología.
/// Se crea una vez al arrancar y se pasa por referencia a todo lo demás.
pub struct Coordinator<K> {
    kvs: K,
    topology: Topology,
    wait_timeout: Option<Duration>,
}

impl<K: Kvs> Coordinator<K> {
    pub fn new(kvs: K, topology: Topology) -> Self {
        Self {
            kvs,
            topology,
            wait_timeout: None,
        }
    }

    /// Hace que cada `get`/`view` falle con `Timeout` en vez de esperar
    /// para siempre.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn kvs(&self) -> &K {
        &self.kvs
    }

    pub fn is_master(&self) -> bool {
        self.topology.is_master
    }

    pub fn rank(&self) -> usize {
        self.topology.rank
    }

    pub fn task_count(&self) -> usize {
        self.topology.task_count
    }

    async fn bounded<T, F>(&self, key: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.wait_timeout {
            None => fut.await,
            Some(waited) => tokio::time::timeout(waited, fut)
                .await
                .map_err(|_| CoordError::Timeout {
                    key: key.to_string(),
                    waited,
                })?,
        }
    }

    pub async fn put_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        kvs::put_json(&self.kvs, key, value).await
    }

    pub async fn get_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.bounded(key, kvs::get_json(&self.kvs, key)).await
    }

    pub async fn view_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.bounded(key, kvs::view_json(&self.kvs, key)).await
    }

    /// El master saca un valor de `key`; el resto no hace nada.
    pub async fn master_remove_key(&self, key: &str) -> Result<()> {
        if self.is_master() {
            debug!("master drenando clave {}", key);
            self.bounded(key, self.kvs.get(key)).await?;
        }
        Ok(())
    }

    /// Asignador de rangos sobre `key`. El master inicializa el contador.
    pub async fn own_check(&self, key: &str, chunk: usize) -> Result<RangeAllocator<'_, K>> {
        RangeAllocator::start(self, key, chunk).await
    }
}
