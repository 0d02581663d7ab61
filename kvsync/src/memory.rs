use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::Result;
use crate::kvs::Kvs;

/// KVS en memoria: una cola FIFO por clave.
///
/// Sirve para correr varios "procesos" como tareas de tokio dentro del mismo
/// binario (tests, corridas locales). Clonar comparte el mismo almacén.
#[derive(Clone, Default)]
pub struct MemoryKvs {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    notify: Notify,
}

impl MemoryKvs {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Vec<u8>>>> {
        self.inner.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cantidad de valores encolados bajo `key`.
    pub fn len(&self, key: &str) -> usize {
        self.queues().get(key).map(|q| q.len()).unwrap_or(0)
    }

    /// Claves que todavía tienen algún valor.
    pub fn live_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .queues()
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn try_front(&self, key: &str, remove: bool) -> Option<Vec<u8>> {
        let mut queues = self.queues();
        let queue = queues.get_mut(key)?;
        if remove {
            let value = queue.pop_front();
            if queue.is_empty() {
                queues.remove(key);
            }
            value
        } else {
            queue.front().cloned()
        }
    }

    async fn wait_front(&self, key: &str, remove: bool) -> Vec<u8> {
        loop {
            // registrarse antes de mirar la cola para no perder un put
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_front(key, remove) {
                return value;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Kvs for MemoryKvs {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.queues()
            .entry(key.to_string())
            .or_default()
            .push_back(value);
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.wait_front(key, true).await)
    }

    async fn view(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.wait_front(key, false).await)
    }
}
