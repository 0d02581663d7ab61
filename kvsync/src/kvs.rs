use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Contrato mínimo que pedimos al servicio KVS.
///
/// Cada clave es una cola FIFO:
/// - `put` encola y no bloquea.
/// - `get` espera a que haya un valor y lo saca; dos `get` concurrentes
///   nunca reciben el mismo valor.
/// - `view` espera a que haya un valor y devuelve el primero sin sacarlo.
#[async_trait]
pub trait Kvs: Send + Sync {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn view(&self, key: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl<K: Kvs + ?Sized> Kvs for std::sync::Arc<K> {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key).await
    }

    async fn view(&self, key: &str) -> Result<Vec<u8>> {
        (**self).view(key).await
    }
}

/* --------- helpers JSON --------- */

pub async fn put_json<K, T>(kvs: &K, key: &str, value: &T) -> Result<()>
where
    K: Kvs + ?Sized,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value)?;
    kvs.put(key, bytes).await
}

pub async fn get_json<K, T>(kvs: &K, key: &str) -> Result<T>
where
    K: Kvs + ?Sized,
    T: DeserializeOwned,
{
    let bytes = kvs.get(key).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn view_json<K, T>(kvs: &K, key: &str) -> Result<T>
where
    K: Kvs + ?Sized,
    T: DeserializeOwned,
{
    let bytes = kvs.view(key).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
