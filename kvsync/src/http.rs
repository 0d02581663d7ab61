use std::env;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::constants::{DEFAULT_KVS_HOST, DEFAULT_KVS_PORT, ENV_KVS_HOST, ENV_KVS_PORT};
use crate::error::{CoordError, Result};
use crate::kvs::Kvs;

/// Cliente para un servicio KVS expuesto por HTTP.
///
/// - `POST /kvs/{key}`      encola el body
/// - `POST /kvs/{key}/get`  espera y saca el primer valor (long-poll)
/// - `GET  /kvs/{key}`      espera y devuelve el primer valor sin sacarlo
#[derive(Clone)]
pub struct HttpKvs {
    client: Client,
    base: Url,
}

/// URL del KVS a partir de KVSSTCP_HOST / KVSSTCP_PORT.
/// Si no están definidas usa http://127.0.0.1:8080.
pub fn kvs_base_url() -> String {
    let host = env::var(ENV_KVS_HOST).unwrap_or_else(|_| DEFAULT_KVS_HOST.to_string());
    let port = env::var(ENV_KVS_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_KVS_PORT);
    format!("http://{}:{}", host, port)
}

impl HttpKvs {
    pub fn connect(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            CoordError::config(format!("URL de KVS inválida '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(CoordError::config(format!(
                "URL de KVS inválida '{}': no puede ser base",
                base_url
            )));
        }
        // sin timeout: get/view bloquean lo que haga falta
        let client = Client::builder()
            .build()
            .map_err(|e| CoordError::transport_with("", "no se pudo crear el cliente HTTP", e))?;
        Ok(Self { client, base })
    }

    pub fn from_env() -> Result<Self> {
        Self::connect(&kvs_base_url())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, key: &str, get: bool) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CoordError::transport(key, "URL base sin path"))?;
            segments.pop_if_empty().push("kvs").push(key);
            if get {
                segments.push("get");
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, key: &str, url: Url, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CoordError::transport_with(key, "request fallido", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoordError::transport(
                key,
                format!("el KVS respondió status {}", status),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CoordError::transport_with(key, "error leyendo la respuesta", e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Kvs for HttpKvs {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        debug!("put {} ({} bytes)", key, value.len());
        let url = self.url_for(key, false)?;
        self.send(Method::POST, key, url, Some(value)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key, true)?;
        self.send(Method::POST, key, url, None).await
    }

    async fn view(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key, false)?;
        self.send(Method::GET, key, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arma_urls_por_clave() {
        let kvs = HttpKvs::connect("http://kvs:9000").unwrap();

        assert_eq!(
            kvs.url_for("pileup", false).unwrap().as_str(),
            "http://kvs:9000/kvs/pileup"
        );
        assert_eq!(
            kvs.url_for("ns_wait", true).unwrap().as_str(),
            "http://kvs:9000/kvs/ns_wait/get"
        );
    }

    #[test]
    fn claves_con_caracteres_raros_se_escapan() {
        let kvs = HttpKvs::connect("http://kvs:9000/").unwrap();
        let url = kvs.url_for("a/b c", false).unwrap();
        assert_eq!(url.as_str(), "http://kvs:9000/kvs/a%2Fb%20c");
    }

    #[test]
    fn url_invalida_es_error_de_config() {
        assert!(matches!(
            HttpKvs::connect("no es una url"),
            Err(CoordError::Config { .. })
        ));
    }
}
