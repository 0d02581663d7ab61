//! Prueba el cliente HTTP contra un KVS de juguete hecho con axum que
//! delega en `MemoryKvs`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use kvsync::{
    Coordinator, DistributeOptions, HttpKvs, Kvs, MemoryKvs, Outcome, Task, TaskArg, Topology,
};
use serde_json::Value;
use tokio::net::TcpListener;

async fn put(State(kvs): State<MemoryKvs>, Path(key): Path<String>, body: Bytes) -> StatusCode {
    match kvs.put(&key, body.to_vec()).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn get(
    State(kvs): State<MemoryKvs>,
    Path(key): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    kvs.get(&key)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn view(
    State(kvs): State<MemoryKvs>,
    Path(key): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    kvs.view(&key)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Levanta el KVS de juguete en un puerto libre y devuelve su URL.
async fn spawn_stub(kvs: MemoryKvs) -> String {
    let app = Router::new()
        .route("/kvs/:key", post(put).get(view))
        .route("/kvs/:key/get", post(get))
        .with_state(kvs);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn square(args: &[Value]) -> anyhow::Result<i64> {
    let x = args[0]
        .as_i64()
        .ok_or_else(|| anyhow::anyhow!("se esperaba un entero"))?;
    Ok(x * x)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn put_get_view_por_http() {
    let store = MemoryKvs::new();
    let url = spawn_stub(store.clone()).await;
    let kvs = HttpKvs::connect(&url).unwrap();

    kvs.put("clave", b"uno".to_vec()).await.unwrap();
    kvs.put("clave", b"dos".to_vec()).await.unwrap();

    assert_eq!(kvs.view("clave").await.unwrap(), b"uno".to_vec());
    assert_eq!(kvs.get("clave").await.unwrap(), b"uno".to_vec());
    assert_eq!(kvs.get("clave").await.unwrap(), b"dos".to_vec());
    assert_eq!(store.len("clave"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn get_por_http_espera_al_put() {
    let store = MemoryKvs::new();
    let url = spawn_stub(store.clone()).await;
    let kvs = HttpKvs::connect(&url).unwrap();

    let reader = {
        let kvs = kvs.clone();
        tokio::spawn(async move { kvs.get("luego").await.unwrap() })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!reader.is_finished());

    store.put("luego", b"listo".to_vec()).await.unwrap();
    assert_eq!(reader.await.unwrap(), b"listo".to_vec());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn map_reduce_completo_sobre_http() {
    let store = MemoryKvs::new();
    let url = spawn_stub(store.clone()).await;
    let n = 3;

    let mut handles = Vec::new();
    for rank in 0..n {
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let kvs = HttpKvs::connect(&url).unwrap();
            let coord = Coordinator::new(kvs, Topology::for_rank(rank, n));
            let task = Task::new(square, vec![TaskArg::sequence(1..=10)]);
            let opts = DistributeOptions {
                chunk: 2,
                ..Default::default()
            };
            coord.distribute(&task, &opts).await.unwrap()
        }));
    }

    let expected: Vec<i64> = (1..=10).map(|x| x * x).collect();
    for h in handles {
        assert_eq!(h.await.unwrap(), Outcome::Merged(expected.clone()));
    }
    assert!(store.live_keys().is_empty());
}
