use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::store::{ExecutionStorage, get_all_executions, get_executions_by_pid, get_stats};

pub fn create_app(storage: ExecutionStorage) -> Router {
    Router::new()
        .route("/executions", get(get_all_executions))
        .route("/executions/:pid", get(get_executions_by_pid))
        .route("/stats", get(get_stats))
        .with_state(storage)
}

pub async fn start_http_server(
    storage: ExecutionStorage,
    addr: SocketAddr,
) -> anyhow::Result<JoinHandle<()>> {
    let app = create_app(storage);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    info!("API endpoints:");
    info!("  GET /executions - recent executions, oldest first");
    info!("  GET /executions/:pid - recent executions for one PID");
    info!("  GET /stats - received, malformed and retained counts");

    Ok(server_handle)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::event::ProcessExecution;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_executions_and_stats() {
        let storage = ExecutionStorage::new(4);
        storage
            .add_execution(ProcessExecution {
                seq: storage.next_seq(),
                pid: 99,
                comm: "bash".to_string(),
                filename: "/bin/echo".to_string(),
                observed_at: Utc::now(),
            })
            .await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_app(storage);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let all = get(addr, "/executions").await;
        assert!(all.starts_with("HTTP/1.1 200"));
        assert!(all.contains("\"filename\":\"/bin/echo\""));

        let missing = get(addr, "/executions/100").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        let stats = get(addr, "/stats").await;
        assert!(stats.contains("\"received\":1"));

        server.abort();
    }
}
