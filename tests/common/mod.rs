//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use access_logger::config::schema::DebugRuleConfig;
use access_logger::observability::Severity;
use access_logger::{
    AccessLogConfig, AccessLogger, AppConfig, HttpServer, MemorySink, Record, Shutdown,
};
use tokio::net::TcpListener;

/// Build a logger that records into memory.
pub fn memory_logger(config: AccessLogConfig) -> (AccessLogger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let logger = AccessLogger::new(config)
        .expect("valid access log config")
        .with_sink(sink.clone());
    (logger, sink)
}

/// A single forced-DEBUG rule from field/pattern pairs.
#[allow(dead_code)]
pub fn rule(pairs: &[(&str, &str)]) -> DebugRuleConfig {
    pairs
        .iter()
        .map(|(field, pattern)| (field.to_string(), pattern.to_string()))
        .collect()
}

/// Start the demo server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(config: AppConfig, logger: AccessLogger) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::with_logger(config, Arc::new(logger));
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Wait until the sink holds `count` records. Records with logged bodies are
/// emitted once the response body has been fully written.
#[allow(dead_code)]
pub async fn wait_for_entries(sink: &MemorySink, count: usize) -> Vec<(Severity, Record)> {
    for _ in 0..200 {
        if sink.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let entries = sink.entries();
    assert_eq!(entries.len(), count, "access log records");
    entries
}
