//! admitqd - operator driver for the admission queue.
//!
//! Reads commands from stdin, prints dispatched keys to stdout:
//!
//! ```text
//! add <queue> <key> <priority>   submit a key
//! done <queue> <key>             mark an admitted key finished
//! cancel <queue> <key>           withdraw a pending key
//! window <queue> <n>             change a queue's window
//! stats                          print queue depths and counters
//! ```
//!
//! Ctrl+C, SIGTERM or end of input flushes a final snapshot and exits.

use std::sync::Arc;

use admitq::{telemetry, ChannelExecutor, FileStore, ManagerConfig, QueueManager};
use chrono::Utc;
use mimalloc::MiMalloc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler, continuing without it");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

fn handle_command(manager: &QueueManager, line: &str) -> Result<(), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => Ok(()),
        ["add", queue, key, priority] => {
            let priority: i64 = priority
                .parse()
                .map_err(|_| format!("invalid priority: {priority}"))?;
            let added = manager
                .add(queue, *key, priority, Utc::now())
                .map_err(|e| e.to_string())?;
            if !added {
                println!("exists {queue} {key}");
            }
            Ok(())
        }
        ["done", queue, key] => {
            if !manager.complete(queue, key) {
                println!("unknown {queue} {key}");
            }
            Ok(())
        }
        ["cancel", queue, key] => {
            if !manager.cancel(queue, key) {
                println!("unknown {queue} {key}");
            }
            Ok(())
        }
        ["window", queue, n] => {
            let window: i64 = n.parse().map_err(|_| format!("invalid window: {n}"))?;
            manager.set_window(queue, window);
            Ok(())
        }
        ["stats"] => {
            for (name, stats) in manager.queue_stats() {
                println!(
                    "queue {name} pending={} processing={} window={}",
                    stats.pending, stats.processing, stats.window
                );
            }
            let metrics = serde_json::to_string(&manager.metrics()).map_err(|e| e.to_string())?;
            println!("metrics {metrics}");
            Ok(())
        }
        _ => Err(format!("unrecognized command: {line}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = ManagerConfig::from_env();
    let store = Arc::new(FileStore::open(&config.snapshot.dir).await?);
    info!(dir = ?store.dir(), "Using file snapshot store");

    let (executor, mut tickets) = ChannelExecutor::new();
    let manager = QueueManager::start(config, store, Arc::new(executor)).await?;

    tokio::spawn(async move {
        while let Some(ticket) = tickets.recv().await {
            println!("dispatch {} {}", ticket.queue, ticket.key);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = handle_command(&manager, line.trim()) {
                        warn!(error = %e, "Command rejected");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            },
        }
    }

    let report = manager.shutdown().await;
    if report.failed > 0 {
        return Err(format!("{} queue snapshot(s) failed on shutdown", report.failed).into());
    }
    Ok(())
}
