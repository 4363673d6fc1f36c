use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::event::ProcessExecution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Records decoded since startup.
    pub received: u64,
    /// Records rejected by the decoder.
    pub malformed: u64,
    /// Executions currently held in memory.
    pub retained: usize,
}

// Recent executions, shared between the drain loop and the HTTP handlers
#[derive(Clone)]
pub struct ExecutionStorage {
    capacity: usize,
    // Oldest first
    executions: Arc<RwLock<VecDeque<ProcessExecution>>>,
    // Per-PID index for quick lookups
    pid_executions: Arc<DashMap<u32, Vec<ProcessExecution>>>,
    received: Arc<AtomicU64>,
    malformed: Arc<AtomicU64>,
}

impl ExecutionStorage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            executions: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            pid_executions: Arc::new(DashMap::new()),
            received: Arc::new(AtomicU64::new(0)),
            malformed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Claims the next drain-order sequence number.
    pub fn next_seq(&self) -> u64 {
        self.received.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn add_execution(&self, execution: ProcessExecution) {
        let mut executions = self.executions.write().await;

        if executions.len() >= self.capacity {
            if let Some(removed) = executions.pop_front() {
                if let Some(mut pid_vec) = self.pid_executions.get_mut(&removed.pid) {
                    pid_vec.retain(|e| e.seq != removed.seq);
                    if pid_vec.is_empty() {
                        drop(pid_vec);
                        self.pid_executions.remove(&removed.pid);
                    }
                }
            }
        }

        executions.push_back(execution.clone());

        self.pid_executions
            .entry(execution.pid)
            .or_default()
            .push(execution);
    }

    pub async fn get_all_executions(&self) -> Vec<ProcessExecution> {
        let executions = self.executions.read().await;
        executions.iter().cloned().collect()
    }

    pub fn get_executions_by_pid(&self, pid: u32) -> Vec<ProcessExecution> {
        self.pid_executions
            .get(&pid)
            .map(|executions| executions.clone())
            .unwrap_or_default()
    }

    pub async fn stats(&self) -> ExecutionStats {
        ExecutionStats {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            retained: self.executions.read().await.len(),
        }
    }
}

// HTTP API handlers
pub async fn get_all_executions(
    State(storage): State<ExecutionStorage>,
) -> Json<Vec<ProcessExecution>> {
    let executions = storage.get_all_executions().await;
    info!("Returning {} executions", executions.len());
    Json(executions)
}

pub async fn get_executions_by_pid(
    Path(pid): Path<u32>,
    State(storage): State<ExecutionStorage>,
) -> Result<Json<Vec<ProcessExecution>>, StatusCode> {
    let executions = storage.get_executions_by_pid(pid);
    if executions.is_empty() {
        info!("No executions found for PID {}", pid);
        Err(StatusCode::NOT_FOUND)
    } else {
        info!("Returning {} executions for PID {}", executions.len(), pid);
        Ok(Json(executions))
    }
}

pub async fn get_stats(State(storage): State<ExecutionStorage>) -> Json<ExecutionStats> {
    Json(storage.stats().await)
}
