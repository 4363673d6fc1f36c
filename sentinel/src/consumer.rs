use aya::maps::{MapData, RingBuf};
use chrono::Utc;
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};

use crate::config::Format;
use crate::event::{self, ProcessExecution};
use crate::store::ExecutionStorage;

/// Single reader of the probe's ring. Owns the read side; producers never wait on it.
pub struct Consumer {
    storage: ExecutionStorage,
    format: Format,
}

impl Consumer {
    pub fn new(storage: ExecutionStorage, format: Format) -> Self {
        Self { storage, format }
    }

    /// Decodes and reports one ring record. Malformed records are counted and skipped.
    pub fn accept(&self, bytes: &[u8]) -> Option<ProcessExecution> {
        let event = match event::decode(bytes) {
            Ok(event) => event,
            Err(e) => {
                self.storage.record_malformed();
                warn!("dropping ring record: {e}");
                return None;
            }
        };
        let execution = ProcessExecution::from_event(self.storage.next_seq(), &event, Utc::now());
        debug!(
            seq = execution.seq,
            pid = execution.pid,
            comm = %execution.comm,
            filename = %execution.filename,
            "execution drained"
        );
        crate::output::emit(self.format, &execution);
        Some(execution)
    }

    /// Drains the ring until `limit` executions have been reported, or forever.
    pub async fn run(&self, events: RingBuf<MapData>, limit: Option<u64>) -> anyhow::Result<()> {
        if limit == Some(0) {
            return Ok(());
        }
        let mut events = AsyncFd::new(events)?;
        let mut reported = 0u64;

        loop {
            let mut guard = events.readable_mut().await?;
            let ring = guard.get_inner_mut();

            let mut batch = Vec::new();
            while let Some(record) = ring.next() {
                if let Some(execution) = self.accept(&record) {
                    batch.push(execution);
                }
                if limit.is_some_and(|limit| reported + batch.len() as u64 >= limit) {
                    break;
                }
            }
            guard.clear_ready();

            for execution in batch {
                self.storage.add_execution(execution).await;
                reported += 1;
            }
            if limit.is_some_and(|limit| reported >= limit) {
                return Ok(());
            }
        }
    }
}
