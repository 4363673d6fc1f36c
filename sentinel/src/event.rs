use chrono::{DateTime, Utc};
use sentinel_common::ExecEvent;
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// Reads one ring record. The probe always reserves exactly one `ExecEvent`,
/// so anything else is rejected rather than guessed at.
pub fn decode(bytes: &[u8]) -> Result<ExecEvent, SentinelError> {
    bytemuck::try_pod_read_unaligned(bytes).map_err(|_| SentinelError::MalformedRecord {
        len: bytes.len(),
        expected: size_of::<ExecEvent>(),
    })
}

/// A decoded execution as the consumer keeps and reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessExecution {
    /// Position in drain order, starting at 1.
    pub seq: u64,
    pub pid: u32,
    pub comm: String,
    /// Empty when the probe could not read the path argument.
    pub filename: String,
    /// Wall-clock time the record was drained. The record itself carries no time.
    pub observed_at: DateTime<Utc>,
}

impl ProcessExecution {
    pub fn from_event(seq: u64, event: &ExecEvent, observed_at: DateTime<Utc>) -> Self {
        ProcessExecution {
            seq,
            pid: event.pid,
            comm: String::from_utf8_lossy(event.comm_bytes()).into_owned(),
            filename: String::from_utf8_lossy(event.filename_bytes()).into_owned(),
            observed_at,
        }
    }
}
