use std::io::Write;

use tracing::{info, warn};

use crate::config::Format;
use crate::event::ProcessExecution;

const UNREADABLE: &str = "<unreadable>";

pub fn render_text(execution: &ProcessExecution) -> String {
    let filename = if execution.filename.is_empty() {
        UNREADABLE
    } else {
        &execution.filename
    };
    format!(
        "PID: {:<6} | COMM: {:<15} | FILENAME: {}",
        execution.pid, execution.comm, filename
    )
}

pub fn render_json(execution: &ProcessExecution) -> serde_json::Result<String> {
    serde_json::to_string(execution)
}

/// Reports one execution in the configured format.
pub fn emit(format: Format, execution: &ProcessExecution) {
    match format {
        Format::Text => info!(seq = execution.seq, "{}", render_text(execution)),
        Format::Json => {
            let line = match render_json(execution) {
                Ok(line) => line,
                Err(e) => {
                    warn!(seq = execution.seq, "failed to encode execution: {e}");
                    return;
                }
            };
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}") {
                warn!(seq = execution.seq, "failed to write execution: {e}");
            }
        }
    }
}
