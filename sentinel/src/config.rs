use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

/// Syscall wrapper for `execve` on the architecture we were built for.
#[cfg(target_arch = "x86_64")]
pub const DEFAULT_SYMBOL: &str = "__x64_sys_execve";
#[cfg(target_arch = "aarch64")]
pub const DEFAULT_SYMBOL: &str = "__arm64_sys_execve";
#[cfg(target_arch = "riscv64")]
pub const DEFAULT_SYMBOL: &str = "__riscv_sys_execve";
#[cfg(target_arch = "s390x")]
pub const DEFAULT_SYMBOL: &str = "__s390x_sys_execve";
#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64",
    target_arch = "s390x"
)))]
compile_error!("no execve syscall wrapper known for this architecture");

pub const DEFAULT_HISTORY: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One aligned line per execution, through the log output.
    Text,
    /// One JSON object per line on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sentinel", about = "Report every execve on this machine")]
pub struct Opt {
    /// Kernel symbol the kprobe is attached to.
    #[arg(long, default_value = DEFAULT_SYMBOL)]
    pub symbol: String,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Serve the recent executions over HTTP on this address.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// How many recent executions to keep in memory.
    #[arg(long, default_value_t = DEFAULT_HISTORY, value_parser = parse_history)]
    pub history: usize,

    /// Exit after this many executions.
    #[arg(long, value_parser = parse_count)]
    pub count: Option<u64>,
}

fn parse_history(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("history must hold at least one execution".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_count(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("count must be at least one execution".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
