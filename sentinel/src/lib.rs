//! Userspace side of the execve sentinel: loads the kprobe, drains its ring
//! and reports every execution it sees.

pub mod config;
pub mod consumer;
pub mod error;
pub mod event;
pub mod loader;
pub mod output;
pub mod server;
pub mod store;

pub use error::SentinelError;
