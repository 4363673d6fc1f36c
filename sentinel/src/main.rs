use anyhow::Context;
use clap::Parser;
use sentinel::{
    config::{Format, Opt},
    consumer::Consumer,
    loader,
    server::start_http_server,
    store::ExecutionStorage,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    // Logs go to stderr so JSON lines on stdout stay machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting execve sentinel");

    let probe = loader::load(&opt.symbol)
        .with_context(|| format!("failed to set up the execve probe on {}", opt.symbol))?;

    let storage = ExecutionStorage::new(opt.history);
    let server_handle = match opt.listen {
        Some(addr) => Some(start_http_server(storage.clone(), addr).await?),
        None => None,
    };

    if opt.format == Format::Text {
        info!("Waiting for executions. Press Ctrl-C to exit.");
    }

    let consumer = Consumer::new(storage, opt.format);
    tokio::select! {
        res = consumer.run(probe.events, opt.count) => res.context("ring buffer consumer failed")?,
        res = signal::ctrl_c() => res.context("failed to listen for Ctrl-C")?,
    }
    info!("Exiting...");

    if let Some(handle) = server_handle {
        handle.abort();
    }
    Ok(())
}
