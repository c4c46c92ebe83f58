//! Palaver terminal client
//!
//! Thin frontend over `palaver-core`: renders the peer sidebar, the
//! conversation pane, and the input line, and maps key events onto the
//! session controller.

mod app;
mod config;
mod input;
mod runtime;
mod terminal;
mod ui;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal client for the Palaver chat
#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(about = "Direct-messaging chat in the terminal")]
#[command(version)]
struct Args {
    /// Username to connect as
    #[arg(short, long)]
    username: String,

    /// Server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Connect without TLS
    #[arg(long)]
    no_tls: bool,

    /// Session cookie for the credentialed API endpoints
    #[arg(long)]
    cookie: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("palaver");
    std::fs::create_dir_all(&data_dir).ok();

    // The terminal is in raw mode while running; logs go to a file.
    let log_file = std::fs::File::create(data_dir.join("palaver.log"))
        .context("create log file")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "palaver=info,palaver_core=info".to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false),
        )
        .init();

    tracing::info!("starting palaver v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::AppConfig::load(&data_dir).unwrap_or_default();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_tls {
        config.server.use_tls = false;
    }
    config.save(&data_dir).ok();

    runtime::Runtime::new(config, args.username, args.cookie)?
        .run()
        .await
}
