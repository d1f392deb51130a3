use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use prompt_grid_rs::api::server::GridServer;
use prompt_grid_rs::helpers::{build_image_router, initial_settings};
use prompt_grid_rs::imagegen::{AspectRatio, Style};
use prompt_grid_rs::logging::init_logging;
use prompt_grid_rs::task::TaskBoard;
use prompt_grid_rs::{ArchiveBuilder, BatchRunner, GridConfig};

/// Batch text-to-image service. Flags override `PROMPT_GRID_*` variables.
#[derive(Debug, Parser)]
#[command(name = "prompt-grid", version)]
struct Args {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Default image provider (gemini, openai)
    #[arg(long)]
    provider: Option<String>,

    /// Model override for the default provider
    #[arg(long)]
    model: Option<String>,

    /// Initial aspect ratio
    #[arg(long)]
    aspect_ratio: Option<AspectRatio>,

    /// Initial style
    #[arg(long)]
    style: Option<Style>,

    /// Per-request timeout for provider calls and image fetches
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log filter when RUST_LOG is unset
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn apply(self, cfg: &mut GridConfig) {
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(provider) = self.provider {
            cfg.provider = provider.to_lowercase();
        }
        if self.model.is_some() {
            cfg.model = self.model;
        }
        if let Some(ratio) = self.aspect_ratio {
            cfg.aspect_ratio = ratio;
        }
        if let Some(style) = self.style {
            cfg.style = style;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.request_timeout_secs = secs;
        }
        if let Some(filter) = self.log {
            cfg.log_filter = filter;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut cfg = match GridConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("config error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut cfg);

    if let Err(err) = init_logging(&cfg.log_filter) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let router = match build_image_router(&cfg) {
        Ok(router) => router,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let runner = Arc::new(BatchRunner::new(
        Arc::new(router),
        TaskBoard::spawn(),
        initial_settings(&cfg),
    ));
    let server = GridServer::new(cfg.port, runner, ArchiveBuilder::new(cfg.request_timeout()));
    if let Err(err) = server.start().await {
        error!("server error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
