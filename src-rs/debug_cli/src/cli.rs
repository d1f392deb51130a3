use clap::Parser;

use crate::models::CLIConfig;

/// Terminal front end for a running prompt-grid service.
#[derive(Debug, Parser)]
#[command(name = "prompt-grid-cli", version)]
pub struct Args {
    /// Service base URL
    #[arg(long = "base", env = "PROMPT_GRID_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Initial style sent with the first submission
    #[arg(long, env = "PROMPT_GRID_STYLE")]
    pub style: Option<String>,

    /// Initial aspect ratio sent with the first submission
    #[arg(long = "ratio", env = "PROMPT_GRID_ASPECT_RATIO")]
    pub aspect_ratio: Option<String>,

    /// Seconds between polls while waiting on a run
    #[arg(long, env = "PROMPT_GRID_POLL_SECS", default_value_t = 2)]
    pub poll_secs: u64,
}

pub fn parse_config() -> CLIConfig {
    let args = Args::parse();
    CLIConfig {
        base_url: args.base_url,
        style: args.style,
        aspect_ratio: args.aspect_ratio,
        poll_secs: args.poll_secs.max(1),
    }
}
