pub mod archive;
pub mod config;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod runner;

#[path = "imagegen/lib.rs"]
pub mod imagegen;
#[path = "task/lib.rs"]
pub mod task;
#[path = "api/lib.rs"]
pub mod api;

pub use archive::{Archive, ArchiveBuilder};
pub use config::GridConfig;
pub use error::{ArchiveError, ConfigError, GridError};
pub use runner::{split_prompts, BatchRunner, GenerationSettings, RunGuard, RunReport};
