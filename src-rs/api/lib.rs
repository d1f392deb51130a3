pub use crate::archive::{Archive, ArchiveBuilder};
pub use crate::runner::{BatchRunner, GenerationSettings, RunReport};
pub use crate::task::{GenerationTask, TaskBoard, TaskId, TaskStatus};

pub mod handlers;
pub mod server;

pub use server::{build_router, GridServer};
