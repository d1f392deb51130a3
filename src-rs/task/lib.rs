pub mod board;
pub mod types;

pub use board::{Outcome, TaskBoard};
pub use types::{GenerationTask, TaskId, TaskStatus, Ticket};
