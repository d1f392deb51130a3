use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

static COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn next() -> Self {
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("task_{}_{}", Utc::now().timestamp_millis(), count))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the latest generation attempt. The result payload lives on the
/// variant, so a task never carries both an image and an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Reserved. Tasks go straight to `Generating` when created or restarted.
    Pending,
    Generating,
    Done { image_url: String },
    Error { message: String },
}

impl TaskStatus {
    pub fn is_generating(&self) -> bool {
        matches!(self, TaskStatus::Generating)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TaskStatus::Error { .. })
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            TaskStatus::Done { image_url } => Some(image_url),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            TaskStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationTask {
    pub id: TaskId,
    pub prompt: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationTask {
    pub fn new(prompt: &str) -> Self {
        Self {
            id: TaskId::next(),
            prompt: prompt.to_string(),
            status: TaskStatus::Generating,
            attempt: 1,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn ticket(&self) -> Ticket {
        Ticket {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            attempt: self.attempt,
        }
    }
}

/// One task's claim on a generation attempt. Results carrying an outdated
/// `attempt` are discarded by the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub id: TaskId,
    pub prompt: String,
    pub attempt: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task_"));
    }

    #[test]
    fn status_serializes_flat_with_payload() {
        let mut task = GenerationTask::new("a cat");
        task.status = TaskStatus::Done {
            image_url: "url-1".to_string(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "done");
        assert_eq!(value["image_url"], "url-1");
        assert!(value.get("message").is_none());

        task.status = TaskStatus::Generating;
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "generating");
        assert!(value.get("image_url").is_none());
    }
}
