use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct CLIConfig {
    pub base_url: String,
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
    pub poll_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub prompts: String,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptedResponse {
    pub task_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub prompt: String,
    pub status: String,
    pub image_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskInfo>,
    pub is_loading: bool,
    pub has_errors: bool,
    pub has_done: bool,
}

#[derive(Debug, Deserialize)]
pub struct Options {
    pub styles: Vec<String>,
    pub aspect_ratios: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub aspect_ratio: String,
    pub style: String,
}

/// Zip bytes plus how many finished images the service could not include.
pub struct Download {
    pub bytes: Vec<u8>,
    pub skipped: usize,
}
