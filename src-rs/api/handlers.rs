use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::archive::{decode_inline, ArchiveBuilder};
use crate::error::{ArchiveError, GridError};
use crate::imagegen::{AspectRatio, ImageRef, Style};
use crate::runner::{split_prompts, BatchRunner, GenerationSettings, RunGuard};
use crate::task::{GenerationTask, TaskId, Ticket};

pub struct AppState {
    pub runner: Arc<BatchRunner>,
    pub archive: ArchiveBuilder,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompts: String,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<GenerationTask>,
    pub is_loading: bool,
    pub has_errors: bool,
    pub has_done: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub task_ids: Vec<TaskId>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": message})))
}

fn grid_failure(err: GridError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        GridError::EmptyPrompts => StatusCode::BAD_REQUEST,
        GridError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        GridError::Busy => StatusCode::CONFLICT,
        GridError::BoardClosed => StatusCode::SERVICE_UNAVAILABLE,
        GridError::Archive(ArchiveError::NothingFetched(_)) => StatusCode::BAD_GATEWAY,
        GridError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reject(status, &err.to_string())
}

fn apply_update(mut settings: GenerationSettings, update: SettingsUpdate) -> ApiResult<GenerationSettings> {
    if let Some(raw) = update.aspect_ratio {
        settings.aspect_ratio = raw
            .parse::<AspectRatio>()
            .map_err(|err| reject(StatusCode::BAD_REQUEST, &err))?;
    }
    if let Some(raw) = update.style {
        settings.style = raw
            .parse::<Style>()
            .map_err(|err| reject(StatusCode::BAD_REQUEST, &err))?;
    }
    if let Some(provider) = update.provider {
        settings.provider = Some(provider).filter(|p| !p.trim().is_empty());
    }
    if let Some(model) = update.model {
        settings.model = Some(model).filter(|m| !m.trim().is_empty());
    }
    Ok(settings)
}

/// Runs the staged tickets in the background; the request returns as soon
/// as the board reflects the new `Generating` state. The guard moves into the
/// spawned run, so the runner stays busy across the hand-off.
fn spawn_run(
    runner: Arc<BatchRunner>,
    guard: RunGuard,
    tickets: Vec<Ticket>,
) -> Json<AcceptedResponse> {
    let task_ids = tickets.iter().map(|t| t.id.clone()).collect();
    if !tickets.is_empty() {
        tokio::spawn(async move {
            if let Err(err) = runner.run_claimed(guard, tickets).await {
                error!("run aborted: {}", err);
            }
        });
    }
    Json(AcceptedResponse { task_ids })
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn handle_options() -> Json<Value> {
    let styles: Vec<&str> = Style::ALL.iter().map(Style::as_str).collect();
    let ratios: Vec<&str> = AspectRatio::ALL.iter().map(AspectRatio::as_str).collect();
    Json(json!({"styles": styles, "aspect_ratios": ratios}))
}

pub async fn handle_get_settings(State(state): State<SharedState>) -> Json<GenerationSettings> {
    Json(state.runner.settings())
}

pub async fn handle_put_settings(
    State(state): State<SharedState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<Json<GenerationSettings>> {
    let settings = apply_update(state.runner.settings(), update)?;
    state.runner.set_settings(settings.clone());
    Ok(Json(settings))
}

pub async fn handle_tasks(State(state): State<SharedState>) -> Json<TasksResponse> {
    let tasks = state.runner.board().snapshot();
    Json(TasksResponse {
        is_loading: state.runner.is_busy(),
        has_errors: tasks.iter().any(|t| t.status.is_error()),
        has_done: tasks.iter().any(|t| t.status.is_done()),
        tasks,
    })
}

pub async fn handle_generate(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let lines = split_prompts(&req.prompts);
    if lines.is_empty() {
        return Err(grid_failure(GridError::EmptyPrompts));
    }
    let guard = state.runner.try_claim().map_err(grid_failure)?;
    let settings = apply_update(
        state.runner.settings(),
        SettingsUpdate {
            aspect_ratio: req.aspect_ratio,
            style: req.style,
            ..SettingsUpdate::default()
        },
    )?;
    state.runner.set_settings(settings);

    let tickets = state.runner.stage_submit(&lines).await.map_err(grid_failure)?;
    Ok((StatusCode::ACCEPTED, spawn_run(state.runner.clone(), guard, tickets)))
}

pub async fn handle_regenerate(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let guard = state.runner.claim();
    let ticket = state
        .runner
        .stage_regenerate_one(&TaskId::from(id))
        .await
        .map_err(grid_failure)?;
    Ok((StatusCode::ACCEPTED, spawn_run(state.runner.clone(), guard, vec![ticket])))
}

pub async fn handle_regenerate_failed(
    State(state): State<SharedState>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let guard = state.runner.try_claim().map_err(grid_failure)?;
    let tickets = state
        .runner
        .stage_regenerate_failed()
        .await
        .map_err(grid_failure)?;
    Ok((StatusCode::ACCEPTED, spawn_run(state.runner.clone(), guard, tickets)))
}

pub async fn handle_image(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = TaskId::from(id);
    let task = state
        .runner
        .board()
        .get(&id)
        .ok_or_else(|| grid_failure(GridError::TaskNotFound(id.clone())))?;
    let url = task
        .status
        .image_url()
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "image not ready"))?;

    let image = ImageRef::new(url);
    let Some((mime, _)) = image.inline_parts() else {
        return Ok(Redirect::temporary(image.as_str()).into_response());
    };
    let content_type = HeaderValue::from_str(mime)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let bytes = decode_inline(&image).map_err(|err| {
        warn!(task_id = %id, "stored image is not decodable: {}", err);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "stored image is not decodable")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    Ok((headers, bytes).into_response())
}

pub async fn handle_archive(State(state): State<SharedState>) -> ApiResult<Response> {
    let tasks = state.runner.board().snapshot();
    let archive = state
        .archive
        .build(&tasks)
        .await
        .map_err(|err| grid_failure(err.into()))?;
    let Some(archive) = archive else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"images.zip\""),
    );
    headers.insert("x-skipped-images", HeaderValue::from(archive.skipped.len()));
    Ok((headers, archive.bytes).into_response())
}
