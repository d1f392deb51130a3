use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::api::handlers::{
    handle_archive, handle_generate, handle_get_settings, handle_health, handle_image,
    handle_options, handle_put_settings, handle_regenerate, handle_regenerate_failed,
    handle_tasks, AppState,
};
use crate::archive::ArchiveBuilder;
use crate::runner::BatchRunner;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/options", get(handle_options))
        .route("/settings", get(handle_get_settings).put(handle_put_settings))
        .route("/tasks", get(handle_tasks))
        .route("/generate", post(handle_generate))
        .route("/tasks/regenerate-failed", post(handle_regenerate_failed))
        .route("/tasks/:id/regenerate", post(handle_regenerate))
        .route("/tasks/:id/image", get(handle_image))
        .route("/archive", get(handle_archive))
        .with_state(state)
}

pub struct GridServer {
    pub port: u16,
    pub state: Arc<AppState>,
}

impl GridServer {
    pub fn new(port: u16, runner: Arc<BatchRunner>, archive: ArchiveBuilder) -> Self {
        Self {
            port,
            state: Arc::new(AppState { runner, archive }),
        }
    }

    pub async fn start(&self) -> Result<(), String> {
        let app = build_router(self.state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!(%addr, "prompt-grid listening");
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|err| err.to_string())
    }
}
