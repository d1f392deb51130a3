#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::oneshot;

use prompt_grid_rs::imagegen::{ImageGenerator, ImageRef, ImageRequest, ProviderError};
use prompt_grid_rs::task::TaskBoard;
use prompt_grid_rs::{BatchRunner, GenerationSettings};

type Hold = (oneshot::Sender<()>, oneshot::Receiver<()>);

/// In-process generator with per-prompt scripted results.
///
/// Unscripted prompts succeed with an inline PNG data URL whose bytes are the
/// prompt text. A result is taken from the script when the call starts, so a
/// held call keeps the result it was dealt.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    holds: Mutex<HashMap<String, Hold>>,
    calls: Mutex<Vec<ImageRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn succeed(&self, prompt: &str, url: &str) {
        self.push(prompt, Ok(url.to_string()));
    }

    pub fn fail(&self, prompt: &str, message: &str) {
        self.push(prompt, Err(message.to_string()));
    }

    fn push(&self, prompt: &str, result: Result<String, String>) {
        self.script
            .lock()
            .unwrap()
            .entry(prompt.to_string())
            .or_default()
            .push_back(result);
    }

    /// Blocks the next call for `prompt` until the returned sender fires.
    /// The receiver resolves once that call has started.
    pub fn hold(&self, prompt: &str) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.holds
            .lock()
            .unwrap()
            .insert(prompt.to_string(), (started_tx, release_rx));
        (started_rx, release_tx)
    }

    pub fn calls(&self) -> Vec<ImageRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, request: ImageRequest) -> Result<ImageRef, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.clone());

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.prompt)
            .and_then(|queue| queue.pop_front());
        let hold = self.holds.lock().unwrap().remove(&request.prompt);
        if let Some((started, release)) = hold {
            let _ = started.send(());
            let _ = release.await;
        }
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(Ok(url)) => Ok(ImageRef::new(url)),
            Some(Err(message)) => Err(ProviderError::new("api_error", &message, false)),
            None => Ok(ImageRef::from_base64(
                "image/png",
                &STANDARD.encode(request.prompt.as_bytes()),
            )),
        }
    }
}

pub fn runner_with(generator: Arc<ScriptedGenerator>) -> Arc<BatchRunner> {
    Arc::new(BatchRunner::new(
        generator,
        TaskBoard::spawn(),
        GenerationSettings::default(),
    ))
}

pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Waits until no run is active and no task is still generating.
pub async fn settle(runner: &BatchRunner) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let generating = runner
                .board()
                .snapshot()
                .iter()
                .any(|t| t.status.is_generating());
            if !runner.is_busy() && !generating {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("runs did not settle");
}
