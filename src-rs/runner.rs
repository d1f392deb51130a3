use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GridError;
use crate::imagegen::{AspectRatio, ImageGenerator, ImageRequest, Style};
use crate::task::{Outcome, TaskBoard, TaskId, Ticket};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub aspect_ratio: AspectRatio,
    pub style: Style,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Results dropped because the task was restarted or replaced meanwhile.
    pub stale: usize,
}

/// Splits newline-delimited input into prompts, dropping blank lines.
pub fn split_prompts(text: &str) -> Vec<String> {
    prompt_lines(text.lines())
}

/// Trims each line and keeps the non-blank ones, in order.
pub fn prompt_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct BatchRunner {
    generator: Arc<dyn ImageGenerator>,
    board: TaskBoard,
    settings: RwLock<GenerationSettings>,
    active_runs: Arc<AtomicUsize>,
}

impl BatchRunner {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        board: TaskBoard,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            board,
            settings: RwLock::new(settings),
            active_runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub fn settings(&self) -> GenerationSettings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Takes effect for every generation call issued after this returns,
    /// including the remaining tasks of a run already in progress.
    pub fn set_settings(&self, settings: GenerationSettings) {
        match self.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    /// Advisory: true from the moment a run is claimed until it finishes.
    /// Only [`BatchRunner::try_claim`] refuses to start alongside another run.
    pub fn is_busy(&self) -> bool {
        self.active_runs.load(Ordering::SeqCst) > 0
    }

    /// Marks a run as active until the guard is dropped. Take it before
    /// staging so the board never shows `Generating` tasks while idle.
    pub fn claim(&self) -> RunGuard {
        RunGuard::enter(&self.active_runs)
    }

    /// Like [`BatchRunner::claim`], but fails with `Busy` when any run is
    /// already claimed. The check and the claim are one atomic step.
    pub fn try_claim(&self) -> Result<RunGuard, GridError> {
        self.active_runs
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| GridError::Busy)?;
        Ok(RunGuard(self.active_runs.clone()))
    }

    /// Validates the lines and replaces the whole collection with a fresh
    /// batch. A blank submission leaves the board untouched.
    pub async fn stage_submit(&self, lines: &[String]) -> Result<Vec<Ticket>, GridError> {
        let prompts = prompt_lines(lines.iter().map(String::as_str));
        if prompts.is_empty() {
            return Err(GridError::EmptyPrompts);
        }
        let tickets = self.board.replace(prompts).await?;
        info!(count = tickets.len(), "new batch submitted");
        Ok(tickets)
    }

    pub async fn stage_regenerate_one(&self, id: &TaskId) -> Result<Ticket, GridError> {
        let mut tickets = self.board.restart(vec![id.clone()]).await?;
        tickets.pop().ok_or_else(|| GridError::TaskNotFound(id.clone()))
    }

    pub async fn stage_regenerate_failed(&self) -> Result<Vec<Ticket>, GridError> {
        let tickets = self.board.restart_failed().await?;
        if !tickets.is_empty() {
            info!(count = tickets.len(), "re-queued failed tasks");
        }
        Ok(tickets)
    }

    pub async fn submit(&self, lines: &[String]) -> Result<RunReport, GridError> {
        let guard = self.claim();
        let tickets = self.stage_submit(lines).await?;
        self.run_claimed(guard, tickets).await
    }

    pub async fn regenerate_one(&self, id: &TaskId) -> Result<RunReport, GridError> {
        let guard = self.claim();
        let ticket = self.stage_regenerate_one(id).await?;
        self.run_claimed(guard, vec![ticket]).await
    }

    /// No-op when nothing is in `Error`. Only the tasks failed at call time
    /// are re-run; failures produced by this run are left for the next call.
    pub async fn regenerate_failed(&self) -> Result<RunReport, GridError> {
        let guard = self.claim();
        let tickets = self.stage_regenerate_failed().await?;
        if tickets.is_empty() {
            return Ok(RunReport::default());
        }
        self.run_claimed(guard, tickets).await
    }

    /// Generates each ticket in order, one call at a time. Provider failures
    /// become task state; only a closed board aborts the run.
    pub async fn run(&self, tickets: Vec<Ticket>) -> Result<RunReport, GridError> {
        self.run_claimed(self.claim(), tickets).await
    }

    /// [`BatchRunner::run`] under a guard claimed before staging. The guard
    /// is released when the last ticket resolves.
    pub async fn run_claimed(
        &self,
        guard: RunGuard,
        tickets: Vec<Ticket>,
    ) -> Result<RunReport, GridError> {
        let _guard = guard;
        let mut report = RunReport::default();

        for ticket in tickets {
            let settings = self.settings();
            let request = ImageRequest {
                prompt: ticket.prompt.clone(),
                aspect_ratio: settings.aspect_ratio,
                style: settings.style,
                model: settings.model,
                provider: settings.provider,
            };
            debug!(task_id = %ticket.id, attempt = ticket.attempt, "generating image");

            let outcome = match self.generator.generate(request).await {
                Ok(image) => Outcome::Done(image.into_string()),
                Err(err) => {
                    warn!(task_id = %ticket.id, code = %err.code, "generation failed: {}", err.message);
                    Outcome::Failed(err.user_message())
                }
            };
            let failed = matches!(outcome, Outcome::Failed(_));
            if !self.board.resolve(ticket, outcome).await? {
                report.stale += 1;
            } else if failed {
                report.failed += 1;
            } else {
                report.succeeded += 1;
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            stale = report.stale,
            "run finished"
        );
        Ok(report)
    }
}

/// Counts one active run for [`BatchRunner::is_busy`] while alive.
#[must_use]
pub struct RunGuard(Arc<AtomicUsize>);

impl RunGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prompts_drops_blank_lines() {
        let prompts = split_prompts("a cat\n\n   \n  a dog  \r\n");
        assert_eq!(prompts, vec!["a cat".to_string(), "a dog".to_string()]);
        assert!(split_prompts(" \n\t\n").is_empty());
    }

    #[test]
    fn prompt_lines_trims_and_keeps_order() {
        let prompts = prompt_lines(["  b ", "", "a", "\t"]);
        assert_eq!(prompts, vec!["b".to_string(), "a".to_string()]);
    }
}
