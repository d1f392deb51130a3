//! Single-writer owner of the task collection.
//!
//! Every mutation is a message handled in order by one spawned task, so
//! update-by-id operations from interleaved runs never overwrite each other.
//! Readers observe the collection through a `watch` channel that is refreshed
//! after each mutation.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::types::{GenerationTask, TaskId, TaskStatus, Ticket};
use crate::error::GridError;

const COMMAND_BUFFER: usize = 64;

/// Terminal outcome reported for one ticket.
#[derive(Clone, Debug)]
pub enum Outcome {
    Done(String),
    Failed(String),
}

enum Command {
    Replace {
        prompts: Vec<String>,
        reply: oneshot::Sender<Vec<Ticket>>,
    },
    Restart {
        ids: Vec<TaskId>,
        reply: oneshot::Sender<Vec<Ticket>>,
    },
    RestartFailed {
        reply: oneshot::Sender<Vec<Ticket>>,
    },
    Resolve {
        ticket: Ticket,
        outcome: Outcome,
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Clone)]
pub struct TaskBoard {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<Vec<GenerationTask>>,
}

impl TaskBoard {
    /// Spawns the owning task on the current tokio runtime.
    pub fn spawn() -> Self {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (publish, view) = watch::channel(Vec::new());
        tokio::spawn(run_board(inbox, publish));
        Self { commands, view }
    }

    /// Discards the current collection and installs one `Generating` task per
    /// prompt, in order.
    pub async fn replace(&self, prompts: Vec<String>) -> Result<Vec<Ticket>, GridError> {
        self.request(|reply| Command::Replace { prompts, reply }).await
    }

    /// Resets the given tasks to `Generating`. Ids not on the board are
    /// skipped; the returned tickets cover only tasks that were found.
    pub async fn restart(&self, ids: Vec<TaskId>) -> Result<Vec<Ticket>, GridError> {
        self.request(|reply| Command::Restart { ids, reply }).await
    }

    /// Snapshots every task in `Error` and resets exactly those to
    /// `Generating` in one step.
    pub async fn restart_failed(&self) -> Result<Vec<Ticket>, GridError> {
        self.request(|reply| Command::RestartFailed { reply }).await
    }

    /// Applies a terminal outcome. Returns `false` when the ticket is stale:
    /// the task was replaced, restarted since, or already resolved.
    pub async fn resolve(&self, ticket: Ticket, outcome: Outcome) -> Result<bool, GridError> {
        self.request(|reply| Command::Resolve {
            ticket,
            outcome,
            reply,
        })
        .await
    }

    pub fn snapshot(&self) -> Vec<GenerationTask> {
        self.view.borrow().clone()
    }

    pub fn get(&self, id: &TaskId) -> Option<GenerationTask> {
        self.view.borrow().iter().find(|task| &task.id == id).cloned()
    }

    /// Receiver that wakes on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<GenerationTask>> {
        self.view.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, GridError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| GridError::BoardClosed)?;
        rx.await.map_err(|_| GridError::BoardClosed)
    }
}

async fn run_board(
    mut inbox: mpsc::Receiver<Command>,
    publish: watch::Sender<Vec<GenerationTask>>,
) {
    let mut tasks: Vec<GenerationTask> = Vec::new();
    while let Some(command) = inbox.recv().await {
        let changed = match command {
            Command::Replace { prompts, reply } => {
                tasks = prompts.iter().map(|p| GenerationTask::new(p)).collect();
                let _ = reply.send(tasks.iter().map(GenerationTask::ticket).collect());
                true
            }
            Command::Restart { ids, reply } => {
                let wanted: HashSet<TaskId> = ids.into_iter().collect();
                let tickets = restart_where(&mut tasks, |task| wanted.contains(&task.id));
                let changed = !tickets.is_empty();
                let _ = reply.send(tickets);
                changed
            }
            Command::RestartFailed { reply } => {
                let tickets = restart_where(&mut tasks, |task| task.status.is_error());
                let changed = !tickets.is_empty();
                let _ = reply.send(tickets);
                changed
            }
            Command::Resolve {
                ticket,
                outcome,
                reply,
            } => {
                let applied = apply_outcome(&mut tasks, &ticket, outcome);
                let _ = reply.send(applied);
                applied
            }
        };
        if changed {
            publish.send_replace(tasks.clone());
        }
    }
    debug!("task board stopped");
}

fn restart_where(
    tasks: &mut [GenerationTask],
    predicate: impl Fn(&GenerationTask) -> bool,
) -> Vec<Ticket> {
    let mut tickets = Vec::new();
    for task in tasks.iter_mut().filter(|task| predicate(&**task)) {
        task.status = TaskStatus::Generating;
        task.attempt += 1;
        task.completed_at = None;
        tickets.push(task.ticket());
    }
    tickets
}

fn apply_outcome(tasks: &mut [GenerationTask], ticket: &Ticket, outcome: Outcome) -> bool {
    let Some(task) = tasks.iter_mut().find(|task| task.id == ticket.id) else {
        debug!(task_id = %ticket.id, "result for a task no longer on the board");
        return false;
    };
    if task.attempt != ticket.attempt || !task.status.is_generating() {
        warn!(
            task_id = %ticket.id,
            attempt = ticket.attempt,
            current = task.attempt,
            "discarding stale generation result"
        );
        return false;
    }
    task.status = match outcome {
        Outcome::Done(image_url) => TaskStatus::Done { image_url },
        Outcome::Failed(message) => TaskStatus::Error { message },
    };
    task.completed_at = Some(Utc::now());
    true
}
