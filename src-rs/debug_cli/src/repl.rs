use std::fs;
use std::io;
use std::thread;
use std::time::Duration;

use crate::client::HTTPClient;
use crate::models::{CLIConfig, GenerateRequest};
use crate::render;

const DEFAULT_ARCHIVE_PATH: &str = "images.zip";

pub struct REPL {
    pub config: CLIConfig,
    pub client: HTTPClient,
    pub draft: Vec<String>,
}

impl REPL {
    pub fn new(config: CLIConfig, client: HTTPClient) -> Self {
        Self {
            config,
            client,
            draft: Vec::new(),
        }
    }

    pub fn run(&mut self) {
        render::banner(&self.config);
        loop {
            render::prompt(self.draft.len());
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('/') {
                if self.handle_command(&line) {
                    break;
                }
                continue;
            }
            self.draft.push(line);
        }
    }

    fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("").trim_start_matches('/');
        let rest = parts.next().unwrap_or("").trim();
        match cmd {
            "exit" | "quit" => return true,
            "help" => render::help(),
            "go" => self.submit(),
            "draft" => render::draft(&self.draft),
            "clear" => {
                self.draft.clear();
                render::info("draft cleared");
            }
            "style" => {
                if rest.is_empty() {
                    render::info(&format!("style: {:?}", self.config.style));
                } else {
                    self.update_settings(None, Some(rest));
                }
            }
            "ratio" => {
                if rest.is_empty() {
                    render::info(&format!("ratio: {:?}", self.config.aspect_ratio));
                } else {
                    self.update_settings(Some(rest), None);
                }
            }
            "options" => match self.client.options() {
                Ok(opts) => render::options(&opts),
                Err(err) => render::error(&err),
            },
            "tasks" => self.show_grid(),
            "watch" => self.watch(),
            "regen" => self.regenerate(rest),
            "retry" => self.retry_failed(),
            "download" => {
                let path = if rest.is_empty() { DEFAULT_ARCHIVE_PATH } else { rest };
                self.download(path);
            }
            "preview" => {
                let mut args = rest.split_whitespace();
                match args.next() {
                    Some(target) => self.preview(target, args.next()),
                    None => render::error("usage: /preview <id|#> [path]"),
                }
            }
            "config" => render::config(&self.config),
            "base" => {
                if rest.is_empty() {
                    render::info(&format!("base: {}", self.config.base_url));
                } else {
                    self.config.base_url = rest.to_string();
                    self.client = HTTPClient::new(&self.config.base_url);
                    render::info("base url updated");
                }
            }
            _ => render::info("unknown command, type /help"),
        }
        false
    }

    fn submit(&mut self) {
        let req = GenerateRequest {
            prompts: self.draft.join("\n"),
            aspect_ratio: self.config.aspect_ratio.clone(),
            style: self.config.style.clone(),
        };
        match self.client.generate(&req) {
            Ok(resp) => {
                self.draft.clear();
                render::info(&format!("generating {} image(s)", resp.task_ids.len()));
                self.watch();
            }
            Err(err) => render::error(&err),
        }
    }

    fn update_settings(&mut self, aspect_ratio: Option<&str>, style: Option<&str>) {
        match self.client.update_settings(aspect_ratio, style) {
            Ok(settings) => {
                self.config.aspect_ratio = Some(settings.aspect_ratio.clone());
                self.config.style = Some(settings.style.clone());
                render::info(&format!(
                    "style: {}  ratio: {}",
                    settings.style, settings.aspect_ratio
                ));
            }
            Err(err) => render::error(&err),
        }
    }

    fn show_grid(&self) {
        match self.client.tasks() {
            Ok(listing) => render::grid(&listing),
            Err(err) => render::error(&err),
        }
    }

    fn watch(&self) {
        loop {
            match self.client.tasks() {
                Ok(listing) if listing.is_loading => {
                    let done = listing.tasks.iter().filter(|t| t.status != "generating").count();
                    render::info(&format!("{}/{} finished", done, listing.tasks.len()));
                }
                Ok(listing) => {
                    render::grid(&listing);
                    return;
                }
                Err(err) => {
                    render::error(&err);
                    return;
                }
            }
            thread::sleep(Duration::from_secs(self.config.poll_secs));
        }
    }

    fn regenerate(&self, target: &str) {
        let Some(id) = self.resolve_target(target) else {
            return;
        };
        match self.client.regenerate(&id) {
            Ok(_) => {
                render::info(&format!("regenerating {}", id));
                self.watch();
            }
            Err(err) => render::error(&err),
        }
    }

    fn retry_failed(&self) {
        match self.client.regenerate_failed() {
            Ok(resp) if resp.task_ids.is_empty() => render::info("no failed images"),
            Ok(resp) => {
                render::info(&format!("retrying {} image(s)", resp.task_ids.len()));
                self.watch();
            }
            Err(err) => render::error(&err),
        }
    }

    fn download(&self, path: &str) {
        match self.client.download() {
            Ok(None) => render::info("no finished images to download"),
            Ok(Some(archive)) => match fs::write(path, &archive.bytes) {
                Ok(()) => {
                    render::info(&format!("saved {} ({} bytes)", path, archive.bytes.len()));
                    if archive.skipped > 0 {
                        render::error(&format!("{} image(s) could not be fetched", archive.skipped));
                    }
                }
                Err(err) => render::error(&err.to_string()),
            },
            Err(err) => render::error(&err),
        }
    }

    fn preview(&self, target: &str, path: Option<&str>) {
        let Some(id) = self.resolve_target(target) else {
            return;
        };
        let path = path.map(str::to_string).unwrap_or_else(|| format!("{}.png", id));
        match self.client.image(&id) {
            Ok(bytes) => match fs::write(&path, &bytes) {
                Ok(()) => render::info(&format!("saved {}", path)),
                Err(err) => render::error(&err.to_string()),
            },
            Err(err) => render::error(&err),
        }
    }

    /// Accepts a task id or a 1-based grid position.
    fn resolve_target(&self, target: &str) -> Option<String> {
        if target.is_empty() {
            render::error("task id or grid number required");
            return None;
        }
        let Ok(position) = target.trim_start_matches('#').parse::<usize>() else {
            return Some(target.to_string());
        };
        match self.client.tasks() {
            Ok(listing) => match position.checked_sub(1).and_then(|i| listing.tasks.get(i)) {
                Some(task) => Some(task.id.clone()),
                None => {
                    render::error(&format!("no task at position {}", position));
                    None
                }
            },
            Err(err) => {
                render::error(&err);
                None
            }
        }
    }
}
