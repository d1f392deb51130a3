use std::io::{self, Write};

use crate::models::{CLIConfig, Options, TasksResponse};

pub fn banner(cfg: &CLIConfig) {
    println!("Prompt Grid CLI");
    println!("API: {}", cfg.base_url);
    println!("Type prompts one per line, then /go. Type /help for commands.");
}

pub fn prompt(draft_len: usize) {
    if draft_len > 0 {
        print!("[{}] > ", draft_len);
    } else {
        print!("> ");
    }
    let _ = io::stdout().flush();
}

pub fn help() {
    println!("Commands:");
    println!("  <text>                 Add a prompt line to the draft");
    println!("  /go                    Generate one image per draft line");
    println!("  /draft                 Show the draft");
    println!("  /clear                 Clear the draft");
    println!("  /style <name>          Set style");
    println!("  /ratio <w:h>           Set aspect ratio");
    println!("  /options               List styles and aspect ratios");
    println!("  /tasks                 Show the grid");
    println!("  /watch                 Poll until the current run finishes");
    println!("  /regen <id|#>          Regenerate one image");
    println!("  /retry                 Regenerate every failed image");
    println!("  /download [path]       Save all finished images as a zip");
    println!("  /preview <id|#> [path] Save one image at full size");
    println!("  /config                Show current config");
    println!("  /base <url>            Update base URL");
    println!("  /help                  Show commands");
    println!("  /exit | /quit          Exit");
}

pub fn grid(listing: &TasksResponse) {
    if listing.tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for (idx, task) in listing.tasks.iter().enumerate() {
        let marker = match task.status.as_str() {
            "done" => "ok ",
            "error" => "ERR",
            "generating" => "...",
            _ => " ? ",
        };
        println!("{:>3}. [{}] {} - {}", idx + 1, marker, task.id, task.prompt);
        if let Some(message) = &task.message {
            println!("       error: {}", message);
        } else if let Some(url) = &task.image_url {
            println!("       image: {}", shorten(url));
        }
    }
    let mut actions = Vec::new();
    if listing.is_loading {
        actions.push("generating...");
    }
    if listing.has_errors {
        actions.push("/retry to regenerate failed");
    }
    if listing.has_done {
        actions.push("/download to save all");
    }
    if !actions.is_empty() {
        println!("{}", actions.join("  |  "));
    }
}

/// Inline data URLs are long; show only their header.
fn shorten(url: &str) -> String {
    if url.starts_with("data:") {
        let header = url.split(',').next().unwrap_or(url);
        format!("{},... ({} chars)", header, url.len())
    } else {
        url.to_string()
    }
}

pub fn options(opts: &Options) {
    println!("styles: {}", opts.styles.join(", "));
    println!("aspect ratios: {}", opts.aspect_ratios.join(", "));
}

pub fn draft(lines: &[String]) {
    if lines.is_empty() {
        println!("draft is empty");
        return;
    }
    for (idx, line) in lines.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, line);
    }
}

pub fn config(cfg: &CLIConfig) {
    println!("config:");
    println!("  base: {}", cfg.base_url);
    println!("  style: {}", cfg.style.clone().unwrap_or_else(|| "(service default)".to_string()));
    println!(
        "  ratio: {}",
        cfg.aspect_ratio.clone().unwrap_or_else(|| "(service default)".to_string())
    );
    println!("  poll: {}s", cfg.poll_secs);
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}
