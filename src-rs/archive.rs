use std::io::{Cursor, Write};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::imagegen::ImageRef;
use crate::task::{GenerationTask, TaskId};

const ENTRY_SUFFIX: &str = ".png";

#[derive(Clone, Debug, Serialize)]
pub struct SkippedImage {
    pub task_id: TaskId,
    pub entry: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
    pub skipped: Vec<SkippedImage>,
}

/// Bundles the images of finished tasks into one zip.
///
/// Entry names follow the grid: the i-th finished task is `"{i}.png"`.
/// Images that cannot be fetched are left out and listed in
/// [`Archive::skipped`]; their numbers are not reused.
pub struct ArchiveBuilder {
    client: Client,
}

impl ArchiveBuilder {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// `Ok(None)` when no task is done.
    pub async fn build(&self, tasks: &[GenerationTask]) -> Result<Option<Archive>, ArchiveError> {
        let done: Vec<(String, &TaskId, ImageRef)> = tasks
            .iter()
            .filter_map(|task| task.status.image_url().map(|url| (&task.id, ImageRef::new(url))))
            .enumerate()
            .map(|(idx, (id, image))| (format!("{}{}", idx + 1, ENTRY_SUFFIX), id, image))
            .collect();
        if done.is_empty() {
            return Ok(None);
        }

        let fetched = join_all(done.iter().map(|(_, _, image)| self.fetch(image))).await;

        let mut cursor = Cursor::new(Vec::new());
        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for ((entry, id, _), result) in done.iter().zip(fetched) {
                match result {
                    Ok(bytes) => {
                        zip.start_file(entry.as_str(), options)?;
                        zip.write_all(&bytes)?;
                        entries.push(entry.clone());
                    }
                    Err(reason) => {
                        warn!(task_id = %id, entry = %entry, "leaving image out of archive: {}", reason);
                        skipped.push(SkippedImage {
                            task_id: (*id).clone(),
                            entry: entry.clone(),
                            reason,
                        });
                    }
                }
            }
            if entries.is_empty() {
                return Err(ArchiveError::NothingFetched(done.len()));
            }
            zip.finish()?;
        }

        info!(entries = entries.len(), skipped = skipped.len(), "archive built");
        Ok(Some(Archive {
            bytes: cursor.into_inner(),
            entries,
            skipped,
        }))
    }

    /// Raw bytes behind an image reference, decoding inline data URLs
    /// without a network round trip.
    pub async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, String> {
        if image.is_inline() {
            return decode_inline(image);
        }
        let resp = self
            .client
            .get(image.as_str())
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("http {}", status.as_u16()));
        }
        let bytes = resp.bytes().await.map_err(|err| err.to_string())?;
        Ok(bytes.to_vec())
    }
}

pub fn decode_inline(image: &ImageRef) -> Result<Vec<u8>, String> {
    let (_, payload) = image
        .inline_parts()
        .ok_or_else(|| "malformed data url".to_string())?;
    STANDARD.decode(payload).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use std::io::Read;

    fn task(prompt: &str, status: TaskStatus) -> GenerationTask {
        let mut task = GenerationTask::new(prompt);
        task.status = status;
        task
    }

    fn done(payload: &[u8]) -> TaskStatus {
        TaskStatus::Done {
            image_url: ImageRef::from_base64("image/png", &STANDARD.encode(payload)).into_string(),
        }
    }

    fn builder() -> ArchiveBuilder {
        ArchiveBuilder::new(Duration::from_secs(5))
    }

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        for idx in 0..archive.len() {
            let mut file = archive.by_index(idx).unwrap();
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).unwrap();
            out.push((file.name().to_string(), buf));
        }
        out
    }

    #[tokio::test]
    async fn no_done_tasks_produces_nothing() {
        let tasks = vec![
            task("a", TaskStatus::Generating),
            task("b", TaskStatus::Error { message: "x".into() }),
        ];
        assert!(builder().build(&tasks).await.unwrap().is_none());
        assert!(builder().build(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn one_entry_per_done_task_in_grid_order() {
        let tasks = vec![
            task("a", done(b"first")),
            task("b", TaskStatus::Error { message: "x".into() }),
            task("c", TaskStatus::Generating),
            task("d", done(b"second")),
        ];
        let archive = builder().build(&tasks).await.unwrap().unwrap();
        assert_eq!(archive.entries, vec!["1.png", "2.png"]);
        assert!(archive.skipped.is_empty());

        let entries = read_entries(&archive.bytes);
        assert_eq!(entries[0], ("1.png".to_string(), b"first".to_vec()));
        assert_eq!(entries[1], ("2.png".to_string(), b"second".to_vec()));
    }

    #[tokio::test]
    async fn fetches_remote_images_and_skips_failures() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/one.png")
            .with_status(200)
            .with_body("remote")
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/two.png")
            .with_status(404)
            .create_async()
            .await;

        let tasks = vec![
            task("a", TaskStatus::Done { image_url: format!("{}/one.png", server.url()) }),
            task("b", TaskStatus::Done { image_url: format!("{}/two.png", server.url()) }),
        ];
        let archive = builder().build(&tasks).await.unwrap().unwrap();
        assert_eq!(archive.entries, vec!["1.png"]);
        assert_eq!(archive.skipped.len(), 1);
        assert_eq!(archive.skipped[0].entry, "2.png");
        assert_eq!(archive.skipped[0].task_id, tasks[1].id);

        let entries = read_entries(&archive.bytes);
        assert_eq!(entries, vec![("1.png".to_string(), b"remote".to_vec())]);
    }

    #[tokio::test]
    async fn every_fetch_failing_is_an_error() {
        let tasks = vec![task("a", TaskStatus::Done { image_url: "data:image/png;base64,@@@".into() })];
        let err = builder().build(&tasks).await.unwrap_err();
        assert!(matches!(err, ArchiveError::NothingFetched(1)));
    }
}
