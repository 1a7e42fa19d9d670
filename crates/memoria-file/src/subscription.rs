//! Live subscriptions for the file store.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use memoria_core::error::{Error, RemoteErrorKind};
use memoria_core::{Result, Snapshot, StoragePath};

use crate::store::{ChangeLogEvent, FileStore};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Snapshot stream for one path of a file store.
///
/// Follows the change log with a filesystem watcher, and polls it as a
/// fallback for filesystems that do not report changes.
pub struct FileSubscription {
    inner: Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>,
}

impl FileSubscription {
    pub(crate) fn new(store: FileStore, path: StoragePath) -> Result<Self> {
        std::fs::create_dir_all(store.root()).map_err(|e| {
            Error::remote(
                RemoteErrorKind::Io,
                format!("failed to create store directory: {}", e),
            )
        })?;

        let changes_path = store.changes_path();
        let mut position = std::fs::metadata(&changes_path)
            .map(|m| m.len())
            .unwrap_or(0);

        let (wake_tx, mut wake_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else {
                return;
            };

            if !matches!(
                event.kind,
                notify::EventKind::Modify(_) | notify::EventKind::Create(_)
            ) {
                return;
            }

            let is_change_log = event
                .paths
                .iter()
                .any(|p| p.file_name().is_some_and(|n| n == "changes.jsonl"));

            if is_change_log {
                let _ = wake_tx.send(());
            }
        })
        .map_err(|e| {
            Error::remote(
                RemoteErrorKind::Io,
                format!("failed to create file watcher: {}", e),
            )
        })?;

        watcher
            .watch(store.root(), RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::remote(
                    RemoteErrorKind::Io,
                    format!("failed to watch store directory: {}", e),
                )
            })?;

        let initial = snapshot(&store, &path);

        let stream = async_stream::stream! {
            // Dropping the stream drops the watcher.
            let _watcher = watcher;

            match initial {
                Ok(snapshot) => yield Ok(snapshot),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = wake_rx.recv() => {}
                }

                let touched = match read_new_changes(&changes_path, &mut position) {
                    Ok(changes) => changes.iter().any(|change| change.overlaps(&path)),
                    Err(e) => {
                        warn!(error = %e, "Failed to read change log");
                        false
                    }
                };

                if !touched {
                    continue;
                }

                trace!(path = %path, "Change touched subscription");
                match snapshot(&store, &path) {
                    Ok(snapshot) => yield Ok(snapshot),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        debug!("Watching change log");

        Ok(Self {
            inner: Box::pin(stream),
        })
    }
}

impl Stream for FileSubscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn snapshot(store: &FileStore, path: &StoragePath) -> Result<Snapshot> {
    let value = store.read(path)?.unwrap_or_default();
    Ok(Snapshot::from_value(path.clone(), value))
}

/// Paths written since `position`, advancing it past complete lines.
fn read_new_changes(changes_path: &Path, position: &mut u64) -> std::io::Result<Vec<StoragePath>> {
    let mut file = match File::open(changes_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    file.seek(SeekFrom::Start(*position))?;
    let mut reader = BufReader::new(file);
    let mut paths = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 || !line.ends_with('\n') {
            break;
        }
        *position += read as u64;

        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChangeLogEvent>(&line) {
            Ok(event) => match StoragePath::new(&event.path) {
                Ok(path) => paths.push(path),
                Err(e) => warn!(path = %event.path, error = %e, "Bad path in change log"),
            },
            Err(e) => warn!(error = %e, "Bad change log line"),
        }
    }

    Ok(paths)
}
