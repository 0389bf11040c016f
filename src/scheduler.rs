use crate::app::{Event, Lifecycle, Listing, Outcome, RemoveKind, Task};
use crate::engine::Engine;
use crate::model::NavigationMode;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs tasks off the UI loop. Every submitted task delivers exactly one
/// [`Event`] on the channel, in completion order.
#[derive(Clone)]
pub struct Scheduler {
    engine: Arc<dyn Engine>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Scheduler {
    pub fn new(engine: Arc<dyn Engine>, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { engine, tx }
    }

    pub fn submit(&self, task: Task) {
        debug!("task={task:?}");
        let engine = Arc::clone(&self.engine);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = run_task(engine.as_ref(), task).await;
            if tx.send(event).is_err() {
                debug!("event loop closed before task completed");
            }
        });
    }
}

async fn run_task(engine: &dyn Engine, task: Task) -> Event {
    let outcome = match task {
        Task::ScheduleTick { kind, delay } => {
            tokio::time::sleep(delay).await;
            return Event::Tick(kind);
        }
        Task::Refresh(mode) => Outcome::Refreshed {
            mode,
            result: refresh(engine, mode).await.map_err(|error| compact_error(&error)),
        },
        Task::Lifecycle { action, id } => {
            let result = match action {
                Lifecycle::Start => engine.start(&id).await,
                Lifecycle::Stop => engine.stop(&id).await,
                Lifecycle::Restart => engine.restart(&id).await,
            };
            Outcome::Lifecycle {
                action,
                result: result.map_err(|error| compact_error(&error)),
            }
        }
        Task::Remove { kind, id } => {
            let result = match kind {
                RemoveKind::Container => engine.remove_container(&id).await,
                RemoveKind::Volume => engine.remove_volume(&id).await,
                RemoveKind::Image => engine.remove_image(&id).await,
            };
            Outcome::Removed {
                kind,
                result: result.map_err(|error| compact_error(&error)),
            }
        }
        Task::FetchLogs {
            container_id,
            request,
        } => {
            let result = engine
                .fetch_logs(&container_id, request)
                .await
                .map_err(|error| compact_error(&error));
            Outcome::Logs {
                container_id,
                request,
                result,
            }
        }
        Task::Inspect { container_id } => {
            let result = engine
                .inspect(&container_id)
                .await
                .map_err(|error| compact_error(&error));
            Outcome::Inspected {
                container_id,
                result,
            }
        }
        Task::Stats { container_id } => {
            let result = engine
                .stats(&container_id)
                .await
                .map_err(|error| compact_error(&error));
            Outcome::Stats {
                container_id,
                result,
            }
        }
        Task::ReadDirectory { path } => {
            let result = read_directory(&path)
                .await
                .map_err(|error| compact_error(&error));
            Outcome::Directory { path, result }
        }
        Task::OpenBrowser { url } => {
            let result = open_browser(&url)
                .await
                .map_err(|error| compact_error(&error));
            Outcome::Browser { url, result }
        }
        Task::Shell { name, .. } => {
            warn!("shell task for {name} reached the scheduler");
            Outcome::Shell {
                name,
                result: Err("interactive shell needs the terminal".to_string()),
            }
        }
    };
    Event::Completed(outcome)
}

async fn refresh(engine: &dyn Engine, mode: NavigationMode) -> Result<Listing> {
    Ok(match mode {
        NavigationMode::Containers => Listing::Containers(engine.list_containers().await?),
        NavigationMode::Volumes => Listing::Volumes(engine.list_volumes().await?),
        NavigationMode::Images => Listing::Images(engine.list_images().await?),
        NavigationMode::Networks => Listing::Networks(engine.list_networks().await?),
    })
}

/// Sorted entry names; directories carry a trailing `/`.
async fn read_directory(path: &Path) -> Result<Vec<String>> {
    let mut reader = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .with_context(|| format!("failed to list {}", path.display()))?
    {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if is_dir {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();
    Ok(entries)
}

async fn open_browser(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let status = TokioCommand::new(opener)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to run {opener}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{opener} exited with {status}"))
    }
}

/// First line of the error plus at most two causes, on one line.
pub fn compact_error(error: &anyhow::Error) -> String {
    error
        .chain()
        .take(3)
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
