//! Meme directory scanning and file-watcher ingest.
//!
//! Startup does one full scan seeded from persisted statuses; after that
//! a poll watcher feeds newly created files into the queue. Directories
//! and files that vanish again are handled by the queue's own pruning
//! during rotation, so ingest stays write-only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::queue::MemeQueue;
use crate::state::SharedQueue;
use crate::store;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Scan `dir` and seed the queue, applying persisted statuses from
/// `status_file`. Returns the number of entries seeded.
///
/// The status file itself is skipped: it defaults into the working
/// directory but may be placed inside the meme directory, and must not
/// end up on screen.
pub fn seed_queue(dir: &Path, status_file: &Path, queue: &mut MemeQueue) -> Result<usize> {
    let persisted = store::load_statuses(status_file)?;
    let status_file_abs = status_file.canonicalize().ok();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read meme dir {}", dir.display()))?;

    let mut seeded = 0usize;
    for entry in entries {
        let entry = entry.with_context(|| format!("read meme dir {}", dir.display()))?;
        let path = entry.path();
        let is_status_file = path == status_file
            || (status_file_abs.is_some() && path.canonicalize().ok() == status_file_abs);
        if is_status_file {
            continue;
        }
        queue.add_seeded(path.clone(), persisted.get(&path).copied());
        seeded += 1;
    }
    Ok(seeded)
}

/// Start the directory watcher in a background task.
pub fn start_watcher(dir: PathBuf, queue: SharedQueue) {
    tokio::spawn(async move {
        if let Err(err) = run_watcher(dir, queue).await {
            warn!(err = %err, "meme directory watcher failed");
        }
    });
}

async fn run_watcher(dir: PathBuf, queue: SharedQueue) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let tx_clone = tx.clone();
    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx_clone.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(POLL_INTERVAL),
    )
    .context("create poll watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch {}", dir.display()))?;
    info!(path = %dir.display(), "watching meme directory");

    // Batch events so a burst of copies turns into one queue pass.
    let mut pending: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(POLL_INTERVAL);
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending.push(event);
            }
            _ = flush_tick.tick() => {
                if pending.is_empty() {
                    continue;
                }
                let added = {
                    let mut queue = crate::state::lock(&queue);
                    ingest_events(&dir, &pending, &mut queue)
                };
                if added > 0 {
                    debug!(added, "ingested new memes");
                }
                pending.clear();
            }
        }
    }
}

/// Apply a batch of watcher events to the queue. Returns how many paths
/// were newly registered.
fn ingest_events(dir: &Path, events: &[NotifyEvent], queue: &mut MemeQueue) -> usize {
    let before = queue.len();
    for event in events {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        for path in &event.paths {
            // Only direct children: the meme directory is watched flat.
            if path.parent() == Some(dir) {
                queue.add(path.clone());
            }
        }
    }
    queue.len() - before
}
