//! The slideshow loop: advance the queue on a fixed cadence, interleave
//! commercials, and react to control commands from the HTTP layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::display::Display;
use crate::state::{SharedQueue, lock};

/// Commands sent from HTTP handlers to the running loop.
///
/// Only commands that wait for the next tick belong here. Killing the
/// playing commercial goes straight through [`Display::kill_commercial`]
/// instead: while a commercial plays the loop is parked inside the tick
/// arm, so a queued command would only be seen after playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Show a commercial on the next tick and restart the cadence count.
    ShowCommercial,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Time each meme stays on screen.
    pub duration: Duration,
    /// A commercial plays every `commercial_rate` displayed items.
    pub commercial_rate: u32,
    pub commercial_dir: Option<PathBuf>,
}

/// Drive the slideshow until the process shuts down.
///
/// Display failures are logged and skipped; the kiosk keeps rotating.
pub async fn run_watch_loop(
    queue: SharedQueue,
    display: Arc<Display>,
    config: WatchConfig,
    mut control_rx: mpsc::Receiver<ControlCommand>,
) -> Result<()> {
    let mut tick = tokio::time::interval(config.duration);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut shown: u32 = 1;
    let mut commercial_requested = false;

    loop {
        tokio::select! {
            Some(command) = control_rx.recv() => match command {
                ControlCommand::ShowCommercial => commercial_requested = true,
            },
            _ = tick.tick() => {
                let play_commercial = commercial_requested
                    || cadence_due(shown, config.commercial_rate, config.commercial_dir.is_some());
                if commercial_requested {
                    commercial_requested = false;
                    shown = 0;
                }

                if play_commercial {
                    show_random_commercial(&display, config.commercial_dir.as_deref()).await;
                } else {
                    let meme = lock(&queue).next(|path| path.is_file());
                    match meme {
                        Some(meme) => {
                            if let Err(err) = display.show_meme(&meme).await {
                                warn!(path = %meme.path.display(), err = %err, "failed to show meme");
                            }
                        }
                        None => debug!("meme queue empty, skipping tick"),
                    }
                }
                shown += 1;
            }
        }
    }
}

/// Whether the periodic commercial cadence fires for this display count.
fn cadence_due(shown: u32, rate: u32, has_commercials: bool) -> bool {
    has_commercials && rate > 0 && shown % rate == 0
}

async fn show_random_commercial(display: &Display, dir: Option<&Path>) {
    let Some(dir) = dir else {
        debug!("commercial requested but no commercial directory configured");
        return;
    };
    match random_commercial(dir) {
        Ok(Some(commercial)) => {
            if let Err(err) = display.show_commercial(&commercial).await {
                warn!(path = %commercial.display(), err = %err, "failed to show commercial");
            }
        }
        Ok(None) => debug!(dir = %dir.display(), "commercial directory is empty"),
        Err(err) => warn!(err = %err, "failed to pick commercial"),
    }
}

/// Pick a random file from the commercial directory.
fn random_commercial(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read commercial dir {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read commercial dir {}", dir.display()))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files.choose(&mut rand::thread_rng()).cloned())
}
