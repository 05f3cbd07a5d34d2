//! Viewer and player control: show memes, play jingles and commercials.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::queue::{Meme, MemeStatus};

/// How the current meme reaches the screen.
#[derive(Debug, Clone)]
pub enum ViewerMode {
    /// A long-lived viewer was started by the launcher: repoint the
    /// symlink it displays and signal it to reload.
    SymlinkReload { pid: i32, link: PathBuf },
    /// No launcher-provided viewer: run one viewer process per image,
    /// setting it as the wallpaper.
    SpawnPerImage,
}

/// Bound on jingle/commercial playback so a wedged player cannot stall
/// the slideshow forever.
const PLAYBACK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const COMMERCIAL_POLL: Duration = Duration::from_millis(200);

pub struct Display {
    mode: ViewerMode,
    viewer_bin: String,
    player_bin: String,
    jingle: Option<PathBuf>,
    current_commercial: Arc<Mutex<Option<Child>>>,
}

impl Display {
    pub fn new(mode: ViewerMode, jingle: Option<PathBuf>) -> Self {
        Self {
            mode,
            viewer_bin: "feh".to_string(),
            player_bin: "cvlc".to_string(),
            jingle,
            current_commercial: Arc::new(Mutex::new(None)),
        }
    }

    /// Put a meme on screen. A meme seen for the first time also plays
    /// the jingle, when one is configured.
    pub async fn show_meme(&self, meme: &Meme) -> Result<()> {
        debug!(path = %meme.path.display(), status = ?meme.status, "showing meme");
        match &self.mode {
            ViewerMode::SymlinkReload { pid, link } => {
                repoint_link(link, &meme.path)?;
                kill(Pid::from_raw(*pid), Signal::SIGUSR1)
                    .with_context(|| format!("signal viewer pid {pid}"))?;
            }
            ViewerMode::SpawnPerImage => {
                let status = tokio::time::timeout(
                    PLAYBACK_TIMEOUT,
                    Command::new(&self.viewer_bin)
                        .arg(&meme.path)
                        .arg("--bg-max")
                        .stdin(Stdio::null())
                        .status(),
                )
                .await
                .context("viewer timed out")?
                .with_context(|| format!("run viewer {}", self.viewer_bin))?;
                if !status.success() {
                    warn!(path = %meme.path.display(), code = ?status.code(), "viewer exited nonzero");
                }
            }
        }

        if meme.status == MemeStatus::New
            && let Some(jingle) = &self.jingle
        {
            self.play_to_completion(&["--play-and-exit"], jingle)
                .await
                .context("play jingle")?;
        }
        Ok(())
    }

    /// Play a commercial as video wallpaper and wait for it to finish.
    ///
    /// The child is parked in a shared slot so [`Display::kill_commercial`]
    /// can interrupt it from an HTTP handler while this future waits.
    pub async fn show_commercial(&self, commercial: &Path) -> Result<()> {
        info!(path = %commercial.display(), "showing commercial");
        let child = Command::new(&self.player_bin)
            .args(["--video-wallpaper", "--play-and-exit"])
            .arg(commercial)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn player {}", self.player_bin))?;
        *self.lock_slot() = Some(child);

        let deadline = tokio::time::Instant::now() + PLAYBACK_TIMEOUT;
        loop {
            tokio::time::sleep(COMMERCIAL_POLL).await;
            let mut slot = self.lock_slot();
            let Some(child) = slot.as_mut() else {
                break;
            };
            match child.try_wait().context("wait for commercial")? {
                Some(status) => {
                    debug!(code = ?status.code(), "commercial finished");
                    *slot = None;
                    break;
                }
                None if tokio::time::Instant::now() >= deadline => {
                    warn!("commercial exceeded playback timeout, killing");
                    child.start_kill().context("kill timed-out commercial")?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Kill the currently playing commercial, if any. The waiting
    /// [`Display::show_commercial`] future reaps the child.
    pub fn kill_commercial(&self) {
        let mut slot = self.lock_slot();
        if let Some(child) = slot.as_mut() {
            info!("killing current commercial");
            if let Err(err) = child.start_kill() {
                warn!(err = %err, "failed to kill commercial");
            }
        }
    }

    async fn play_to_completion(&self, args: &[&str], media: &Path) -> Result<()> {
        let status = tokio::time::timeout(
            PLAYBACK_TIMEOUT,
            Command::new(&self.player_bin)
                .arg(media)
                .args(args)
                .stdin(Stdio::null())
                .status(),
        )
        .await
        .context("player timed out")?
        .with_context(|| format!("run player {}", self.player_bin))?;
        if !status.success() {
            warn!(media = %media.display(), code = ?status.code(), "player exited nonzero");
        }
        Ok(())
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<Child>> {
        self.current_commercial
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Repoint `link` at the absolute path of `target` (remove + relink).
pub fn repoint_link(link: &Path, target: &Path) -> Result<()> {
    let target = target
        .canonicalize()
        .unwrap_or_else(|_| target.to_path_buf());
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link).with_context(|| format!("remove {}", link.display()))?;
    }
    std::os::unix::fs::symlink(&target, link)
        .with_context(|| format!("link {} -> {}", link.display(), target.display()))?;
    Ok(())
}
