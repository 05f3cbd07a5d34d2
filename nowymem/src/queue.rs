//! Rotating meme queue with per-path statuses.
//!
//! Pure logic: the queue never touches the filesystem itself. Callers
//! supply a liveness predicate so dead entries can be pruned during
//! rotation, which keeps every transition testable without a disk.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Display status of a single meme.
///
/// `Pending` is set by the report endpoint; `Retracted` only ever enters
/// through the persisted status file (operator edit). Both block display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemeStatus {
    New,
    Normal,
    Pending,
    Retracted,
}

impl MemeStatus {
    /// Blocked memes are skipped by rotation and never displayed.
    pub fn is_blocked(self) -> bool {
        matches!(self, MemeStatus::Pending | MemeStatus::Retracted)
    }
}

/// A meme as handed to the display layer.
///
/// Carries the status the meme had when it was selected, so a first-time
/// (`New`) display can be distinguished even though the queue marks the
/// entry `Normal` at the same moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meme {
    pub path: PathBuf,
    pub status: MemeStatus,
}

/// Rotating display cycle over known memes.
///
/// Rotation takes from the back and pushes displayed entries to the
/// front. Blocked entries fall out of the cycle when encountered (their
/// status is kept); entries whose file no longer exists are forgotten
/// entirely.
#[derive(Debug, Default)]
pub struct MemeQueue {
    statuses: HashMap<PathBuf, MemeStatus>,
    cycle: VecDeque<PathBuf>,
    displayed: Vec<Meme>,
}

impl MemeQueue {
    /// Register a newly discovered path. Idempotent per path.
    pub fn add(&mut self, path: PathBuf) {
        if self.statuses.contains_key(&path) {
            return;
        }
        self.statuses.insert(path.clone(), MemeStatus::New);
        self.cycle.push_back(path);
    }

    /// Register a path found during the startup scan, seeded from the
    /// persisted status map.
    ///
    /// Blocked statuses survive restarts; everything else enters as
    /// `Normal` so the first-seen jingle does not replay on every start.
    pub fn add_seeded(&mut self, path: PathBuf, persisted: Option<MemeStatus>) {
        if self.statuses.contains_key(&path) {
            return;
        }
        let status = match persisted {
            Some(status) if status.is_blocked() => status,
            _ => MemeStatus::Normal,
        };
        self.statuses.insert(path.clone(), status);
        self.cycle.push_back(path);
    }

    /// Block a meme from display. Unknown paths are recorded too, so a
    /// report outlives the file's later appearance in the directory.
    pub fn block(&mut self, path: &Path) {
        self.statuses.insert(path.to_path_buf(), MemeStatus::Pending);
    }

    /// Select the next meme to display and rotate it to the front.
    ///
    /// `live` reports whether the path still exists on disk; dead paths
    /// are dropped. Returns `None` once the cycle is exhausted.
    pub fn next(&mut self, live: impl Fn(&Path) -> bool) -> Option<Meme> {
        loop {
            let path = self.cycle.pop_back()?;
            let status = match self.statuses.get(&path) {
                Some(status) => *status,
                None => continue,
            };
            if status.is_blocked() {
                continue;
            }
            if !live(&path) {
                self.statuses.remove(&path);
                continue;
            }

            let meme = Meme {
                path: path.clone(),
                status,
            };
            self.statuses.insert(path.clone(), MemeStatus::Normal);
            self.displayed.push(meme.clone());
            self.cycle.push_front(path);
            return Some(meme);
        }
    }

    /// Last `n` displayed memes, oldest first.
    pub fn last_displayed(&self, n: usize) -> &[Meme] {
        let start = self.displayed.len().saturating_sub(n);
        &self.displayed[start..]
    }

    /// Snapshot of every known path and its current status.
    pub fn statuses(&self) -> HashMap<PathBuf, MemeStatus> {
        self.statuses.clone()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
