//! Shared application state for the HTTP layer and the watch loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::display::Display;
use crate::queue::MemeQueue;
use crate::watch::ControlCommand;

/// The meme queue as shared between the HTTP handlers, the watch loop,
/// and the directory watcher. Locked only for short, non-async sections.
pub type SharedQueue = Arc<Mutex<MemeQueue>>;

/// Lock the shared queue, recovering from a poisoned lock (a panicked
/// holder leaves the queue usable; worst case is one odd rotation).
pub fn lock(queue: &SharedQueue) -> MutexGuard<'_, MemeQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory the memes are served and displayed from.
    pub meme_dir: PathBuf,
    pub queue: SharedQueue,
    /// Commands for the watch loop (next-tick commercial control).
    pub control_tx: mpsc::Sender<ControlCommand>,
    /// Display shared with the watch loop; handlers that must act while
    /// the loop is mid-playback (killing a commercial) call it directly.
    pub display: Arc<Display>,
}

impl AppState {
    pub fn new(
        meme_dir: PathBuf,
        queue: SharedQueue,
        control_tx: mpsc::Sender<ControlCommand>,
        display: Arc<Display>,
    ) -> Self {
        Self {
            meme_dir,
            queue,
            control_tx,
            display,
        }
    }
}
