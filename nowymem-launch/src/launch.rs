//! The launch sequence: relink, spawn viewer, build the daemon handoff.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Symlink name the viewer displays.
pub const DEFAULT_LINK_NAME: &str = "meme_symlink";

/// Image the symlink points at when the kiosk starts.
pub const DEFAULT_IMAGE_NAME: &str = "nohorny.jpg";

/// Repoint `link_name` in `dir` at the absolute path of `image_name`.
///
/// The existing link is removed first. A missing link is a hard error:
/// the launcher refuses to bootstrap a directory that was never set up,
/// and fails here before any viewer is started.
///
/// Returns the absolute target the link now resolves to.
pub fn relink(dir: &Path, link_name: &str, image_name: &str) -> Result<PathBuf> {
    let link = dir.join(link_name);
    fs::remove_file(&link).with_context(|| format!("remove {}", link.display()))?;

    let target = dir
        .canonicalize()
        .with_context(|| format!("resolve {}", dir.display()))?
        .join(image_name);
    std::os::unix::fs::symlink(&target, &link)
        .with_context(|| format!("link {} -> {}", link.display(), target.display()))?;

    debug!(link = %link.display(), target = %target.display(), "relinked");
    Ok(target)
}

/// Start the viewer in the background, pointed at the link.
///
/// The child is returned for its PID and intentionally never waited on;
/// the daemon takes over its lifecycle via the PID handoff.
pub fn spawn_viewer(viewer: &str, link_name: &str) -> Result<Child> {
    let child = Command::new(viewer)
        .arg(link_name)
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn viewer {viewer}"))?;
    info!(pid = child.id(), viewer, "viewer started");
    Ok(child)
}

/// Argument vector for the daemon handoff.
///
/// The daemon contract is exactly four arguments: `--port=<port>`, the
/// home directory as the positional meme directory, `--feh-pid <pid>`,
/// and `--feh-pic-path <link>`.
pub fn daemon_args(port: u16, home: &OsStr, viewer_pid: u32, link_name: &str) -> Vec<OsString> {
    vec![
        OsString::from(format!("--port={port}")),
        home.to_os_string(),
        OsString::from("--feh-pid"),
        OsString::from(viewer_pid.to_string()),
        OsString::from("--feh-pic-path"),
        OsString::from(link_name),
    ]
}
