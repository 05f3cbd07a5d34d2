//! Kiosk launcher for the nowymem display daemon.
//!
//! Prepares the meme symlink in the kiosk directory, starts the image
//! viewer in the background, and replaces itself with the `nowymem`
//! daemon. Every step fails loudly: the kiosk directory is expected to
//! be set up ahead of time, and a half-configured directory should stop
//! the launch rather than start a viewer on stale state.

pub mod launch;
