//! Meme kiosk display daemon.
//!
//! Rotates images from a directory onto the screen through an external
//! viewer, plays commercials at a cadence, and exposes a small HTTP
//! control surface. The architecture keeps the split the codebase uses
//! everywhere:
//!
//! - [`queue`]: pure rotation/status logic, no I/O, fully testable in
//!   isolation.
//! - [`store`], [`display`], [`ingest`]: side-effecting operations
//!   (status file, child processes and signals, filesystem watching).
//! - [`watch`], [`routes`], [`state`]: orchestration wiring the queue to
//!   the viewer loop and the HTTP handlers.

pub mod display;
pub mod ingest;
pub mod queue;
pub mod routes;
pub mod state;
pub mod store;
pub mod watch;
