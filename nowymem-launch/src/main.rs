//! Kiosk launcher binary: relink, start viewer, exec the daemon.

use std::env;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nowymem_launch::launch::{
    DEFAULT_IMAGE_NAME, DEFAULT_LINK_NAME, daemon_args, relink, spawn_viewer,
};

#[derive(Parser)]
#[command(name = "nowymem-launch")]
#[command(about = "Prepare the kiosk symlink, start the viewer, hand off to the nowymem daemon")]
struct Args {
    /// Kiosk directory containing the image and the symlink.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Image the symlink is repointed at.
    #[arg(long, default_value = DEFAULT_IMAGE_NAME)]
    image: String,

    /// Symlink name the viewer displays.
    #[arg(long, default_value = DEFAULT_LINK_NAME)]
    link: String,

    /// Viewer binary to launch in the background.
    #[arg(long, default_value = "feh")]
    viewer: String,

    /// Daemon binary to exec into (resolved via PATH unless a path is given).
    #[arg(long, default_value = "nowymem")]
    server_bin: String,

    /// Port handed to the daemon.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();

    env::set_current_dir(&args.dir)
        .with_context(|| format!("enter kiosk directory {}", args.dir.display()))?;

    relink(Path::new("."), &args.link, &args.image)?;
    let viewer = spawn_viewer(&args.viewer, &args.link)?;

    let home = env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    let handoff = daemon_args(args.port, &home, viewer.id(), &args.link);

    info!(server = %args.server_bin, pid = viewer.id(), "handing off to daemon");

    // exec only returns on failure; on success the daemon's exit code
    // becomes ours.
    let err = Command::new(&args.server_bin).args(&handoff).exec();
    Err(err).with_context(|| format!("exec {}", args.server_bin))
}
