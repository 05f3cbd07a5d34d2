//! Meme kiosk display daemon binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use nowymem::display::{Display, ViewerMode};
use nowymem::queue::MemeQueue;
use nowymem::state::AppState;
use nowymem::watch::WatchConfig;
use nowymem::{ingest, routes, store, watch};

#[derive(Parser)]
#[command(name = "nowymem")]
#[command(about = "Meme kiosk: rotates images onto the screen and serves a control UI")]
struct Args {
    /// Address to bind the server to.
    #[arg(long, default_value = "0.0.0.0")]
    hostname: String,

    /// Port to listen on.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Seconds each meme stays on screen.
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Directory with commercial videos; none disables commercials.
    #[arg(long)]
    commercial_dir: Option<PathBuf>,

    /// Play a commercial every N displayed items.
    #[arg(long, default_value_t = 30)]
    commercial_rate: u32,

    /// PID of a launcher-started viewer to signal on image change.
    #[arg(long)]
    feh_pid: Option<i32>,

    /// Symlink that viewer displays; repointed at the current meme.
    #[arg(long)]
    feh_pic_path: Option<PathBuf>,

    /// Persisted status file (blocked memes survive restarts).
    #[arg(long, default_value = "meme_info")]
    status_file: PathBuf,

    /// Sound played the first time a meme is shown.
    #[arg(long)]
    jingle: Option<PathBuf>,

    /// Directory containing the memes.
    directory: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nowymem=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();

    let mut queue = MemeQueue::default();
    let seeded = ingest::seed_queue(&args.directory, &args.status_file, &mut queue)
        .with_context(|| format!("seed from {}", args.directory.display()))?;
    info!(seeded, dir = %args.directory.display(), "seeded meme queue");
    let queue = Arc::new(Mutex::new(queue));

    let mode = match (args.feh_pid, args.feh_pic_path.clone()) {
        (Some(pid), Some(link)) => {
            info!(pid, link = %link.display(), "reusing launcher viewer");
            ViewerMode::SymlinkReload { pid, link }
        }
        _ => ViewerMode::SpawnPerImage,
    };
    let display = Arc::new(Display::new(mode, args.jingle.clone()));

    let (control_tx, control_rx) = tokio::sync::mpsc::channel(16);
    ingest::start_watcher(args.directory.clone(), queue.clone());

    let state = AppState::new(args.directory.clone(), queue.clone(), control_tx, display.clone());
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = routes::router(state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", args.hostname, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    let config = WatchConfig {
        duration: Duration::from_secs_f64(args.duration),
        commercial_rate: args.commercial_rate,
        commercial_dir: args.commercial_dir.clone(),
    };
    let watch_loop = watch::run_watch_loop(queue.clone(), display, config, control_rx);

    tokio::select! {
        result = axum::serve(listener, app) => result.context("serve http")?,
        result = watch_loop => result.context("watch loop")?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    // Persist statuses so reported memes stay blocked across restarts.
    let statuses = nowymem::state::lock(&queue).statuses();
    store::save_statuses(&args.status_file, &statuses)
        .with_context(|| format!("persist {}", args.status_file.display()))?;

    Ok(())
}
