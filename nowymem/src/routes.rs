//! HTTP route handlers for the kiosk control surface.

use std::sync::LazyLock;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use minijinja::{Environment, context};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::queue::Meme;
use crate::state::{AppState, lock};
use crate::watch::ControlCommand;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// How many recently displayed memes the index page lists.
const RECENT_MEMES: usize = 10;

/// Build the kiosk router. Image files are served straight from the
/// meme directory under `/memes/`.
pub fn router(state: AppState) -> Router {
    let memes_service = ServeDir::new(&state.meme_dir);
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/last_meme", get(last_meme))
        .route("/report/{meme_name}", post(report_meme))
        .route("/kill_commercial", post(kill_commercial))
        .route("/ask_commercial", post(ask_commercial))
        .nest_service("/memes", memes_service)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// GET / - HTML page listing the recently displayed memes.
async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let memes: Vec<String> = {
        let queue = lock(&state.queue);
        queue
            .last_displayed(RECENT_MEMES)
            .iter()
            .filter_map(meme_file_name)
            .collect()
    };
    match render_index(&memes) {
        Ok(html) => Ok(Html(html)),
        Err(err) => {
            warn!(err = %err, "failed to render index");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /last_meme - file name of the most recently displayed meme.
async fn last_meme(State(state): State<AppState>) -> String {
    let queue = lock(&state.queue);
    queue
        .last_displayed(1)
        .iter()
        .filter_map(meme_file_name)
        .next_back()
        .unwrap_or_else(|| "No meme for u".to_string())
}

/// POST /report/:meme_name - block a meme from further display.
async fn report_meme(
    State(state): State<AppState>,
    Path(meme_name): Path<String>,
) -> Result<&'static str, StatusCode> {
    if !is_safe_meme_name(&meme_name) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let path = state.meme_dir.join(&meme_name);
    info!(meme = %meme_name, "meme reported");
    lock(&state.queue).block(&path);
    Ok("OK!")
}

/// POST /kill_commercial - stop the commercial currently playing.
///
/// Goes straight to the display: the watch loop is parked inside its
/// tick arm while a commercial plays, so a queued command would only be
/// handled after playback already ended.
async fn kill_commercial(State(state): State<AppState>) -> &'static str {
    state.display.kill_commercial();
    "Ok!"
}

/// POST /ask_commercial - request a commercial on the next tick.
async fn ask_commercial(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    send_control(&state, ControlCommand::ShowCommercial).await?;
    Ok("Ok!")
}

async fn send_control(state: &AppState, command: ControlCommand) -> Result<(), StatusCode> {
    state.control_tx.send(command).await.map_err(|_| {
        warn!(?command, "watch loop is gone, dropping control command");
        StatusCode::SERVICE_UNAVAILABLE
    })
}

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("index", INDEX_TEMPLATE)
        .expect("index template should be valid");
    env
});

fn render_index(memes: &[String]) -> Result<String, minijinja::Error> {
    let template = TEMPLATES.get_template("index")?;
    template.render(context! { memes => memes })
}

fn meme_file_name(meme: &Meme) -> Option<String> {
    meme.path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Reject names that could escape the meme directory.
fn is_safe_meme_name(name: &str) -> bool {
    !name.is_empty() && name != ".." && !name.contains('/') && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Display, ViewerMode};
    use crate::queue::{MemeQueue, MemeStatus};
    use crate::state::SharedQueue;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        queue: SharedQueue,
        meme_dir: PathBuf,
        control_rx: mpsc::Receiver<ControlCommand>,
        _temp: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let temp = tempfile::tempdir().expect("tempdir");
        let meme_dir = temp.path().to_path_buf();
        let queue: SharedQueue = Arc::new(Mutex::new(MemeQueue::default()));
        let (control_tx, control_rx) = mpsc::channel(8);
        let display = Arc::new(Display::new(ViewerMode::SpawnPerImage, None));
        let state = AppState::new(meme_dir.clone(), queue.clone(), control_tx, display);
        TestApp {
            router: router(state),
            queue,
            meme_dir,
            control_rx,
            _temp: temp,
        }
    }

    async fn body_string(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app();
        let (status, body) = body_string(
            app.router,
            Request::get("/health").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn last_meme_without_history_says_so() {
        let app = test_app();
        let (status, body) = body_string(
            app.router,
            Request::get("/last_meme").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "No meme for u");
    }

    #[tokio::test]
    async fn last_meme_returns_most_recent_file_name() {
        let app = test_app();
        {
            let mut queue = lock(&app.queue);
            queue.add(app.meme_dir.join("first.jpg"));
            queue.add(app.meme_dir.join("second.jpg"));
            queue.next(|_| true);
            queue.next(|_| true);
        }
        let (_, body) = body_string(
            app.router,
            Request::get("/last_meme").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(body, "first.jpg");
    }

    #[tokio::test]
    async fn index_lists_recent_memes() {
        let app = test_app();
        {
            let mut queue = lock(&app.queue);
            queue.add(app.meme_dir.join("cat.jpg"));
            queue.next(|_| true);
        }
        let (status, body) = body_string(
            app.router,
            Request::get("/").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/memes/cat.jpg"), "index should link the meme: {body}");
    }

    #[tokio::test]
    async fn report_blocks_the_meme() {
        let app = test_app();
        {
            let mut queue = lock(&app.queue);
            queue.add(app.meme_dir.join("bad.jpg"));
        }
        let (status, body) = body_string(
            app.router.clone(),
            Request::post("/report/bad.jpg").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK!");

        let statuses = lock(&app.queue).statuses();
        assert_eq!(
            statuses.get(&app.meme_dir.join("bad.jpg")),
            Some(&MemeStatus::Pending)
        );
    }

    #[tokio::test]
    async fn report_rejects_traversal_names() {
        let app = test_app();
        let (status, _) = body_string(
            app.router,
            Request::post("/report/..").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ask_commercial_queues_for_the_next_tick() {
        let mut app = test_app();
        let (status, body) = body_string(
            app.router,
            Request::post("/ask_commercial").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Ok!");
        assert_eq!(app.control_rx.try_recv(), Ok(ControlCommand::ShowCommercial));
    }

    #[tokio::test]
    async fn kill_commercial_does_not_wait_on_the_watch_loop() {
        let mut app = test_app();
        let (status, body) = body_string(
            app.router,
            Request::post("/kill_commercial").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Ok!");
        // The kill acts on the display directly; nothing is queued for
        // the loop to pick up after playback.
        assert!(app.control_rx.try_recv().is_err());
    }

    #[test]
    fn render_index_without_history_shows_placeholder() {
        let html = render_index(&[]).expect("render");
        assert!(html.contains("No meme for u"), "placeholder missing: {html}");
    }

    #[tokio::test]
    async fn memes_are_served_from_the_directory() {
        let app = test_app();
        std::fs::write(app.meme_dir.join("pic.jpg"), b"image-bytes").expect("write image");

        let (status, body) = body_string(
            app.router,
            Request::get("/memes/pic.jpg").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "image-bytes");
    }
}
