//! HTTP API server.
//!
//! Accepts document uploads, reports job status and serves finished
//! lectures chunk by chunk. A worker runs in the same process.

use super::{open_store, parse_depth};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::LecternError;
use crate::ingest::{self, SubmitOptions};
use crate::job::JobId;
use crate::lecture::{JobView, Lecture};
use crate::library::Library;
use crate::pipeline::{self, Collaborators, SubmissionQueue, Worker};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
struct AppState {
    settings: Settings,
    library: Library,
    queue: SubmissionQueue,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    preflight::check(Operation::Process, &settings)?;

    let store = open_store(&settings)?;
    let worker = Worker::new(&settings, store.clone(), Collaborators::openai(&settings)?).polling_store();
    let (queue, receiver) = pipeline::channel();
    let recovered = pipeline::recover(store.as_ref(), &queue).await?;

    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(receiver, shutdown).await }
    });

    let state = Arc::new(AppState {
        library: Library::new(&settings, store),
        queue,
        settings,
    });
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lectern API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    if recovered > 0 {
        Output::info(&format!("Resuming {} unfinished jobs", recovered));
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Submit", "POST /jobs?filename=<name>[&title=..][&depth=..]");
    Output::kv("Job Status", "GET  /jobs/{id}");
    Output::kv("Script", "GET  /jobs/{id}/script");
    Output::kv("Audio", "GET  /jobs/{id}/audio[/{part}]");
    Output::kv("Lectures", "GET  /lectures");
    Output::kv("Lecture", "GET  /lectures/{id}");
    Output::kv("Lecture Script", "GET  /lectures/{id}/script");
    Output::kv("Chunk", "GET  /lectures/{id}/chunks/{index}");
    Output::kv("Context", "GET  /lectures/{id}/context?index=..[&window=..]");
    Output::kv("Instructions", "GET  /lectures/{id}/instructions");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Output::warning("Stopping worker after the current stage...");
    shutdown.cancel();
    worker_handle.await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.settings.extraction.max_upload_bytes()).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(submit_job))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/script", get(get_script))
        .route("/jobs/{id}/audio", get(get_audio))
        .route("/jobs/{id}/audio/{part}", get(get_audio_part))
        .route("/lectures", get(list_lectures))
        .route("/lectures/{id}", get(get_lecture))
        .route("/lectures/{id}/script", get(get_script))
        .route("/lectures/{id}/chunks/{index}", get(get_chunk))
        .route("/lectures/{id}/context", get(get_context))
        .route("/lectures/{id}/instructions", get(get_instructions))
        // Leave room above the limit so oversized uploads get a clear 400.
        .layer(DefaultBodyLimit::max(body_limit.saturating_add(1024 * 1024)))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SubmitQuery {
    filename: String,
    title: Option<String>,
    depth: Option<String>,
}

#[derive(Serialize)]
struct SubmitResponse {
    job_id: JobId,
    status: String,
}

#[derive(Deserialize)]
struct ContextQuery {
    index: usize,
    window: Option<u32>,
}

#[derive(Serialize)]
struct LectureListResponse {
    lectures: Vec<Lecture>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map a library error to a status code. Internal detail stays in the log.
fn error_response(err: LecternError) -> Response {
    let (status, message) = match &err {
        e if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
        LecternError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            error!("Request failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit_job(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubmitQuery>,
    body: Bytes,
) -> Response {
    let depth = match parse_depth(query.depth.as_deref()) {
        Ok(depth) => depth,
        Err(e) => return error_response(LecternError::InvalidInput(e.to_string())),
    };
    let options = SubmitOptions {
        title: query.title,
        depth,
    };

    let job = match ingest::submit_bytes(
        &state.settings,
        state.library.store().as_ref(),
        &query.filename,
        &body,
        options,
    )
    .await
    {
        Ok(job) => job,
        Err(e) => return error_response(e),
    };

    if let Err(e) = state.queue.enqueue(job.id.clone()) {
        return error_response(e);
    }

    (
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id,
            status: job.status.as_str().to_string(),
        }),
    )
        .into_response()
}

async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.library.job_view(&JobId::from(id)).await {
        Ok(view) => Json::<JobView>(view).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_script(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.library.script(&JobId::from(id)).await {
        Ok(script) => Json(script).into_response(),
        Err(e) => error_response(e),
    }
}

/// The playable audio: the file itself, or the `.m3u` listing of its parts.
async fn get_audio(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.library.audio(&JobId::from(id)).await {
        Ok(artifact) => file_response(artifact.path()).await,
        Err(e) => error_response(e),
    }
}

/// One part named in a playlist. Only listed parts are served.
async fn get_audio_part(
    State(state): State<Arc<AppState>>,
    Path((id, part)): Path<(String, String)>,
) -> Response {
    let artifact = match state.library.audio(&JobId::from(id)).await {
        Ok(artifact) => artifact,
        Err(e) => return error_response(e),
    };
    let listed = artifact
        .files()
        .into_iter()
        .skip(1)
        .find(|path| path.file_name().is_some_and(|name| name == part.as_str()));
    match listed {
        Some(path) => file_response(path).await,
        None => error_response(LecternError::NotFound(format!("Audio part {}", part))),
    }
}

async fn file_response(path: &std::path::Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, audio_content_type(path))], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(LecternError::NotFound("Audio file".to_string()))
        }
        Err(e) => error_response(e.into()),
    }
}

fn audio_content_type(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "m3u" => "audio/x-mpegurl",
        "mp3" => "audio/mpeg",
        "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

async fn list_lectures(State(state): State<Arc<AppState>>) -> Response {
    match state.library.lectures().await {
        Ok(lectures) => Json(LectureListResponse {
            total: lectures.len(),
            lectures,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_lecture(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.library.lecture(&JobId::from(id)).await {
        Ok(lecture) => Json(lecture).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_chunk(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> Response {
    match state.library.chunk(&JobId::from(id), index).await {
        Ok(chunk) => Json(chunk).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_context(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ContextQuery>,
) -> Response {
    match state
        .library
        .context(&JobId::from(id), query.index, query.window)
        .await
    {
        Ok(context) => Json(context).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_instructions(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.library.playback_guide(&JobId::from(id)).await {
        Ok(guide) => Json(guide).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactKind, ArtifactStore};
    use crate::job::{Job, JobStatus};
    use crate::script::{tests::sample_script, Depth};
    use crate::store::MemoryJobStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(dir: &std::path::Path) -> (Arc<AppState>, pipeline::QueueReceiver) {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.to_string_lossy().into_owned();
        let (queue, receiver) = pipeline::channel();
        let state = Arc::new(AppState {
            library: Library::new(&settings, Arc::new(MemoryJobStore::new())),
            queue,
            settings,
        });
        (state, receiver)
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_queues_and_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mut receiver) = state(dir.path());
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/jobs?filename=notes.md&depth=high")
                    .body(Body::from("Entropy always increases."))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json(response).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(body["status"], "queued");

        let queued = receiver.next(std::time::Duration::from_millis(10)).await;
        assert_eq!(queued, pipeline::Dequeue::Job(JobId::from(job_id.as_str())));

        let response = app
            .oneshot(Request::get(format!("/jobs/{}", job_id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = json(response).await;
        assert_eq!(view["status"], "queued");
        assert!(view.get("error_detail").is_none());
    }

    #[tokio::test]
    async fn test_rejects_unsupported_upload() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _receiver) = state(dir.path());

        let response = router(state)
            .oneshot(Request::post("/jobs?filename=deck.pptx").body(Body::from("x")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_lecture_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _receiver) = state(dir.path());

        let response = router(state)
            .oneshot(Request::get("/lectures/nope/chunks/0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// A finished job whose audio is a two-part playlist.
    async fn finished_job(state: &AppState, dir: &std::path::Path) -> JobId {
        let id = JobId::from("done1");
        let artifacts = ArtifactStore::new(state.settings.data_dir());
        let mut job = Job::with_id(id.clone(), dir.join("x.md"), Some("x.md".into()), "x".into(), Depth::Medium);
        job.apply(JobStatus::Extracting).unwrap();
        job.apply(JobStatus::Scripting).unwrap();
        job.script_output = Some(artifacts.write_json(ArtifactKind::Script, &id, &sample_script()).unwrap());

        std::fs::write(dir.join("done1.part1.wav"), b"one").unwrap();
        std::fs::write(dir.join("done1.part2.wav"), b"two").unwrap();
        std::fs::write(dir.join("done1.m3u"), "done1.part1.wav\ndone1.part2.wav").unwrap();
        job.audio_output = Some(dir.join("done1.m3u"));
        job.apply(JobStatus::Done).unwrap();
        state.library.store().upsert_job(&job).await.unwrap();
        id
    }

    async fn fetch(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_script_is_served_for_job_and_lecture() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _receiver) = state(dir.path());
        let id = finished_job(&state, dir.path()).await;
        let app = router(state);

        for uri in [format!("/jobs/{}/script", id), format!("/lectures/{}/script", id)] {
            let response = fetch(&app, &uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(json(response).await["title"], "Gradient Descent");
        }
        assert_eq!(fetch(&app, "/jobs/nope/script").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_playlist_audio_and_its_parts() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _receiver) = state(dir.path());
        let id = finished_job(&state, dir.path()).await;
        let app = router(state);

        let response = fetch(&app, &format!("/jobs/{}/audio", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/x-mpegurl");
        let listing = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&listing[..], b"done1.part1.wav\ndone1.part2.wav");

        let response = fetch(&app, &format!("/jobs/{}/audio/done1.part2.wav", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        assert_eq!(&to_bytes(response.into_body(), usize::MAX).await.unwrap()[..], b"two");

        let unlisted = fetch(&app, &format!("/jobs/{}/audio/x.md", id)).await;
        assert_eq!(unlisted.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_audio_before_synthesis_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _receiver) = state(dir.path());
        let job = Job::new(dir.path().join("y.md"), None, "y".into(), Depth::Low);
        state.library.store().upsert_job(&job).await.unwrap();

        let response = fetch(&router(state), &format!("/jobs/{}/audio", job.id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
