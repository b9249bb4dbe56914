use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use bt_core::{Analysis, Event, InfoTopic, Prediction};
use bt_inference::preprocess::{self, ACCEPTED_EXTENSIONS};
use bt_inference::Engine;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::WebError;
use crate::render;
use crate::session::{self, Opened};
use crate::AppState;

const GENERIC_FAILURE: &str = "The model could not analyze this image. Please try again with a different scan.";
const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model: String,
    pub sessions: usize,
}

fn attach_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("could not build session cookie: {}", e),
    }
    response
}

fn finish<T>(opened: &Opened<T>, response: Response) -> Response {
    if opened.created {
        attach_cookie(response, &session::session_cookie(opened.id))
    } else {
        response
    }
}

fn back_to_page<T>(opened: &Opened<T>) -> Response {
    finish(opened, Redirect::to("/").into_response())
}

pub async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let opened = state.sessions.snapshot(session::session_id(&headers)).await;
    let page = render::render_page(&opened.value, state.engine.model_name());
    finish(&opened, Html(page).into_response())
}

pub async fn toggle_topic(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let topic: InfoTopic = slug.parse()?;
    let opened = state
        .sessions
        .apply(session::session_id(&headers), Event::ToggleTopic(topic))
        .await;
    Ok(back_to_page(&opened))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, WebError> {
    let analysis = match read_upload(&mut multipart).await {
        Ok(Some(upload)) if !upload.bytes.is_empty() => analyze_upload(&state, upload).await,
        Ok(_) => Analysis::failed("upload", "Please choose an image to upload."),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("rejected oversized upload: {}", e.body_text());
            Analysis::failed(
                "upload",
                format!(
                    "The file is larger than the {} upload limit.",
                    format_limit(state.config.max_upload_bytes)
                ),
            )
        }
        Err(e) => return Err(e.into()),
    };

    let opened = state
        .sessions
        .apply(session::session_id(&headers), Event::Analyzed(analysis))
        .await;
    Ok(back_to_page(&opened))
}

pub async fn close_topic(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let opened = state
        .sessions
        .apply(session::session_id(&headers), Event::CloseTopic)
        .await;
    back_to_page(&opened)
}

pub async fn clear_analysis(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let opened = state
        .sessions
        .apply(session::session_id(&headers), Event::ClearAnalysis)
        .await;
    back_to_page(&opened)
}

pub async fn reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session::session_id(&headers) {
        if state.sessions.remove(id).await {
            info!("🧹 Session {} closed", id);
        }
    }
    attach_cookie(Redirect::to("/").into_response(), &session::expired_cookie())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        model: state.engine.model_name().to_string(),
        sessions: state.sessions.len().await,
    })
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(Upload { file_name, content_type, bytes }));
    }
    Ok(None)
}

fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{} byte", bytes)
    }
}

fn is_accepted(upload: &Upload) -> bool {
    let by_type = upload
        .content_type
        .as_deref()
        .map(|ct| ACCEPTED_CONTENT_TYPES.iter().any(|a| a.eq_ignore_ascii_case(ct)))
        .unwrap_or(false);
    by_type || preprocess::has_accepted_extension(&upload.file_name)
}

async fn analyze_upload(state: &AppState, upload: Upload) -> Analysis {
    let file_name = if upload.file_name.is_empty() {
        "upload".to_string()
    } else {
        upload.file_name.clone()
    };

    if !is_accepted(&upload) {
        return Analysis::failed(
            file_name,
            format!("Unsupported file type. Please upload one of: {}.", ACCEPTED_EXTENSIONS.join(", ")),
        );
    }

    let engine = Arc::clone(&state.engine);
    let bytes = upload.bytes;
    let result = tokio::task::spawn_blocking(move || run_pipeline(&engine, &bytes)).await;

    if !state.config.reveal_delay.is_zero() {
        tokio::time::sleep(state.config.reveal_delay).await;
    }

    match result {
        Ok(Ok((prediction, thumbnail))) => {
            info!(
                "🔬 {} -> {} ({})",
                file_name,
                prediction.class.headline(),
                prediction.confidence_display()
            );
            Analysis::completed(file_name, thumbnail, prediction)
        }
        Ok(Err(e)) if e.is_upload_error() => {
            warn!("rejected upload {}: {}", file_name, e);
            Analysis::failed(file_name, format!("The file could not be read as an image: {}", e))
        }
        Ok(Err(e)) => {
            error!("inference failed for {}: {}", file_name, e);
            Analysis::failed(file_name, GENERIC_FAILURE)
        }
        Err(e) => {
            error!("inference task for {} did not complete: {}", file_name, e);
            Analysis::failed(file_name, GENERIC_FAILURE)
        }
    }
}

fn run_pipeline(engine: &Engine, bytes: &[u8]) -> bt_core::Result<(Prediction, Option<String>)> {
    let image = preprocess::decode_image(bytes)?;
    let thumbnail = render::thumbnail_data_uri(&image);
    let prediction = engine.predict_image(&image)?;
    Ok((prediction, thumbnail))
}
