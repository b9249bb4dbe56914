use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod render;
pub mod session;
pub mod state;

pub use error::WebError;
pub use state::{AppState, WebConfig};

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/topics/:topic", post(handlers::toggle_topic))
        .route("/close-topic", post(handlers::close_topic))
        .route("/clear-analysis", post(handlers::clear_analysis))
        .route("/predict", post(handlers::predict))
        .route("/reset", post(handlers::reset))
        .route("/healthz", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("👋 Shutting down");
    }
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState, WebConfig};
    pub use bt_core::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use bt_core::{ImageClassifier, PixelBatch, Prediction};
    use bt_inference::models::DummyClassifier;
    use bt_inference::{Engine, FeatureExtractorConfig};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    const BOUNDARY: &str = "bt-test-boundary";

    #[derive(Debug)]
    struct BrokenClassifier;

    impl ImageClassifier for BrokenClassifier {
        fn name(&self) -> &str {
            "Broken"
        }

        fn input_size(&self) -> usize {
            224
        }

        fn classify(&self, _batch: &PixelBatch) -> bt_core::Result<Prediction> {
            Err(bt_core::Error::Inference("CUDA out of memory".to_string()))
        }
    }

    fn app_with(classifier: Arc<dyn ImageClassifier>, config: WebConfig) -> Router {
        let engine = Engine::new(classifier, FeatureExtractorConfig::default()).unwrap();
        create_app(AppState::new(Arc::new(engine), config))
    }

    fn app() -> Router {
        app_with(Arc::new(DummyClassifier::new()), WebConfig::default())
    }

    fn black_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(300, 200))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, file_name, content_type
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload(cookie: Option<&str>, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut request = Request::post("/predict").header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request
            .body(Body::from(multipart_body(file_name, content_type, bytes)))
            .unwrap()
    }

    fn post(uri: &str, cookie: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn get_page(cookie: &str) -> Request<Body> {
        Request::get("/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn cookie_of(response: &Response<Body>) -> String {
        let value = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("response sets a session cookie")
            .to_str()
            .unwrap();
        value.split(';').next().unwrap().to_string()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_first_visit_sets_cookie() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_of(&response).starts_with("bt_session="));
        let html = body_text(response).await;
        assert!(html.contains("Brain Tumor Detection"));
    }

    #[tokio::test]
    async fn test_upload_then_view_result() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&response);

        let response = app.clone().oneshot(get_page(&cookie)).await.unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains("banner banner-clear"));
        assert!(html.contains("No Tumor Detected"));
        assert!(html.contains("98.20%"));
        assert!(html.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_topic_toggle_keeps_prediction() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        let cookie = cookie_of(&response);

        let response = app.clone().oneshot(post("/topics/symptoms", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("id=\"topic-symptoms\""));
        assert!(html.contains("No Tumor Detected"));
        assert!(html.contains("98.20%"));

        app.clone().oneshot(post("/topics/symptoms", &cookie)).await.unwrap();
        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(!html.contains("id=\"topic-symptoms\""));
        assert!(html.contains("98.20%"));
    }

    #[tokio::test]
    async fn test_corrupt_upload_shows_error() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", b"\x89PNG\r\n\x1a\nbroken"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&response);

        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("banner banner-error"));
        assert!(!html.contains("banner banner-clear"));
        assert!(!html.contains("banner banner-tumor"));
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "notes.txt", "text/plain", b"hello"))
            .await
            .unwrap();
        let cookie = cookie_of(&response);

        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn test_oversized_upload_shows_limit() {
        let config = WebConfig {
            max_upload_bytes: 1000,
            ..WebConfig::default()
        };
        let app = app_with(Arc::new(DummyClassifier::new()), config);
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &[0u8; 5000]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&response);

        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("banner banner-error"));
        assert!(html.contains("larger than the 1000 byte upload limit"));
    }

    #[tokio::test]
    async fn test_inference_failure_hides_details() {
        let app = app_with(Arc::new(BrokenClassifier), WebConfig::default());
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&response);

        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("banner banner-error"));
        assert!(html.contains("The model could not analyze this image"));
        assert!(!html.contains("CUDA out of memory"));
    }

    #[tokio::test]
    async fn test_reveal_delay_holds_the_redirect() {
        let config = WebConfig {
            reveal_delay: Duration::from_millis(200),
            ..WebConfig::default()
        };
        let app = app_with(Arc::new(DummyClassifier::new()), config);

        let started = Instant::now();
        let response = app
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_close_topic_and_clear_result() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        let cookie = cookie_of(&response);
        app.clone().oneshot(post("/topics/diagnosis", &cookie)).await.unwrap();

        let response = app.clone().oneshot(post("/close-topic", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(!html.contains("id=\"topic-diagnosis\""));
        assert!(html.contains("98.20%"));

        app.clone().oneshot(post("/topics/diagnosis", &cookie)).await.unwrap();
        let response = app.clone().oneshot(post("/clear-analysis", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let html = body_text(app.clone().oneshot(get_page(&cookie)).await.unwrap()).await;
        assert!(html.contains("id=\"topic-diagnosis\""));
        assert!(!html.contains("98.20%"));
    }

    #[tokio::test]
    async fn test_unknown_topic_is_not_found() {
        let response = app()
            .oneshot(Request::post("/topics/astrology").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reset_discards_session() {
        let app = app();
        let response = app
            .clone()
            .oneshot(upload(None, "scan.png", "image/png", &black_png()))
            .await
            .unwrap();
        let cookie = cookie_of(&response);

        let response = app.clone().oneshot(post("/reset", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cleared = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let response = app.clone().oneshot(get_page(&cookie)).await.unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        let html = body_text(response).await;
        assert!(!html.contains("98.20%"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "Dummy");
    }
}
