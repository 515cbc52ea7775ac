use axum::{
    extract::DefaultBodyLimit,
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{auth, exams, handlers, questions, session, students};
use crate::core::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};
use crate::core::{config::Settings, state::AppState};

/// Headroom for multipart framing on top of the archive size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn router(state: AppState) -> Router {
    let settings = state.settings();
    let cors = build_cors_layer(settings);
    let api_v1_prefix = settings.api().api_v1_str.clone();
    let uploads = ServeDir::new(&settings.storage().uploads_dir);
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest(&api_v1_prefix, api_v1_routes(settings))
        .nest_service("/uploads", uploads)
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        )
        .layer(cors);

    if settings.telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.with_state(state)
}

/// Coordinator authoring under `/exams`, `/questions`, `/choices` and
/// `/students`; the student exam flow under `/student`.
fn api_v1_routes(settings: &Settings) -> Router<AppState> {
    let body_limit = settings.import().max_upload_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .nest("/auth", auth::router())
        .nest("/exams", exams::router())
        .nest("/questions", questions::router())
        .nest("/choices", questions::choices_router())
        .nest("/students", students::router())
        .nest("/student", session::router())
        .layer(DefaultBodyLimit::max(body_limit))
}

fn request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id
    )
}

fn record_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
    let status_label = response.status().as_u16().to_string();
    metrics::counter!(HTTP_REQUESTS_TOTAL, "status" => status_label.clone()).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, "status" => status_label)
        .record(latency.as_secs_f64());
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true)
            .allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::router;
    use axum::{body::to_bytes, body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use std::sync::Arc;

    use crate::core::redis::RedisHandle;
    use crate::core::state::AppState;
    use crate::core::{config::Settings, metrics};
    use crate::services::storage::LocalImageStore;
    use crate::test_support;

    fn build_state(settings: Settings) -> AppState {
        let db =
            sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
        let redis = RedisHandle::new(settings.redis().redis_url());
        let images = Arc::new(LocalImageStore::from_settings(&settings));
        AppState::new(settings, db, redis, images)
    }

    #[tokio::test]
    async fn root_returns_message() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");

        let settings = Settings::load().expect("settings");
        let app = router(build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Examhall API");
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");

        let settings = Settings::load().expect("settings");
        let app = router(build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_returns_200() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::set_var("PROMETHEUS_ENABLED", "1");

        let settings = Settings::load().expect("settings");
        metrics::init(&settings).expect("metrics init");
        let app = router(build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn uploads_are_served_with_request_id() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");
        let uploads = tempfile::tempdir().expect("uploads dir");
        std::fs::create_dir_all(uploads.path().join("questions")).expect("questions dir");
        std::fs::write(uploads.path().join("questions/flag.png"), b"png-bytes").expect("write");
        std::env::set_var("UPLOADS_DIR", uploads.path());

        let settings = Settings::load().expect("settings");
        let app = router(build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/uploads/questions/flag.png").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"png-bytes");
    }
}
