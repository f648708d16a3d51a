pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::dashboard::handlers::handle_dashboard;
use crate::generation::handlers::handle_job_events;
use crate::intake::handlers as intake;
use crate::state::AppState;
use crate::tiers::handlers as tiers;
use crate::workflow::handlers as workflow;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_cv_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Presentation
        .route("/api/v1/dashboard", get(handle_dashboard))
        .route("/api/v1/plans", get(tiers::handle_plans))
        .route(
            "/api/v1/tiers/:tier/capabilities",
            get(tiers::handle_capabilities),
        )
        // Creation workflow
        .route("/api/v1/sessions", post(workflow::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(workflow::handle_get_session).delete(workflow::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/cv",
            post(intake::handle_upload_cv).delete(intake::handle_remove_cv),
        )
        .route("/api/v1/sessions/:id/cv/:cv_id", get(intake::handle_get_cv))
        .route(
            "/api/v1/sessions/:id/preferences",
            post(workflow::handle_submit_preferences),
        )
        .route("/api/v1/sessions/:id/events", get(handle_job_events))
        .route("/api/v1/sessions/:id/restart", post(workflow::handle_restart))
        .layer(body_limit)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::tiers::handlers::TIER_HEADER;
    use crate::tiers::WATERMARK_LABEL;
    use crate::video_client::testing::ScriptedVideoService;
    use crate::video_client::VideoService;
    use crate::workflow::store::SessionStore;

    const BOUNDARY: &str = "vidcv-test-boundary";

    fn app(video: Arc<dyn VideoService>) -> Router {
        build_router(AppState {
            config: Config::for_tests(),
            video,
            sessions: SessionStore::new(),
        })
    }

    fn completing_service() -> Arc<dyn VideoService> {
        Arc::new(
            ScriptedVideoService::new("job_42")
                .then_processing(40)
                .then_completed("https://cdn.example.com/job_42.mp4"),
        )
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn upload(session_id: &str, file_name: &str, content_type: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post(format!("/api/v1/sessions/{session_id}/cv"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn submit(session_id: &str, prefs: Value) -> Request<Body> {
        Request::post(format!("/api/v1/sessions/{session_id}/preferences"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(prefs.to_string()))
            .unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = send(app, post_empty("/api/v1/sessions")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let view = json_body(response).await;
        assert_eq!(view["step"], "upload");
        view["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(&app(completing_service()), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "vidcv-api");
    }

    #[tokio::test]
    async fn test_upload_moves_session_to_questionnaire() {
        let app = app(completing_service());
        let id = create_session(&app).await;

        let response = send(&app, upload(&id, "resume.txt", "text/plain", "Senior Engineer")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["step"], "questionnaire");
        assert_eq!(view["cv"]["file_name"], "resume.txt");

        let display_url = view["cv"]["display_url"].as_str().unwrap().to_string();
        let response = send(&app, Request::get(display_url).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Senior Engineer");
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let app = app(completing_service());
        let id = create_session(&app).await;

        let response = send(&app, upload(&id, "photo.png", "image/png", "not a cv")).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");

        let response = send(&app, Request::get(format!("/api/v1/sessions/{id}")).body(Body::empty()).unwrap()).await;
        assert_eq!(json_body(response).await["step"], "upload");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app(completing_service());
        let missing = uuid::Uuid::new_v4();
        let response = send(&app, upload(&missing.to_string(), "cv.txt", "text/plain", "x")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preferences_before_upload_conflict() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        let response = send(&app, submit(&id, json!({ "jobGoal": "Engineer" }))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_free_tier_cannot_customize_style() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        send(&app, upload(&id, "cv.txt", "text/plain", "cv")).await;

        let mut request = submit(&id, json!({ "jobGoal": "Designer", "style": "bold" }));
        request.headers_mut().insert(TIER_HEADER, "free".parse().unwrap());
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duration_outside_range_rejected() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        send(&app, upload(&id, "cv.txt", "text/plain", "cv")).await;

        let response = send(&app, submit(&id, json!({ "jobGoal": "Engineer", "duration": 30 }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_flow_to_completion_and_restart() {
        let app = app(completing_service());
        let id = create_session(&app).await;

        let view = json_body(send(&app, upload(&id, "cv.txt", "text/plain", "Engineer")).await).await;
        let display_url = view["cv"]["display_url"].as_str().unwrap().to_string();

        let response = send(
            &app,
            submit(&id, json!({ "jobGoal": "Engineer", "highlights": ["Projects"] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["step"], "generating");

        tokio::time::sleep(Duration::from_secs(10)).await;

        let response = send(&app, Request::get(format!("/api/v1/sessions/{id}")).body(Body::empty()).unwrap()).await;
        let view = json_body(response).await;
        assert_eq!(view["step"], "complete");
        assert_eq!(view["job"]["status"], "completed");
        assert_eq!(view["job"]["progress"], 100);
        assert_eq!(view["result"]["video_url"], "https://cdn.example.com/job_42.mp4");
        assert!(view["result"]["qr_code_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));
        assert_eq!(view["result"]["download"]["state"], "enabled");

        // Same session viewed as free: watermark shown, QR hidden.
        let request = Request::get(format!("/api/v1/sessions/{id}"))
            .header(TIER_HEADER, "free")
            .body(Body::empty())
            .unwrap();
        let view = json_body(send(&app, request).await).await;
        assert_eq!(view["result"]["watermark"], WATERMARK_LABEL);
        assert!(view["result"]["qr_code_url"].is_null());
        assert_eq!(view["result"]["download"]["state"], "hidden");

        let dashboard = json_body(send(&app, Request::get("/api/v1/dashboard").body(Body::empty()).unwrap()).await).await;
        assert_eq!(dashboard["stats"][0]["value"], "1");
        assert_eq!(dashboard["recent_videos"][0]["title"], "Engineer");

        let response = send(&app, post_empty(&format!("/api/v1/sessions/{id}/restart"))).await;
        let view = json_body(response).await;
        assert_eq!(view["step"], "upload");
        assert!(view["cv"].is_null());
        assert!(view["preferences"].is_null());
        assert!(view["job"].is_null());
        assert!(view["result"].is_null());

        let response = send(&app, Request::get(display_url).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_stream_ends_on_terminal_state() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        send(&app, upload(&id, "cv.txt", "text/plain", "Engineer")).await;
        send(&app, submit(&id, json!({ "jobGoal": "Engineer" }))).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        let response = send(&app, Request::get(format!("/api/v1/sessions/{id}/events")).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("event: completed"));
        assert!(text.contains("job_42.mp4"));
    }

    #[tokio::test]
    async fn test_events_before_generation_conflict() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        let response = send(&app, Request::get(format!("/api/v1/sessions/{id}/events")).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = app(completing_service());
        let id = create_session(&app).await;
        let delete = Request::delete(format!("/api/v1/sessions/{id}")).body(Body::empty()).unwrap();
        assert_eq!(send(&app, delete).await.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Request::get(format!("/api/v1/sessions/{id}")).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_capabilities_and_plans() {
        let app = app(completing_service());
        let response = send(&app, Request::get("/api/v1/tiers/premium/capabilities").body(Body::empty()).unwrap()).await;
        let caps = json_body(response).await;
        assert_eq!(caps["download"]["note"], "Pro Only");

        let response = send(&app, Request::get("/api/v1/tiers/gold/capabilities").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let plans = json_body(send(&app, Request::get("/api/v1/plans").body(Body::empty()).unwrap()).await).await;
        assert_eq!(plans.as_array().unwrap().len(), 3);
        assert_eq!(plans[2]["current"], true);
    }
}
