use std::time::Duration;

use pretty_assertions::assert_eq;
use studio_core::{
    ApiRoutes, Asset, AudioToVideoRequest, GenerationRequest, JobId, MediaFailure, StatusReport,
    Submission, WeightsDirVoiceResolver,
};
use studio_engine::{
    BackendSettings, JobBackend, ReqwestBackend, SubmitError, TransportErrorKind,
    TUNNEL_WARNING_HEADER,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, settings: BackendSettings) -> ReqwestBackend {
    let routes = ApiRoutes::new(&server.uri()).expect("mock server uri");
    ReqwestBackend::new(routes, settings).expect("client")
}

fn audio_submission() -> Submission {
    GenerationRequest::AudioToVideo(AudioToVideoRequest {
        image: Some(Asset::new("face.png", &b"png-bytes"[..])),
        audio_files: vec![
            Asset::new("one.wav", &b"wav-1"[..]),
            Asset::new("two.wav", &b"wav-2"[..]),
        ],
        prompt: "A person speaking".to_string(),
    })
    .into_submission(&WeightsDirVoiceResolver::default())
    .expect("valid submission")
}

#[tokio::test]
async fn create_job_posts_multipart_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-audio-video"))
        .and(header(TUNNEL_WARNING_HEADER, "true"))
        .and(body_string_contains("name=\"image\"; filename=\"face.png\""))
        .and(body_string_contains("name=\"audio_files\"; filename=\"one.wav\""))
        .and(body_string_contains("name=\"audio_files\"; filename=\"two.wav\""))
        .and(body_string_contains("name=\"config\""))
        .and(body_string_contains("{\"prompt\":\"A person speaking\"}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "abc123",
            "status": "processing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job_id = backend(&server, BackendSettings::default())
        .create_job(&audio_submission())
        .await
        .expect("job created");
    assert_eq!(job_id, JobId::new("abc123"));
}

#[tokio::test]
async fn rejection_carries_backend_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-audio-video"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "Image and audio files are required"
        })))
        .mount(&server)
        .await;

    let err = backend(&server, BackendSettings::default())
        .create_job(&audio_submission())
        .await
        .unwrap_err();
    match err {
        SubmitError::Rejected(rejection) => {
            assert_eq!(rejection.status, 400);
            assert_eq!(rejection.detail(), "Image and audio files are required");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn created_body_without_job_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing"
        })))
        .mount(&server)
        .await;

    let err = backend(&server, BackendSettings::default())
        .create_job(&audio_submission())
        .await
        .unwrap_err();
    match err {
        SubmitError::Transport(err) => assert_eq!(err.kind, TransportErrorKind::MalformedBody),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn status_failed_prefers_message_over_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "failed",
            "message": "out of memory",
            "error": "decoder crashed"
        })))
        .mount(&server)
        .await;

    let report = backend(&server, BackendSettings::default())
        .job_status(&JobId::new("abc123"))
        .await
        .expect("status");
    assert_eq!(
        report,
        StatusReport::Failed {
            detail: "out of memory".to_string()
        }
    );
}

#[tokio::test]
async fn status_html_interstitial_is_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>tunnel warning</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let err = backend(&server, BackendSettings::default())
        .job_status(&JobId::new("abc123"))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, TransportErrorKind::NotJson { .. }));
}

#[tokio::test]
async fn status_http_error_is_reported_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "status": "not_found"
        })))
        .mount(&server)
        .await;

    let err = backend(&server, BackendSettings::default())
        .job_status(&JobId::new("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::HttpStatus(404));
}

#[tokio::test]
async fn slow_status_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({ "status": "processing" })),
        )
        .mount(&server)
        .await;

    let settings = BackendSettings {
        request_timeout: Duration::from_millis(50),
        ..BackendSettings::default()
    };
    let err = backend(&server, settings)
        .job_status(&JobId::new("slow"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::Timeout);
}

#[tokio::test]
async fn tunnel_header_can_be_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header(TUNNEL_WARNING_HEADER, "true"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "queued" })),
        )
        .mount(&server)
        .await;

    let settings = BackendSettings {
        skip_tunnel_warning: false,
        ..BackendSettings::default()
    };
    let report = backend(&server, settings)
        .job_status(&JobId::new("abc123"))
        .await
        .expect("status");
    assert_eq!(report, StatusReport::Other("queued".to_string()));
}

#[tokio::test]
async fn fetch_video_rejects_non_video_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/video/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{\"error\":\"nope\"}", "application/json"),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, BackendSettings::default());
    let url = format!("{}/api/video/abc123?t=1", server.uri());
    let err = backend.fetch_video(&url).await.unwrap_err();
    assert_eq!(err.failure, MediaFailure::UnsupportedFormat);
}

#[tokio::test]
async fn fetch_video_returns_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/video/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"mp4-bytes"[..], "video/mp4"))
        .mount(&server)
        .await;

    let backend = backend(&server, BackendSettings::default());
    let url = format!("{}/api/video/abc123?t=1", server.uri());
    let bytes = backend.fetch_video(&url).await.expect("video");
    assert_eq!(&bytes[..], b"mp4-bytes");
}

#[tokio::test]
async fn download_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "video/mp4"))
        .mount(&server)
        .await;

    let settings = BackendSettings {
        max_media_bytes: 16,
        ..BackendSettings::default()
    };
    let backend = backend(&server, settings);
    let url = format!("{}/api/download/abc123", server.uri());
    let err = backend.download(&url).await.unwrap_err();
    assert!(matches!(err.kind, TransportErrorKind::TooLarge { max_bytes: 16, .. }));
}
