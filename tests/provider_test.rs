//! Tests for the Gemini REST client, using wiremock as the remote end.

use std::time::Duration;

use serde_json::json;
use showreel::{AspectRatio, GeminiProvider, MediaProvider, ShowreelError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> GeminiProvider {
    GeminiProvider::with_base_url("test-key", server.uri())
}

#[tokio::test]
async fn image_success_returns_data_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "imageConfig": { "aspectRatio": "16:9" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "image/png", "data": "QUJD" } }]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = provider_for(&server)
        .generate_image("noir gallery", AspectRatio::Widescreen)
        .await
        .unwrap();
    assert_eq!(payload, "data:image/png;base64,QUJD");
}

#[tokio::test]
async fn image_prompt_carries_house_style() {
    let server = MockServer::start().await;
    let styled = "Cinematic film still, 35mm anamorphic. noir gallery. \
                  High contrast, deep noir shadows, atmospheric, masterpiece quality.";
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": styled }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "data": "QUJD" } }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = provider_for(&server)
        .generate_image("noir gallery", AspectRatio::Widescreen)
        .await
        .unwrap();
    // Missing mime type falls back to image/png.
    assert_eq!(payload, "data:image/png;base64,QUJD");
}

#[tokio::test]
async fn rate_limit_maps_to_structured_error_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("anything", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(err.is_rate_limit());
    assert!(err.is_transient());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn blocked_prompt_maps_to_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("contentious", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ShowreelError::ContentFiltered { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn safety_stopped_candidate_maps_to_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("contentious", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ShowreelError::ContentFiltered { .. }));
}

#[tokio::test]
async fn missing_media_maps_to_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("anything", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ShowreelError::EmptyResponse));
}

#[tokio::test]
async fn auth_failure_maps_to_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("anything", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ShowreelError::AuthenticationFailed));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate_image("anything", AspectRatio::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ShowreelError::Api { status: 500, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn speech_returns_raw_base64() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent",
        ))
        .and(body_partial_json(json!({
            "generationConfig": { "responseModalities": ["AUDIO"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/wav", "data": "UklGRg==" } }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = provider_for(&server)
        .generate_speech("In a world...")
        .await
        .unwrap();
    assert_eq!(payload, "UklGRg==");
}
