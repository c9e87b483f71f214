//! Relay behaviour against a local stand-in for the AI gateway.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use greenleaf_core::{
    constants::{SYSTEM_PROMPT, USER_INSTRUCTION},
    DiagnosisRecord, DiseaseRelay, ImageReference, RelayConfig, RelayError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const IMAGE: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

struct Gateway {
    status: StatusCode,
    body: String,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<(Option<String>, Value)>>,
}

async fn chat_completions(
    State(gw): State<Arc<Gateway>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    gw.calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let parsed = serde_json::from_str(&body).unwrap_or(Value::Null);
    *gw.last_request.lock().unwrap() = Some((auth, parsed));

    tokio::time::sleep(gw.delay).await;
    (
        gw.status,
        [(header::CONTENT_TYPE, "application/json")],
        gw.body.clone(),
    )
}

async fn spawn_gateway(status: StatusCode, body: String, delay: Duration) -> (String, Arc<Gateway>) {
    let gw = Arc::new(Gateway {
        status,
        body,
        delay,
        calls: AtomicUsize::new(0),
        last_request: Mutex::new(None),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(gw.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1/chat/completions"), gw)
}

fn completion(content: &str) -> String {
    json!({
        "choices": [ { "message": { "role": "assistant", "content": content } } ]
    })
    .to_string()
}

fn relay_for(url: &str, timeout: Duration) -> DiseaseRelay {
    let cfg = RelayConfig::new("test-key")
        .unwrap()
        .with_gateway_url(url)
        .unwrap()
        .with_timeout(timeout);
    DiseaseRelay::new(Arc::new(cfg)).unwrap()
}

async fn analyze_with(status: StatusCode, body: String) -> (Result<DiagnosisRecord, RelayError>, Arc<Gateway>) {
    let (url, gw) = spawn_gateway(status, body, Duration::ZERO).await;
    let relay = relay_for(&url, Duration::from_secs(5));
    let image = ImageReference::new(IMAGE).unwrap();
    (relay.analyze(&image).await, gw)
}

#[tokio::test]
async fn test_sends_one_request_with_prompt_image_and_credential() {
    let reply = r#"{"plantName":"Tomato","disease":"Healthy","cause":"","symptoms":"","treatment":"","prevention":""}"#;
    let (result, gw) = analyze_with(StatusCode::OK, completion(reply)).await;

    assert!(result.is_ok());
    assert_eq!(gw.calls.load(Ordering::SeqCst), 1);

    let (auth, body) = gw.last_request.lock().unwrap().clone().expect("request recorded");
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "google/gemini-2.5-flash");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"][0]["text"], USER_INSTRUCTION);
    assert_eq!(body["messages"][1]["content"][1]["type"], "image_url");
    assert_eq!(body["messages"][1]["content"][1]["image_url"]["url"], IMAGE);
}

#[tokio::test]
async fn test_well_formed_reply_is_returned_unchanged() {
    let reply = r#"{"plantName":"Tomato","disease":"Healthy","cause":"","symptoms":"","treatment":"","prevention":""}"#;
    let (result, _) = analyze_with(StatusCode::OK, completion(reply)).await;

    let record = result.expect("analysis should succeed");
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        serde_json::from_str::<Value>(reply).unwrap()
    );
}

#[tokio::test]
async fn test_fenced_reply_is_parsed() {
    let reply = "```json\n{\"plantName\":\"Potato\",\"disease\":\"Late blight\",\"cause\":\"Phytophthora infestans\",\"symptoms\":\"Dark lesions\",\"treatment\":\"Copper fungicide\",\"prevention\":\"Rotate crops\"}\n```";
    let (result, _) = analyze_with(StatusCode::OK, completion(reply)).await;

    let record = result.expect("analysis should succeed");
    assert_eq!(record.plant_name, "Potato");
    assert_eq!(record.disease, "Late blight");
    assert_eq!(record.prevention, "Rotate crops");
}

#[tokio::test]
async fn test_prose_reply_becomes_fallback_record() {
    let reply = "I think this is a maple leaf with tar spot, but the photo is blurry.";
    let (result, _) = analyze_with(StatusCode::OK, completion(reply)).await;

    assert_eq!(
        result.expect("fallback is a success"),
        DiagnosisRecord::fallback(reply)
    );
}

#[tokio::test]
async fn test_rate_limit_is_passed_through() {
    let (result, gw) = analyze_with(StatusCode::TOO_MANY_REQUESTS, "{}".into()).await;
    let err = result.expect_err("429 should fail");
    assert!(matches!(err, RelayError::RateLimited));
    assert_eq!(
        err.to_string(),
        "Rate limit exceeded. Please try again in a moment."
    );
    assert_eq!(gw.calls.load(Ordering::SeqCst), 1, "no retry");
}

#[tokio::test]
async fn test_exhausted_credits_are_passed_through() {
    let (result, _) = analyze_with(StatusCode::PAYMENT_REQUIRED, "{}".into()).await;
    let err = result.expect_err("402 should fail");
    assert!(matches!(err, RelayError::CreditsExhausted));
    assert_eq!(
        err.to_string(),
        "AI service credits exhausted. Please contact support."
    );
}

#[tokio::test]
async fn test_other_status_is_generic_failure() {
    for status in [
        StatusCode::BAD_REQUEST,
        StatusCode::UNAUTHORIZED,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::SERVICE_UNAVAILABLE,
    ] {
        let (result, _) = analyze_with(status, "upstream exploded".into()).await;
        match result {
            Err(RelayError::UpstreamStatus(code)) => assert_eq!(code, status.as_u16()),
            other => panic!("{status}: unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_empty_content_is_an_error_not_a_fallback() {
    let (result, _) = analyze_with(StatusCode::OK, completion("")).await;
    assert!(matches!(result, Err(RelayError::EmptyResponse)));

    let (result, _) = analyze_with(StatusCode::OK, json!({ "choices": [] }).to_string()).await;
    assert!(matches!(result, Err(RelayError::EmptyResponse)));
}

#[tokio::test]
async fn test_non_json_envelope_is_an_error() {
    let (result, _) = analyze_with(StatusCode::OK, "<html>gateway</html>".into()).await;
    assert!(matches!(result, Err(RelayError::InvalidEnvelope(_))));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let (url, gw) = spawn_gateway(
        StatusCode::OK,
        completion("{}"),
        Duration::from_secs(3),
    )
    .await;
    let relay = relay_for(&url, Duration::from_millis(200));
    let image = ImageReference::new(IMAGE).unwrap();

    let result = relay.analyze(&image).await;
    assert!(matches!(result, Err(RelayError::Timeout)), "{result:?}");
    assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let reply = r#"{"plantName":"Basil","disease":"Healthy"}"#;
    let (url, gw) = spawn_gateway(StatusCode::OK, completion(reply), Duration::ZERO).await;
    let relay = relay_for(&url, Duration::from_secs(5));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let relay = relay.clone();
            tokio::spawn(async move {
                let image = ImageReference::new(IMAGE).unwrap();
                relay.analyze(&image).await
            })
        })
        .collect();

    for handle in handles {
        let record = handle.await.unwrap().expect("analysis should succeed");
        assert_eq!(record.plant_name, "Basil");
    }
    assert_eq!(gw.calls.load(Ordering::SeqCst), 8);
}
