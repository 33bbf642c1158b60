use std::io::Write;
use std::path::Path;
use std::time::Duration;

use pm_optimizer::client::{connect, ChatClient};
use pm_optimizer::prompts::SYSTEM_INSTRUCTION;
use pm_optimizer::{ClientError, Credentials, Overrides, ServiceSettings, TemplateSet};
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials {
        client_id: "client-1".to_string(),
        client_pass: "pass-1".to_string(),
        client_secret: "secret-1".to_string(),
        subscription_key: "sub-key".to_string(),
    }
}

fn settings(server: &MockServer) -> ServiceSettings {
    let mut settings = ServiceSettings::direct(format!("{}/backend/", server.uri()));
    settings.application_id = 47;
    settings
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/backend/auth/token"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .and(body_partial_json(json!({
            "client_id": "client-1",
            "client_pass": "pass-1",
            "client_secret": "secret-1",
            "app_id": 47
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_conversation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/backend/chat/conversation"))
        .and(query_param("app_id", "47"))
        .and(bearer_token("tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"conversation_id": "conv-9"})),
        )
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_full_conversation_flow() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_conversation(&server).await;

    Mock::given(method("POST"))
        .and(path("/backend/chat/temp_file"))
        .and(query_param("conversation_id", "conv-9"))
        .and(query_param("app_id", "47"))
        .and(query_param("force_group", "True"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .and(bearer_token("tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/backend/chat/response"))
        .and(query_param("conversation_id", "conv-9"))
        .and(body_partial_json(json!({
            "prompt": "Analyse the file",
            "overrides": {"top_p": 1.0, "temperature": 0.0}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Executive summary\nDone."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut client = connect(&credentials(), &settings(&server)).await.unwrap();
    assert_eq!(client.conversation_id(), None);

    client.new_conversation().await.unwrap();
    assert_eq!(client.conversation_id(), Some("conv-9"));

    let mut csv = NamedTempFile::new().unwrap();
    writeln!(csv, "Order Type,Scheduled start").unwrap();
    writeln!(csv, "72FP,2024-01-02").unwrap();
    client.upload_file(csv.path()).await.unwrap();

    let response = client
        .get_response("Analyse the file", &Overrides::default(), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(response.message, "Executive summary\nDone.");
}

#[tokio::test]
async fn test_system_instruction_sent_as_prompt_override() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_conversation(&server).await;
    Mock::given(method("POST"))
        .and(path("/backend/chat/response"))
        .and(body_partial_json(json!({
            "prompt": "Summarise",
            "overrides": {
                "prompt": SYSTEM_INSTRUCTION,
                "top_p": 1.0,
                "frequency_penalty": 0.0,
                "presence_penalty": 0.0,
                "temperature": 0.0
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = connect(&credentials(), &settings(&server)).await.unwrap();
    client.new_conversation().await.unwrap();
    let overrides = Overrides::for_templates(TemplateSet::Standard);
    let response = client
        .get_response("Summarise", &overrides, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(response.message, "ok");
}

#[tokio::test]
async fn test_bad_credentials_fail_construction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/backend/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid client"))
        .mount(&server)
        .await;

    let err = connect(&credentials(), &settings(&server)).await.err().unwrap();
    match err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "invalid client");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_service_fails_construction() {
    let settings = ServiceSettings::direct("http://127.0.0.1:9");
    let err = connect(&credentials(), &settings).await.err().unwrap();
    assert!(matches!(err, ClientError::Request { .. }));
}

#[tokio::test]
async fn test_calls_require_a_conversation() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let client = connect(&credentials(), &settings(&server)).await.unwrap();
    let upload = client.upload_file(Path::new("orders.csv")).await.unwrap_err();
    assert!(matches!(upload, ClientError::NoConversation));

    let reply = client
        .get_response("hi", &Overrides::default(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(reply, ClientError::NoConversation));
}

#[tokio::test]
async fn test_missing_upload_file() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_conversation(&server).await;

    let mut client = connect(&credentials(), &settings(&server)).await.unwrap();
    client.new_conversation().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = client
        .upload_file(&dir.path().join("absent.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::File { .. }));
    assert!(err.to_string().contains("absent.csv"));
}

#[tokio::test]
async fn test_service_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_conversation(&server).await;
    Mock::given(method("POST"))
        .and(path("/backend/chat/response"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = connect(&credentials(), &settings(&server)).await.unwrap();
    client.new_conversation().await.unwrap();
    let err = client
        .get_response("hi", &Overrides::default(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { .. }));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_malformed_reply_is_decode_error() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_conversation(&server).await;
    Mock::given(method("POST"))
        .and(path("/backend/chat/response"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "wrong field"})))
        .mount(&server)
        .await;

    let mut client = connect(&credentials(), &settings(&server)).await.unwrap();
    client.new_conversation().await.unwrap();
    let err = client
        .get_response("hi", &Overrides::default(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}
