use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agora_core::{
    AgoraError, AgoraResult, ChatClient, ChatCompletion, ChatMessage, HttpManagedBackend,
    ManagedBackend, ProviderConfig, ProviderKind,
};

/// Stand-in for the managed backend in tests that only exercise the HTTP
/// variants.
struct UnreachableBackend;

#[async_trait]
impl ManagedBackend for UnreachableBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
        Err(AgoraError::Internal(
            "managed backend should not be called".to_string(),
        ))
    }
}

fn client() -> ChatClient {
    ChatClient::new(Arc::new(UnreachableBackend))
}

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a debater."),
        ChatMessage::user("Open the debate."),
    ]
}

#[tokio::test]
async fn openai_chat_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "You are a debater."},
                {"role": "user", "content": "Open the debate."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Opening statement."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::openai("sk-test").with_base_url(server.uri());
    let completion = client().chat(&conversation(), &config).await.unwrap();

    assert_eq!(completion.content, "Opening statement.");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.completion_tokens, 5);
    assert_eq!(usage.total_tokens, 17);
}

#[tokio::test]
async fn openai_missing_key_is_configuration_error() {
    let config = ProviderConfig {
        kind: ProviderKind::OpenAi,
        api_key: None,
        base_url: None,
        model: None,
    };
    let err = client().chat(&conversation(), &config).await.unwrap_err();
    assert!(matches!(err, AgoraError::MissingApiKey(ref p) if p == "openai"));
}

#[tokio::test]
async fn openai_non_success_status_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let config = ProviderConfig::openai("sk-test").with_base_url(server.uri());
    let err = client().chat(&conversation(), &config).await.unwrap_err();

    match err {
        AgoraError::ProviderStatus {
            provider,
            status,
            body,
        } => {
            assert_eq!(provider, "openai");
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn openai_missing_content_degrades_to_empty_string() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant"}}]
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::openai("sk-test").with_base_url(server.uri());
    let completion = client().chat(&conversation(), &config).await.unwrap();

    assert_eq!(completion.content, "");
    assert!(completion.usage.is_none());
}

#[tokio::test]
async fn anthropic_request_shape_and_response_parse() {
    let server = MockServer::start().await;

    // System turn moves to the dedicated field; max_tokens is mandatory.
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "max_tokens": 4096,
            "system": "You are a debater.",
            "messages": [{"role": "user", "content": "Open the debate."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Claude opens."}],
            "usage": {"input_tokens": 20, "output_tokens": 6}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        kind: ProviderKind::Anthropic,
        api_key: Some("sk-ant-test".to_string()),
        base_url: Some(server.uri()),
        model: None,
    };
    let completion = client().chat(&conversation(), &config).await.unwrap();

    assert_eq!(completion.content, "Claude opens.");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 20);
    assert_eq!(usage.completion_tokens, 6);
    assert_eq!(usage.total_tokens, 26);
}

#[tokio::test]
async fn anthropic_missing_key_is_configuration_error() {
    let config = ProviderConfig {
        kind: ProviderKind::Anthropic,
        api_key: None,
        base_url: None,
        model: None,
    };
    let err = client().chat(&conversation(), &config).await.unwrap_err();
    assert!(matches!(err, AgoraError::MissingApiKey(ref p) if p == "anthropic"));
}

#[tokio::test]
async fn custom_requires_base_url() {
    let config = ProviderConfig {
        kind: ProviderKind::Custom,
        api_key: None,
        base_url: None,
        model: None,
    };
    let err = client().chat(&conversation(), &config).await.unwrap_err();
    assert!(matches!(err, AgoraError::MissingBaseUrl(ref p) if p == "custom"));
}

#[tokio::test]
async fn custom_accepts_top_level_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "default"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": "nonstandard reply"
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        kind: ProviderKind::Custom,
        api_key: None,
        base_url: Some(server.uri()),
        model: None,
    };
    let completion = client().chat(&conversation(), &config).await.unwrap();
    assert_eq!(completion.content, "nonstandard reply");
}

#[tokio::test]
async fn managed_http_backend_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "managed reply"}}]
        })))
        .mount(&server)
        .await;

    let backend = HttpManagedBackend::new(server.uri());
    let chat = ChatClient::new(Arc::new(backend));
    let completion = chat
        .chat(&conversation(), &ProviderConfig::managed())
        .await
        .unwrap();

    assert_eq!(completion.content, "managed reply");
}
