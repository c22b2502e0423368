//! OpenAI-compatible clients against a mock HTTP server.

use serde_json::json;
use statute_rag::openai::{OpenAIChatModel, OpenAIClient, OpenAIEmbeddingProvider};
use statute_rag::{ChatMessage, CompletionModel, EmbeddingProvider, RagError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new("sk-test").unwrap().with_base_url(format!("{}/v1/", server.uri()))
}

#[tokio::test]
async fn embedding_maps_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": ["劳动合同"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.25, -0.5], "index": 0 }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new(client(&server));
    let embedding = provider.embed("劳动合同").await.unwrap();

    assert_eq!(embedding, vec![0.25, -0.5]);
    assert_eq!(provider.dimensions(), 1536);
}

#[tokio::test]
async fn embedding_api_error_is_embedding_call_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new(client(&server));
    let err = provider.embed("劳动合同").await.unwrap_err();

    match err {
        RagError::EmbeddingCallFailed { message, .. } => {
            assert!(message.contains("429"), "{message}");
            assert!(message.contains("Rate limit reached"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn chat_sends_messages_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                { "role": "system", "content": "instruction" },
                { "role": "user", "content": "question" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "answer" } }]
        })))
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new(client(&server));
    let reply = model
        .complete(&[ChatMessage::system("instruction"), ChatMessage::user("question")])
        .await
        .unwrap();

    assert_eq!(reply, "answer");
}

#[tokio::test]
async fn chat_failure_is_generation_call_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new(client(&server)).with_model("gpt-4o-mini");
    let err = model.complete(&[ChatMessage::user("question")]).await.unwrap_err();

    assert!(matches!(err, RagError::GenerationCallFailed { .. }), "{err}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn empty_choices_are_generation_call_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new(client(&server));
    let err = model.complete(&[ChatMessage::user("question")]).await.unwrap_err();

    assert!(matches!(err, RagError::GenerationCallFailed { .. }));
}

#[test]
fn empty_api_key_is_rejected() {
    assert!(matches!(OpenAIClient::new(""), Err(RagError::InvalidConfig(_))));
}
