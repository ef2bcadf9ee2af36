//! RagClient against a mock backend

use futures_util::StreamExt;
use ragstream::client::{AnswerRequest, ChatBackend, RagClient};
use ragstream::{ChatSession, RagClientConfig, RagError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "support/sse_fixture.rs"]
mod support;

fn client_for(server: &MockServer) -> RagClient {
    RagClient::new(RagClientConfig::new(server.uri()).with_api_token("test-token")).unwrap()
}

#[tokio::test]
async fn chat_stream_sends_question_and_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/rag"))
        .and(header("accept", "text/event-stream"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept-encoding", "identity"))
        .and(body_json(json!({"question": "fee?", "conversationId": "c-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(support::read_fixture("basic_answer.sse"), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut body = client
        .open_answer_stream(&AnswerRequest::chat("fee?", "c-1"))
        .await
        .unwrap();
    let mut raw = Vec::new();
    while let Some(chunk) = body.next().await {
        raw.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(raw, support::read_fixture("basic_answer.sse"));
}

#[tokio::test]
async fn search_uses_search_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/search"))
        .and(body_json(json!({"query": "prepayment"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"answer\":\"ok\"}\n\ndata: [DONE]\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = ChatSession::new(client_for(&server), "c-1");
    let outcome = session
        .stream_search("prepayment")
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(outcome.answer, "ok");
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/rag"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model backend down"))
        .mount(&server)
        .await;

    let session = ChatSession::new(client_for(&server), "c-1");
    let err = session.stream_answer("q").await.unwrap_err();
    match err {
        RagError::ApiError { code, message } => {
            assert_eq!(code, 500);
            assert_eq!(message, "model backend down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!session.is_turn_in_flight());
}

#[tokio::test]
async fn history_envelope_is_unwrapped_and_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/rag/msg/list"))
        .and(query_param("conversationId", "c-42"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(support::read_fixture("history.json"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ChatSession::new(client_for(&server), "c-42");
    let messages = session.load_history().await.unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].citations().len(), 1);
    assert_eq!(
        messages[1].citations()[0].metadata["knowledge_base_name"],
        "Retail lending"
    );
}

#[tokio::test]
async fn failed_envelope_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/rag/msg/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "conversation not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).load_conversation("missing").await.unwrap_err();
    assert!(matches!(err, RagError::ApiError { ref message, .. } if message == "conversation not found"));
}

#[tokio::test]
async fn ask_end_to_end_renders_streamed_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/rag"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            support::read_fixture("crlf_with_reference.sse"),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let mut session = ChatSession::new(client_for(&server), "c-7");
    let reply = session.ask("rate?").await.unwrap().clone();
    assert_eq!(
        reply.content,
        "Rate is 4.2% [citation](1)\n\nSources: [citation](1)"
    );
    let meta = &reply.citations()[0].metadata;
    assert_eq!(meta["title"], "rates.pdf");
    assert_eq!(meta["file_name"], "rates.pdf");
    assert_eq!(meta["url"], "/document/doc-1");
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn slow_body_hits_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/rag"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"answer\":\"late\"}\n\n", "text/event-stream")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = RagClient::new(
        RagClientConfig::new(server.uri()).with_timeout(Duration::from_millis(100)),
    )
    .unwrap();
    let session = ChatSession::new(client, "c-1");
    let err = session.stream_answer("q").await.unwrap_err();
    assert!(matches!(err, RagError::TimeoutError(_)), "got {err:?}");
    assert!(err.is_transport());
}
