//! Router-level tests for the invoke endpoints

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use helpers::{test_state, ScriptedModel};
use parley_core::{ChatMessage, ConversationKey, MessageRole};
use parley_rag::MessageLogStore;
use parley_web::create_app;
use serde_json::{json, Value};
use tower::ServiceExt;

fn invoke(route: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/{route}/invoke"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = cookie {
        builder = builder.header(header::COOKIE, format!("user_id={user_id}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn question(text: &str, conversation_id: &str) -> Value {
    json!({
        "input": {"question": text},
        "config": {"configurable": {"conversation_id": conversation_id}},
        "kwargs": {}
    })
}

#[tokio::test]
async fn test_base_invoke_returns_ai_message() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let (status, body) = send(&app, invoke("base", Some("alice"), question("hi", "1"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"]["type"], "ai");
    assert_eq!(body["output"]["content"], "reply 1 to: hi");
    let run_id = body["metadata"]["run_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(run_id).is_ok());
}

#[tokio::test]
async fn test_base_invoke_without_cookie_is_rejected() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let (status, body) = send(&app, invoke("base", None, question("hi", "1"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_identity");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Please set a cookie named 'user_id'"));
    assert!(body["error_id"].is_string());
    assert!(ctx.model.prompts().is_empty());
}

#[tokio::test]
async fn test_invalid_identifiers_are_rejected_before_model() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let (status, body) = send(&app, invoke("base", Some("bad%20id"), question("hi", "1"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("User ID"));

    let (status, body) = send(&app, invoke("base", Some("alice"), question("hi", "a/b"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Conversation ID"));

    // No conversation id at all falls back to the empty default
    let (status, _) = send(
        &app,
        invoke("base", Some("alice"), json!({"input": {"question": "hi"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(ctx.model.prompts().is_empty());
}

#[tokio::test]
async fn test_cookie_overrides_config_user_id() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let body = json!({
        "input": {"question": "hi"},
        "config": {"configurable": {"user_id": "mallory", "conversation_id": "1"}}
    });
    let (status, _) = send(&app, invoke("base", Some("alice"), body)).await;
    assert_eq!(status, StatusCode::OK);

    let alice = ConversationKey::new("alice", "1").unwrap();
    let mallory = ConversationKey::new("mallory", "1").unwrap();
    assert_eq!(ctx.store.load(&alice).await.unwrap().len(), 2);
    assert!(ctx.store.load(&mallory).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sequential_turns_accumulate_history() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    send(&app, invoke("base", Some("alice"), question("first", "c1"))).await;
    send(&app, invoke("base", Some("alice"), question("second", "c1"))).await;

    let key = ConversationKey::new("alice", "c1").unwrap();
    assert_eq!(
        ctx.store.load(&key).await.unwrap(),
        vec![
            ChatMessage::human("first"),
            ChatMessage::assistant("reply 1 to: first"),
            ChatMessage::human("second"),
            ChatMessage::assistant("reply 2 to: second"),
        ]
    );

    let prompts = ctx.model.prompts();
    assert_eq!(prompts[1].len(), 4);
    assert_eq!(prompts[1][0].role, MessageRole::System);
    assert_eq!(prompts[1][1], ChatMessage::human("first"));
}

#[tokio::test]
async fn test_rag_invoke_uses_filtered_context() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let body = json!({
        "input": {"question": "How long does a refund take?", "filter": {"category": "billing"}},
        "config": {"configurable": {"conversation_id": "r1"}}
    });
    let (status, body) = send(&app, invoke("rag", Some("alice"), body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"]["type"], "ai");

    let prompts = ctx.model.prompts();
    let system = &prompts[0][0].content;
    assert!(system.contains("Refunds are issued within five days.\n\nRefund requests need an order number."));
    assert!(!system.contains("Shipping"));

    let key = ConversationKey::new("alice", "r1").unwrap();
    assert_eq!(ctx.store.load(&key).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rag_invoke_without_history_needs_no_conversation_id() {
    let ctx = test_state(ScriptedModel::default(), false).await;
    let app = create_app(ctx.state.clone());

    let body = json!({"input": {"question": "password help", "filter": {}}});
    let (status, _) = send(&app, invoke("rag", Some("alice"), body)).await;
    assert_eq!(status, StatusCode::OK);

    // Still requires the cookie
    let body = json!({"input": {"question": "password help", "filter": {}}});
    let (status, _) = send(&app, invoke("rag", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rag_invoke_schema_and_filter_errors() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    // Missing filter is a schema error
    let (status, _) = send(&app, invoke("rag", Some("alice"), question("refund", "1"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body = json!({
        "input": {"question": "refund", "filter": {"category": {"$regex": "bill"}}},
        "config": {"configurable": {"conversation_id": "1"}}
    });
    let (status, body) = send(&app, invoke("rag", Some("alice"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(ctx.model.prompts().is_empty());
}

#[tokio::test]
async fn test_model_failure_maps_to_500_and_persists_nothing() {
    let ctx = test_state(
        ScriptedModel {
            fail: true,
            ..ScriptedModel::default()
        },
        true,
    )
    .await;
    let app = create_app(ctx.state.clone());

    let (status, body) = send(&app, invoke("base", Some("alice"), question("hi", "1"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "external_service_error");
    let key = ConversationKey::new("alice", "1").unwrap();
    assert!(ctx.store.load(&key).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_openai_invoke_passes_messages_through() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    let (status, body) = send(&app, invoke("openai", None, json!({"input": "ping"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"]["content"], "reply 1 to: ping");

    let body = json!({"input": [
        {"role": "system", "content": "terse"},
        {"role": "human", "content": "pong"}
    ]});
    let (status, _) = send(&app, invoke("openai", None, body)).await;
    assert_eq!(status, StatusCode::OK);

    let prompts = ctx.model.prompts();
    assert_eq!(prompts[0], vec![ChatMessage::human("ping")]);
    assert_eq!(prompts[1].len(), 2);
}

#[tokio::test]
async fn test_batch_and_playground_routes_are_not_mounted() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let app = create_app(ctx.state.clone());

    for uri in ["/base/batch", "/rag/stream", "/base/playground/"] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_prompt_mismatch_is_a_server_error() {
    let ctx = test_state(ScriptedModel::default(), true).await;
    let model: std::sync::Arc<dyn parley_rag::ChatModel> = ctx.model.clone();
    let broken = parley_rag::ChatPipeline::new(
        "base",
        parley_rag::PromptTemplate::new().human("{question} {tone}"),
        model,
    );
    let state = parley_web::AppState {
        base: std::sync::Arc::new(broken),
        ..ctx.state.clone()
    };
    let app = create_app(state);

    let (status, body) = send(&app, invoke("base", Some("alice"), question("hi", "1"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(ctx.model.prompts().is_empty());
}
