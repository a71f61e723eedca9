//! Invoke handlers for the chat pipelines and the direct model route

use super::types::{InvokeRequest, InvokeResponse, ModelInput, Question, RagQuestion};
use crate::{enrich::CookieEnricher, AppState, WebResult};
use axum::{extract::State, response::Json};
use axum_extra::extract::CookieJar;
use parley_core::{performance::measure_async, RequestConfig};
use parley_rag::{ChatInput, ChatOutput, ChatPipeline};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Plain chat with conversation history
pub async fn invoke_base(
    State(state): State<AppState>,
    cookies: CookieJar,
    Json(request): Json<InvokeRequest<Question>>,
) -> WebResult<Json<InvokeResponse>> {
    let InvokeRequest { input, config, .. } = request;
    run_pipeline(&state.base, ChatInput::new(input.question), &config, &cookies).await
}

/// Retrieval-augmented chat
pub async fn invoke_rag(
    State(state): State<AppState>,
    cookies: CookieJar,
    Json(request): Json<InvokeRequest<RagQuestion>>,
) -> WebResult<Json<InvokeResponse>> {
    let InvokeRequest { input, config, .. } = request;
    let input = ChatInput::new(input.question).with_filter(Value::Object(input.filter));
    run_pipeline(&state.rag, input, &config, &cookies).await
}

/// Send the input straight to the model, without prompt or history
pub async fn invoke_model(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest<ModelInput>>,
) -> WebResult<Json<InvokeResponse>> {
    let run_id = Uuid::new_v4();
    let messages = request.input.into_messages();

    info!(%run_id, messages = messages.len(), "Invoking model directly");

    let content = measure_async("invoke_model", state.model.generate(messages)).await?;
    Ok(Json(InvokeResponse::new(run_id, content)))
}

async fn run_pipeline(
    pipeline: &ChatPipeline,
    input: ChatInput,
    config: &RequestConfig,
    cookies: &CookieJar,
) -> WebResult<Json<InvokeResponse>> {
    let run_id = Uuid::new_v4();
    let enricher = CookieEnricher::new(cookies);

    let ChatOutput { content, stages } = measure_async(
        pipeline.name(),
        pipeline.invoke(input, config, &enricher),
    )
    .await?;

    info!(
        %run_id,
        pipeline = pipeline.name(),
        conversation_id = %config.conversation_id(),
        stages = ?stages
            .iter()
            .map(|s| format!("{}={}ms", s.stage, s.duration.as_millis()))
            .collect::<Vec<_>>(),
        "Pipeline invoked"
    );

    Ok(Json(InvokeResponse::new(run_id, content)))
}
