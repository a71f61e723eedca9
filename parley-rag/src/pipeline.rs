//! Chat pipelines
//!
//! A pipeline runs a fixed sequence of [`Stage`]s for every call:
//!
//! ```text
//! enrich -> [load-history] -> [retrieve] -> render-prompt -> invoke-model -> [persist-turn]
//! ```
//!
//! Bracketed stages only run when the pipeline has a history resolver or a
//! retriever. Any stage failure aborts the call and later stages do not run,
//! so a failed call never writes to the message log.
//!
//! Two concurrent calls on the same conversation may both read the same
//! history and then append their turns in either order.

use crate::history::HistoryResolver;
use crate::llm_client::ChatModel;
use crate::prompt::{PromptTemplate, PromptValues, HISTORY_PLACEHOLDER};
use crate::retriever::Retriever;
use parley_core::{ChatMessage, ParleyResult, RequestConfig};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};

/// Produces the configuration a call actually runs with
pub trait ConfigEnricher: Send + Sync {
    fn enrich(&self, config: &RequestConfig) -> ParleyResult<RequestConfig>;
}

/// Runs calls with the configuration exactly as supplied
pub struct PassThrough;

impl ConfigEnricher for PassThrough {
    fn enrich(&self, config: &RequestConfig) -> ParleyResult<RequestConfig> {
        Ok(config.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enrich,
    LoadHistory,
    Retrieve,
    RenderPrompt,
    InvokeModel,
    PersistTurn,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Enrich => "enrich",
            Stage::LoadHistory => "load-history",
            Stage::Retrieve => "retrieve",
            Stage::RenderPrompt => "render-prompt",
            Stage::InvokeModel => "invoke-model",
            Stage::PersistTurn => "persist-turn",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatInput {
    pub question: String,
    /// Metadata pre-filter for retrieval; ignored by pipelines without a retriever
    pub filter: Value,
}

impl ChatInput {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            filter: Value::Object(Map::new()),
        }
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutput {
    pub content: String,
    /// Stages that ran, in order
    pub stages: Vec<StageTiming>,
}

pub struct ChatPipeline {
    name: String,
    prompt: PromptTemplate,
    model: Arc<dyn ChatModel>,
    retriever: Option<Arc<Retriever>>,
    history: Option<HistoryResolver>,
}

impl ChatPipeline {
    pub fn new(name: impl Into<String>, prompt: PromptTemplate, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            prompt,
            model,
            retriever: None,
            history: None,
        }
    }

    /// Plain chat over stored history.
    pub fn base(model: Arc<dyn ChatModel>, history: HistoryResolver) -> Self {
        Self::new("base", PromptTemplate::base_chat(), model).with_history(history)
    }

    /// Retrieval-augmented chat, with or without stored history.
    pub fn rag(
        model: Arc<dyn ChatModel>,
        retriever: Arc<Retriever>,
        history: Option<HistoryResolver>,
    ) -> Self {
        let pipeline = Self::new("rag", PromptTemplate::rag_chat(history.is_some()), model)
            .with_retriever(retriever);
        match history {
            Some(history) => pipeline.with_history(history),
            None => pipeline,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Load history before each call and persist the turn after it.
    pub fn with_history(mut self, history: HistoryResolver) -> Self {
        self.history = Some(history);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    /// Stages every successful call runs, in order
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Enrich];
        if self.history.is_some() {
            stages.push(Stage::LoadHistory);
        }
        if self.retriever.is_some() {
            stages.push(Stage::Retrieve);
        }
        stages.extend([Stage::RenderPrompt, Stage::InvokeModel]);
        if self.history.is_some() {
            stages.push(Stage::PersistTurn);
        }
        stages
    }

    pub async fn invoke(
        &self,
        input: ChatInput,
        config: &RequestConfig,
        enricher: &dyn ConfigEnricher,
    ) -> ParleyResult<ChatOutput> {
        let span = info_span!("pipeline", name = %self.name);
        self.run(input, config, enricher).instrument(span).await
    }

    async fn run(
        &self,
        input: ChatInput,
        config: &RequestConfig,
        enricher: &dyn ConfigEnricher,
    ) -> ParleyResult<ChatOutput> {
        let started = Instant::now();
        let mut trace = Trace::default();

        let config = enricher.enrich(config)?;
        trace.finish(Stage::Enrich);

        let log = match &self.history {
            Some(resolver) => {
                let log = resolver.resolve(&config.user_id(), &config.conversation_id())?;
                let messages = log.messages().await?;
                debug!(
                    user_id = log.key().user_id(),
                    conversation_id = log.key().conversation_id(),
                    "Loaded {} history messages",
                    messages.len()
                );
                trace.finish(Stage::LoadHistory);
                Some((log, messages))
            }
            None => None,
        };

        let mut values = PromptValues::new().set("question", input.question.as_str());

        if let Some(retriever) = &self.retriever {
            let context = retriever
                .retrieve_context(&input.question, &input.filter)
                .await?;
            values = values.set("context", context);
            trace.finish(Stage::Retrieve);
        }

        if let Some((_, messages)) = &log {
            values = values.set_messages(HISTORY_PLACEHOLDER, messages.clone());
        }
        let messages = self.prompt.render(&values)?;
        trace.finish(Stage::RenderPrompt);

        let content = self.model.generate(messages).await?;
        trace.finish(Stage::InvokeModel);

        if let Some((log, _)) = &log {
            log.add_messages(&[
                ChatMessage::human(input.question.as_str()),
                ChatMessage::assistant(content.as_str()),
            ])
            .await?;
            trace.finish(Stage::PersistTurn);
        }

        info!(
            "Pipeline {} answered with {} ({} chars) in {:?}",
            self.name,
            self.model.model_name(),
            content.len(),
            started.elapsed()
        );

        Ok(ChatOutput {
            content,
            stages: trace.stages,
        })
    }
}

struct Trace {
    last: Instant,
    stages: Vec<StageTiming>,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            last: Instant::now(),
            stages: Vec::new(),
        }
    }
}

impl Trace {
    fn finish(&mut self, stage: Stage) {
        let now = Instant::now();
        let duration = now - self.last;
        debug!(stage = %stage, duration_ms = duration.as_millis() as u64, "stage complete");
        self.stages.push(StageTiming { stage, duration });
        self.last = now;
    }
}
