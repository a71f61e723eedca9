//! Chat prompt templates
//!
//! A template is an ordered list of role-tagged message templates and named
//! placeholders. Message templates substitute `{name}` variables; `{{` and
//! `}}` produce literal braces. A placeholder expands to a list of messages.

use parley_core::{ChatMessage, ErrorContext, MessageRole, ParleyError, ParleyResult};
use std::collections::HashMap;

pub const BASE_SYSTEM_PROMPT: &str = "You're a helpful assistant answering questions.";

pub const RAG_SYSTEM_PROMPT: &str = "Based on the question and the given context write a natural language response that will answer the customer query:\n context: {context}";

/// Name of the placeholder filled with stored conversation history
pub const HISTORY_PLACEHOLDER: &str = "history";

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Message { role: MessageRole, template: String },
    Placeholder(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptTemplate {
    parts: Vec<PromptPart>,
}

/// Values used to render a [`PromptTemplate`]
#[derive(Debug, Clone, Default)]
pub struct PromptValues {
    variables: HashMap<String, String>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn set_messages(mut self, name: &str, messages: Vec<ChatMessage>) -> Self {
        self.messages.insert(name.to_string(), messages);
        self
    }
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(self, template: impl Into<String>) -> Self {
        self.message(MessageRole::System, template)
    }

    pub fn human(self, template: impl Into<String>) -> Self {
        self.message(MessageRole::Human, template)
    }

    pub fn assistant(self, template: impl Into<String>) -> Self {
        self.message(MessageRole::Assistant, template)
    }

    pub fn message(mut self, role: MessageRole, template: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Message {
            role,
            template: template.into(),
        });
        self
    }

    pub fn placeholder(mut self, name: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Placeholder(name.into()));
        self
    }

    /// System prompt, stored history, then the question.
    pub fn base_chat() -> Self {
        Self::new()
            .system(BASE_SYSTEM_PROMPT)
            .placeholder(HISTORY_PLACEHOLDER)
            .human("{question}")
    }

    /// Context-bearing system prompt, optional history, then the question.
    pub fn rag_chat(with_history: bool) -> Self {
        let template = Self::new().system(RAG_SYSTEM_PROMPT);
        let template = if with_history {
            template.placeholder(HISTORY_PLACEHOLDER)
        } else {
            template
        };
        template.human("{question}")
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PromptPart::Placeholder(n) if n == name))
    }

    /// Render into a message list. Missing variables or placeholders fail.
    pub fn render(&self, values: &PromptValues) -> ParleyResult<Vec<ChatMessage>> {
        let mut messages = Vec::with_capacity(self.parts.len());

        for part in &self.parts {
            match part {
                PromptPart::Message { role, template } => {
                    let mut content = String::with_capacity(template.len());
                    for segment in parse(template)? {
                        match segment {
                            Segment::Literal(text) => content.push_str(&text),
                            Segment::Variable(name) => {
                                let value = values.variables.get(&name).ok_or_else(|| {
                                    template_error(format!("Missing prompt variable: {}", name))
                                })?;
                                content.push_str(value);
                            }
                        }
                    }
                    messages.push(ChatMessage {
                        role: *role,
                        content,
                    });
                }
                PromptPart::Placeholder(name) => {
                    let history = values.messages.get(name).ok_or_else(|| {
                        template_error(format!("Missing messages for placeholder: {}", name))
                    })?;
                    messages.extend(history.iter().cloned());
                }
            }
        }

        Ok(messages)
    }
}

enum Segment {
    Literal(String),
    Variable(String),
}

fn parse(template: &str) -> ParleyResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(malformed(template)),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(malformed(template));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
            }
            '}' => return Err(malformed(template)),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn malformed(template: &str) -> ParleyError {
    template_error(format!("Malformed prompt template: {:?}", template))
}

/// Templates are built by the server, so a mismatch is a server fault
fn template_error(message: String) -> ParleyError {
    ParleyError::Config {
        message,
        source: None,
        context: ErrorContext::new("prompt").with_operation("render"),
    }
}
