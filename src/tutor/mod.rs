//! Tutoring flows: analysis, gym evaluation and chat.
//!
//! Each flow validates its input, assembles the prompt and hands back an
//! event stream. Validation failures are returned as `Err` before any
//! stream exists, so they never surface as terminal stream events.

pub mod prompts;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{RequestError, TutorResult};
use crate::observability::Observability;
use crate::schema::ResponseSchema;
use crate::streamer::{
    ChatEventStream, ChatMessage, ConversationalStreamer, FieldEventStream, IncrementalJsonFieldStreamer,
};

/// Summary of an earlier analysis, folded into chat instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Problem statement.
    #[serde(default)]
    pub problem: Option<String>,
    /// Student attempt.
    #[serde(default)]
    pub attempt: Option<String>,
    /// Analysis title.
    #[serde(default)]
    pub title: Option<String>,
    /// Concept tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Diagnosis text.
    #[serde(default)]
    pub diagnosis: Option<String>,
    /// Explanation text.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl AnalysisContext {
    /// True when nothing at all is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One chat turn request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    #[serde(default)]
    pub message: String,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Earlier analysis to ground the conversation in.
    #[serde(default)]
    pub analysis_context: Option<AnalysisContext>,
    /// Replaces the whole system instruction when non-empty.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Request with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach prior turns.
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Attach an earlier analysis.
    pub fn with_analysis_context(mut self, context: AnalysisContext) -> Self {
        self.analysis_context = Some(context);
        self
    }

    /// Override the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Entry point for the three tutoring flows.
#[derive(Clone)]
pub struct TutorService {
    structured: IncrementalJsonFieldStreamer,
    chat: ConversationalStreamer,
    obs: Observability,
}

impl TutorService {
    /// Create the service from its two streamers.
    pub fn new(structured: IncrementalJsonFieldStreamer, chat: ConversationalStreamer, obs: Observability) -> Self {
        Self { structured, chat, obs }
    }

    /// Diagnose `attempt` against `problem`, streaming the analysis fields.
    pub fn analyze(&self, problem: &str, attempt: &str) -> TutorResult<FieldEventStream> {
        self.require("analyze", "problem", problem, "Input problem context")?;
        self.require("analyze", "attempt", attempt, "Input attempt context")?;

        self.obs.logger.info(
            "Starting analysis",
            json!({ "problem_len": problem.len(), "attempt_len": attempt.len() }),
        );
        Ok(self.structured.stream(
            prompts::ANALYSIS_SYSTEM_PROMPT,
            prompts::analysis_parts(problem, attempt),
            ResponseSchema::analysis(),
        ))
    }

    /// Grade a practice answer, streaming the gym fields.
    pub fn evaluate_gym(&self, problem: &str, attempt: &str) -> TutorResult<FieldEventStream> {
        self.require("evaluate_gym", "problem", problem, "No problem context")?;
        self.require("evaluate_gym", "attempt", attempt, "Input attempt context")?;

        self.obs.logger.info("Starting gym evaluation", json!({ "attempt_len": attempt.len() }));
        Ok(self.structured.stream(
            prompts::GYM_SYSTEM_PROMPT,
            prompts::gym_parts(problem, attempt),
            ResponseSchema::gym(),
        ))
    }

    /// Run one conversational turn.
    pub fn chat(&self, request: &ChatRequest) -> TutorResult<ChatEventStream> {
        self.require("chat", "message", &request.message, "Message is required")?;

        let system = prompts::chat_system_prompt(request.analysis_context.as_ref(), request.system_prompt.as_deref());
        self.obs.logger.info(
            "Starting chat turn",
            json!({
                "history_len": request.history.len(),
                "has_analysis_context": request.analysis_context.is_some(),
            }),
        );
        Ok(self.chat.stream(&system, &request.history, &request.message))
    }

    fn require(&self, operation: &str, field: &str, value: &str, message: &str) -> TutorResult<()> {
        if !value.is_empty() {
            return Ok(());
        }
        self.obs.metrics.record_validation_failure(operation);
        self.obs
            .logger
            .warn("Rejected request", json!({ "operation": operation, "field": field }));
        Err(RequestError::missing(field, message).into())
    }
}
