//! Model-backed collaborators: answering, classification, sender extraction.
//!
//! Every call is bounded by a timeout. A timeout or provider failure never
//! reaches the coordinator; the client hands back a fixed fallback payload
//! shaped for its own call site instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use super::types::{SenderInfo, TriageDecision};
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::prompts::PromptTemplate;

/// Temperature for every triage call (deterministic-ish).
const TRIAGE_TEMPERATURE: f32 = 0.1;

/// Max tokens for the drafted acknowledgement.
const ANSWER_MAX_TOKENS: u32 = 1024;

/// Max tokens for classification and sender extraction (small JSON objects).
const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Payload the classifier returns when the model is unreachable. It carries
/// no classification, so the complaint is not routed.
pub const CLASSIFICATION_FALLBACK_PAYLOAD: &str = "{}";

/// Drafts the acknowledgement and decides on escalation.
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Raw model output, expected to hold a `TriageDecision` object.
    async fn ask(&self, complaint_text: &str) -> String;
}

/// Maps a complaint onto an organizational unit.
#[async_trait]
pub trait ClassifierService: Send + Sync {
    /// Raw model output, expected to hold a `Classification` object.
    async fn classify(&self, complaint_text: &str) -> String;
}

/// Recovers the complainant's name and address from the complaint text.
#[async_trait]
pub trait SenderExtractor: Send + Sync {
    /// Raw model output, expected to hold a `SenderInfo` object.
    async fn extract(&self, complaint_text: &str) -> String;
}

/// One prompt bound to one provider, with a timeout.
pub struct InferenceClient {
    llm: Arc<dyn LlmProvider>,
    prompt: PromptTemplate,
    timeout: Duration,
    max_tokens: u32,
}

impl InferenceClient {
    pub fn new(llm: Arc<dyn LlmProvider>, prompt: PromptTemplate, timeout: Duration) -> Self {
        Self {
            llm,
            prompt,
            timeout,
            max_tokens: CLASSIFY_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Render the prompt with `vars` and run one completion.
    pub async fn complete(&self, vars: &[(&str, &str)]) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !self.prompt.system_instruction.is_empty() {
            messages.push(ChatMessage::system(&self.prompt.system_instruction));
        }
        messages.push(ChatMessage::user(self.prompt.render_user(vars)));

        let request = CompletionRequest::new(messages)
            .with_temperature(TRIAGE_TEMPERATURE)
            .with_max_tokens(self.max_tokens);

        info!(model = self.llm.model_name(), "Invoking LLM model");
        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.model_name().to_string(),
                timeout: self.timeout,
            })??;

        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "LLM response received successfully"
        );
        Ok(response.content)
    }

    /// Like `complete`, but any error yields `fallback`.
    async fn complete_or(&self, vars: &[(&str, &str)], fallback: impl FnOnce() -> String) -> String {
        match self.complete(vars).await {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, "LLM error, using fallback payload");
                fallback()
            }
        }
    }
}

/// Answer service driven by the acknowledgement prompt.
///
/// Prompt variable: `complaint_text`.
pub struct LlmAnswerService {
    client: InferenceClient,
}

impl LlmAnswerService {
    pub fn new(llm: Arc<dyn LlmProvider>, prompt: PromptTemplate, timeout: Duration) -> Self {
        Self {
            client: InferenceClient::new(llm, prompt, timeout).with_max_tokens(ANSWER_MAX_TOKENS),
        }
    }
}

#[async_trait]
impl AnswerService for LlmAnswerService {
    async fn ask(&self, complaint_text: &str) -> String {
        self.client
            .complete_or(&[("complaint_text", complaint_text)], || {
                serde_json::to_string(&TriageDecision::fallback()).unwrap_or_default()
            })
            .await
    }
}

/// Classifier driven by the router prompt.
///
/// Prompt variable: `email_content`.
pub struct LlmClassifier {
    client: InferenceClient,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, prompt: PromptTemplate, timeout: Duration) -> Self {
        Self {
            client: InferenceClient::new(llm, prompt, timeout),
        }
    }
}

#[async_trait]
impl ClassifierService for LlmClassifier {
    async fn classify(&self, complaint_text: &str) -> String {
        info!("Classifying issue from email content");
        self.client
            .complete_or(&[("email_content", complaint_text)], || {
                CLASSIFICATION_FALLBACK_PAYLOAD.to_string()
            })
            .await
    }
}

/// Sender extraction driven by the extract-sender prompt.
///
/// Prompt variable: `complaint_text`.
pub struct LlmSenderExtractor {
    client: InferenceClient,
}

impl LlmSenderExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, prompt: PromptTemplate, timeout: Duration) -> Self {
        Self {
            client: InferenceClient::new(llm, prompt, timeout),
        }
    }
}

#[async_trait]
impl SenderExtractor for LlmSenderExtractor {
    async fn extract(&self, complaint_text: &str) -> String {
        info!("Extracting sender information from complaint text");
        self.client
            .complete_or(&[("complaint_text", complaint_text)], || {
                serde_json::to_string(&SenderInfo::default()).unwrap_or_default()
            })
            .await
    }
}
