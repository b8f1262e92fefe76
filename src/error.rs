//! Error types for the complaint triage service.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Acknowledgement error: {0}")]
    Acknowledgement(#[from] AcknowledgementError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors. These abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("No destination configured for classification {id} ({unit})")]
    UnroutedClassification { id: u32, unit: String },

    #[error("Prompt configuration error: {0}")]
    Prompt(#[from] PromptError),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Email provider {provider} request failed: {reason}")]
    Transport { provider: String, reason: String },

    #[error("Email provider {provider} rejected message with status {status}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Email provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Template loading and placeholder substitution errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{name}}} in template")]
    UnknownPlaceholder { name: String },

    #[error("Malformed placeholder at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Prompt file errors.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Failed to read prompt {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse prompt {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Model output did not match the expected schema.
#[derive(Debug, thiserror::Error)]
#[error("{schema} contract violated: {reason}")]
pub struct ContractViolation {
    pub schema: &'static str,
    pub reason: String,
}

/// Acknowledgement dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum AcknowledgementError {
    #[error("Failed to render acknowledgement: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to deliver acknowledgement: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Routing errors.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Unknown classification {id}: no destination configured")]
    UnknownClassification { id: u32 },

    #[error("Failed to render escalation template: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to deliver routing email: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Auxiliary store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Complaint {id} is not registered")]
    NotRegistered { id: String },

    #[error("Store backend failure: {0}")]
    Backend(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
