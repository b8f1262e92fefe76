//! Configuration types.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{ConfigError, DeliveryError};
use crate::llm::{LlmBackend, LlmConfig};
use crate::mail::{Mailer, SendGridConfig, SendGridMailer, SmtpConfig, SmtpMailer, sendgrid};
use crate::triage::router::{CLASSIFICATION_UNITS, RoutingTable};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_COMPANY_NAME: &str = "PENCOM";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PORT: u16 = 8080;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub llm: LlmConfig,
    pub email: EmailTransport,
    /// Substituted for `{company_name}` in acknowledgements.
    pub company_name: String,
    /// Validated to cover every classifier ID.
    pub routing: RoutingTable,
    pub prompt_dir: PathBuf,
    pub template_dir: PathBuf,
    /// Bound on every outbound LLM or email call.
    pub request_timeout: Duration,
    pub extract_sender: bool,
    pub server: ServerConfig,
    /// Rolling log file directory, if file logging is wanted.
    pub log_dir: Option<PathBuf>,
}

/// Which email backend delivers mail.
#[derive(Debug, Clone)]
pub enum EmailTransport {
    SendGrid(SendGridConfig),
    Smtp(SmtpConfig),
}

impl EmailTransport {
    pub fn from_address(&self) -> &str {
        match self {
            Self::SendGrid(config) => &config.from_address,
            Self::Smtp(config) => &config.from_address,
        }
    }

    /// Construct the configured mailer.
    pub fn build_mailer(&self) -> Result<Arc<dyn Mailer>, DeliveryError> {
        Ok(match self {
            Self::SendGrid(config) => Arc::new(SendGridMailer::new(config.clone())?),
            Self::Smtp(config) => Arc::new(SmtpMailer::new(config.clone())),
        })
    }
}

/// Intake server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            key: "TRIAGE_HOST".into(),
            message: format!("'{}' is not an IP address", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl TriageConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let backend_name = vars.or("TRIAGE_LLM_BACKEND", "anthropic");
        let backend =
            LlmBackend::parse(&backend_name).ok_or_else(|| ConfigError::InvalidValue {
                key: "TRIAGE_LLM_BACKEND".into(),
                message: format!("unknown backend '{backend_name}'"),
            })?;
        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(vars.required(backend.api_key_var())?),
            model: vars.or("TRIAGE_MODEL", DEFAULT_MODEL),
        };

        let request_timeout =
            Duration::from_secs(vars.parsed("TRIAGE_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TRIAGE_REQUEST_TIMEOUT_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let from_address = vars.required("EMAIL_ADDRESS")?;
        let email = match vars.or("EMAIL_TRANSPORT", "sendgrid").to_ascii_lowercase().as_str() {
            "sendgrid" => EmailTransport::SendGrid(SendGridConfig {
                api_key: SecretString::from(vars.required("SENDGRID_API_KEY")?),
                api_url: vars.or("SENDGRID_API_URL", sendgrid::SENDGRID_API_URL),
                from_address,
                timeout: request_timeout,
            }),
            "smtp" => {
                let username = vars.required("SMTP_USERNAME")?;
                EmailTransport::Smtp(SmtpConfig {
                    host: vars.required("SMTP_HOST")?,
                    port: vars.parsed("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                    password: SecretString::from(vars.required("SMTP_PASSWORD")?),
                    username,
                    from_address,
                    timeout: request_timeout,
                })
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "EMAIL_TRANSPORT".into(),
                    message: format!("expected 'sendgrid' or 'smtp', got '{other}'"),
                });
            }
        };

        let mut routing = RoutingTable::new();
        for (id, unit) in CLASSIFICATION_UNITS {
            if let Some(address) = vars.get(&format!("{unit}_UNIT_EMAIL")) {
                routing = routing.with_target(id, unit, address);
            }
        }
        routing.validate(&CLASSIFICATION_UNITS)?;

        Ok(Self {
            llm,
            email,
            company_name: vars.or("COMPANY_NAME", DEFAULT_COMPANY_NAME),
            routing,
            prompt_dir: PathBuf::from(vars.or("PROMPT_DIR", "prompts")),
            template_dir: PathBuf::from(vars.or("TEMPLATE_DIR", "templates")),
            request_timeout,
            extract_sender: vars.flag("TRIAGE_EXTRACT_SENDER")?,
            server: ServerConfig {
                host: vars.or("TRIAGE_HOST", "127.0.0.1"),
                port: vars.parsed("TRIAGE_PORT", DEFAULT_PORT)?,
            },
            log_dir: vars.get("TRIAGE_LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Lookup helpers; blank values count as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("0" | "false" | "no" | "off") => Ok(false),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        }
    }
}
