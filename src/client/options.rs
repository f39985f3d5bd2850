use crate::error::OtsError;
use crate::observability::logging::{JsonLineLogger, LogLevel, Logger};
use crate::retry::{DeadlineRetryStrategy, RetryStrategy};
use std::sync::Arc;
use std::time::Duration;

/// Access credential. None of the fields may contain CR or LF; they travel
/// in headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

impl Credential {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
        }
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.access_key_id.is_empty() {
            return Err(OtsError::parameter_invalid("Access-key id must be nonempty."));
        }
        if self.access_key_secret.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Access-key secret must be nonempty.",
            ));
        }
        let fields = [
            Some(self.access_key_id.as_str()),
            Some(self.access_key_secret.as_str()),
            self.security_token.as_deref(),
        ];
        for field in fields.into_iter().flatten() {
            if field.contains('\r') || field.contains('\n') {
                return Err(OtsError::parameter_invalid(
                    "Credential fields must not contain CR or LF.",
                ));
            }
        }
        Ok(())
    }
}

/// Client knobs. Defaults suit production; tests usually shrink the retry
/// deadline and the executor count.
pub struct ClientOptions {
    pub max_connections: i64,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry_strategy: Box<dyn RetryStrategy>,
    pub logger: Arc<dyn Logger>,
    /// Number of callback executors the client owns.
    pub callback_executors: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_connections: 5000,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(3),
            retry_strategy: Box::new(DeadlineRetryStrategy::new(Duration::from_secs(10))),
            logger: Arc::new(JsonLineLogger::stderr(LogLevel::Info)),
            callback_executors: 10,
        }
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<(), OtsError> {
        if self.max_connections <= 0 {
            return Err(OtsError::parameter_invalid(
                "Max connections must be positive.",
            ));
        }
        if self.connect_timeout < Duration::from_millis(1) {
            return Err(OtsError::parameter_invalid(
                "Connect timeout must be at least one millisecond.",
            ));
        }
        if self.request_timeout < Duration::from_millis(1) {
            return Err(OtsError::parameter_invalid(
                "Request timeout must be at least one millisecond.",
            ));
        }
        if self.callback_executors == 0 {
            return Err(OtsError::parameter_invalid(
                "Number of callback executors must be positive.",
            ));
        }
        Ok(())
    }
}
