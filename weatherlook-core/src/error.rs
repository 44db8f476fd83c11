//! Uniform error shape for every remote call.
//!
//! Provider and transport failures are normalized into a [`ResolutionError`]
//! carrying the provider's message and a status-like `code` token. The code
//! selects both the retry behaviour and the message shown to the user.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const GENERIC_MESSAGE: &str = "Failed to fetch weather data";
pub const GENERIC_CODE: &str = "500";

/// Classification of a [`ResolutionError`] by its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or 5xx.
    TransientTransport,
    /// `401`, bad or missing API key.
    Auth,
    /// `404`
    NotFound,
    /// `429`
    RateLimit,
    Unknown,
}

impl ErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "401" => Self::Auth,
            "404" => Self::NotFound,
            "429" => Self::RateLimit,
            c if c.len() == 3 && c.starts_with('5') => Self::TransientTransport,
            _ => Self::Unknown,
        }
    }

    /// Auth, not-found and rate-limit failures are surfaced on the first hit.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientTransport | Self::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ResolutionError {
    pub message: String,
    pub code: String,
}

impl ResolutionError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { message: message.into(), code: code.into() }
    }

    /// Code "500" with the generic message.
    pub fn generic() -> Self {
        Self::new(GENERIC_MESSAGE, GENERIC_CODE)
    }

    pub fn missing_api_key() -> Self {
        Self::new("No API key configured", "401")
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        tracing::debug!("transport error: {err}");
        let code = err
            .status()
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| GENERIC_CODE.to_string());
        Self::new(GENERIC_MESSAGE, code)
    }

    /// Build an error from a provider error body such as
    /// `{"cod": "404", "message": "city not found"}`.
    ///
    /// `cod` may be a string or a number. Missing fields fall back to the
    /// HTTP status, then to the generic message and code "500". A 2xx code is
    /// never an error code and counts as missing.
    pub fn from_payload(body: &str, status: Option<u16>) -> Self {
        let payload: Option<Value> = serde_json::from_str(body).ok();

        let code = payload
            .as_ref()
            .and_then(|v| v.get("cod"))
            .and_then(code_token)
            .filter(|c| !is_success_code(c))
            .or_else(|| status.map(|s| s.to_string()).filter(|c| !is_success_code(c)))
            .unwrap_or_else(|| GENERIC_CODE.to_string());

        let message = payload
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(GENERIC_MESSAGE);

        Self::new(message, code)
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(&self.code)
    }

    /// Message selected by code, for display.
    pub fn user_message(&self) -> String {
        match self.code.as_str() {
            "401" => {
                "Invalid API key. Please check your OpenWeatherMap API key configuration.".into()
            }
            "404" => "City not found. Please check the city name and try again.".into(),
            "429" => "Too many requests. Please try again later.".into(),
            "500" => "Server error. Please try again later.".into(),
            _ if !self.message.is_empty() => self.message.clone(),
            _ => "An unexpected error occurred. Please try again.".into(),
        }
    }

    /// Same code, message replaced by [`Self::user_message`].
    pub fn for_display(&self) -> Self {
        Self::new(self.user_message(), self.code.clone())
    }
}

fn is_success_code(code: &str) -> bool {
    code.len() == 3 && code.starts_with('2')
}

fn code_token(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_string_code() {
        let err = ResolutionError::from_payload(r#"{"cod":"404","message":"city not found"}"#, None);
        assert_eq!(err.code, "404");
        assert_eq!(err.message, "city not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn payload_with_numeric_code() {
        let err = ResolutionError::from_payload(r#"{"cod":401,"message":"Invalid API key"}"#, Some(401));
        assert_eq!(err.code, "401");
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn unstructured_payload_uses_status_then_default() {
        let err = ResolutionError::from_payload("<html>bad gateway</html>", Some(502));
        assert_eq!(err.code, "502");
        assert_eq!(err.message, GENERIC_MESSAGE);

        let err = ResolutionError::from_payload("", None);
        assert_eq!(err, ResolutionError::generic());
    }

    #[test]
    fn success_code_in_payload_falls_back_to_generic() {
        let err = ResolutionError::from_payload(r#"{"cod":200,"name":"London"}"#, None);
        assert_eq!(err, ResolutionError::generic());

        let err = ResolutionError::from_payload(r#"{"cod":"200"}"#, Some(200));
        assert_eq!(err.code, "500");
    }

    #[test]
    fn retry_classification() {
        assert!(ErrorKind::from_code("500").is_retryable());
        assert!(ErrorKind::from_code("503").is_retryable());
        assert!(ErrorKind::from_code("418").is_retryable());
        assert!(!ErrorKind::from_code("401").is_retryable());
        assert!(!ErrorKind::from_code("404").is_retryable());
        assert!(!ErrorKind::from_code("429").is_retryable());
    }

    #[test]
    fn user_messages_by_code() {
        assert!(ResolutionError::new("x", "401").user_message().starts_with("Invalid API key"));
        assert!(ResolutionError::new("x", "404").user_message().starts_with("City not found"));
        assert!(ResolutionError::new("x", "429").user_message().starts_with("Too many requests"));
        assert!(ResolutionError::new("x", "500").user_message().starts_with("Server error"));
        assert_eq!(ResolutionError::new("odd failure", "418").user_message(), "odd failure");
        assert_eq!(
            ResolutionError::new("", "418").user_message(),
            "An unexpected error occurred. Please try again."
        );
    }
}
