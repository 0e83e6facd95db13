use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 | 406 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            409 => ErrorCode::Conflict,
            502..=504 => ErrorCode::Unavailable,
            _ => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from an HTTP status and the raw response body.
    ///
    /// PostgREST answers with `{"code", "message", "details", "hint"}`; any
    /// other body is kept verbatim as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<PostgrestErrorBody>(body) {
            Ok(parsed) => parsed.describe(),
            Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
            Err(_) => body.trim().to_string(),
        };
        Self::new(ErrorCode::from_status(status), message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestErrorBody {
    fn describe(&self) -> String {
        let mut out = match &self.code {
            Some(code) => format!("[{code}] {}", self.message),
            None => self.message.clone(),
        };
        if let Some(details) = &self.details {
            out.push_str(&format!(" ({details})"));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!(" hint: {hint}"));
        }
        out
    }
}
