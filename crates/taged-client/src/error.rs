//! Client error types

use taged_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Refresh failed or no refresh token was available; the session is gone.
    ///
    /// `original` is the 401 that started the refresh.
    #[error("Session expired, please log in again")]
    AuthExpired {
        #[source]
        original: Box<ClientError>,
    },

    /// Non-2xx response with a structured per-field error body
    #[error("Request rejected with status {status}: {}", summarize(fields))]
    Validation {
        status: u16,
        fields: Vec<(String, Vec<String>)>,
    },

    /// Any other non-2xx response
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] taged_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Build the error for a non-2xx response.
    ///
    /// A JSON object body is read as field -> message(s); anything else is kept as text.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body)
            && !map.is_empty()
        {
            let fields = map
                .into_iter()
                .map(|(field, value)| (field, messages(value)))
                .collect();
            return ClientError::Validation { status, fields };
        }

        ClientError::Status {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// HTTP status carried directly by this error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Validation { status, .. } | ClientError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// User-facing text: one `field: message` line per field for validation
    /// errors, the display form otherwise
    pub fn verbose_message(&self) -> String {
        match self {
            ClientError::Validation { fields, .. } => fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

fn messages(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s],
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

fn summarize(fields: &[(String, Vec<String>)]) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
