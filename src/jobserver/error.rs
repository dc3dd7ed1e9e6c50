use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobServerError {
    /// Connection, timeout or protocol failure talking to the job server.
    #[error("Job server request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The job server answered with a non-success status. `payload` holds the
    /// body when it was JSON.
    #[error("Job server returned HTTP {status}: {body}")]
    Remote {
        status: u16,
        payload: Option<Value>,
        body: String,
    },

    /// A success status whose body is empty or not JSON. Context create and
    /// delete acknowledge this way.
    #[error("Job server response was not JSON (HTTP {status})")]
    NotJson { status: u16, body: String },

    /// JSON body that does not have the expected shape.
    #[error("Unexpected job server response: {0}")]
    Decode(String),

    #[error("Invalid job server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl JobServerError {
    pub async fn from_response(response: reqwest::Response) -> JobServerError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response text".to_string());
        let payload = serde_json::from_str::<Value>(&body).ok();

        JobServerError::Remote {
            status,
            payload,
            body,
        }
    }

    /// Structured body the job server sent along with the error, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Remote {
                payload: Some(payload),
                ..
            } => Some(payload),
            _ => None,
        }
    }

    /// Take the structured payload, giving the error back when there is none.
    pub fn into_payload(self) -> Result<Value, Self> {
        match self {
            Self::Remote {
                payload: Some(payload),
                ..
            } => Ok(payload),
            other => Err(other),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Remote { .. } => "remote",
            Self::NotJson { .. } => "not_json",
            Self::Decode(_) => "decode",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}
