//! Client facade over the Spark job server REST API.
//!
//! The handlers only talk to the [`JobServerApi`] trait. A
//! [`JobServerConnector`] hands out an API instance bound to the
//! authenticated user of the request; [`JobServerClient`] is the HTTP
//! implementation of both.

pub mod client;
pub mod error;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use client::JobServerClient;
pub use error::JobServerError;

pub type Result<T> = std::result::Result<T, JobServerError>;

/// Status the job server reports for an accepted asynchronous job.
pub const STARTED: &str = "STARTED";

/// A job run request as sent to `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSubmission {
    pub app_name: String,
    pub class_path: String,
    /// Job configuration, one `key=value` per line
    pub data: String,
    /// Target context; `None` lets the job server create a temporary one
    pub context: Option<String>,
    pub sync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub status: String,
    #[serde(default)]
    pub result: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubmitResult {
    pub fn is_started(&self) -> bool {
        self.status == STARTED
    }

    /// Human readable reason for a submission that did not start.
    pub fn failure_message(&self) -> String {
        match &self.result {
            Value::String(message) => message.clone(),
            Value::Null => self.status.clone(),
            Value::Object(fields) => match fields.get("message") {
                Some(Value::String(message)) => message.clone(),
                _ => self.result.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait JobServerApi: Send + Sync {
    /// Names of the uploaded application jars.
    async fn jars(&self) -> Result<Vec<String>>;

    /// Names of the running contexts.
    async fn contexts(&self) -> Result<Vec<String>>;

    async fn create_context(&self, name: &str, mem_per_node: &str, num_cores: &str)
        -> Result<Value>;

    async fn delete_context(&self, name: &str) -> Result<Value>;

    /// Status and result of a job.
    async fn job(&self, job_id: &str) -> Result<Value>;

    async fn submit_job(&self, submission: &JobSubmission) -> Result<SubmitResult>;
}

/// Builds a job server API scoped to one authenticated user.
pub trait JobServerConnector: Send + Sync {
    fn connect(&self, user: &str) -> Arc<dyn JobServerApi>;
}

/// Extract names from a listing body. The job server returns either a list
/// of names or an object keyed by name (jars map to their upload time).
pub(crate) fn names_from(body: Value) -> Result<Vec<String>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                Value::Object(mut fields) => match fields.remove("name") {
                    Some(Value::String(name)) => Ok(name),
                    _ => Err(JobServerError::Decode(
                        "listing entry without a name".to_string(),
                    )),
                },
                other => Err(JobServerError::Decode(format!(
                    "unexpected listing entry: {}",
                    other
                ))),
            })
            .collect(),
        Value::Object(fields) => {
            let mut names: Vec<String> = fields.into_iter().map(|(name, _)| name).collect();
            names.sort();
            Ok(names)
        }
        other => Err(JobServerError::Decode(format!(
            "expected a list or an object, got {}",
            other
        ))),
    }
}
