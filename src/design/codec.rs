use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Format version written into every stored design.
pub const DESIGN_VERSION: &str = "0.0.1";

#[derive(Debug, Error)]
pub enum DesignDecodeError {
    #[error("Malformed design data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Cannot recognize design version {0}")]
    UnsupportedVersion(String),

    #[error("Design parameters are not a list of name/value pairs: {0}")]
    InvalidParams(#[source] serde_json::Error),
}

/// One `name=value` job configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParam {
    pub name: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

impl JobParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Decode a JSON encoded list of name/value pairs.
pub fn parse_params(raw: &str) -> Result<Vec<JobParam>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Render params as the job server expects them: one `name=value` per line.
pub fn params_to_job_data(params: &[JobParam]) -> String {
    params
        .iter()
        .map(|p| format!("{}={}", p.name, p.value))
        .collect::<Vec<_>>()
        .join("\n")
}

// Editors send numbers and booleans unquoted.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar parameter value, got {}",
            other
        ))),
    }
}

/// The saved query of the Spark editor, stored in `Design::data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkDesign {
    pub app_name: String,
    pub class_path: String,
    pub auto_context: bool,
    #[serde(default)]
    pub context: Option<String>,
    /// JSON encoded list of [`JobParam`]
    pub params: String,
}

#[derive(Deserialize)]
struct StoredDesign {
    #[serde(rename = "VERSION")]
    version: String,
    query: SparkDesign,
}

impl SparkDesign {
    pub fn encode(&self) -> String {
        json!({
            "VERSION": DESIGN_VERSION,
            "query": self,
        })
        .to_string()
    }

    pub fn decode(blob: &str) -> Result<Self, DesignDecodeError> {
        let stored: StoredDesign = serde_json::from_str(blob)?;
        if stored.version != DESIGN_VERSION {
            return Err(DesignDecodeError::UnsupportedVersion(stored.version));
        }
        stored.query.param_list()?;
        Ok(stored.query)
    }

    pub fn param_list(&self) -> Result<Vec<JobParam>, DesignDecodeError> {
        parse_params(&self.params).map_err(DesignDecodeError::InvalidParams)
    }
}
