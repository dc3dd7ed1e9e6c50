use axum::{
    extract::{Request, State},
    http::Method,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::{read_form, require_method, AppState, Identity};
use crate::error::ApiResult;
use crate::jobserver::{self, JobServerError};

#[derive(Debug, Deserialize)]
pub struct CreateContextForm {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mem-per-node")]
    pub mem_per_node: Option<String>,
    #[serde(rename = "num-cpu-cores")]
    pub num_cores: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteContextForm {
    #[serde(default)]
    pub name: String,
}

pub async fn list_contexts(
    State(state): State<AppState>,
    identity: Identity,
    method: Method,
) -> ApiResult<Json<Value>> {
    require_method(&method, Method::GET)?;
    let contexts = state.api_for(&identity).contexts().await?;
    Ok(Json(json!({ "contexts": contexts })))
}

pub async fn create_context(
    State(state): State<AppState>,
    identity: Identity,
    request: Request,
) -> ApiResult<Json<Value>> {
    require_method(request.method(), Method::POST)?;
    let form: CreateContextForm = read_form(request).await?;

    let defaults = &state.context_defaults;
    let mem_per_node = or_default(form.mem_per_node, &defaults.mem_per_node);
    let num_cores = or_default(form.num_cores, &defaults.num_cores);

    let outcome = state
        .api_for(&identity)
        .create_context(&form.name, &mem_per_node, &num_cores)
        .await;

    Ok(Json(with_name(acknowledgement(outcome)?, &form.name)))
}

pub async fn delete_context(
    State(state): State<AppState>,
    identity: Identity,
    request: Request,
) -> ApiResult<Json<Value>> {
    require_method(request.method(), Method::DELETE)?;
    let form: DeleteContextForm = read_form(request).await?;

    let outcome = state.api_for(&identity).delete_context(&form.name).await;

    Ok(Json(with_name(acknowledgement(outcome)?, &form.name)))
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Body to return for a context create/delete call.
///
/// The job server acknowledges both with a plain-text `OK`, so a success
/// status without a JSON body is reported as `{"status": "OK"}`. Any other
/// non-JSON 2xx answer is reported the same way. A rejected call surfaces the
/// job server's own error body; without one the error propagates.
fn acknowledgement(outcome: jobserver::Result<Value>) -> Result<Value, JobServerError> {
    match outcome {
        Ok(body) => Ok(body),
        Err(JobServerError::NotJson { status, body }) => {
            tracing::debug!(status, body = %body, "Treating non-JSON acknowledgement as success");
            Ok(json!({ "status": "OK" }))
        }
        Err(err) => err.into_payload(),
    }
}

fn with_name(body: Value, name: &str) -> Value {
    let mut fields = match body {
        Value::Object(fields) => fields,
        other => {
            let mut fields = Map::new();
            fields.insert("result".to_string(), other);
            fields
        }
    };
    fields.insert("name".to_string(), Value::String(name.to_string()));
    Value::Object(fields)
}
