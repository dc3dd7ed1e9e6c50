use axum::{
    extract::{Path, Request, State},
    http::Method,
    Json,
};
use serde_json::{json, Value};

use crate::api::designs::load_owned_design;
use crate::api::{read_form, require_method, AppState, DesignIdSegment, Envelope, Identity};
use crate::design::NewDesign;
use crate::error::ApiResult;
use crate::forms::{validate_submission, SubmissionFields};

const MISSING_JARS: &str = "Missing application jar list.";

pub async fn list_jars(
    State(state): State<AppState>,
    identity: Identity,
    method: Method,
) -> ApiResult<Json<Value>> {
    require_method(&method, Method::GET)?;
    let jars = state.api_for(&identity).jars().await?;
    Ok(Json(json!({ "jars": jars })))
}

pub async fn get_job(
    State(state): State<AppState>,
    identity: Identity,
    method: Method,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    require_method(&method, Method::GET)?;

    let results = match state.api_for(&identity).job(&job_id).await {
        Ok(results) => results,
        // Unknown or failed jobs come back as an error status with a JSON body
        Err(err) => err.into_payload()?,
    };

    Ok(Json(json!({ "results": results })))
}

pub async fn execute_new(
    State(state): State<AppState>,
    identity: Identity,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    execute(state, identity, None, request).await
}

pub async fn execute_design(
    State(state): State<AppState>,
    identity: Identity,
    design_id: DesignIdSegment,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    execute(state, identity, Some(design_id), request).await
}

/// Validate a submission against the live jar list and run it.
///
/// Without a design id the submission is kept as an auto design so the
/// response can always name the design that was run.
async fn execute(
    state: AppState,
    identity: Identity,
    design_id: Option<DesignIdSegment>,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    require_method(request.method(), Method::POST)?;

    let existing = match design_id {
        Some(id) => {
            let id = id.parse()?;
            Some(load_owned_design(state.designs.as_ref(), &identity, id).await?)
        }
        None => None,
    };
    let fields: SubmissionFields = read_form(request).await?;

    let mut response = Envelope::failure();
    let api = state.api_for(&identity);

    let app_names = api.jars().await?;
    if app_names.is_empty() {
        response.message = MISSING_JARS.to_string();
        return Ok(Json(response));
    }

    let submission = match validate_submission(&fields, &app_names) {
        Ok(submission) => submission,
        Err(errors) => {
            tracing::debug!(user = identity.user(), errors = %errors, "Rejected job submission");
            response.message = format!("There was an error with your query: {}", errors);
            response.insert("errors", json!(errors));
            return Ok(Json(response));
        }
    };

    let design = match existing {
        Some(design) => design,
        None => {
            state
                .designs
                .create(NewDesign::auto(identity.user(), &submission.to_spark_design()))
                .await?
        }
    };

    match api.submit_job(&submission.to_job_submission()).await {
        Ok(results) => {
            if results.is_started() {
                response.succeed();
                response.insert("results", json!(results));
            } else {
                response.message = results.failure_message();
            }
            response.insert("design", json!(design.id));
        }
        Err(err) => {
            tracing::warn!(
                design_id = design.id,
                error_type = err.error_type(),
                error = %err,
                "Job submission failed"
            );
            response.message = err.to_string();
        }
    }

    tracing::info!(
        user = identity.user(),
        design_id = design.id,
        app_name = %submission.app_name,
        started = response.status == Envelope::SUCCESS,
        "Executed design"
    );

    Ok(Json(response))
}
