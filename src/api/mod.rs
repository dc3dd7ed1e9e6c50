//! JSON endpoints of the Spark editor.
//!
//! Every handler checks its HTTP method before doing anything else, so a
//! mismatched request never reaches the job server or the design store.
//! Mutating endpoints answer with an [`Envelope`]; failures that cannot be
//! expressed in the envelope surface as [`ApiError`].

pub mod contexts;
pub mod designs;
pub mod jobs;

use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts, Method},
    routing::any,
    Form, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ContextDefaults;
use crate::design::DesignStore;
use crate::error::{ApiError, ApiResult};
use crate::jobserver::{JobServerApi, JobServerConnector};

pub const API_PREFIX: &str = "/spark/api";

/// Header carrying the user authenticated by the fronting proxy.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn JobServerConnector>,
    pub designs: Arc<dyn DesignStore>,
    pub context_defaults: ContextDefaults,
    pub default_user: Option<String>,
}

impl AppState {
    pub fn new(connector: Arc<dyn JobServerConnector>, designs: Arc<dyn DesignStore>) -> Self {
        Self {
            connector,
            designs,
            context_defaults: ContextDefaults::default(),
            default_user: None,
        }
    }

    pub fn with_context_defaults(mut self, defaults: ContextDefaults) -> Self {
        self.context_defaults = defaults;
        self
    }

    pub fn with_default_user(mut self, user: Option<String>) -> Self {
        self.default_user = user;
        self
    }

    /// Job server API acting for the request's user.
    pub fn api_for(&self, identity: &Identity) -> Arc<dyn JobServerApi> {
        self.connector.connect(identity.user())
    }
}

/// The authenticated user of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    pub fn user(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let header = parts
            .headers
            .get(REMOTE_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        header
            .or_else(|| state.default_user.clone())
            .map(Identity)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Uniform response body of the mutating endpoints: `status` 0 on success,
/// -1 on failure, plus endpoint specific fields.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: i32,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = -1;

    pub fn failure() -> Self {
        Self {
            status: Self::FAILURE,
            message: String::new(),
            extra: Map::new(),
        }
    }

    pub fn succeed(&mut self) {
        self.status = Self::SUCCESS;
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }
}

pub(crate) fn require_method(actual: &Method, expected: Method) -> ApiResult<()> {
    if *actual != expected {
        return Err(ApiError::InvalidMethod(expected));
    }
    Ok(())
}

/// Largest form body accepted, matching axum's default body limit.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Bind the urlencoded form of a request.
///
/// A urlencoded body wins. A request without one (no body, or another
/// content type) binds from its query string, so a bare POST yields an
/// empty form and `DELETE ...?name=x` works.
pub(crate) async fn read_form<T: DeserializeOwned>(request: Request) -> ApiResult<T> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| ApiError::InvalidForm(e.to_string()))?;

    if is_urlencoded(&parts) && !bytes.is_empty() {
        let request = Request::from_parts(parts, Body::from(bytes));
        let Form(fields) = Form::<T>::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::InvalidForm(rejection.body_text()))?;
        return Ok(fields);
    }

    let Query(fields) = Query::<T>::try_from_uri(&parts.uri)
        .map_err(|rejection| ApiError::InvalidForm(rejection.body_text()))?;
    Ok(fields)
}

fn is_urlencoded(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// The `:design_id` path segment, left unparsed so handlers can check the
/// method first and answer a malformed id with a JSON error.
#[derive(Debug, Clone)]
pub struct DesignIdSegment(String);

impl DesignIdSegment {
    pub fn parse(&self) -> ApiResult<u64> {
        self.0
            .parse()
            .map_err(|_| ApiError::InvalidDesignId(self.0.clone()))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DesignIdSegment {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> ApiResult<Self> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::InvalidDesignId(rejection.body_text()))?;
        Ok(Self(raw))
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/jars", any(jobs::list_jars))
        .route("/contexts", any(contexts::list_contexts))
        .route("/contexts/create", any(contexts::create_context))
        .route("/contexts/delete", any(contexts::delete_context))
        .route("/job/:job_id", any(jobs::get_job))
        .route("/execute", any(jobs::execute_new))
        .route("/execute/:design_id", any(jobs::execute_design))
        .route("/save", any(designs::save_new))
        .route("/save/:design_id", any(designs::save_design))
        .route("/design/:design_id", any(designs::fetch_saved_query));

    Router::new().nest(API_PREFIX, routes).with_state(state)
}
