use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;

use crate::config::JobServerConfig;
use crate::jobserver::{
    names_from, JobServerApi, JobServerConnector, JobServerError, JobSubmission, Result,
    SubmitResult,
};

/// HTTP client for the Spark job server.
///
/// Cloning is cheap: the underlying connection pool is shared, so a per-request
/// instance from [`JobServerClient::for_user`] costs no new connections.
#[derive(Debug, Clone)]
pub struct JobServerClient {
    http: Client,
    base_url: Url,
    user: Option<String>,
    impersonation: bool,
}

impl JobServerClient {
    pub fn new(config: &JobServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| JobServerError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(JobServerError::InvalidUrl {
                url: config.url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            user: None,
            impersonation: config.impersonation,
        })
    }

    /// A client acting on behalf of `user`.
    pub fn for_user(&self, user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| JobServerError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let mut req = self.http.request(method, url);
        if self.impersonation {
            if let Some(user) = &self.user {
                req = req.query(&[("doAs", user.as_str())]);
            }
        }
        Ok(req)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let response = req.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "Job server responded");

        if !status.is_success() {
            return Err(JobServerError::from_response(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| JobServerError::NotJson {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobServerApi for JobServerClient {
    async fn jars(&self) -> Result<Vec<String>> {
        let body = self.send(self.request(Method::GET, &["jars"])?).await?;
        names_from(body)
    }

    async fn contexts(&self) -> Result<Vec<String>> {
        let body = self.send(self.request(Method::GET, &["contexts"])?).await?;
        names_from(body)
    }

    async fn create_context(
        &self,
        name: &str,
        mem_per_node: &str,
        num_cores: &str,
    ) -> Result<Value> {
        tracing::info!(context = name, mem_per_node, num_cores, "Creating context");
        let req = self.request(Method::POST, &["contexts", name])?.query(&[
            ("memory-per-node", mem_per_node),
            ("num-cpu-cores", num_cores),
        ]);
        self.send(req).await
    }

    async fn delete_context(&self, name: &str) -> Result<Value> {
        tracing::info!(context = name, "Deleting context");
        self.send(self.request(Method::DELETE, &["contexts", name])?)
            .await
    }

    async fn job(&self, job_id: &str) -> Result<Value> {
        self.send(self.request(Method::GET, &["jobs", job_id])?)
            .await
    }

    async fn submit_job(&self, submission: &JobSubmission) -> Result<SubmitResult> {
        let mut req = self.request(Method::POST, &["jobs"])?.query(&[
            ("appName", submission.app_name.as_str()),
            ("classPath", submission.class_path.as_str()),
        ]);
        if let Some(context) = &submission.context {
            req = req.query(&[("context", context.as_str())]);
        }
        let req = req
            .query(&[("sync", if submission.sync { "true" } else { "false" })])
            .body(submission.data.clone());

        tracing::info!(
            app_name = %submission.app_name,
            class_path = %submission.class_path,
            context = ?submission.context,
            "Submitting job"
        );

        let body = self.send(req).await?;
        serde_json::from_value(body).map_err(|e| JobServerError::Decode(e.to_string()))
    }
}

impl JobServerConnector for JobServerClient {
    fn connect(&self, user: &str) -> Arc<dyn JobServerApi> {
        Arc::new(self.for_user(user))
    }
}
