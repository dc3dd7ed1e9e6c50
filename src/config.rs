use std::net::SocketAddr;
use std::time::Duration;

/// Connection settings for the remote Spark job server.
#[derive(Debug, Clone)]
pub struct JobServerConfig {
    /// Base URL of the job server REST API (e.g., "http://localhost:8090")
    pub url: String,
    /// Timeout applied to every outbound request
    pub request_timeout_ms: u64,
    /// Forward the authenticated user as `doAs` on every call.
    pub impersonation: bool,
}

impl Default for JobServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090".to_string(),
            request_timeout_ms: 30_000,
            impersonation: false,
        }
    }
}

impl JobServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Resources requested for a new context when the form leaves them out.
#[derive(Debug, Clone)]
pub struct ContextDefaults {
    /// Memory per node (e.g., "512m")
    pub mem_per_node: String,
    /// Number of CPU cores
    pub num_cores: String,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            mem_per_node: "512m".to_string(),
            num_cores: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkbenchConfig {
    pub listen_addr: SocketAddr,
    pub job_server: JobServerConfig,
    pub contexts: ContextDefaults,
    /// User assumed when a request carries no identity header.
    /// `None` means such requests are rejected.
    pub default_user: Option<String>,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            job_server: JobServerConfig::default(),
            contexts: ContextDefaults::default(),
            default_user: None,
        }
    }
}

impl WorkbenchConfig {
    pub fn new(listen_addr: SocketAddr, job_server_url: impl Into<String>) -> Self {
        Self {
            listen_addr,
            job_server: JobServerConfig {
                url: job_server_url.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }
}
