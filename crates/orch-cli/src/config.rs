//! Connection settings for the manager.

use std::time::Duration;

use crate::cli::Cli;
use crate::error::CliError;

/// Manager URL used when neither `--manager` nor `ORCHCTL_MANAGER` is given.
pub const DEFAULT_MANAGER_URL: &str = "http://localhost:80";

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to talk to a manager.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the manager, e.g. `https://manager.example.com`.
    pub manager_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Tenant the requests act on.
    pub tenant: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("manager_url", &self.manager_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("tenant", &self.tenant)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for the given manager URL.
    #[must_use]
    pub fn new(manager_url: impl Into<String>) -> Self {
        Self {
            manager_url: manager_url.into(),
            token: None,
            tenant: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Builds the configuration from parsed global flags.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Self::new(cli.manager.clone());
        if let Some(token) = cli.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
        if let Some(tenant) = cli.tenant.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_tenant(tenant);
        }
        config
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Checks that the manager URL is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the URL is not `http://` or `https://`.
    pub fn validate(&self) -> Result<(), CliError> {
        let url = self.manager_url.as_str();
        let host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.trim_matches('/').is_empty() => Ok(()),
            _ => Err(CliError::Config(format!(
                "invalid manager URL: {url}, must start with http:// or https://"
            ))),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.manager_url.trim_end_matches('/')
    }
}
