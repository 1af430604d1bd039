//! REST client for the orchestration manager.
//!
//! [`ManagerClient`] implements [`ExecutionService`] and
//! [`DeploymentDirectory`] on top of the manager's JSON API.
//!
//! # Example
//!
//! ```rust,no_run
//! use orch_cli::api::DeploymentDirectory;
//! use orch_cli::client::ManagerClient;
//! use orch_cli::config::ClientConfig;
//!
//! # async fn example() -> Result<(), orch_cli::CliError> {
//! let client = ManagerClient::new(&ClientConfig::new("http://localhost:80"))?;
//! for deployment in client.list_deployments().await? {
//!     println!("{}", deployment.id);
//! }
//! # Ok(())
//! # }
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::api::{
    Deployment, DeploymentDirectory, EventPage, EventQuery, Execution, ExecutionService,
    NodeInstance, StartExecution,
};
use crate::config::ClientConfig;
use crate::error::CliError;
use crate::events::Event;

/// REST API version prefix.
pub const API_VERSION: &str = "v3.1";

/// Header carrying the tenant name.
const TENANT_HEADER: &str = "tenant";

/// Manager REST client.
#[derive(Debug, Clone)]
pub struct ManagerClient {
    http: reqwest::Client,
    base_url: Url,
}

/// Envelope of every list endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
    #[serde(default)]
    metadata: ListMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ListMetadata {
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    total: Option<usize>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ExecutionAction {
    action: &'static str,
}

impl ManagerClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, CliError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| CliError::Config(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(tenant) = &config.tenant {
            let value = HeaderValue::from_str(tenant)
                .map_err(|e| CliError::Config(format!("invalid tenant: {e}")))?;
            headers.insert(HeaderName::from_static(TENANT_HEADER), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CliError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(config.base_url())
            .map_err(|e| CliError::Config(format!("invalid manager URL: {e}")))?;

        Ok(Self { http, base_url })
    }

    /// Builds `<base>/api/<version>/<segments..>`, percent-encoding each
    /// segment so IDs cannot escape their path position.
    fn url(&self, segments: &[&str]) -> Result<Url, CliError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CliError::Config(format!("invalid manager URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", API_VERSION])
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CliError> {
        let response = request.send().await?;
        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "received response");

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, CliError> {
        let url = self.url(path)?;
        debug!(url = %url, "GET");
        self.send(self.http.get(url).query(query)).await
    }

    async fn post_json<B, T>(&self, path: &[&str], body: &B) -> Result<T, CliError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!(url = %url, "POST");
        self.send(self.http.post(url).json(body)).await
    }
}

/// Turns a non-success response into an error, preferring the manager's own
/// message when the body carries one.
fn api_error(status: StatusCode, body: &str) -> CliError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    CliError::Api {
        status: status.as_u16(),
        message,
    }
}

fn event_query_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("execution_id", query.execution_id.clone()),
        ("_offset", query.offset.to_string()),
        ("_size", query.size.to_string()),
        ("_sort", "@timestamp".to_string()),
    ];
    params.extend(query.kinds().iter().map(|k| ("type", k.as_str().to_string())));
    params
}

impl ExecutionService for ManagerClient {
    async fn start(&self, request: StartExecution) -> Result<Execution, CliError> {
        self.post_json(&["executions"], &request).await
    }

    async fn get(&self, execution_id: &str) -> Result<Execution, CliError> {
        self.get_json(&["executions", execution_id], &[]).await
    }

    async fn list(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>, CliError> {
        let query: Vec<(&str, String)> = deployment_id
            .map(|d| ("deployment_id", d.to_string()))
            .into_iter()
            .collect();
        let response: ListResponse<Execution> = self.get_json(&["executions"], &query).await?;
        Ok(response.items)
    }

    async fn cancel(&self, execution_id: &str, force: bool) -> Result<Execution, CliError> {
        let action = ExecutionAction {
            action: if force { "force-cancel" } else { "cancel" },
        };
        self.post_json(&["executions", execution_id], &action)
            .await
    }

    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, CliError> {
        let response: ListResponse<Event> = self
            .get_json(&["events"], &event_query_params(query))
            .await?;
        let total = response
            .metadata
            .pagination
            .total
            .unwrap_or(query.offset + response.items.len());
        Ok(EventPage {
            items: response.items,
            total,
        })
    }
}

impl DeploymentDirectory for ManagerClient {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, CliError> {
        match self.get_json(&["deployments", deployment_id], &[]).await {
            Err(e) if e.is_not_found() => Err(CliError::DeploymentNotFound(deployment_id.to_string())),
            other => other,
        }
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, CliError> {
        let response: ListResponse<Deployment> = self.get_json(&["deployments"], &[]).await?;
        Ok(response.items)
    }

    async fn list_node_instances(&self, deployment_id: &str) -> Result<Vec<NodeInstance>, CliError> {
        let query = [("deployment_id", deployment_id.to_string())];
        let response: ListResponse<NodeInstance> =
            self.get_json(&["node-instances"], &query).await?;
        Ok(response.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_rejects_invalid_url() {
        let err = ManagerClient::new(&ClientConfig::new("ftp://manager")).unwrap_err();
        assert!(err.to_string().contains("invalid manager URL"));
    }

    #[test]
    fn client_rejects_unprintable_token() {
        let config = ClientConfig::new("http://manager").with_token("bad\ntoken");
        let err = ManagerClient::new(&config).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn url_includes_api_version() {
        let client = ManagerClient::new(&ClientConfig::new("http://manager/")).expect("client");
        let url = client.url(&["executions", "e1"]).expect("url");
        assert_eq!(url.as_str(), "http://manager/api/v3.1/executions/e1");
    }

    #[test]
    fn url_keeps_base_path() {
        let client =
            ManagerClient::new(&ClientConfig::new("https://gateway/orchestrator/")).expect("client");
        let url = client.url(&["deployments"]).expect("url");
        assert_eq!(url.as_str(), "https://gateway/orchestrator/api/v3.1/deployments");
    }

    #[test]
    fn url_escapes_ids() {
        let client = ManagerClient::new(&ClientConfig::new("http://manager")).expect("client");
        let url = client.url(&["deployments", "a/b?c#d"]).expect("url");
        assert_eq!(url.as_str(), "http://manager/api/v3.1/deployments/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn api_error_prefers_manager_message() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"workflow not found","error_code":"no_such_workflow"}"#,
        );
        match err {
            CliError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "workflow not found");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn api_error_falls_back_to_body_then_reason() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));

        let err = api_error(StatusCode::NOT_FOUND, "");
        assert!(err.to_string().contains("Not Found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn event_query_params_select_kinds() {
        let query = EventQuery {
            execution_id: "e1".into(),
            offset: 200,
            size: 100,
            include_logs: true,
        };
        let params = event_query_params(&query);
        assert!(params.contains(&("execution_id", "e1".to_string())));
        assert!(params.contains(&("_offset", "200".to_string())));
        assert!(params.contains(&("type", "cloudify_event".to_string())));
        assert!(params.contains(&("type", "cloudify_log".to_string())));

        let query = EventQuery {
            include_logs: false,
            ..query
        };
        let params = event_query_params(&query);
        assert!(!params.contains(&("type", "cloudify_log".to_string())));
    }

    #[test]
    fn list_response_without_metadata() {
        let json = r#"{"items":[{"id":"d1"},{"id":"d2","blueprint_id":"bp"}]}"#;
        let response: ListResponse<Deployment> = serde_json::from_str(json).expect("valid list");
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.metadata.pagination.total, None);
    }

    #[tokio::test]
    async fn unreachable_manager_is_connection_error() {
        let mut config = ClientConfig::new("http://127.0.0.1:1");
        config.request_timeout = std::time::Duration::from_secs(2);
        let client = ManagerClient::new(&config).expect("client");
        let err = client.list_deployments().await.unwrap_err();
        assert!(matches!(err, CliError::Connection(_)));
    }
}
