use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::token_store::TokenStore;
use forum_core::{
    CoreError, ErrorExt, ForumApiError, ForumConfig, PostRecord, SettingsProvider, TokenPair,
    FORUM_ACCESS_TOKEN, FORUM_REFRESH_TOKEN,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";
const VERIFY_TOKEN_PATH: &str = "/auth/verify-token";
const CREATE_POST_PATH: &str = "/community/create-post";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    #[serde(default)]
    success: bool,
    data: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: PostRecord,
}

/// Authenticated access to the forum API.
///
/// Any request answered with 401 is reissued exactly once after a
/// successful token refresh; a second 401 surfaces as
/// [`ForumApiError::AuthExpired`].
pub struct ForumClient {
    http_client: Client,
    base_url: String,
    tokens: RwLock<TokenPair>,
    token_store: Option<TokenStore>,
    settings: Option<Arc<dyn SettingsProvider>>,
    metrics: Arc<MetricsCollector>,
}

impl fmt::Debug for ForumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForumClient")
            .field("base_url", &self.base_url)
            .field("token_store", &self.token_store)
            .field("mirrors_settings", &self.settings.is_some())
            .finish_non_exhaustive()
    }
}

impl ForumClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenPair) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(concat!("forum-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: RwLock::new(tokens),
            token_store: None,
            settings: None,
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn from_config(config: &ForumConfig) -> Result<Self, CoreError> {
        Self::new(
            config.api_base_url.clone(),
            TokenPair::new(config.access_token.clone(), config.refresh_token.clone()),
        )
    }

    /// Persist every refreshed token pair to `store`.
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Mirror every refreshed token pair into `settings`.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    pub async fn get_tokens(&self) -> TokenPair {
        self.tokens.read().await.clone()
    }

    /// Refresh first, then create the post. A failed refresh is logged and the
    /// current token is used; the 401 retry still applies.
    pub async fn create_post(
        &self,
        title: &str,
        description: &str,
    ) -> Result<PostRecord, CoreError> {
        if !self.refresh_tokens().await {
            warn!("Token refresh before posting failed, continuing with current token");
        }

        let body = json!({ "title": title, "description": description });
        let endpoint = self.versioned_path(CREATE_POST_PATH);

        let response = match self.send_authorized(Method::POST, &endpoint, Some(&body)).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error creating forum post: {}", e);
                return Err(e);
            }
        };

        let created: CreatePostResponse = response.json().await.map_err(|e| {
            error!("Failed to parse create post response: {}", e);
            ForumApiError::InvalidResponse {
                details: "Failed to parse created post".to_string(),
            }
        })?;

        info!("Forum post created successfully: {}", created.data.id);
        Ok(created.data)
    }

    /// Probe the verify endpoint and refresh when the token looks stale.
    ///
    /// 401 and 404 both lead to a refresh, as does any unexpected failure.
    /// Returns whether a usable token is now held.
    pub async fn refresh_token_if_needed(&self) -> bool {
        info!("Checking if token refresh is needed...");
        let endpoint = self.versioned_path(VERIFY_TOKEN_PATH);
        let access_token = self.tokens.read().await.access_token.clone();

        match self
            .dispatch(Method::GET, &endpoint, &access_token, None, false)
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("Token is valid");
                true
            }
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                info!("Token appears to be invalid, refreshing...");
                self.refresh_tokens().await
            }
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                warn!("Verify token endpoint not found, attempting to refresh token directly");
                self.refresh_tokens().await
            }
            Ok(response) => {
                warn!(
                    "Could not verify token (status {}), refreshing anyway",
                    response.status()
                );
                self.refresh_tokens().await
            }
            Err(e) => {
                warn!("Could not verify/refresh token: {}", e);
                self.refresh_tokens().await
            }
        }
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// On success both tokens are replaced together, persisted and mirrored
    /// into settings. On any failure the held tokens are left untouched and
    /// `false` is returned.
    pub async fn refresh_tokens(&self) -> bool {
        info!("Refreshing forum access token...");
        let new_tokens = match self.exchange_refresh_token().await {
            Ok(tokens) => tokens,
            Err(e) => {
                e.log_warn();
                self.metrics.record_refresh(false).await;
                return false;
            }
        };

        *self.tokens.write().await = new_tokens.clone();
        if let Some(store) = &self.token_store {
            store.save_or_log(&new_tokens);
        }
        if let Some(settings) = &self.settings {
            settings.set(FORUM_ACCESS_TOKEN, &new_tokens.access_token);
            settings.set(FORUM_REFRESH_TOKEN, &new_tokens.refresh_token);
        }
        self.metrics.record_refresh(true).await;

        info!("Forum tokens refreshed successfully");
        true
    }

    async fn exchange_refresh_token(&self) -> Result<TokenPair, CoreError> {
        let refresh_token = self.tokens.read().await.refresh_token.clone();
        let url = format!("{}{}", self.base_url, REFRESH_TOKEN_PATH);
        let start_time = Instant::now();

        let result = self
            .http_client
            .post(&url)
            .json(&RefreshTokenRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await;

        let status_code = result.as_ref().ok().map(|r| r.status().as_u16());
        self.metrics
            .record_request(RequestMetrics {
                endpoint: REFRESH_TOKEN_PATH.to_string(),
                method: Method::POST.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: result.as_ref().map(|r| r.status().is_success()).unwrap_or(false),
                auth_retry: false,
            })
            .await;

        let response = check_status(result?, REFRESH_TOKEN_PATH).await?;
        let parsed: RefreshTokenResponse =
            response
                .json()
                .await
                .map_err(|e| ForumApiError::InvalidResponse {
                    details: format!("Malformed token refresh response: {}", e),
                })?;

        match parsed {
            RefreshTokenResponse {
                success: true,
                data: Some(tokens),
            } if tokens.is_complete() => Ok(tokens),
            _ => Err(ForumApiError::RefreshRejected.into()),
        }
    }

    /// Send with the current access token, retrying once after a 401.
    async fn send_authorized(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CoreError> {
        let mut is_retry = false;

        loop {
            let access_token = self.tokens.read().await.access_token.clone();
            let response = self
                .dispatch(method.clone(), endpoint, &access_token, body, is_retry)
                .await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return check_status(response, endpoint).await;
            }

            if is_retry {
                error!("Request to {} unauthorized again after refresh", endpoint);
                return Err(ForumApiError::AuthExpired.into());
            }

            warn!("Request to {} unauthorized, refreshing tokens", endpoint);
            if !self.refresh_tokens().await {
                return Err(ForumApiError::Unauthorized {
                    endpoint: endpoint.to_string(),
                }
                .into());
            }
            is_retry = true;
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        body: Option<&serde_json::Value>,
        auth_retry: bool,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        debug!("Making forum API request: {} {}", method, endpoint);
        let result = request_builder.send().await;

        let status_code = result.as_ref().ok().map(|r| r.status().as_u16());
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: result.as_ref().map(|r| r.status().is_success()).unwrap_or(false),
                auth_retry,
            })
            .await;

        result.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::ForumApi(ForumApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })
    }

    /// The forum nests some routes under `/v1` when the base URL is versioned.
    fn versioned_path(&self, path: &str) -> String {
        if self.base_url.contains("/v1") {
            format!("/v1{}", path)
        } else {
            path.to_string()
        }
    }
}

async fn check_status(response: Response, endpoint: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!("Request failed with status: {} for {}", status, endpoint);
    let error = if status == StatusCode::NOT_FOUND {
        ForumApiError::EndpointNotFound {
            endpoint: endpoint.to_string(),
        }
    } else if status.is_server_error() {
        ForumApiError::ServerError {
            status_code: status.as_u16(),
        }
    } else {
        ForumApiError::RequestFailed {
            status_code: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        }
    };
    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_paths() {
        let client =
            ForumClient::new("https://forum.example/api/v1/", TokenPair::new("a", "r")).unwrap();
        assert_eq!(client.base_url, "https://forum.example/api/v1");
        assert_eq!(
            client.versioned_path(VERIFY_TOKEN_PATH),
            "/v1/auth/verify-token"
        );

        let client =
            ForumClient::new("https://forum.example/api", TokenPair::new("a", "r")).unwrap();
        assert_eq!(
            client.versioned_path(CREATE_POST_PATH),
            "/community/create-post"
        );
    }

    #[test]
    fn test_client_creation() {
        let client = ForumClient::new("https://forum.example/api", TokenPair::new("a", "r"))
            .unwrap();
        assert_eq!(
            tokio_test::block_on(client.get_tokens()),
            TokenPair::new("a", "r")
        );

        let metrics = tokio_test::block_on(client.metrics().get_metrics());
        assert_eq!(metrics.total_requests, 0);
    }
}
