//! API client for communicating with the portfolio REST service.
//!
//! This module provides the `ApiClient` struct: one configured channel to
//! the service with a base URL, a default JSON content type, and bearer
//! token injection on every request.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::models::{
    AssetMatch, Credentials, LoginResponse, PortfolioSnapshot, Quote, RegisterRequest,
    TradeOrder, TradeReceipt, TradeSide,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when neither config nor environment provides one
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the portfolio service.
/// Clone is cheap and clones share the connection pool and the default
/// auth header.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    default_token: Arc<RwLock<Option<String>>>,
    durable: Option<Arc<dyn TokenStore>>,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {}", base_url);
        }

        let mut defaults = header::HeaderMap::new();
        defaults.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(defaults)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            default_token: Arc::new(RwLock::new(None)),
            durable: None,
        })
    }

    /// Also consult durable storage for a token at send time, covering the
    /// window before the session store has configured the default header.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Set or clear the default bearer token for all subsequent requests
    pub fn set_auth_token(&self, token: Option<&str>) {
        let mut slot = self
            .default_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = token.map(str::to_string);
    }

    /// Token currently installed as the default auth header
    pub fn auth_token(&self) -> Option<String> {
        self.default_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resolve the bearer token for one outgoing request.
    ///
    /// The default header is authoritative; durable storage fills in only
    /// when no default is set.
    pub fn resolve_bearer(&self) -> Option<String> {
        let default = self.auth_token();
        // Synchronous file or keychain read on every request
        let durable = self.durable.as_ref().and_then(|store| store.read());
        match (default, durable) {
            (Some(default), Some(durable)) => {
                if default != durable {
                    warn!("Default auth header and stored token disagree, using default header");
                }
                Some(default)
            }
            (Some(default), None) => Some(default),
            (None, durable) => {
                if durable.is_some() {
                    debug!("Using stored token for request");
                }
                durable
            }
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.resolve_bearer() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("bad base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            Self::check_response(response).await.map(Some)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            debug!(url = %url, "GET");
            let response = self
                .client
                .get(url.clone())
                .headers(self.auth_headers()?)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response.json().await?),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    /// POSTs are not retried; trades and registrations are not idempotent.
    async fn post<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;
        Self::check_response(response).await
    }

    // ===== Auth =====

    /// Register a new account. Success carries no further data.
    pub async fn register(&self, user: &RegisterRequest) -> Result<(), ApiError> {
        self.post(&["auth", "register"], user).await?;
        Ok(())
    }

    /// Exchange credentials for an access token
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let response = self.post(&["auth", "login"], credentials).await?;
        let login: LoginResponse = response.json().await?;
        if login.access_token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".into()));
        }
        Ok(login)
    }

    // ===== Portfolio =====

    /// Fetch the authenticated user's portfolio
    pub async fn get_portfolio(&self) -> Result<PortfolioSnapshot, ApiError> {
        self.get(&["portfolio"]).await
    }

    pub async fn trade(&self, side: TradeSide, order: &TradeOrder) -> Result<TradeReceipt, ApiError> {
        let response = self.post(&["portfolio", side.path()], order).await?;
        Ok(response.json().await?)
    }

    pub async fn buy(&self, order: &TradeOrder) -> Result<TradeReceipt, ApiError> {
        self.trade(TradeSide::Buy, order).await
    }

    pub async fn sell(&self, order: &TradeOrder) -> Result<TradeReceipt, ApiError> {
        self.trade(TradeSide::Sell, order).await
    }

    // ===== Market =====

    pub async fn get_quote(&self, ticker: &str) -> Result<Quote, ApiError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(ApiError::InvalidRequest("ticker symbol is required".into()));
        }
        self.get(&["market", "quote", &ticker]).await
    }

    pub async fn search_assets(&self, query: &str) -> Result<Vec<AssetMatch>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidRequest("search query is required".into()));
        }
        self.get(&["market", "search", query]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    #[test]
    fn test_endpoint_joins_segments() {
        let api = ApiClient::new("http://127.0.0.1:5000/api").unwrap();
        assert_eq!(
            api.endpoint(&["auth", "login"]).unwrap().as_str(),
            "http://127.0.0.1:5000/api/auth/login"
        );

        let trailing = ApiClient::new("http://127.0.0.1:5000/api/").unwrap();
        assert_eq!(
            trailing.endpoint(&["portfolio"]).unwrap().as_str(),
            "http://127.0.0.1:5000/api/portfolio"
        );
    }

    #[test]
    fn test_endpoint_escapes_user_input() {
        let api = ApiClient::new("http://127.0.0.1:5000/api").unwrap();
        let url = api.endpoint(&["market", "search", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/market/search/a%2Fb%20c");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_default_header_set_and_clear() {
        let api = ApiClient::new(DEFAULT_API_URL).unwrap();
        assert_eq!(api.auth_token(), None);
        assert!(api.auth_headers().unwrap().get(header::AUTHORIZATION).is_none());

        api.set_auth_token(Some("T1"));
        let headers = api.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer T1");

        api.set_auth_token(None);
        assert!(api.auth_headers().unwrap().get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_clones_share_default_header() {
        let api = ApiClient::new(DEFAULT_API_URL).unwrap();
        let clone = api.clone();
        api.set_auth_token(Some("T1"));
        assert_eq!(clone.auth_token().as_deref(), Some("T1"));
    }

    #[test]
    fn test_resolve_bearer_falls_back_to_durable_store() {
        let store = Arc::new(MemoryTokenStore::with_token("STORED"));
        let api = ApiClient::new(DEFAULT_API_URL)
            .unwrap()
            .with_token_store(store.clone());

        // Before the default header is configured, the stored token is used
        assert_eq!(api.resolve_bearer().as_deref(), Some("STORED"));

        // Once both are set they agree
        api.set_auth_token(Some("STORED"));
        assert_eq!(api.resolve_bearer().as_deref(), Some("STORED"));

        // The default header wins a disagreement
        api.set_auth_token(Some("NEWER"));
        assert_eq!(api.resolve_bearer().as_deref(), Some("NEWER"));

        api.set_auth_token(None);
        store.clear().unwrap();
        assert_eq!(api.resolve_bearer(), None);
    }

    #[test]
    fn test_invalid_token_is_request_error() {
        let api = ApiClient::new(DEFAULT_API_URL).unwrap();
        api.set_auth_token(Some("bad\ntoken"));
        assert!(matches!(api.auth_headers(), Err(ApiError::InvalidRequest(_))));
    }
}
