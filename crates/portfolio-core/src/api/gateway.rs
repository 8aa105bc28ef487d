use async_trait::async_trait;

use crate::models::{Credentials, LoginResponse, PortfolioSnapshot, RegisterRequest};

use super::{ApiClient, ApiError};

/// The slice of the remote service the session store depends on.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-process fake.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Set or clear the default bearer token for subsequent requests.
    fn set_auth_token(&self, token: Option<&str>);

    /// Token currently installed as the default header.
    fn auth_token(&self) -> Option<String>;

    async fn register(&self, user: &RegisterRequest) -> Result<(), ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    async fn get_portfolio(&self) -> Result<PortfolioSnapshot, ApiError>;
}

#[async_trait]
impl AuthGateway for ApiClient {
    fn set_auth_token(&self, token: Option<&str>) {
        ApiClient::set_auth_token(self, token);
    }

    fn auth_token(&self) -> Option<String> {
        ApiClient::auth_token(self)
    }

    async fn register(&self, user: &RegisterRequest) -> Result<(), ApiError> {
        ApiClient::register(self, user).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        ApiClient::login(self, credentials).await
    }

    async fn get_portfolio(&self) -> Result<PortfolioSnapshot, ApiError> {
        ApiClient::get_portfolio(self).await
    }
}
