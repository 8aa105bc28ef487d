//! Application context: the single owned instance of the API client and
//! session store for one run of the client.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::{FileTokenStore, KeyringTokenStore, SessionStore, TokenStore};
use crate::config::{Config, TokenBackend};

pub struct AppContext {
    pub api: ApiClient,
    pub session: SessionStore,
}

impl AppContext {
    /// Build the context from configuration, choosing the token backend
    /// it names. The session is not hydrated yet.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_url = config.api_url();
        let api = ApiClient::with_timeout(&api_url, config.request_timeout())?;

        let tokens: Arc<dyn TokenStore> = match config.token_backend {
            TokenBackend::File => {
                let store = FileTokenStore::for_origin(&config.data_dir()?, api.base_url());
                debug!(path = ?store.path(), "Using file token store");
                Arc::new(store)
            }
            TokenBackend::Keyring => {
                debug!("Using keychain token store");
                Arc::new(KeyringTokenStore::for_origin(api.base_url()))
            }
        };

        info!(api_url = %api_url, "Client configured");
        Ok(Self::assemble(api, tokens))
    }

    /// Build the context around an explicit token store
    pub fn with_token_store(api_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let api = ApiClient::new(api_url).context("Failed to create API client")?;
        Ok(Self::assemble(api, tokens))
    }

    fn assemble(api: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        let api = api.with_token_store(tokens.clone());
        // Clones share the default header, so the session store and direct
        // callers of `api` always see the same token
        let session = SessionStore::new(Arc::new(api.clone()), tokens);
        Self { api, session }
    }
}
