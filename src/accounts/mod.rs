//! Hosting-provider accounts and the token storage seam behind them.

pub mod provider;
pub mod secrets;

pub use provider::{GitProvider, LoginFlow};
pub use secrets::{MemorySecretStore, SecretStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Unknown git provider: {0}")]
    UnknownProvider(String),

    #[error("{0} accounts require a server URL")]
    MissingServerUrl(GitProvider),

    #[error("Login is not supported for {0}")]
    UnsupportedProvider(GitProvider),

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Secret must not be empty")]
    EmptySecret,

    #[error("Secret store error: {0}")]
    Store(String),
}

/// A signed-in user on one hosting provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub provider: GitProvider,
    pub username: String,
    pub server_url: Option<String>,
}

impl Account {
    /// Build an account, checking the provider's login requirements
    pub fn new(
        provider: GitProvider,
        username: impl Into<String>,
        server_url: Option<String>,
    ) -> Result<Self, AccountError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(AccountError::EmptyUsername);
        }

        match provider.login_flow() {
            LoginFlow::Unsupported => return Err(AccountError::UnsupportedProvider(provider)),
            LoginFlow::EnterpriseToken
                if server_url.as_deref().is_none_or(|url| url.trim().is_empty()) =>
            {
                return Err(AccountError::MissingServerUrl(provider));
            }
            _ => {}
        }

        Ok(Self {
            provider,
            username,
            server_url,
        })
    }

    /// Key under which this account's token lives in a [`SecretStore`]
    pub fn secret_key(&self) -> String {
        match &self.server_url {
            Some(server) => format!(
                "{}:{}@{}",
                self.provider.id(),
                self.username,
                server.trim_end_matches('/')
            ),
            None => format!("{}:{}", self.provider.id(), self.username),
        }
    }

    pub fn save_token(&self, store: &dyn SecretStore, token: &str) -> Result<(), AccountError> {
        store.store(&self.secret_key(), token)
    }

    pub fn token(&self, store: &dyn SecretStore) -> Result<Option<String>, AccountError> {
        store.load(&self.secret_key())
    }

    pub fn sign_out(&self, store: &dyn SecretStore) -> Result<(), AccountError> {
        store.delete(&self.secret_key())
    }
}
