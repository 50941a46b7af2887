use crate::accounts::AccountError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage for account tokens, keyed by [`Account::secret_key`].
///
/// [`Account::secret_key`]: crate::accounts::Account::secret_key
pub trait SecretStore: Send + Sync {
    fn store(&self, key: &str, secret: &str) -> Result<(), AccountError>;

    /// Returns `Ok(None)` when nothing is stored under `key`
    fn load(&self, key: &str) -> Result<Option<String>, AccountError>;

    fn delete(&self, key: &str) -> Result<(), AccountError>;
}

/// Process-local store, used by tests and when no keychain is available
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.secrets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecretStore for MemorySecretStore {
    fn store(&self, key: &str, secret: &str) -> Result<(), AccountError> {
        if secret.is_empty() {
            return Err(AccountError::EmptySecret);
        }
        self.lock().insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, AccountError> {
        Ok(self.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), AccountError> {
        self.lock().remove(key);
        Ok(())
    }
}
