//! Token persistence
//!
//! Two key-value backing stores hold at most one live auth token between
//! them: a durable store that survives restarts and a session-scoped store
//! rooted in the OS temp directory. The [`TokenVault`] adapter implements
//! the save/load/clear contract over any pair of stores.

use async_trait::async_trait;
use realto_core::{ErrorContext, RealtoError, RealtoResult, TOKEN_STORAGE_KEY};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// One backing key-value store for the auth token
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the stored token. `Ok(None)` means the key is absent.
    async fn read(&self) -> RealtoResult<Option<String>>;

    /// Write the token under the well-known key.
    async fn write(&self, token: &str) -> RealtoResult<()>;

    /// Remove the key. Removing an absent key is not an error.
    async fn remove(&self) -> RealtoResult<()>;

    /// Store label for diagnostics.
    fn label(&self) -> &'static str;
}

/// File-backed token store
///
/// The durable variant lives under the configured data directory; the
/// session-scoped variant lives under a temp-rooted directory that does not
/// outlive the OS session. Both use the same key as the file name.
pub struct FileTokenStore {
    path: PathBuf,
    label: &'static str,
}

impl FileTokenStore {
    /// Durable store: survives application restarts.
    pub fn durable(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_STORAGE_KEY),
            label: "durable",
        }
    }

    /// Session-scoped store: cleared together with the OS temp directory.
    pub fn session_scoped(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_STORAGE_KEY),
            label: "session",
        }
    }

    fn storage_error(&self, operation: &str, error: std::io::Error) -> RealtoError {
        RealtoError::Storage {
            message: format!("{} store {} failed: {}", self.label, operation, error),
            source: Some(Box::new(error)),
            context: ErrorContext::new("file_token_store")
                .with_operation(operation)
                .with_suggestion("Check permissions on the token store directory"),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn read(&self) -> RealtoResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim().to_string();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token))
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.storage_error("read", error)),
        }
    }

    async fn write(&self, token: &str) -> RealtoResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_error("write", e))?;
        }

        tokio::fs::write(&self.path, token)
            .await
            .map_err(|e| self.storage_error("write", e))
    }

    async fn remove(&self) -> RealtoResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.storage_error("remove", error)),
        }
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

/// In-process token store, used by tests and as an explicit opt-out of
/// persistence.
#[derive(Default)]
pub struct MemoryTokenStore {
    cell: std::sync::Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn read(&self) -> RealtoResult<Option<String>> {
        Ok(self.cell.lock().unwrap().clone())
    }

    async fn write(&self, token: &str) -> RealtoResult<()> {
        *self.cell.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> RealtoResult<()> {
        *self.cell.lock().unwrap() = None;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "memory"
    }
}

/// Adapter over the durable and session-scoped stores
///
/// Invariant: at most one store holds the live token; writing one never
/// writes the other.
#[derive(Clone)]
pub struct TokenVault {
    durable: Arc<dyn TokenStore>,
    session: Arc<dyn TokenStore>,
}

impl TokenVault {
    pub fn new(durable: Arc<dyn TokenStore>, session: Arc<dyn TokenStore>) -> Self {
        Self { durable, session }
    }

    /// Persist the token in exactly one store, chosen by `durable`.
    pub async fn save(&self, token: &str, durable: bool) -> RealtoResult<String> {
        let target = if durable { &self.durable } else { &self.session };

        target.write(token).await?;
        debug!(store = target.label(), "Stored auth token");

        Ok(token.to_string())
    }

    /// Load the token, trying the durable store first and falling back to
    /// the session-scoped store. Fails only when both stores come up empty
    /// or broken.
    pub async fn load(&self) -> RealtoResult<String> {
        match self.durable.read().await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => debug!(store = self.durable.label(), "No stored token"),
            Err(error) => warn!(
                store = self.durable.label(),
                error = %error,
                "Token store read failed, falling back"
            ),
        }

        match self.session.read().await? {
            Some(token) => Ok(token),
            None => Err(RealtoError::Storage {
                message: "No stored token in either store".to_string(),
                source: None,
                context: ErrorContext::new("token_vault")
                    .with_operation("load")
                    .with_suggestion("Log in to obtain a new token"),
            }),
        }
    }

    /// Remove the token from both stores. Both removals always run, and
    /// both must confirm before the clear reports success; the first
    /// failure is reported after the other store has been given its chance.
    pub async fn clear(&self) -> RealtoResult<()> {
        let (durable, session) = tokio::join!(self.durable.remove(), self.session.remove());

        durable.and(session)
    }
}
