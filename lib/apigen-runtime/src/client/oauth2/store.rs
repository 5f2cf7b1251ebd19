//! Persistence of the current OAuth2 access token.

use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::TokenStoreError;
use super::token::AccessToken;

/// Storage for the access token of one set of OAuth2 credentials.
///
/// A store is shared by every request signed with those credentials.
#[async_trait]
pub trait TokenStore: fmt::Debug + Send + Sync {
    /// Returns the stored token.
    ///
    /// # Errors
    ///
    /// Fails when no token is stored or the backing storage cannot be read.
    async fn get(&self) -> Result<AccessToken, TokenStoreError>;

    /// Replaces the stored token.
    ///
    /// # Errors
    ///
    /// Fails when the backing storage cannot be written.
    async fn persist(&self, token: AccessToken) -> Result<(), TokenStoreError>;

    /// Removes the stored token.
    ///
    /// # Errors
    ///
    /// Fails when the backing storage cannot be removed.
    async fn remove(&self) -> Result<(), TokenStoreError>;
}

/// Process-lifetime token store with a single slot.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Option<AccessToken>>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding an initial token.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token))),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<AccessToken, TokenStoreError> {
        let guard = self.inner.read().await;
        guard.clone().ok_or(TokenStoreError::NotFound)
    }

    async fn persist(&self, token: AccessToken) -> Result<(), TokenStoreError> {
        let mut guard = self.inner.write().await;
        *guard = Some(token);
        Ok(())
    }

    async fn remove(&self) -> Result<(), TokenStoreError> {
        let mut guard = self.inner.write().await;
        *guard = None;
        Ok(())
    }
}

/// Token store backed by a JSON file.
///
/// Every call reads or writes the whole file. There is no locking: concurrent
/// writers, in this process or another, can interleave.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store for the given file path.
    ///
    /// The file is not touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<AccessToken, TokenStoreError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        serde_json::from_slice(&data).map_err(|source| TokenStoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    async fn persist(&self, token: AccessToken) -> Result<(), TokenStoreError> {
        let raw = serde_json::to_vec(&token).map_err(|source| TokenStoreError::Encode { source })?;

        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| self.io_error(source))
    }

    async fn remove(&self) -> Result<(), TokenStoreError> {
        tokio::fs::remove_file(&self.path)
            .await
            .map_err(|source| self.io_error(source))
    }
}

/// Reference-counted handle to a [`TokenStore`].
///
/// Defaults to an empty [`MemoryTokenStore`].
#[derive(Debug, Clone)]
pub struct SharedTokenStore(Arc<dyn TokenStore>);

impl SharedTokenStore {
    /// Wraps a token store.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Default for SharedTokenStore {
    fn default() -> Self {
        Self::new(MemoryTokenStore::new())
    }
}

impl Deref for SharedTokenStore {
    type Target = dyn TokenStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl From<MemoryTokenStore> for SharedTokenStore {
    fn from(store: MemoryTokenStore) -> Self {
        Self::new(store)
    }
}

impl From<FileTokenStore> for SharedTokenStore {
    fn from(store: FileTokenStore) -> Self {
        Self::new(store)
    }
}

impl From<Arc<dyn TokenStore>> for SharedTokenStore {
    fn from(store: Arc<dyn TokenStore>) -> Self {
        Self(store)
    }
}
