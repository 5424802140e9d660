//! Credential persistence.
//!
//! The auth service persists the credential record on every committed
//! mutation. The store must therefore be cheap to call and must never leave a
//! half-written record behind that a later load would misinterpret.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::Result;
use crate::platform::PlatformType;

use super::types::TwitchCredentials;

/// Durable storage for one credential record per platform.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the persisted record for a platform. A missing record loads as an
    /// empty one.
    async fn load(&self, platform: PlatformType) -> Result<TwitchCredentials>;

    /// Replace the persisted record for a platform.
    async fn save(&self, platform: PlatformType, credentials: &TwitchCredentials) -> Result<()>;
}

/// JSON-file-backed credential store, one file per platform under a data
/// directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    data_dir: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at `data_dir`. The directory is created lazily on
    /// the first save.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory the credential files live in.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn credentials_path(&self, platform: PlatformType) -> PathBuf {
        self.data_dir
            .join(format!("credentials-{}.json", platform.as_str()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, platform: PlatformType) -> Result<TwitchCredentials> {
        let path = self.credentials_path(platform);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credentials file, starting empty");
                return Ok(TwitchCredentials::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<TwitchCredentials>(&contents) {
            Ok(mut credentials) => {
                credentials.normalize();
                Ok(credentials)
            }
            Err(e) => {
                // A corrupt file is not recoverable; treat it like a logout
                // rather than failing startup.
                error!(path = %path.display(), error = %e, "corrupt credentials file, ignoring it");
                Ok(TwitchCredentials::default())
            }
        }
    }

    async fn save(&self, platform: PlatformType, credentials: &TwitchCredentials) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let contents = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(self.credentials_path(platform), contents).await?;
        Ok(())
    }
}
