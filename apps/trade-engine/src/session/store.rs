//! File-backed persistence for per-identity session artifacts.
//!
//! One JSON file per `(brokerage, login label)` under the creds directory.
//! Artifact contents are opaque to the store; each backend owns its own
//! shape (token struct, cookie list).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Session artifact store keyed by identity cache key.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

/// Store operation failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No artifact is persisted under the key.
    #[error("no session artifact for {key}")]
    NotFound {
        /// Cache key that missed.
        key: String,
    },

    /// Artifact exists but is not readable as the expected shape.
    #[error("session artifact for {key} is corrupt: {message}")]
    Corrupt {
        /// Cache key of the bad artifact.
        key: String,
        /// Decode failure detail.
        message: String,
    },

    /// Filesystem failure.
    #[error("session store I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist an artifact, overwriting any previous one for the key.
    ///
    /// Writes to a temp file and renames so a crash never leaves a
    /// half-written artifact behind.
    pub fn store<T: Serialize>(&self, key: &str, artifact: &T) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(artifact).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Restore the artifact for a key.
    pub fn restore<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let path = self.path_for(key);
        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        serde_json::from_slice(&body).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Drop the artifact for a key, if present.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are login labels like "SoFi 2"; strip path separators only.
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct TokenArtifact {
        access_token: String,
        expires_at: i64,
    }

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trips_artifacts() {
        let (_dir, store) = store();
        let artifact = TokenArtifact {
            access_token: "tok".to_string(),
            expires_at: 123,
        };

        store.store("Robinhood 1", &artifact).unwrap();
        let restored: TokenArtifact = store.restore("Robinhood 1").unwrap();
        assert_eq!(restored, artifact);
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, store) = store();
        let err = store.restore::<TokenArtifact>("Schwab 1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn corrupt_artifact_is_distinguished_from_missing() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("SoFi 1.json"), b"not json").unwrap();

        let err = store.restore::<TokenArtifact>("SoFi 1").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn store_overwrites_unconditionally() {
        let (_dir, store) = store();
        let first = TokenArtifact {
            access_token: "old".to_string(),
            expires_at: 1,
        };
        let second = TokenArtifact {
            access_token: "new".to_string(),
            expires_at: 2,
        };

        store.store("Schwab 1", &first).unwrap();
        store.store("Schwab 1", &second).unwrap();

        let restored: TokenArtifact = store.restore("Schwab 1").unwrap();
        assert_eq!(restored, second);
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = store();
        store.remove("Robinhood 1").unwrap();

        store
            .store(
                "Robinhood 1",
                &TokenArtifact {
                    access_token: "tok".to_string(),
                    expires_at: 1,
                },
            )
            .unwrap();
        store.remove("Robinhood 1").unwrap();
        store.remove("Robinhood 1").unwrap();

        let err = store.restore::<TokenArtifact>("Robinhood 1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn keys_with_separators_cannot_escape_the_dir() {
        let (dir, store) = store();
        store
            .store(
                "../escape",
                &TokenArtifact {
                    access_token: "tok".to_string(),
                    expires_at: 1,
                },
            )
            .unwrap();

        assert!(dir.path().join(".._escape.json").exists());
    }
}
