//! Cache-first session acquisition.
//!
//! Restore a persisted artifact and probe it; fall back to a full
//! credential login on any miss, then persist the fresh artifact
//! unconditionally.

use crate::broker::BrokerBackend;
use crate::config::Credential;
use crate::error::AuthError;
use crate::models::AccountIdentity;
use crate::notify::Notifier;

use super::store::{SessionStore, StoreError};
use super::two_factor::TwoFactorResolver;

/// Acquire an authenticated session for one identity.
///
/// This is the only operation whose failure aborts the identity's pipeline;
/// other identities continue independently.
pub async fn acquire<B: BrokerBackend>(
    backend: &B,
    store: &SessionStore,
    identity: &AccountIdentity,
    credential: &Credential,
    two_factor: &TwoFactorResolver,
    notifier: &dyn Notifier,
) -> Result<B::Session, AuthError> {
    let cache_key = identity.cache_key();

    if let Some(session) = try_restore(backend, store, identity, &cache_key).await {
        return Ok(session);
    }

    tracing::info!(identity = %identity, "logging in with credentials");
    let session = backend
        .login(identity, credential, two_factor, notifier)
        .await?;

    // Overwrite whatever artifact was there; the fresh session wins.
    if let Err(e) = store.store(&cache_key, &backend.artifact(&session)) {
        tracing::warn!(identity = %identity, error = %e, "failed to persist session artifact");
    }

    Ok(session)
}

/// Restore-and-probe path. Any failure is a cache miss, not an error.
async fn try_restore<B: BrokerBackend>(
    backend: &B,
    store: &SessionStore,
    identity: &AccountIdentity,
    cache_key: &str,
) -> Option<B::Session> {
    let artifact = match store.restore::<serde_json::Value>(cache_key) {
        Ok(artifact) => artifact,
        Err(StoreError::NotFound { .. }) => return None,
        Err(e) => {
            tracing::warn!(identity = %identity, error = %e, "discarding unreadable session artifact");
            return None;
        }
    };

    let session = match backend.restore_session(artifact).await {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(identity = %identity, error = %e, "cached session could not be revived");
            return None;
        }
    };

    if backend.probe(&session).await {
        tracing::info!(identity = %identity, "restored cached session");
        Some(session)
    } else {
        tracing::info!(identity = %identity, "cached session failed liveness check");
        None
    }
}
