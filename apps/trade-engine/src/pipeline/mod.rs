//! Per-identity pipelines.
//!
//! Every configured login runs its own login → discover → report/trade
//! pipeline. Identities are isolated: an auth failure aborts only its own
//! pipeline, and the session handle is released on every exit path.

use std::sync::Arc;

use crate::broker::BrokerBackend;
use crate::config::BrokerageConfig;
use crate::error::AuthError;
use crate::executor::{OrderExecutor, SelectionPolicy};
use crate::holdings;
use crate::models::{AccountIdentity, OrderRequest, mask_account};
use crate::notify::Notifier;
use crate::registry::BrokerageRegistry;
use crate::session::{SessionStore, TwoFactorResolver, acquire};

/// What one pass does after login.
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Collect and report holdings.
    Holdings,
    /// Execute an order request.
    Trade(OrderRequest),
}

/// Run every configured identity of one brokerage concurrently.
///
/// Returns one outcome per identity, in configuration order.
pub async fn run_brokerage<B: BrokerBackend + 'static>(
    backend: Arc<B>,
    config: &BrokerageConfig,
    store: Arc<SessionStore>,
    mode: &RunMode,
    two_factor: TwoFactorResolver,
    notifier: Arc<dyn Notifier>,
) -> Vec<(AccountIdentity, Result<(), AuthError>)> {
    let mut handles = Vec::new();

    for (index, credential) in config.credentials.iter().enumerate() {
        let identity = AccountIdentity::new(&config.name, index + 1);
        let policy = SelectionPolicy::resolve(&config.selection, credential);

        let backend = Arc::clone(&backend);
        let store = Arc::clone(&store);
        let notifier = Arc::clone(&notifier);
        let credential = credential.clone();
        let mode = mode.clone();
        let two_factor = two_factor.clone();
        let task_identity = identity.clone();

        let handle = tokio::spawn(async move {
            run_identity(
                &*backend,
                &store,
                &task_identity,
                &credential,
                policy,
                &mode,
                &two_factor,
                &*notifier,
            )
            .await
        });
        handles.push((identity, handle));
    }

    let mut outcomes = Vec::new();
    for (identity, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(AuthError::Unreachable(format!("pipeline task failed: {e}"))),
        };
        outcomes.push((identity, result));
    }
    outcomes
}

/// Run one identity's full pipeline.
///
/// Only an [`AuthError`] aborts the pipeline; every later failure is
/// reported and contained by the collector/executor boundaries.
#[allow(clippy::too_many_arguments)]
pub async fn run_identity<B: BrokerBackend>(
    backend: &B,
    store: &SessionStore,
    identity: &AccountIdentity,
    credential: &crate::config::Credential,
    policy: SelectionPolicy,
    mode: &RunMode,
    two_factor: &TwoFactorResolver,
    notifier: &dyn Notifier,
) -> Result<(), AuthError> {
    notifier.notify(&format!("Logging in to {identity}..."));

    let session = match acquire(backend, store, identity, credential, two_factor, notifier).await {
        Ok(session) => session,
        Err(e) => {
            notifier.notify(&format!("{identity}: unable to log in: {e}"));
            return Err(e);
        }
    };
    notifier.notify(&format!("Logged in to {identity}"));

    let mut registry = BrokerageRegistry::new(identity.clone());
    registry.set_session(session);

    // The registry owns the session; it is taken out for the duration of
    // the pass and released below on every path.
    let Some(session) = registry.take_session() else {
        return Ok(());
    };

    let run_result = run_steps(backend, &session, &mut registry, &policy, mode, notifier).await;

    backend.logout(session).await;
    run_result
}

async fn run_steps<B: BrokerBackend>(
    backend: &B,
    session: &B::Session,
    registry: &mut BrokerageRegistry<B::Session>,
    policy: &SelectionPolicy,
    mode: &RunMode,
    notifier: &dyn Notifier,
) -> Result<(), AuthError> {
    let identity = registry.identity().clone();

    let accounts = backend
        .accounts(session)
        .await
        .map_err(|e| AuthError::Unreachable(format!("account discovery failed: {e}")))?;

    for account in accounts {
        tracing::info!(
            identity = %identity,
            account = %mask_account(&account.number),
            kind = account.kind.as_deref().unwrap_or("unknown"),
            "found account"
        );
        registry.register_account(account);
    }
    notifier.notify(&format!(
        "{identity}: found {} account(s)",
        registry.accounts().len()
    ));

    match mode {
        RunMode::Holdings => {
            holdings::collect(backend, session, registry, notifier).await;
            holdings::report(registry, notifier);
        }
        RunMode::Trade(request) => {
            let executor = OrderExecutor::new(backend, notifier, policy.clone());
            let results = executor
                .execute(&identity, session, registry.accounts(), request)
                .await;

            let failed = results.iter().filter(|r| !r.succeeded).count();
            tracing::info!(
                identity = %identity,
                total = results.len(),
                failed,
                "order pass complete"
            );
        }
    }

    Ok(())
}
