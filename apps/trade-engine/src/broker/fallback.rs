//! Ordered-fallback evaluation.
//!
//! One generic "first match" helper replaces ad-hoc nested retry blocks:
//! candidates are tried in declared order with a bounded number of attempts
//! (one per candidate) and an explicit delay between attempts. Used for
//! endpoint-generation fallback (new API, then old) and session-liveness
//! probing.

use std::time::Duration;

/// Evaluate candidates in order, returning the first success.
///
/// On total failure, every candidate's error is returned in order so the
/// caller can log the whole chain.
pub async fn first_match<C, T, E, F, Fut>(
    candidates: &[C],
    delay_between: Duration,
    mut eval: F,
) -> Result<T, Vec<E>>
where
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut errors = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        if index > 0 && !delay_between.is_zero() {
            tokio::time::sleep(delay_between).await;
        }

        match eval(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => errors.push(e),
        }
    }

    Err(errors)
}
