//! Known business-rejection table.
//!
//! Backend-reported policy refusals map to user-facing explanations and
//! are never retried.

/// Substring → explanation pairs, checked in order.
const KNOWN_ERRORS: &[(&str, &str)] = &[
    (
        "One share buy orders for this security must be phoned into a representative.",
        "Order failed: One share buy orders must be phoned in.",
    ),
    (
        "This order may result in an oversold/overbought position in your account.",
        "Order failed: This may result in an oversold/overbought position.",
    ),
    (
        "cannot be traded",
        "Order failed: this security cannot be traded here.",
    ),
];

/// Look up a user-facing explanation for backend rejection messages.
///
/// Matching is substring-based because backends embed the canonical text
/// inside larger sentences.
#[must_use]
pub fn classify(messages: &[String]) -> Option<&'static str> {
    for (needle, explanation) in KNOWN_ERRORS {
        if messages
            .iter()
            .any(|message| message.to_lowercase().contains(&needle.to_lowercase()))
        {
            return Some(explanation);
        }
    }
    None
}
