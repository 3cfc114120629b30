//! Session acquisition, persistence, and two-factor resolution.

mod auth;
mod store;
mod two_factor;

pub use auth::acquire;
pub use store::{SessionStore, StoreError};
pub use two_factor::{Challenge, TwoFactorError, TwoFactorResolver, derive_totp_at};
