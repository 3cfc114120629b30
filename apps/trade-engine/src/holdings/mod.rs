//! Holdings collection and reporting.
//!
//! A collection pass never fails: every per-position problem (missing
//! symbol, price-fetch failure) is caught, logged, and skipped so one bad
//! position cannot abort the pass.

use rust_decimal::Decimal;

use crate::broker::BrokerBackend;
use crate::models::{Holding, mask_account};
use crate::notify::Notifier;
use crate::registry::BrokerageRegistry;

/// Cash rows carry this pseudo-symbol and are never recorded.
const CASH_SYMBOL: &str = "|CASH|";

/// Collect holdings for every account in the registry.
///
/// Symbol resolution order: direct field, instrument lookup, then skip and
/// report the position as unresolved. Quote failures record the 0.00
/// sentinel price instead of aborting.
pub async fn collect<B: BrokerBackend>(
    backend: &B,
    session: &B::Session,
    registry: &mut BrokerageRegistry<B::Session>,
    notifier: &dyn Notifier,
) {
    let identity = registry.identity().clone();
    let accounts: Vec<_> = registry.accounts().to_vec();

    for account in &accounts {
        let positions = match backend.positions(session, account).await {
            Ok(positions) => positions,
            Err(e) => {
                notifier.notify(&format!(
                    "{identity}: error getting holdings for account {}: {e}",
                    mask_account(&account.number)
                ));
                continue;
            }
        };

        for position in positions {
            // Direct symbol field first, instrument lookup second.
            let symbol = match &position.symbol {
                Some(symbol) => Some(symbol.clone()),
                None => match backend.resolve_symbol(session, &position).await {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "instrument lookup failed");
                        None
                    }
                },
            };

            let Some(symbol) = symbol else {
                notifier.notify(&format!(
                    "{identity}: could not determine symbol for a position, skipping"
                ));
                continue;
            };
            if symbol == CASH_SYMBOL {
                continue;
            }
            if position.quantity < Decimal::ZERO {
                tracing::warn!(identity = %identity, symbol, "dropping negative-quantity position");
                continue;
            }

            let price = match position.price {
                Some(price) => price.round_dp(2),
                None => match backend.quote(session, &symbol).await {
                    Ok(quote) => quote.last.map_or_else(
                        || {
                            tracing::warn!(identity = %identity, symbol, "no price data, recording 0.00");
                            Decimal::ZERO
                        },
                        |last| last.round_dp(2),
                    ),
                    Err(e) => {
                        tracing::warn!(identity = %identity, symbol, error = %e, "price fetch failed, recording 0.00");
                        Decimal::ZERO
                    }
                },
            };

            registry.record_holding(
                &account.number,
                Holding {
                    symbol,
                    quantity: position.quantity,
                    price,
                },
            );
        }
    }
}

/// Report the collected holdings through the notifier, masked account
/// numbers, per-account totals last.
pub fn report<S>(registry: &BrokerageRegistry<S>, notifier: &dyn Notifier) {
    let identity = registry.identity();
    notifier.notify(&format!("Holdings for {identity}:"));

    for account in registry.accounts() {
        let masked = mask_account(&account.number);
        let kind = account.kind.as_deref().unwrap_or("Brokerage");
        notifier.notify(&format!("  {kind} account {masked}:"));

        let mut total = Decimal::ZERO;
        for holding in registry.holdings_of(&account.number) {
            let value = holding.market_value();
            total += value;
            notifier.notify(&format!(
                "    {}: {} @ ${} = ${value}",
                holding.symbol, holding.quantity, holding.price
            ));
        }
        notifier.notify(&format!("    Total: ${}", total.round_dp(2)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerError, Capabilities};
    use crate::config::Credential;
    use crate::error::{AuthError, QuoteError};
    use crate::models::{
        Account, AccountIdentity, OrderResponse, OrderTicket, Position, Quote,
    };
    use crate::notify::MemoryNotifier;
    use crate::session::TwoFactorResolver;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    /// Scripted backend: positions per account, quotes per symbol.
    struct ScriptedBackend {
        positions: Vec<Position>,
        quote_fails_for: Vec<String>,
    }

    #[async_trait]
    impl BrokerBackend for ScriptedBackend {
        type Session = ();

        fn name(&self) -> &'static str {
            "Scripted"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }

        async fn restore_session(
            &self,
            _artifact: serde_json::Value,
        ) -> Result<Self::Session, AuthError> {
            Ok(())
        }

        async fn probe(&self, _session: &Self::Session) -> bool {
            true
        }

        async fn login(
            &self,
            _identity: &AccountIdentity,
            _credential: &Credential,
            _two_factor: &TwoFactorResolver,
            _notifier: &dyn Notifier,
        ) -> Result<Self::Session, AuthError> {
            Ok(())
        }

        fn artifact(&self, _session: &Self::Session) -> serde_json::Value {
            serde_json::Value::Null
        }

        async fn logout(&self, _session: Self::Session) {}

        async fn accounts(&self, _session: &Self::Session) -> Result<Vec<Account>, BrokerError> {
            Ok(vec![Account::new("111", dec!(0))])
        }

        async fn positions(
            &self,
            _session: &Self::Session,
            _account: &Account,
        ) -> Result<Vec<Position>, BrokerError> {
            Ok(self.positions.clone())
        }

        async fn resolve_symbol(
            &self,
            _session: &Self::Session,
            position: &Position,
        ) -> Result<Option<String>, BrokerError> {
            Ok(position
                .instrument_ref
                .as_deref()
                .map(|r| r.to_uppercase()))
        }

        async fn quote(&self, _session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError> {
            if self.quote_fails_for.iter().any(|s| s == symbol) {
                return Err(QuoteError::new(symbol, "scripted failure"));
            }
            Ok(Quote {
                bid: None,
                ask: None,
                last: Some(dec!(12.345)),
            })
        }

        async fn submit(
            &self,
            _session: &Self::Session,
            _ticket: &OrderTicket,
        ) -> Result<OrderResponse, BrokerError> {
            Err(BrokerError::Unsupported)
        }
    }

    fn registry_with_account() -> BrokerageRegistry<()> {
        let mut registry = BrokerageRegistry::new(AccountIdentity::new("Scripted", 1));
        registry.register_account(Account::new("111", dec!(0)));
        registry
    }

    #[tokio::test]
    async fn unresolved_symbol_is_skipped_not_fatal() {
        let backend = ScriptedBackend {
            positions: vec![
                Position {
                    symbol: None,
                    instrument_ref: None,
                    quantity: dec!(1),
                    price: None,
                },
                Position {
                    symbol: Some("AAPL".to_string()),
                    instrument_ref: None,
                    quantity: dec!(2),
                    price: None,
                },
            ],
            quote_fails_for: vec![],
        };
        let mut registry = registry_with_account();
        let notifier = MemoryNotifier::new();

        collect(&backend, &(), &mut registry, &notifier).await;

        let holdings = registry.holdings_of("111");
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "AAPL");
        assert!(notifier.saw("could not determine symbol"));
    }

    #[tokio::test]
    async fn instrument_lookup_resolves_missing_symbol() {
        let backend = ScriptedBackend {
            positions: vec![Position {
                symbol: None,
                instrument_ref: Some("msft".to_string()),
                quantity: dec!(3),
                price: None,
            }],
            quote_fails_for: vec![],
        };
        let mut registry = registry_with_account();
        let notifier = MemoryNotifier::new();

        collect(&backend, &(), &mut registry, &notifier).await;

        let holdings = registry.holdings_of("111");
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "MSFT");
    }

    #[tokio::test]
    async fn quote_failure_records_sentinel_price() {
        let backend = ScriptedBackend {
            positions: vec![Position {
                symbol: Some("FAIL".to_string()),
                instrument_ref: None,
                quantity: dec!(1),
                price: None,
            }],
            quote_fails_for: vec!["FAIL".to_string()],
        };
        let mut registry = registry_with_account();
        let notifier = MemoryNotifier::new();

        collect(&backend, &(), &mut registry, &notifier).await;

        let holdings = registry.holdings_of("111");
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].price, dec!(0));
    }

    #[tokio::test]
    async fn negative_and_cash_rows_are_dropped() {
        let backend = ScriptedBackend {
            positions: vec![
                Position {
                    symbol: Some("|CASH|".to_string()),
                    instrument_ref: None,
                    quantity: dec!(100),
                    price: Some(dec!(1)),
                },
                Position {
                    symbol: Some("NEG".to_string()),
                    instrument_ref: None,
                    quantity: dec!(-1),
                    price: Some(dec!(1)),
                },
            ],
            quote_fails_for: vec![],
        };
        let mut registry = registry_with_account();
        let notifier = MemoryNotifier::new();

        collect(&backend, &(), &mut registry, &notifier).await;
        assert!(registry.holdings_of("111").is_empty());
    }

    #[tokio::test]
    async fn inline_price_skips_the_quote_call() {
        let backend = ScriptedBackend {
            positions: vec![Position {
                symbol: Some("FAIL".to_string()),
                instrument_ref: None,
                quantity: dec!(1),
                // Quote for FAIL is scripted to fail, but the inline price
                // means it is never requested.
                price: Some(dec!(55.559)),
            }],
            quote_fails_for: vec!["FAIL".to_string()],
        };
        let mut registry = registry_with_account();
        let notifier = MemoryNotifier::new();

        collect(&backend, &(), &mut registry, &notifier).await;

        let holdings = registry.holdings_of("111");
        assert_eq!(holdings[0].price, dec!(55.56));
    }

    #[test]
    fn report_masks_accounts_and_totals() {
        let mut registry = registry_with_account();
        registry.record_holding(
            "111",
            Holding {
                symbol: "AAPL".to_string(),
                quantity: dec!(2),
                price: dec!(10.00),
            },
        );
        let notifier = MemoryNotifier::new();

        report(&registry, &notifier);

        assert!(notifier.saw("*11"));
        assert!(!notifier.saw("account 111"));
        assert!(notifier.saw("Total: $20.00"));
    }
}
