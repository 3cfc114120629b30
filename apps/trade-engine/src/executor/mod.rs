//! Order-execution state machine.
//!
//! One pass per invocation: for every requested symbol, select accounts,
//! short-circuit dry runs, verify sell-side holdings, gate on buying power
//! where exposed, submit, and run at most one fallback axis. Every
//! (account, symbol) attempt produces exactly one [`OrderResult`], reported
//! through the notifier in symbol order, then account-selection order.

pub mod known_errors;
pub mod pricing;
pub mod selection;

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::broker::{BrokerBackend, Capabilities, FallbackAxis};
use crate::models::{
    Account, AccountIdentity, OrderAction, OrderRequest, OrderResult, OrderTicket, TicketType,
    mask_account,
};
use crate::notify::Notifier;

pub use selection::{Selection, SelectionPolicy, select_accounts};

/// Default pacing delay between sequential submissions to one backend.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Executes one [`OrderRequest`] against one backend session.
pub struct OrderExecutor<'a, B: BrokerBackend> {
    backend: &'a B,
    notifier: &'a dyn Notifier,
    policy: SelectionPolicy,
    pacing: Duration,
}

impl<'a, B: BrokerBackend> OrderExecutor<'a, B> {
    /// Create an executor with the default pacing delay.
    pub fn new(backend: &'a B, notifier: &'a dyn Notifier, policy: SelectionPolicy) -> Self {
        Self {
            backend,
            notifier,
            policy,
            pacing: DEFAULT_PACING,
        }
    }

    /// Override the pacing delay (tests set this to zero).
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run one execution pass. Not restartable; re-invoke for a retry.
    pub async fn execute(
        &self,
        identity: &AccountIdentity,
        session: &B::Session,
        discovered: &[Account],
        request: &OrderRequest,
    ) -> Vec<OrderResult> {
        let caps = self.backend.capabilities();
        let mut results = Vec::new();

        for symbol in &request.symbols {
            self.notifier.notify(&format!(
                "{identity}: {}ing {} of {symbol}",
                request.action, request.amount
            ));
            self.run_symbol(identity, session, discovered, request, symbol, caps, &mut results)
                .await;
        }

        results
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_symbol(
        &self,
        identity: &AccountIdentity,
        session: &B::Session,
        discovered: &[Account],
        request: &OrderRequest,
        symbol: &str,
        caps: Capabilities,
        results: &mut Vec<OrderResult>,
    ) {
        let selection = select_accounts(discovered, &self.policy);
        if selection.suffix_fallback
            && let Some(suffix) = &self.policy.suffix
        {
            self.notifier.notify(&format!(
                "{identity}: no account ends with '{suffix}', using first discovered account"
            ));
        }

        if selection.accounts.is_empty() {
            self.report(
                identity,
                results,
                OrderResult::failure("", symbol, "no eligible trading accounts"),
            );
            return;
        }

        // Sell-side aggregate verification happens once per symbol, before
        // any submission. Dry runs never reach the backend at all.
        let mut salable: Option<HashMap<String, Decimal>> = None;
        if request.action == OrderAction::Sell
            && caps.verify_holdings_before_sell
            && !request.dry_run
        {
            match self.backend.salable_positions(session, symbol).await {
                Ok(positions) if positions.is_empty() => {
                    self.report(
                        identity,
                        results,
                        OrderResult::failure(
                            "",
                            symbol,
                            format!("no holdings found for {symbol}, cannot sell"),
                        ),
                    );
                    return;
                }
                Ok(positions) => {
                    let total: Decimal = positions.iter().map(|p| p.quantity).sum();
                    if total < request.amount {
                        self.report(
                            identity,
                            results,
                            OrderResult::failure(
                                "",
                                symbol,
                                format!(
                                    "not enough shares of {symbol}: available {total}, requested {}",
                                    request.amount
                                ),
                            ),
                        );
                        return;
                    }
                    salable = Some(
                        positions
                            .into_iter()
                            .map(|p| (p.account_ref, p.quantity))
                            .collect(),
                    );
                }
                Err(e) => {
                    self.report(
                        identity,
                        results,
                        OrderResult::failure("", symbol, format!("holdings check failed: {e}")),
                    );
                    return;
                }
            }
        }

        for account in &selection.accounts {
            let masked = mask_account(&account.number);

            if request.dry_run {
                // Synthetic success-shaped result; the submission
                // collaborator is never contacted.
                self.report(
                    identity,
                    results,
                    OrderResult::success(
                        &account.number,
                        symbol,
                        format!(
                            "[DRY] would {} {} of {symbol} in {masked}",
                            request.action, request.amount
                        ),
                    ),
                );
                continue;
            }

            if let Some(salable) = &salable {
                let available = salable
                    .get(account.backend_ref())
                    .copied()
                    .unwrap_or_default();
                if available < request.amount {
                    self.report(
                        identity,
                        results,
                        OrderResult::failure(
                            &account.number,
                            symbol,
                            format!(
                                "not enough shares in {masked}: available {available}, requested {}",
                                request.amount
                            ),
                        ),
                    );
                    continue;
                }
            }

            // Quote-priced backends need an entry price before submission;
            // a missing quote is a hard stop for this pair.
            let mut order_type = TicketType::Market;
            if caps.quote_priced_entry {
                match self.entry_price(session, symbol, request.action).await {
                    Ok(price) => order_type = TicketType::Limit(price),
                    Err(message) => {
                        self.report(
                            identity,
                            results,
                            OrderResult::failure(&account.number, symbol, message),
                        );
                        continue;
                    }
                }
            }

            if caps.buying_power_gate
                && request.action == OrderAction::Buy
                && let TicketType::Limit(price) = order_type
            {
                let required = (price * request.amount).round_dp(2);
                match self.backend.buying_power(session, account).await {
                    Ok(Some(available)) if required > available => {
                        // The one case where iteration continues across
                        // accounts rather than stopping at first success.
                        self.report(
                            identity,
                            results,
                            OrderResult::failure(
                                &account.number,
                                symbol,
                                format!(
                                    "insufficient funds in {masked}: needed {required}, available {available}"
                                ),
                            ),
                        );
                        continue;
                    }
                    Ok(None) => {
                        // The backend lists buying power per funded account
                        // only; an absent entry means this account cannot buy.
                        self.report(
                            identity,
                            results,
                            OrderResult::failure(
                                &account.number,
                                symbol,
                                format!("account {masked} is not funded for buying"),
                            ),
                        );
                        continue;
                    }
                    Ok(Some(_)) => {}
                    Err(e) => {
                        self.report(
                            identity,
                            results,
                            OrderResult::failure(
                                &account.number,
                                symbol,
                                format!("buying power check failed: {e}"),
                            ),
                        );
                        continue;
                    }
                }
            }

            let ticket = OrderTicket {
                symbol: symbol.to_string(),
                quantity: request.amount,
                action: request.action,
                account_ref: account.backend_ref().to_string(),
                order_type,
            };

            let result = self.submit_with_fallback(session, account, &ticket, caps).await;
            let succeeded = result.succeeded;
            self.report(identity, results, result);

            // Rate-limit pacing between sequential submissions.
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            if succeeded && request.action == OrderAction::Sell && caps.sell_first_success {
                break;
            }
        }
    }

    /// Primary submission plus at most one fallback axis.
    async fn submit_with_fallback(
        &self,
        session: &B::Session,
        account: &Account,
        ticket: &OrderTicket,
        caps: Capabilities,
    ) -> OrderResult {
        let masked = mask_account(&account.number);

        match self.backend.submit(session, ticket).await {
            Ok(response) if response.succeeded => {
                let mut result = OrderResult::success(
                    &account.number,
                    &ticket.symbol,
                    format!(
                        "{} {} of {} in {masked}: success",
                        ticket.action, ticket.quantity, ticket.symbol
                    ),
                );
                if let Some(price) = ticket.order_type.limit_price() {
                    result = result.with_price(price);
                }
                result
            }
            Ok(response) => {
                // Known business rejections terminate without a retry.
                if let Some(explanation) = known_errors::classify(&response.messages) {
                    return OrderResult::failure(&account.number, &ticket.symbol, explanation);
                }
                self.run_fallback(session, account, ticket, caps, response.messages)
                    .await
            }
            Err(e) => {
                self.run_fallback(session, account, ticket, caps, vec![e.to_string()])
                    .await
            }
        }
    }

    async fn run_fallback(
        &self,
        session: &B::Session,
        account: &Account,
        ticket: &OrderTicket,
        caps: Capabilities,
        primary_messages: Vec<String>,
    ) -> OrderResult {
        let masked = mask_account(&account.number);

        match caps.fallback {
            FallbackAxis::None => OrderResult::failure(
                &account.number,
                &ticket.symbol,
                format!(
                    "order failed in {masked}: {}",
                    join_messages(&primary_messages)
                ),
            ),
            FallbackAxis::LegacyApi => {
                self.notifier.notify(&format!(
                    "order verification unsuccessful in {masked}, retrying with legacy API"
                ));
                match self.backend.submit_fallback(session, ticket).await {
                    Ok(response) if response.succeeded => OrderResult::success(
                        &account.number,
                        &ticket.symbol,
                        format!(
                            "{} {} of {} in {masked}: success via legacy API",
                            ticket.action, ticket.quantity, ticket.symbol
                        ),
                    ),
                    Ok(response) => OrderResult::failure(
                        &account.number,
                        &ticket.symbol,
                        format!(
                            "legacy retry unsuccessful: {}",
                            join_messages(&response.messages)
                        ),
                    ),
                    Err(e) => OrderResult::failure(
                        &account.number,
                        &ticket.symbol,
                        format!("legacy retry failed: {e}"),
                    ),
                }
            }
            FallbackAxis::LimitOrder => {
                self.notifier.notify(&format!(
                    "market order failed in {masked}, trying limit order"
                ));

                let quote = match self.backend.quote(session, &ticket.symbol).await {
                    Ok(quote) => quote,
                    Err(e) => {
                        return OrderResult::failure(
                            &account.number,
                            &ticket.symbol,
                            format!("error getting price for {}: {e}", ticket.symbol),
                        );
                    }
                };
                let Some(price) = pricing::derive_limit_price(ticket.action, &quote) else {
                    return OrderResult::failure(
                        &account.number,
                        &ticket.symbol,
                        format!("error getting price for {}", ticket.symbol),
                    );
                };

                let limit_ticket = OrderTicket {
                    order_type: TicketType::Limit(price),
                    ..ticket.clone()
                };
                match self.backend.submit_fallback(session, &limit_ticket).await {
                    Ok(response) if response.succeeded => OrderResult::success(
                        &account.number,
                        &ticket.symbol,
                        format!(
                            "{} {} of {} in {masked} @ {price}: success",
                            ticket.action, ticket.quantity, ticket.symbol
                        ),
                    )
                    .with_price(price),
                    Ok(response) => OrderResult::failure(
                        &account.number,
                        &ticket.symbol,
                        format!(
                            "limit order failed @ {price}: {}",
                            join_messages(&response.messages)
                        ),
                    )
                    .with_price(price),
                    Err(e) => OrderResult::failure(
                        &account.number,
                        &ticket.symbol,
                        format!("limit order failed: {e}"),
                    ),
                }
            }
        }
    }

    /// Entry price for quote-priced backends.
    async fn entry_price(
        &self,
        session: &B::Session,
        symbol: &str,
        action: OrderAction,
    ) -> Result<Decimal, String> {
        match self.backend.quote(session, symbol).await {
            Ok(quote) => pricing::entry_limit_price(action, &quote)
                .ok_or_else(|| format!("no price available for {symbol}")),
            Err(e) => Err(format!("failed to retrieve price for {symbol}: {e}")),
        }
    }

    /// Record a result and route it to the notifier. Every attempt ends
    /// here exactly once.
    fn report(&self, identity: &AccountIdentity, results: &mut Vec<OrderResult>, result: OrderResult) {
        self.notifier
            .notify(&format!("{identity}: {}", result.message));
        results.push(result);
    }
}

fn join_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "no details from backend".to_string()
    } else {
        messages.join("; ")
    }
}
