//! Interaction policy for the swap form.
//!
//! [`SwapFlow`] turns user events into store patches that keep the pair
//! invariants intact:
//!
//! - the two sides never hold the same symbol,
//! - `exchange_rate` is `from.price / to.price` with both sides set, else `0`,
//! - `to_amount` is the formatted quote for `(exchange_rate, from_amount)`.
//!
//! Amount edits and search queries are debounced; every other event is
//! applied synchronously. Debounced work is spawned on the Tokio runtime that
//! was current when the flow was built. A flow built outside any runtime
//! applies amount and search updates at once.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::exchange::{self, AmountFormat};
use crate::functional::{Debounced, Debouncer};
use crate::pipeline::TokenPipeline;
use crate::price_feed::{FeedError, PriceService};
use crate::store::{AppState, StatePatch, Store};
use crate::{CoreError, PriceRecord, Side, SubmitError, SwapConfig, Token, ValidationError};

/// Result of a token selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Both sides are set; rate and quote were recomputed.
    Paired,
    /// Only one side is set; the selector for this side should open next.
    ChooseNext(Side),
    /// The symbol is not in the token list; nothing changed.
    UnknownSymbol,
}

/// A confirmed swap, as shown to the user on submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapQuote {
    pub pay_amount: String,
    pub pay_symbol: String,
    pub receive_amount: String,
    pub receive_symbol: String,
    pub exchange_rate: f64,
}

impl SwapQuote {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Display for SwapQuote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pay {} {}, receive {} {}",
            self.pay_amount, self.pay_symbol, self.receive_amount, self.receive_symbol
        )
    }
}

/// Event handlers over a shared [`Store`].
pub struct SwapFlow {
    store: Store,
    pipeline: TokenPipeline,
    format: AmountFormat,
    quote_refresh: Debouncer,
    search_refresh: Debounced<String>,
}

impl SwapFlow {
    pub fn new(store: Store, config: &SwapConfig) -> Self {
        let search_store = store.clone();
        let search_refresh = Debounced::new(config.debounce_delay(), move |query: String| {
            search_store.update(|state| {
                StatePatch::new().visible_tokens(exchange::filter_tokens(&query, &state.tokens))
            });
        });

        Self {
            store,
            pipeline: TokenPipeline::new(config.icon_base_url.clone()),
            format: config.amount_format(),
            quote_refresh: Debouncer::new(config.debounce_delay()),
            search_refresh,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> Arc<AppState> {
        self.store.get_state()
    }

    /// Startup load: fetch prices (cache first), build tokens and publish them.
    ///
    /// While the fetch is pending the state reads `loading: true`. A failure is
    /// written to `error` and returned; the host decides how to surface it.
    pub async fn load_tokens(&self, prices: &PriceService) -> Result<usize, FeedError> {
        self.store
            .set_state(StatePatch::new().loading(true).error(None));

        match prices.get_prices().await {
            Ok(records) => {
                let count = self.set_tokens(&records);
                info!(tokens = count, "swap tokens loaded");
                Ok(count)
            }
            Err(error) => {
                warn!(error = %error, "failed to load swap tokens");
                self.store.set_state(
                    StatePatch::new()
                        .loading(false)
                        .error(Some(error.message().to_owned())),
                );
                Err(error)
            }
        }
    }

    /// Replace the token list from raw records.
    ///
    /// Selected tokens are re-resolved against the new list so their prices
    /// follow the fetch; a symbol that disappeared is deselected.
    pub fn set_tokens(&self, records: &[PriceRecord]) -> usize {
        let tokens: Arc<[Token]> = self.pipeline.run(records).into();
        let count = tokens.len();
        let format = self.format;

        self.store.update(|state| {
            let resolve = |held: &Option<Token>| {
                held.as_ref().and_then(|held| {
                    tokens
                        .iter()
                        .find(|token| token.same_symbol(held))
                        .cloned()
                })
            };
            let from_token = resolve(&state.from_token);
            let to_token = resolve(&state.to_token);
            let rate = exchange::exchange_rate(from_token.as_ref(), to_token.as_ref());
            let dropped = from_token.is_none() != state.from_token.is_none()
                || to_token.is_none() != state.to_token.is_none();
            let to_amount = if from_token.is_some() && to_token.is_some() {
                exchange::quote_text(rate, &state.from_amount, &format)
            } else if dropped {
                String::new()
            } else {
                state.to_amount.clone()
            };

            StatePatch::new()
                .visible_tokens(exchange::filter_tokens(&state.search_query, &tokens))
                .tokens(Arc::clone(&tokens))
                .from_token(from_token)
                .to_token(to_token)
                .exchange_rate(rate)
                .to_amount(to_amount)
                .loading(false)
                .error(None)
        });

        count
    }

    /// Amount typed into the pay field.
    ///
    /// Invalid text sets `amount_error` and leaves `from_amount` alone. Valid
    /// text is echoed at once; the quote follows after the debounce window.
    pub fn edit_amount(&self, text: &str) -> Result<(), ValidationError> {
        if let Err(error) = exchange::validate_amount(text) {
            debug!(%error, "rejected amount input");
            self.store
                .set_state(StatePatch::new().amount_error(Some(error.to_string())));
            return Err(error);
        }

        self.store
            .set_state(StatePatch::new().from_amount(text).amount_error(None));

        let store = self.store.clone();
        let format = self.format;
        self.quote_refresh.schedule(move || {
            store.update(|state| quote_patch(state, &format));
        });
        Ok(())
    }

    /// Set `side` to the token named `symbol`.
    pub fn select_token(&self, side: Side, symbol: &str) -> Selection {
        if self.store.get_state().token(symbol).is_none() {
            debug!(%side, symbol, "ignoring selection of unknown symbol");
            return Selection::UnknownSymbol;
        }

        let format = self.format;
        let mut outcome = Selection::UnknownSymbol;
        self.store.update(|state| {
            let (patch, selection) = selection_patch(state, side, symbol, &format);
            outcome = selection;
            patch
        });
        outcome
    }

    /// Open the token picker for `side` with a fresh search.
    pub fn open_selector(&self, side: Side) {
        self.search_refresh.cancel();
        self.store.update(|state| {
            StatePatch::new()
                .modal_open(true)
                .selecting_side(Some(side))
                .search_query("")
                .visible_tokens(Arc::clone(&state.tokens))
        });
    }

    pub fn close_selector(&self) {
        self.search_refresh.cancel();
        self.store.update(|state| {
            StatePatch::new()
                .modal_open(false)
                .selecting_side(None)
                .search_query("")
                .visible_tokens(Arc::clone(&state.tokens))
        });
    }

    /// Pick `symbol` in the open selector; the selector closes afterwards.
    ///
    /// With no side recorded the pick applies to the `to` side.
    pub fn pick_token(&self, symbol: &str) -> Selection {
        let side = self.store.get_state().selecting_side.unwrap_or(Side::To);
        let selection = self.select_token(side, symbol);
        if selection != Selection::UnknownSymbol {
            self.close_selector();
        }
        selection
    }

    /// Exchange the two sides. Returns `false` when neither side is selected.
    pub fn swap_direction(&self) -> bool {
        let state = self.store.get_state();
        if state.from_token.is_none() && state.to_token.is_none() {
            return false;
        }

        self.store.update(|state| {
            let rate = if state.exchange_rate > 0.0 {
                1.0 / state.exchange_rate
            } else {
                0.0
            };
            StatePatch::new()
                .from_token(state.to_token.clone())
                .to_token(state.from_token.clone())
                .from_amount(state.to_amount.clone())
                .to_amount(state.from_amount.clone())
                .exchange_rate(rate)
        });
        true
    }

    /// Search box edit: echoed at once, list filtered after the debounce window.
    pub fn search(&self, query: &str) {
        self.store
            .set_state(StatePatch::new().search_query(query));
        self.search_refresh.call(query.to_owned());
    }

    /// Validate the form for submission.
    pub fn submit(&self) -> Result<SwapQuote, SubmitError> {
        let state = self.store.get_state();
        let from = state
            .from_token
            .as_ref()
            .ok_or(SubmitError::MissingToken(Side::From))?;
        let to = state
            .to_token
            .as_ref()
            .ok_or(SubmitError::MissingToken(Side::To))?;
        if exchange::parse_amount(&state.from_amount) <= 0.0 {
            return Err(SubmitError::MissingAmount);
        }

        let quote = SwapQuote {
            pay_amount: state.from_amount.clone(),
            pay_symbol: from.symbol().to_string(),
            receive_amount: state.to_amount.clone(),
            receive_symbol: to.symbol().to_string(),
            exchange_rate: state.exchange_rate,
        };
        info!(%quote, "swap submitted");
        Ok(quote)
    }

    /// True while a debounced quote or search refresh is waiting to run.
    pub fn has_pending_work(&self) -> bool {
        self.quote_refresh.is_pending() || self.search_refresh.is_pending()
    }
}

impl std::fmt::Debug for SwapFlow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapFlow")
            .field("format", &self.format)
            .field("pending", &self.has_pending_work())
            .finish_non_exhaustive()
    }
}

fn quote_patch(state: &AppState, format: &AmountFormat) -> StatePatch {
    let to_amount = if state.has_pair() {
        exchange::quote_text(state.exchange_rate, &state.from_amount, format)
    } else {
        String::new()
    };
    StatePatch::new().to_amount(to_amount)
}

fn selection_patch(
    state: &AppState,
    side: Side,
    symbol: &str,
    format: &AmountFormat,
) -> (StatePatch, Selection) {
    let Some(token) = state.token(symbol).cloned() else {
        return (StatePatch::new(), Selection::UnknownSymbol);
    };

    let opposite = side.opposite();
    let mut patch = StatePatch::new().side_token(side, Some(token.clone()));
    let mut from_amount = state.from_amount.clone();
    let mut other = state.side(opposite).cloned();

    if other.as_ref().is_some_and(|held| held.same_symbol(&token)) {
        other = None;
        patch = patch.side_token(opposite, None).to_amount("");
        if opposite == Side::From {
            from_amount.clear();
            patch = patch.from_amount("");
        }
    }

    let (from, to) = match side {
        Side::From => (Some(&token), other.as_ref()),
        Side::To => (other.as_ref(), Some(&token)),
    };

    match (from, to) {
        (Some(_), Some(_)) => {
            let rate = exchange::exchange_rate(from, to);
            let patch = patch
                .exchange_rate(rate)
                .to_amount(exchange::quote_text(rate, &from_amount, format));
            (patch, Selection::Paired)
        }
        _ => (patch.exchange_rate(0.0), Selection::ChooseNext(opposite)),
    }
}
