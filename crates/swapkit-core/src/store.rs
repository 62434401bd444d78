//! Single source of truth for the swap widget's UI state.
//!
//! [`Store`] holds the current [`AppState`] behind an `Arc`. Every update
//! builds a new state from a shallow [`StatePatch`] merge and swaps the
//! reference, so a snapshot handed out earlier never changes underneath its
//! reader. Subscribers are notified synchronously, in subscription order,
//! after the swap.
//!
//! The store does not check cross-field invariants; [`crate::flow::SwapFlow`]
//! is responsible for only writing consistent patches.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{Side, Token};

/// Aggregate UI state of the swap widget.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Every selectable token, sorted by symbol.
    pub tokens: Arc<[Token]>,
    /// `tokens` filtered by `search_query`.
    pub visible_tokens: Arc<[Token]>,
    pub from_token: Option<Token>,
    pub to_token: Option<Token>,
    pub from_amount: String,
    pub to_amount: String,
    pub exchange_rate: f64,
    pub modal_open: bool,
    pub selecting_side: Option<Side>,
    pub search_query: String,
    pub loading: bool,
    pub error: Option<String>,
    /// Field-level message for the amount input.
    pub amount_error: Option<String>,
    /// Keys the typed fields do not cover; stored as given.
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tokens: Arc::from(Vec::new()),
            visible_tokens: Arc::from(Vec::new()),
            from_token: None,
            to_token: None,
            from_amount: String::new(),
            to_amount: String::new(),
            exchange_rate: 0.0,
            modal_open: false,
            selecting_side: None,
            search_query: String::new(),
            loading: false,
            error: None,
            amount_error: None,
            extras: BTreeMap::new(),
        }
    }
}

impl AppState {
    /// Shallow top-level merge: fields present in `patch` replace ours.
    pub fn merged(&self, patch: StatePatch) -> Self {
        let mut next = self.clone();
        let StatePatch {
            tokens,
            visible_tokens,
            from_token,
            to_token,
            from_amount,
            to_amount,
            exchange_rate,
            modal_open,
            selecting_side,
            search_query,
            loading,
            error,
            amount_error,
            extras,
        } = patch;

        if let Some(v) = tokens {
            next.tokens = v;
        }
        if let Some(v) = visible_tokens {
            next.visible_tokens = v;
        }
        if let Some(v) = from_token {
            next.from_token = v;
        }
        if let Some(v) = to_token {
            next.to_token = v;
        }
        if let Some(v) = from_amount {
            next.from_amount = v;
        }
        if let Some(v) = to_amount {
            next.to_amount = v;
        }
        if let Some(v) = exchange_rate {
            next.exchange_rate = v;
        }
        if let Some(v) = modal_open {
            next.modal_open = v;
        }
        if let Some(v) = selecting_side {
            next.selecting_side = v;
        }
        if let Some(v) = search_query {
            next.search_query = v;
        }
        if let Some(v) = loading {
            next.loading = v;
        }
        if let Some(v) = error {
            next.error = v;
        }
        if let Some(v) = amount_error {
            next.amount_error = v;
        }
        next.extras.extend(extras);

        next
    }

    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.tokens.iter().find(|token| token.symbol() == symbol)
    }

    pub fn side(&self, side: Side) -> Option<&Token> {
        match side {
            Side::From => self.from_token.as_ref(),
            Side::To => self.to_token.as_ref(),
        }
    }

    pub fn has_pair(&self) -> bool {
        self.from_token.is_some() && self.to_token.is_some()
    }
}

/// Partial update for [`AppState`]. Unset fields are left untouched.
///
/// Nullable fields take an `Option` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    tokens: Option<Arc<[Token]>>,
    visible_tokens: Option<Arc<[Token]>>,
    from_token: Option<Option<Token>>,
    to_token: Option<Option<Token>>,
    from_amount: Option<String>,
    to_amount: Option<String>,
    exchange_rate: Option<f64>,
    modal_open: Option<bool>,
    selecting_side: Option<Option<Side>>,
    search_query: Option<String>,
    loading: Option<bool>,
    error: Option<Option<String>>,
    amount_error: Option<Option<String>>,
    extras: BTreeMap<String, serde_json::Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn tokens(mut self, tokens: impl Into<Arc<[Token]>>) -> Self {
        self.tokens = Some(tokens.into());
        self
    }

    pub fn visible_tokens(mut self, tokens: impl Into<Arc<[Token]>>) -> Self {
        self.visible_tokens = Some(tokens.into());
        self
    }

    pub fn from_token(mut self, token: Option<Token>) -> Self {
        self.from_token = Some(token);
        self
    }

    pub fn to_token(mut self, token: Option<Token>) -> Self {
        self.to_token = Some(token);
        self
    }

    pub fn side_token(self, side: Side, token: Option<Token>) -> Self {
        match side {
            Side::From => self.from_token(token),
            Side::To => self.to_token(token),
        }
    }

    pub fn from_amount(mut self, amount: impl Into<String>) -> Self {
        self.from_amount = Some(amount.into());
        self
    }

    pub fn to_amount(mut self, amount: impl Into<String>) -> Self {
        self.to_amount = Some(amount.into());
        self
    }

    pub fn exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    pub fn modal_open(mut self, open: bool) -> Self {
        self.modal_open = Some(open);
        self
    }

    pub fn selecting_side(mut self, side: Option<Side>) -> Self {
        self.selecting_side = Some(side);
        self
    }

    pub fn search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn amount_error(mut self, error: Option<String>) -> Self {
        self.amount_error = Some(error);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

struct StoreInner {
    state: Mutex<Arc<AppState>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl StoreInner {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .expect("store listener lock is not poisoned");
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

/// Cloneable handle to the shared application state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Immutable snapshot of the current state.
    pub fn get_state(&self) -> Arc<AppState> {
        let state = self.inner.state.lock().expect("store state lock is not poisoned");
        Arc::clone(&state)
    }

    /// Merge `patch` into the current state and notify every subscriber.
    pub fn set_state(&self, patch: StatePatch) -> Arc<AppState> {
        self.update(|_| patch)
    }

    /// Read-modify-write: build the patch from the current state and apply it
    /// as one step.
    ///
    /// `build` runs under the state lock and must not call back into the store.
    pub fn update<F>(&self, build: F) -> Arc<AppState>
    where
        F: FnOnce(&AppState) -> StatePatch,
    {
        let snapshot = {
            let mut state = self.inner.state.lock().expect("store state lock is not poisoned");
            let next = Arc::new(state.merged(build(&state)));
            *state = Arc::clone(&next);
            next
        };

        self.notify(&snapshot);
        snapshot
    }

    /// Register `listener`; it runs after every update with the new snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .expect("store listener lock is not poisoned")
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("store listener lock is not poisoned")
            .len()
    }

    fn notify(&self, snapshot: &AppState) {
        // Listeners run without any lock held so they may re-enter the store.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .expect("store listener lock is not poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(listeners = listeners.len(), "store updated");
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get_state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already removed.
    ///
    /// Safe to call from inside the listener itself; the notification cycle
    /// in progress still reaches every other listener.
    pub fn unsubscribe(&self) -> bool {
        self.store
            .upgrade()
            .map(|store| store.remove(self.id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn merge_replaces_only_patched_fields() {
        let store = Store::default();
        store.set_state(StatePatch::new().from_amount("1").loading(true));
        let state = store.set_state(StatePatch::new().to_amount("2"));

        assert_eq!(state.from_amount, "1");
        assert_eq!(state.to_amount, "2");
        assert!(state.loading);
        assert_eq!(state.search_query, "");
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let store = Store::default();
        store.set_state(StatePatch::new().error(Some(String::from("boom"))));
        let state = store.set_state(StatePatch::new().error(None));
        assert_eq!(state.error, None);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_updates() {
        let store = Store::default();
        let before = store.get_state();
        store.set_state(StatePatch::new().from_amount("5"));

        assert_eq!(before.from_amount, "");
        assert_eq!(store.get_state().from_amount, "5");
    }

    #[test]
    fn notifies_in_subscription_order_with_new_snapshot() {
        let store = Store::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            let _sub = store.subscribe(move |state| {
                log.lock()
                    .expect("lock")
                    .push(format!("{name}:{}", state.from_amount));
            });
        }

        store.set_state(StatePatch::new().from_amount("7"));
        assert_eq!(
            *log.lock().expect("lock"),
            vec!["first:7", "second:7", "third:7"]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = Store::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set_state(StatePatch::new().loading(true));
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        store.set_state(StatePatch::new().loading(false));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn listener_can_unsubscribe_itself_mid_cycle() {
        let store = Store::default();
        let own_calls = Arc::new(AtomicUsize::new(0));
        let other_calls = Arc::new(AtomicUsize::new(0));
        let handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&handle);
        let own = Arc::clone(&own_calls);
        let sub = store.subscribe(move |_| {
            own.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot.lock().expect("lock").as_ref() {
                sub.unsubscribe();
            }
        });
        *handle.lock().expect("lock") = Some(sub);

        let other = Arc::clone(&other_calls);
        let _other = store.subscribe(move |_| {
            other.fetch_add(1, Ordering::SeqCst);
        });

        store.set_state(StatePatch::new().modal_open(true));
        store.set_state(StatePatch::new().modal_open(false));

        assert_eq!(own_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_write_back_into_store() {
        let store = Store::default();
        let writer = store.clone();
        let _sub = store.subscribe(move |state| {
            if state.from_amount == "1" && state.to_amount.is_empty() {
                writer.set_state(StatePatch::new().to_amount("echo"));
            }
        });

        store.set_state(StatePatch::new().from_amount("1"));
        assert_eq!(store.get_state().to_amount, "echo");
    }

    #[test]
    fn extras_accept_free_form_keys() {
        let store = Store::default();
        let state = store.set_state(StatePatch::new().extra("theme", "dark"));
        assert_eq!(state.extras.get("theme"), Some(&serde_json::json!("dark")));
        assert!(StatePatch::new().is_empty());
    }
}
