//! # Swapkit Core
//!
//! State and data plumbing behind a currency-swap form.
//!
//! ## Overview
//!
//! This crate provides the non-visual half of a swap widget:
//!
//! - **Domain types** for symbols, timestamps, raw price records and tokens
//! - **Price feed** contract with an HTTP implementation and a TTL cache
//! - **Token pipeline** turning raw records into a sorted, de-duplicated list
//! - **Reactive store** holding immutable state snapshots with subscriptions
//! - **Swap flow** applying user events while keeping the pair consistent
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Single-slot TTL cache for price snapshots |
//! | [`config`] | Runtime configuration with environment overrides |
//! | [`domain`] | Domain models (Symbol, PriceRecord, Token, Side) |
//! | [`error`] | Core error types |
//! | [`exchange`] | Amount validation, exchange rate and token search |
//! | [`flow`] | Swap form event handlers |
//! | [`functional`] | Pipe combinator and debouncing |
//! | [`http_client`] | HTTP client abstraction |
//! | [`pipeline`] | Raw records to token list |
//! | [`price_feed`] | Price feed trait, HTTP feed and cache-first service |
//! | [`store`] | Reactive state container |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swapkit_core::{HttpPriceFeed, PriceService, Side, Store, SwapConfig, SwapFlow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SwapConfig::from_env()?;
//!     let prices = PriceService::new(HttpPriceFeed::from_config(&config), config.cache_ttl());
//!
//!     let flow = SwapFlow::new(Store::default(), &config);
//!     let _subscription = flow.store().subscribe(|state| {
//!         println!("{} -> {}", state.from_amount, state.to_amount);
//!     });
//!
//!     flow.load_tokens(&prices).await?;
//!     flow.select_token(Side::From, "ETH");
//!     flow.select_token(Side::To, "USDC");
//!     flow.edit_amount("1.5")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Host / UI      │
//! └────────┬────────┘
//!          │ events
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Swap Flow      │────▶│ Store            │──▶ subscribers
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Token Pipeline  │◀────│ Price Service    │
//! └─────────────────┘     │ (cache + feed)   │
//!                         └────────┬─────────┘
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ HTTP Client      │
//!                         └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return `Result` with structured errors:
//!
//! ```rust
//! use swapkit_core::{FeedError, FeedErrorKind};
//!
//! fn describe(error: &FeedError) -> &'static str {
//!     match error.kind() {
//!         FeedErrorKind::Unavailable | FeedErrorKind::Timeout => "offline, try again",
//!         FeedErrorKind::Status if error.retryable() => "feed busy, try again",
//!         FeedErrorKind::Status | FeedErrorKind::Decode => "feed is broken",
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod functional;
pub mod http_client;
pub mod pipeline;
pub mod price_feed;
pub mod store;

// Caching
pub use cache::{PriceCache, PriceSnapshot};

// Configuration
pub use config::SwapConfig;

// Domain models
pub use domain::{PriceRecord, Side, Symbol, Token, UtcDateTime};

// Error types
pub use error::{ConfigError, CoreError, SubmitError, ValidationError};

// Exchange math
pub use exchange::AmountFormat;

// Swap flow
pub use flow::{Selection, SwapFlow, SwapQuote};

// Combinators
pub use functional::{Debounced, Debouncer, Pipe};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Token pipeline
pub use pipeline::TokenPipeline;

// Price feed
pub use price_feed::{FeedError, FeedErrorKind, HttpPriceFeed, PriceFeed, PriceService, StaticPriceFeed};

// Store
pub use store::{AppState, StatePatch, Store, Subscription};
