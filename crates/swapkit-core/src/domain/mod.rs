//! # Domain Models
//!
//! Value types shared by the cache, the token pipeline and the swap flow.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PriceRecord`] | Raw feed entry (currency, date, optional price) |
//! | [`Token`] | Validated, display-ready priced asset |
//! | [`Symbol`] | Case-preserving currency code |
//! | [`Side`] | `from` or `to` half of the swap form |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Tokens are validated at construction and never mutated afterwards; a new
//! price fetch replaces the whole token list.

mod models;
mod symbol;
mod timestamp;

pub use models::{PriceRecord, Side, Token};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
