//! Raw price records to display-ready tokens.
//!
//! Four fixed stages: drop invalid records, keep the latest record per
//! currency, build [`Token`]s, sort by symbol. The pipeline is pure and never
//! fails; malformed records are dropped.

use std::collections::HashMap;

use tracing::debug;

use crate::functional::Pipe;
use crate::{PriceRecord, Symbol, Token, UtcDateTime};

/// A record that passed validation, keyed by its parsed symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub symbol: Symbol,
    pub price: f64,
    pub date: UtcDateTime,
}

/// Token pipeline bound to an icon location.
#[derive(Debug, Clone)]
pub struct TokenPipeline {
    icon_base_url: String,
}

impl TokenPipeline {
    pub fn new(icon_base_url: impl Into<String>) -> Self {
        Self {
            icon_base_url: icon_base_url.into(),
        }
    }

    pub fn icon_url(&self, symbol: &Symbol) -> String {
        format!("{}/{symbol}.svg", self.icon_base_url.trim_end_matches('/'))
    }

    pub fn run(&self, records: &[PriceRecord]) -> Vec<Token> {
        let tokens = records
            .pipe(filter_valid)
            .pipe(latest_per_currency)
            .pipe(|latest| self.materialize(latest))
            .pipe(sort_tokens);

        debug!(
            records = records.len(),
            tokens = tokens.len(),
            "token pipeline complete"
        );
        tokens
    }

    pub fn materialize(&self, records: Vec<ValidRecord>) -> Vec<Token> {
        records
            .into_iter()
            .filter_map(|record| {
                let icon_url = self.icon_url(&record.symbol);
                Token::new(record.symbol, record.price, record.date, icon_url).ok()
            })
            .collect()
    }
}

/// Stage 1: keep records with a positive finite price and a parseable symbol.
pub fn filter_valid(records: &[PriceRecord]) -> Vec<ValidRecord> {
    records
        .iter()
        .filter_map(|record| {
            let price = record.price.filter(|p| p.is_finite() && *p > 0.0)?;
            let symbol = Symbol::parse(&record.currency).ok()?;
            Some(ValidRecord {
                symbol,
                price,
                date: record.date,
            })
        })
        .collect()
}

/// Stage 2: one record per symbol. A strictly later date replaces the held
/// record; on equal dates the later-seen record replaces it too.
///
/// Output keeps first-appearance order of each symbol.
pub fn latest_per_currency(records: Vec<ValidRecord>) -> Vec<ValidRecord> {
    let mut slots: HashMap<Symbol, usize> = HashMap::with_capacity(records.len());
    let mut latest: Vec<ValidRecord> = Vec::with_capacity(records.len());

    for record in records {
        match slots.get(&record.symbol) {
            Some(&index) => {
                if record.date >= latest[index].date {
                    latest[index] = record;
                }
            }
            None => {
                slots.insert(record.symbol.clone(), latest.len());
                latest.push(record);
            }
        }
    }

    latest
}

/// Stage 4: ascending by symbol collation.
pub fn sort_tokens(mut tokens: Vec<Token>) -> Vec<Token> {
    tokens.sort_by(|a, b| a.symbol().collate(b.symbol()));
    tokens
}
