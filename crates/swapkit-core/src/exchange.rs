//! Exchange math and amount text handling.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Token, ValidationError};

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*\.?[0-9]*$").expect("amount pattern must compile"));

/// Display rules for computed amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountFormat {
    pub max_decimals: usize,
    pub min_amount: f64,
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self {
            max_decimals: 8,
            min_amount: 0.000_001,
        }
    }
}

impl AmountFormat {
    /// Render `value` with at most `max_decimals` places and no trailing zeros.
    ///
    /// Zero renders as `"0"`; anything below `min_amount` as `"< {min_amount}"`.
    pub fn format(&self, value: f64) -> String {
        if value == 0.0 {
            return String::from("0");
        }
        if value < self.min_amount {
            return format!("< {}", self.min_amount);
        }

        let fixed = format!("{value:.prec$}", prec = self.max_decimals);
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            fixed
        }
    }
}

/// Numeric-or-empty check for text typed into the amount field.
pub fn validate_amount(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() || AMOUNT_PATTERN.is_match(text) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAmount {
            value: text.to_owned(),
        })
    }
}

/// Lenient parse: anything that is not a finite number counts as zero.
pub fn parse_amount(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Units of `to` received per unit of `from`; zero when either side is missing.
pub fn exchange_rate(from: Option<&Token>, to: Option<&Token>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => from.price() / to.price(),
        _ => 0.0,
    }
}

pub fn output_amount(rate: f64, input: f64) -> f64 {
    if rate == 0.0 || input == 0.0 {
        0.0
    } else {
        input * rate
    }
}

/// Text for the receive field: empty unless the output is positive.
pub fn quote_text(rate: f64, from_amount: &str, format: &AmountFormat) -> String {
    let output = output_amount(rate, parse_amount(from_amount));
    if output > 0.0 {
        format.format(output)
    } else {
        String::new()
    }
}

pub fn filter_tokens(query: &str, tokens: &[Token]) -> Vec<Token> {
    if query.trim().is_empty() {
        return tokens.to_vec();
    }
    tokens
        .iter()
        .filter(|token| token.symbol().matches_query(query))
        .cloned()
        .collect()
}
