use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Which half of the swap form a selection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    From,
    To,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::From => Self::To,
            Self::To => Self::From,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            other => Err(ValidationError::InvalidSide {
                value: other.to_owned(),
            }),
        }
    }
}

/// Raw price entry as published by the price feed.
///
/// The feed keeps history, so several records may share a currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub currency: String,
    pub date: UtcDateTime,
    #[serde(default)]
    pub price: Option<f64>,
}

impl PriceRecord {
    pub fn new(currency: impl Into<String>, price: Option<f64>, date: UtcDateTime) -> Self {
        Self {
            currency: currency.into(),
            date,
            price,
        }
    }
}

/// A priced asset eligible for swap selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    symbol: Symbol,
    price: f64,
    as_of: UtcDateTime,
    icon_url: String,
}

impl Token {
    pub fn new(
        symbol: Symbol,
        price: f64,
        as_of: UtcDateTime,
        icon_url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if price <= 0.0 {
            return Err(ValidationError::NonPositiveValue { field: "price" });
        }

        Ok(Self {
            symbol,
            price,
            as_of,
            icon_url: icon_url.into(),
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn as_of(&self) -> UtcDateTime {
        self.as_of
    }

    pub fn icon_url(&self) -> &str {
        &self.icon_url
    }

    pub fn same_symbol(&self, other: &Token) -> bool {
        self.symbol == other.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> UtcDateTime {
        UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp")
    }

    #[test]
    fn rejects_non_positive_token_price() {
        let symbol = Symbol::parse("ETH").expect("symbol");
        let err = Token::new(symbol.clone(), 0.0, ts(), "icon").expect_err("must fail");
        assert_eq!(err, ValidationError::NonPositiveValue { field: "price" });

        let err = Token::new(symbol, f64::NAN, ts(), "icon").expect_err("must fail");
        assert_eq!(err, ValidationError::NonFiniteValue { field: "price" });
    }

    #[test]
    fn decodes_feed_record_without_price() {
        let record: PriceRecord =
            serde_json::from_str(r#"{"currency":"BLUR","date":"2023-08-29T07:10:40.000Z"}"#)
                .expect("record should decode");
        assert_eq!(record.currency, "BLUR");
        assert_eq!(record.price, None);
    }

    #[test]
    fn side_round_trips_through_str() {
        assert_eq!("from".parse::<Side>(), Ok(Side::From));
        assert_eq!(Side::To.opposite(), Side::From);
        assert!("left".parse::<Side>().is_err());
    }
}
