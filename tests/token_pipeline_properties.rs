//! Property tests for the raw-records-to-tokens pipeline.

use std::collections::HashSet;

use proptest::prelude::*;
use swapkit_core::{PriceRecord, Token, TokenPipeline, UtcDateTime};

const ICONS: &str = "https://icons.test/tokens";

fn pipeline() -> TokenPipeline {
    TokenPipeline::new(ICONS)
}

fn currency() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ETH"),
        Just("USDC"),
        Just("ATOM"),
        Just("bNEO"),
        Just("wstETH"),
        Just("BUSD"),
        Just(""),
        Just("not a symbol"),
    ]
    .prop_map(str::to_owned)
}

fn price() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(0.0)),
        1 => Just(Some(-3.5)),
        1 => Just(Some(f64::NAN)),
        6 => (0.000_001_f64..100_000.0).prop_map(Some),
    ]
}

fn record() -> impl Strategy<Value = PriceRecord> {
    (currency(), price(), 1_600_000_000_000_i64..1_700_000_000_000_i64).prop_map(
        |(currency, price, millis)| {
            let date = UtcDateTime::from_unix_millis(millis).expect("millis are in range");
            PriceRecord::new(currency, price, date)
        },
    )
}

fn symbols(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(|t| t.symbol().to_string()).collect()
}

proptest! {
    #[test]
    fn each_symbol_appears_at_most_once(records in prop::collection::vec(record(), 0..40)) {
        let tokens = pipeline().run(&records);
        let unique: HashSet<String> = symbols(&tokens).into_iter().collect();
        prop_assert_eq!(unique.len(), tokens.len());
    }

    #[test]
    fn output_is_in_display_order(records in prop::collection::vec(record(), 0..40)) {
        let tokens = pipeline().run(&records);
        for pair in tokens.windows(2) {
            prop_assert!(pair[0].symbol().collate(pair[1].symbol()).is_le());
        }
    }

    #[test]
    fn every_token_is_priced_and_carries_its_latest_date(
        records in prop::collection::vec(record(), 0..40)
    ) {
        let tokens = pipeline().run(&records);
        for token in &tokens {
            prop_assert!(token.price().is_finite() && token.price() > 0.0);

            let latest = records
                .iter()
                .filter(|r| r.currency == token.symbol().as_str())
                .filter(|r| r.price.is_some_and(|p| p.is_finite() && p > 0.0))
                .map(|r| r.date)
                .max();
            prop_assert_eq!(Some(token.as_of()), latest);
            prop_assert!(token.icon_url().starts_with(ICONS));
        }
    }

    #[test]
    fn running_twice_gives_the_same_list(records in prop::collection::vec(record(), 0..40)) {
        let pipeline = pipeline();
        prop_assert_eq!(pipeline.run(&records), pipeline.run(&records));
    }

    #[test]
    fn input_order_does_not_change_which_symbols_survive(
        records in prop::collection::vec(record(), 0..40)
    ) {
        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(
            symbols(&pipeline().run(&records)),
            symbols(&pipeline().run(&reversed))
        );
    }
}

#[test]
fn latest_btc_price_wins_over_earlier_quotes() {
    let at = |value: &str| UtcDateTime::parse(value).expect("timestamp");
    let records = vec![
        PriceRecord::new("BTC", Some(26_000.0), at("2023-08-29T07:10:40Z")),
        PriceRecord::new("BTC", Some(26_002.8), at("2023-08-29T07:10:52Z")),
        PriceRecord::new("BTC", Some(25_990.1), at("2023-08-29T07:10:45Z")),
    ];

    let tokens = pipeline().run(&records);

    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].price(), 26_002.8);
    assert_eq!(tokens[0].icon_url(), format!("{ICONS}/BTC.svg"));
}
