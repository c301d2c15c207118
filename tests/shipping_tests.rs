// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use marginlens::engine::shipping::{FbmRequest, resolve_fbm};
use marginlens::engine::{
    EngineError, FbmCostConfig, MissingInput, RateBracket, RateTable, ShippingRateTable,
};
use marginlens::models::{Currency, FbmShippingMode, Money};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn bracket(threshold: &str, rate: &str) -> RateBracket {
    RateBracket {
        threshold: d(threshold),
        rate: d(rate),
    }
}

fn table() -> ShippingRateTable {
    let mut t = ShippingRateTable::new();
    t.add_route(
        "tr_us",
        Currency::Usd,
        vec![bracket("1", "10"), bracket("2", "15"), bracket("5", "25")],
    )
    .unwrap();
    t.add_route("us_domestic", Currency::Usd, vec![bracket("5", "20")])
        .unwrap();
    t
}

#[test]
fn lookup_rounds_up_to_next_bracket() {
    let t = table();
    let q = t.lookup("tr_us", d("1.3"));
    assert!(q.found);
    assert_eq!(q.rate, d("15"));

    let exact = t.lookup("tr_us", d("5"));
    assert!(exact.found);
    assert_eq!(exact.rate, d("25"));

    let beyond = t.lookup("tr_us", d("6"));
    assert!(!beyond.found);
    assert_eq!(beyond.money(), None);
}

#[test]
fn routes_parse_from_json_and_validate_order() {
    let ok: ShippingRateTable = serde_json::from_str(
        r#"{"routes": {"tr_us": {"currency": "USD", "brackets": [
            {"threshold": 1, "rate": 10}, {"threshold": 2, "rate": 15}
        ]}}}"#,
    )
    .unwrap();
    assert_eq!(ok.route_names().collect::<Vec<_>>(), vec!["tr_us"]);
    assert_eq!(ok.route("tr_us").unwrap().max_threshold(), d("2"));

    let bad = serde_json::from_str::<ShippingRateTable>(
        r#"{"routes": {"tr_us": {"currency": "USD", "brackets": [
            {"threshold": 2, "rate": 15}, {"threshold": 1, "rate": 10}
        ]}}}"#,
    );
    assert!(bad.is_err());

    let mut t = ShippingRateTable::new();
    let err = t
        .add_route("neg", Currency::Usd, vec![bracket("-1", "10")])
        .unwrap_err();
    assert!(matches!(err, EngineError::NegativeBracket { .. }));
}

fn fbm_config() -> FbmCostConfig {
    FbmCostConfig {
        mode: FbmShippingMode::Tr,
        tr_route: Some("tr_us".into()),
        local_route: Some("us_domestic".into()),
        inbound_per_desi: Decimal::ZERO,
        customs_duty_percent: d("10"),
        ddp_fee: d("10"),
        local_warehouse_percent: d("4"),
        ..FbmCostConfig::default()
    }
}

fn request<'a>(
    table: &'a ShippingRateTable,
    config: &'a FbmCostConfig,
    rates: &'a RateTable,
    mode: FbmShippingMode,
    size: &str,
) -> FbmRequest<'a> {
    FbmRequest {
        table,
        config,
        mode,
        size: Some(d(size)),
        unit_cost: Some(Money::new(d("100"), Currency::Usd)),
        custom_shipping: None,
        category: None,
        currency: Currency::Usd,
        rates,
    }
}

#[test]
fn tr_mode_charges_duty_on_landed_value() {
    let (t, cfg, rates) = (table(), fbm_config(), RateTable::fallback());
    // size 5 -> 25 on tr_us
    let out = resolve_fbm(&request(&t, &cfg, &rates, FbmShippingMode::Tr, "5"));
    assert!(out.missing.is_empty());
    assert_eq!(out.shipping.amount, d("25"));
    // (100 + 25) * 10%
    assert_eq!(out.customs.amount, d("12.5"));
    assert_eq!(out.ddp.amount, d("10"));
    assert_eq!(out.warehouse_share, Decimal::ZERO);
}

#[test]
fn local_mode_adds_inbound_freight_and_skips_duty() {
    let t = table();
    let cfg = FbmCostConfig {
        inbound_per_desi: d("1.5"),
        ..fbm_config()
    };
    let rates = RateTable::fallback();
    let out = resolve_fbm(&request(&t, &cfg, &rates, FbmShippingMode::Local, "2"));
    // 2 * 1.5 inbound + 20 domestic
    assert_eq!(out.shipping.amount, d("23"));
    assert_eq!(out.customs.amount, Decimal::ZERO);
    assert_eq!(out.ddp.amount, Decimal::ZERO);
    assert_eq!(out.warehouse_share, Decimal::ONE);
}

#[test]
fn blended_mode_averages_shipping_and_halves_duty() {
    let (cfg, rates) = (fbm_config(), RateTable::fallback());
    let mut tr_table = ShippingRateTable::new();
    tr_table
        .add_route("tr_us", Currency::Usd, vec![bracket("5", "40")])
        .unwrap();
    tr_table
        .add_route("us_domestic", Currency::Usd, vec![bracket("5", "20")])
        .unwrap();

    let tr = resolve_fbm(&request(&tr_table, &cfg, &rates, FbmShippingMode::Tr, "2"));
    let blended = resolve_fbm(&request(&tr_table, &cfg, &rates, FbmShippingMode::Blended, "2"));
    assert_eq!(tr.shipping.amount, d("40"));
    assert_eq!(blended.shipping.amount, d("30"));
    assert_eq!(blended.customs.amount * Decimal::TWO, tr.customs.amount);
    assert_eq!(blended.ddp.amount * Decimal::TWO, tr.ddp.amount);
    assert_eq!(blended.warehouse_share, d("0.5"));
}

#[test]
fn flat_override_bypasses_local_lookup_and_blends_with_tr() {
    let (t, cfg, rates) = (table(), fbm_config(), RateTable::fallback());
    let mut req = request(&t, &cfg, &rates, FbmShippingMode::Local, "50");
    req.custom_shipping = Some(Money::new(d("7"), Currency::Usd));
    let local = resolve_fbm(&req);
    // size 50 has no domestic bracket, but the flat price wins
    assert!(local.missing.is_empty());
    assert_eq!(local.shipping.amount, d("7"));

    let mut req = request(&t, &cfg, &rates, FbmShippingMode::Blended, "2");
    req.custom_shipping = Some(Money::new(d("5"), Currency::Usd));
    let blended = resolve_fbm(&req);
    // (15 tr + 5 flat) / 2
    assert_eq!(blended.shipping.amount, d("10"));
}

#[test]
fn size_beyond_largest_bracket_is_reported_not_zeroed() {
    let (t, cfg, rates) = (table(), fbm_config(), RateTable::fallback());
    let out = resolve_fbm(&request(&t, &cfg, &rates, FbmShippingMode::Tr, "6"));
    assert_eq!(
        out.missing,
        vec![MissingInput::ShippingBracket {
            route: "tr_us".into(),
            size: d("6"),
        }]
    );
}

#[test]
fn missing_route_is_reported() {
    let t = table();
    let cfg = FbmCostConfig {
        tr_route: None,
        ..fbm_config()
    };
    let rates = RateTable::fallback();
    let out = resolve_fbm(&request(&t, &cfg, &rates, FbmShippingMode::Tr, "1"));
    assert_eq!(
        out.missing,
        vec![MissingInput::ShippingRoute {
            mode: FbmShippingMode::Tr
        }]
    );
}

#[test]
fn route_currency_converts_into_marketplace_currency() {
    let mut t = ShippingRateTable::new();
    t.add_route("tr_de", Currency::Usd, vec![bracket("5", "10")])
        .unwrap();
    let cfg = FbmCostConfig {
        tr_route: Some("tr_de".into()),
        customs_duty_percent: Decimal::ZERO,
        ddp_fee: Decimal::ZERO,
        ..FbmCostConfig::default()
    };
    let rates = RateTable::fallback();
    let req = FbmRequest {
        table: &t,
        config: &cfg,
        mode: FbmShippingMode::Tr,
        size: Some(d("1")),
        unit_cost: None,
        custom_shipping: None,
        category: None,
        currency: Currency::Eur,
        rates: &rates,
    };
    let out = resolve_fbm(&req);
    assert_eq!(out.shipping.currency, Currency::Eur);
    // 10 USD at 0.92 EUR/USD
    assert_eq!(out.shipping.amount, d("9.2"));
}
