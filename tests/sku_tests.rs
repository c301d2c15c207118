// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use marginlens::engine::{
    CalculationOptions, CountryProfitConfig, FbaCostConfig, FbmCostConfig, GlobalCostPercentages,
    GstConfig, MissingInput, MixedFulfillmentPolicy, ProfitOutcome, RateBracket, RateTable,
    ShippingRateTable, SkuContext, calculate_sku, skus_to_products,
};
use marginlens::models::{
    CategoryType, Channel, Currency, FbmShippingMode, Fulfillment, Marketplace, ProductCostData,
    TransactionRecord,
};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn order(sku: &str, channel: Channel, sales: &str, selling: &str, fba: &str, qty: i64) -> TransactionRecord {
    TransactionRecord {
        date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        marketplace: Marketplace::Us,
        sku: sku.into(),
        name: "Desk Lamp".into(),
        parent: Some("LAMPS".into()),
        category: Some("Lighting".into()),
        fulfillment: channel,
        category_type: CategoryType::Order,
        description: None,
        product_sales: d(sales),
        selling_fee: d(selling),
        fba_fee: d(fba),
        vat: Decimal::ZERO,
        total: Decimal::ZERO,
        quantity: qty,
    }
}

fn refund(sku: &str, sales: &str) -> TransactionRecord {
    TransactionRecord {
        category_type: CategoryType::Refund,
        product_sales: d(sales),
        selling_fee: Decimal::ZERO,
        fba_fee: Decimal::ZERO,
        quantity: 1,
        ..order(sku, Channel::Fba, "0", "0", "0", 0)
    }
}

fn cost(sku: &str, unit: Option<&str>, size: Option<&str>) -> ProductCostData {
    ProductCostData {
        sku: sku.into(),
        name: "Desk Lamp".into(),
        unit_cost: unit.map(d),
        size: size.map(d),
        custom_shipping: None,
        fbm_source: None,
    }
}

fn fba_only_config() -> CountryProfitConfig {
    CountryProfitConfig {
        fba: FbaCostConfig {
            shipping_per_desi: d("2"),
            warehouse_percent: d("5"),
        },
        ..CountryProfitConfig::default()
    }
}

fn globals(ads: &str, fba: &str, fbm: &str, recovery: &str) -> GlobalCostPercentages {
    GlobalCostPercentages {
        advertising_percent: d(ads),
        fba_cost_percent: d(fba),
        fbm_cost_percent: d(fbm),
        refund_recovery_rate: d(recovery),
        ..GlobalCostPercentages::none(Some(Marketplace::Us))
    }
}

struct Fixture {
    shipping: ShippingRateTable,
    config: Option<CountryProfitConfig>,
    globals: GlobalCostPercentages,
    rates: RateTable,
    options: CalculationOptions,
}

impl Fixture {
    fn new(config: Option<CountryProfitConfig>, globals: GlobalCostPercentages) -> Self {
        Self {
            shipping: ShippingRateTable::new(),
            config,
            globals,
            rates: RateTable::fallback(),
            options: CalculationOptions::default(),
        }
    }

    fn ctx(&self, marketplace: Marketplace) -> SkuContext<'_> {
        SkuContext {
            marketplace,
            shipping: &self.shipping,
            config: self.config.as_ref(),
            globals: &self.globals,
            rates: &self.rates,
            options: &self.options,
        }
    }
}

#[test]
fn single_fba_sku_end_to_end() {
    let fx = Fixture::new(Some(fba_only_config()), globals("10", "5", "0", "0"));
    let txs = [order("LAMP-1", Channel::Fba, "50", "-5", "-3", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));

    assert_eq!(a.fulfillment, Fulfillment::Fba);
    assert_eq!(a.totals.shipping_cost, d("4"));
    assert_eq!(a.totals.warehouse_cost, d("2.5"));
    assert_eq!(a.totals.advertising_cost, d("5"));
    assert_eq!(a.totals.fba_cost, d("2.5"));
    assert_eq!(a.totals.fbm_cost, Decimal::ZERO);
    assert_eq!(a.totals.gross_profit, d("42"));
    // 50 - 5 - 3 - 0 - 10 - 4 - 2.5 - 5 - 2.5
    assert_eq!(a.net_profit(), d("18"));
    match a.outcome {
        ProfitOutcome::Complete { net_margin, roi, .. } => {
            assert_eq!(net_margin, d("36"));
            assert_eq!(roi, d("180"));
        }
        other => panic!("expected complete outcome, got {:?}", other),
    }
    assert!(a.has_cost_data() && a.has_size_data());
}

#[test]
fn gross_profit_excludes_everything_but_marketplace_deductions() {
    let fx = Fixture::new(Some(fba_only_config()), globals("10", "5", "0", "0.5"));
    let mut sale = order("LAMP-1", Channel::Fba, "200", "-20", "-10", 2);
    sale.vat = d("-8");
    let txs = [sale, refund("LAMP-1", "-40")];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    let t = &a.totals;
    assert_eq!(t.refund_loss, d("20"));
    assert_eq!(t.refunded_quantity, 1);
    assert_eq!(t.gross_profit, t.revenue - (t.selling_fee + t.fba_fee + t.refund_loss + t.vat));
    assert_eq!(t.gross_profit, d("142"));
    assert_eq!(a.net_profit(), t.gross_profit - t.total_costs());
}

#[test]
fn missing_cost_marks_incomplete_with_sentinel() {
    let fx = Fixture::new(Some(fba_only_config()), globals("10", "5", "0", "0"));
    let txs = [order("LAMP-1", Channel::Fba, "50", "-5", "-3", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", None, Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert!(!a.has_cost_data());
    assert!(a.has_size_data());
    assert_eq!(a.outcome.missing(), &[MissingInput::UnitCost]);
    assert_eq!(a.net_profit(), Decimal::ZERO);
    assert_eq!(a.totals.net_profit, Decimal::ZERO);
    assert_eq!(a.totals.complete_revenue, Decimal::ZERO);
    // shipping is still attempted
    assert_eq!(a.totals.shipping_cost, d("4"));
    assert_eq!(a.outcome.excluded_reason().as_deref(), Some("missing unit cost"));
}

#[test]
fn no_cost_row_at_all_is_missing_both() {
    let fx = Fixture::new(Some(fba_only_config()), globals("0", "0", "0", "0"));
    let txs = [order("LAMP-1", Channel::Fba, "50", "-5", "-3", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();

    let a = calculate_sku(&refs, None, &fx.ctx(Marketplace::Us));
    assert_eq!(
        a.outcome.missing(),
        &[MissingInput::UnitCost, MissingInput::Size]
    );
}

#[test]
fn zero_revenue_yields_zero_percentages() {
    let fx = Fixture::new(Some(fba_only_config()), globals("10", "5", "0", "0"));
    let txs = [order("LAMP-1", Channel::Fba, "0", "0", "0", 0)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(a.ratios.selling_fee_percent, Decimal::ZERO);
    assert_eq!(a.ratios.gross_margin, Decimal::ZERO);
    assert_eq!(a.ratios.net_margin, Decimal::ZERO);
    assert_eq!(a.ratios.avg_sale_price, Decimal::ZERO);
}

#[test]
fn unconfigured_marketplace_zeroes_channel_costs() {
    let fx = Fixture::new(None, globals("0", "0", "0", "0.3"));
    let mut sale = order("LAMP-1", Channel::Fba, "100", "-10", "-5", 1);
    sale.marketplace = Marketplace::Jp;
    let txs = [sale];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("1"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Jp));
    assert_eq!(a.currency, Currency::Jpy);
    assert_eq!(a.totals.shipping_cost, Decimal::ZERO);
    assert_eq!(a.totals.warehouse_cost, Decimal::ZERO);
    // 1 USD unit cost converted at 150 JPY/USD
    assert_eq!(a.unit_cost, Some(d("150")));
    assert!(a.outcome.is_complete());
}

fn us_fbm_fixture(policy: MixedFulfillmentPolicy) -> Fixture {
    let mut shipping = ShippingRateTable::new();
    shipping
        .add_route(
            "tr_us",
            Currency::Usd,
            vec![RateBracket {
                threshold: d("5"),
                rate: d("8"),
            }],
        )
        .unwrap();
    let config = CountryProfitConfig {
        fba: FbaCostConfig {
            shipping_per_desi: d("2"),
            warehouse_percent: Decimal::ZERO,
        },
        fbm: FbmCostConfig {
            mode: FbmShippingMode::Tr,
            tr_route: Some("tr_us".into()),
            ..FbmCostConfig::default()
        },
        ..CountryProfitConfig::default()
    };
    let mut fx = Fixture::new(Some(config), globals("10", "4", "6", "0"));
    fx.shipping = shipping;
    fx.options.mixed_policy = policy;
    fx
}

#[test]
fn mixed_sku_blends_channel_costs_and_takes_both_allocations() {
    let fx = us_fbm_fixture(MixedFulfillmentPolicy::EvenSplit);
    let txs = [
        order("LAMP-1", Channel::Fba, "100", "0", "0", 1),
        order("LAMP-1", Channel::Fbm, "100", "0", "0", 1),
    ];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(a.fulfillment, Fulfillment::Mixed);
    // per unit: FBA 4, FBM 8 -> 6, times 2 units
    assert_eq!(a.totals.shipping_cost, d("12"));
    // each allocation on the full revenue, not halved
    assert_eq!(a.totals.fba_cost, d("8"));
    assert_eq!(a.totals.fbm_cost, d("12"));
    assert_eq!(a.totals.advertising_cost, d("20"));
}

#[test]
fn quantity_weighted_policy_follows_unit_split() {
    let fx = us_fbm_fixture(MixedFulfillmentPolicy::QuantityWeighted);
    let txs = [
        order("LAMP-1", Channel::Fba, "300", "0", "0", 3),
        order("LAMP-1", Channel::Fbm, "100", "0", "0", 1),
    ];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    // per unit 0.75 * 4 + 0.25 * 8 = 5, times 4 units
    assert_eq!(a.totals.shipping_cost, d("20"));
}

#[test]
fn fbm_source_override_applies_on_split_marketplace_only() {
    let mut fx = us_fbm_fixture(MixedFulfillmentPolicy::EvenSplit);
    if let Some(cfg) = fx.config.as_mut() {
        cfg.fbm.local_route = None;
    }
    let txs = [order("LAMP-1", Channel::Fbm, "100", "0", "0", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let mut row = cost("LAMP-1", Some("10"), Some("2"));
    row.fbm_source = Some(FbmShippingMode::Local);
    row.custom_shipping = Some(d("3"));

    let us = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(us.fbm_mode, Some(FbmShippingMode::Local));
    assert_eq!(us.totals.shipping_cost, d("3"));

    let mut de_sale = txs[0].clone();
    de_sale.marketplace = Marketplace::De;
    let de_refs = vec![&de_sale];
    let de = calculate_sku(&de_refs, Some(&row), &fx.ctx(Marketplace::De));
    assert_eq!(de.fbm_mode, Some(FbmShippingMode::Tr));
    // 8 USD on the TR route, restated in EUR
    assert_eq!(de.totals.shipping_cost, d("7.36"));
}

#[test]
fn unknown_channel_with_sales_is_incomplete() {
    let fx = Fixture::new(Some(fba_only_config()), globals("0", "0", "0", "0"));
    let txs = [order("LAMP-1", Channel::Unknown, "50", "0", "0", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(a.fulfillment, Fulfillment::Unknown);
    assert_eq!(a.outcome.missing(), &[MissingInput::UnknownFulfillment]);
    assert!(!a.has_cost_data());
    assert!(a.has_size_data());
}

#[test]
fn oversize_fbm_unit_clears_size_flag_up_the_rollup() {
    let fx = us_fbm_fixture(MixedFulfillmentPolicy::EvenSplit);
    let txs = [order("LAMP-1", Channel::Fbm, "100", "0", "0", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    // 9 desi is past the 5 desi top bracket on tr_us
    let row = cost("LAMP-1", Some("10"), Some("9"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert!(!a.outcome.is_complete());
    assert!(a.outcome.missing().iter().any(|m| matches!(
        m,
        MissingInput::ShippingBracket { route, .. } if route == "tr_us"
    )));
    assert_eq!(a.net_profit(), Decimal::ZERO);
    assert!(a.has_cost_data());
    assert!(!a.has_size_data());

    let products = skus_to_products(&[a], 5).unwrap();
    assert!(products[0].has_cost_data);
    assert!(!products[0].has_size_data);
}

#[test]
fn unrouted_fbm_mode_clears_size_flag() {
    // FBM defaults to the TR mode, which has no route here
    let fx = Fixture::new(Some(fba_only_config()), globals("0", "0", "0", "0"));
    let txs = [order("LAMP-1", Channel::Fbm, "50", "0", "0", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("2"));

    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert!(a
        .outcome
        .missing()
        .iter()
        .any(|m| matches!(m, MissingInput::ShippingRoute { .. })));
    assert!(!a.has_size_data());
}

#[test]
fn gst_included_and_added_on_top() {
    let txs = [order("LAMP-1", Channel::Fba, "110", "0", "0", 1)];
    let refs: Vec<&TransactionRecord> = txs.iter().collect();
    let row = cost("LAMP-1", Some("10"), Some("1"));

    let mut included = fba_only_config();
    included.gst = Some(GstConfig {
        rate: d("10"),
        included_in_price: true,
    });
    let fx = Fixture::new(Some(included), globals("0", "0", "0", "0"));
    let a = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(a.totals.gst, d("10"));

    let mut on_top = fba_only_config();
    on_top.gst = Some(GstConfig {
        rate: d("10"),
        included_in_price: false,
    });
    let fx = Fixture::new(Some(on_top), globals("0", "0", "0", "0"));
    let b = calculate_sku(&refs, Some(&row), &fx.ctx(Marketplace::Us));
    assert_eq!(b.totals.gst, d("11"));
}
