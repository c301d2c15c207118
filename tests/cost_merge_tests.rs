// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use marginlens::engine::merge_cost_data;
use marginlens::models::{FbmShippingMode, Marketplace, ProductCostData, ProductOverride};
use rust_decimal::Decimal;

fn row(sku: &str, name: &str, cost: Option<i64>, size: Option<i64>) -> ProductCostData {
    ProductCostData {
        sku: sku.into(),
        name: name.into(),
        unit_cost: cost.map(Decimal::from),
        size: size.map(Decimal::from),
        custom_shipping: None,
        fbm_source: None,
    }
}

#[test]
fn siblings_fill_gaps_from_first_non_null_value() {
    let rows = vec![
        row("LAMP-FBA", "Lamp", None, Some(3)),
        row("LAMP-FBM", "Lamp", Some(12), None),
        row("LAMP-OLD", "Lamp", Some(99), Some(9)),
        row("MUG", "Mug", None, None),
    ];
    let merged = merge_cost_data(&rows, &[], Marketplace::De);

    assert_eq!(merged[0].unit_cost, Some(Decimal::from(12)));
    assert_eq!(merged[0].size, Some(Decimal::from(3)));
    assert_eq!(merged[1].size, Some(Decimal::from(3)));
    // own values are never replaced
    assert_eq!(merged[2].unit_cost, Some(Decimal::from(99)));
    // nothing to borrow
    assert_eq!(merged[3].unit_cost, None);
    // input untouched
    assert_eq!(rows[0].unit_cost, None);
}

#[test]
fn overrides_apply_only_on_split_sourcing_marketplace() {
    let rows = vec![row("LAMP-1", "Lamp", Some(10), Some(2)), row("MUG", "Mug", Some(3), Some(1))];
    let overrides = vec![ProductOverride {
        name: "Lamp".into(),
        custom_shipping: Some(Decimal::from(6)),
        fbm_source: Some(FbmShippingMode::Blended),
    }];

    let us = merge_cost_data(&rows, &overrides, Marketplace::Us);
    assert_eq!(us[0].custom_shipping, Some(Decimal::from(6)));
    assert_eq!(us[0].fbm_source, Some(FbmShippingMode::Blended));
    assert_eq!(us[1].fbm_source, None);

    let uk = merge_cost_data(&rows, &overrides, Marketplace::Uk);
    assert_eq!(uk[0].custom_shipping, None);
    assert_eq!(uk[0].fbm_source, None);
}

#[test]
fn cost_rows_load_from_csv_with_blank_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("costs.csv");
    std::fs::write(
        &path,
        "sku,name,unit_cost,size,custom_shipping,fbm_source\n\
         LAMP-1,Lamp,10.50,2,,\n\
         LAMP-2,Lamp,,,4,LOCAL\n",
    )
    .unwrap();
    let rows = marginlens::inputs::load_costs(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].unit_cost, Some(Decimal::new(1050, 2)));
    assert_eq!(rows[1].unit_cost, None);
    assert_eq!(rows[1].fbm_source, Some(FbmShippingMode::Local));

    let merged = merge_cost_data(&rows, &[], Marketplace::Us);
    assert_eq!(merged[1].unit_cost, Some(Decimal::new(1050, 2)));
    assert_eq!(merged[1].size, Some(Decimal::from(2)));
}
