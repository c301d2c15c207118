// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{HashMap, hash_map::Entry};

use rust_decimal::Decimal;

use crate::models::{Marketplace, ProductCostData, ProductOverride};

#[derive(Default, Clone, Copy)]
struct SiblingValues {
    unit_cost: Option<Decimal>,
    size: Option<Decimal>,
}

/// Backfill missing cost and size from sibling SKUs that share a product
/// name, then apply name-scoped manual overrides. Overrides only take effect
/// on the split-sourcing marketplace. Always returns a new collection.
pub fn merge_cost_data(
    rows: &[ProductCostData],
    overrides: &[ProductOverride],
    marketplace: Marketplace,
) -> Vec<ProductCostData> {
    let mut siblings: HashMap<&str, SiblingValues> = HashMap::new();
    for row in rows {
        if row.name.trim().is_empty() {
            continue;
        }
        let entry = siblings.entry(row.name.trim()).or_default();
        if entry.unit_cost.is_none() {
            entry.unit_cost = row.unit_cost;
        }
        if entry.size.is_none() {
            entry.size = row.size;
        }
    }

    let mut merged: Vec<ProductCostData> = rows
        .iter()
        .map(|row| {
            let mut out = row.clone();
            if let Some(sib) = siblings.get(row.name.trim()) {
                if out.unit_cost.is_none() && sib.unit_cost.is_some() {
                    tracing::debug!(sku = %row.sku, name = %row.name, "unit cost borrowed from sibling");
                    out.unit_cost = sib.unit_cost;
                }
                if out.size.is_none() && sib.size.is_some() {
                    tracing::debug!(sku = %row.sku, name = %row.name, "size borrowed from sibling");
                    out.size = sib.size;
                }
            }
            out
        })
        .collect();

    if !marketplace.has_split_sourcing() || overrides.is_empty() {
        return merged;
    }

    let by_name: HashMap<&str, &ProductOverride> =
        overrides.iter().map(|o| (o.name.trim(), o)).collect();
    for row in merged.iter_mut() {
        let Some(o) = by_name.get(row.name.trim()) else {
            continue;
        };
        if o.custom_shipping.is_some() {
            row.custom_shipping = o.custom_shipping;
        }
        if o.fbm_source.is_some() {
            row.fbm_source = o.fbm_source;
        }
    }
    merged
}

/// Lookup over merged cost rows: by SKU first, then by product name so a
/// SKU that never got a row of its own still picks up its product's data.
pub struct CostIndex<'a> {
    by_sku: HashMap<&'a str, &'a ProductCostData>,
    by_name: HashMap<&'a str, &'a ProductCostData>,
}

impl<'a> CostIndex<'a> {
    pub fn new(rows: &'a [ProductCostData]) -> Self {
        let mut by_sku = HashMap::with_capacity(rows.len());
        let mut by_name = HashMap::new();
        for row in rows {
            by_sku.entry(row.sku.trim()).or_insert(row);
            if row.name.trim().is_empty() {
                continue;
            }
            match by_name.entry(row.name.trim()) {
                Entry::Occupied(_) => {}
                Entry::Vacant(e) => {
                    e.insert(row);
                }
            }
        }
        Self { by_sku, by_name }
    }

    /// Keys are compared with surrounding whitespace removed.
    pub fn resolve(&self, sku: &str, name: &str) -> Option<&'a ProductCostData> {
        self.by_sku
            .get(sku.trim())
            .or_else(|| self.by_name.get(name.trim()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn index_falls_back_to_name() {
        let rows = vec![row("A-1", "Lamp", Some(10), Some(2))];
        let idx = CostIndex::new(&rows);
        assert_eq!(idx.resolve("A-9", "Lamp").map(|r| r.sku.as_str()), Some("A-1"));
        assert!(idx.resolve("B-1", "Chair").is_none());
    }

    #[test]
    fn index_ignores_padding_on_either_side() {
        let rows = vec![
            row(" MUG-1 ", "Mug", Some(10), Some(1)),
            row("CUP-1", " Cup ", Some(3), None),
        ];
        let idx = CostIndex::new(&rows);
        assert_eq!(idx.resolve("MUG-1", "").and_then(|r| r.unit_cost), Some(Decimal::from(10)));
        assert_eq!(idx.resolve(" MUG-1\t", "").and_then(|r| r.unit_cost), Some(Decimal::from(10)));
        assert_eq!(idx.resolve("CUP-9", "Cup").map(|r| r.sku.as_str()), Some("CUP-1"));
    }

    #[test]
    fn padded_names_still_share_sibling_values() {
        let rows = vec![
            row("A-1", "Lamp ", Some(10), None),
            row("A-2", " Lamp", None, Some(2)),
        ];
        let merged = merge_cost_data(&rows, &[], Marketplace::Us);
        assert!(merged.iter().all(|r| r.unit_cost == Some(Decimal::from(10))));
        assert!(merged.iter().all(|r| r.size == Some(Decimal::from(2))));
    }
}
