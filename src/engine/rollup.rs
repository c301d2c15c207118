// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::breakdown::{ProfitRatios, ProfitTotals};
use super::error::EngineError;
use super::sku::SkuProfitAnalysis;
use crate::models::{Currency, Fulfillment, Marketplace};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// One entry of a rollup's top-children sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildSample {
    pub key: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductProfitAnalysis {
    pub name: String,
    pub parent: String,
    pub category: String,
    pub currency: Currency,
    pub marketplaces: Vec<Marketplace>,
    pub fulfillment: Fulfillment,
    pub has_cost_data: bool,
    pub has_size_data: bool,
    pub totals: ProfitTotals,
    pub ratios: ProfitRatios,
    pub top_skus: Vec<ChildSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentProfitAnalysis {
    pub parent: String,
    pub category: String,
    pub currency: Currency,
    pub marketplaces: Vec<Marketplace>,
    pub fulfillment: Fulfillment,
    pub has_cost_data: bool,
    pub has_size_data: bool,
    pub product_count: usize,
    pub totals: ProfitTotals,
    pub ratios: ProfitRatios,
    pub top_products: Vec<ChildSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProfitAnalysis {
    pub category: String,
    pub currency: Currency,
    pub marketplaces: Vec<Marketplace>,
    pub fulfillment: Fulfillment,
    pub has_cost_data: bool,
    pub has_size_data: bool,
    pub parent_count: usize,
    pub totals: ProfitTotals,
    pub ratios: ProfitRatios,
    pub top_parents: Vec<ChildSample>,
}

trait RollupChild {
    fn label(&self) -> &str;
    fn currency(&self) -> Currency;
    fn marketplaces(&self) -> Vec<Marketplace>;
    fn fulfillment(&self) -> Fulfillment;
    fn has_cost_data(&self) -> bool;
    fn has_size_data(&self) -> bool;
    fn totals(&self) -> &ProfitTotals;
}

impl RollupChild for SkuProfitAnalysis {
    fn label(&self) -> &str {
        &self.sku
    }
    fn currency(&self) -> Currency {
        self.currency
    }
    fn marketplaces(&self) -> Vec<Marketplace> {
        vec![self.marketplace]
    }
    fn fulfillment(&self) -> Fulfillment {
        self.fulfillment
    }
    fn has_cost_data(&self) -> bool {
        SkuProfitAnalysis::has_cost_data(self)
    }
    fn has_size_data(&self) -> bool {
        SkuProfitAnalysis::has_size_data(self)
    }
    fn totals(&self) -> &ProfitTotals {
        &self.totals
    }
}

macro_rules! rollup_child {
    ($ty:ty, $label:ident) => {
        impl RollupChild for $ty {
            fn label(&self) -> &str {
                &self.$label
            }
            fn currency(&self) -> Currency {
                self.currency
            }
            fn marketplaces(&self) -> Vec<Marketplace> {
                self.marketplaces.clone()
            }
            fn fulfillment(&self) -> Fulfillment {
                self.fulfillment
            }
            fn has_cost_data(&self) -> bool {
                self.has_cost_data
            }
            fn has_size_data(&self) -> bool {
                self.has_size_data
            }
            fn totals(&self) -> &ProfitTotals {
                &self.totals
            }
        }
    };
}

rollup_child!(ProductProfitAnalysis, name);
rollup_child!(ParentProfitAnalysis, parent);

struct Folded {
    currency: Currency,
    marketplaces: Vec<Marketplace>,
    fulfillment: Fulfillment,
    has_cost_data: bool,
    has_size_data: bool,
    totals: ProfitTotals,
    ratios: ProfitRatios,
    top: Vec<ChildSample>,
}

fn fold<C: RollupChild>(children: &[&C], top_n: usize) -> Result<Folded, EngineError> {
    let currency = children
        .first()
        .map(|c| c.currency())
        .unwrap_or(crate::models::COST_CURRENCY);
    let mut totals = ProfitTotals::default();
    let mut marketplaces = Vec::new();
    let mut fulfillment: Option<Fulfillment> = None;
    let mut has_cost_data = true;
    let mut has_size_data = true;

    for child in children {
        if child.currency() != currency {
            return Err(EngineError::CurrencyMismatch {
                left: currency,
                right: child.currency(),
            });
        }
        totals.merge(child.totals());
        marketplaces.extend(child.marketplaces());
        fulfillment = match fulfillment {
            None => Some(child.fulfillment()),
            Some(f) if f == child.fulfillment() => Some(f),
            Some(_) => Some(Fulfillment::Mixed),
        };
        has_cost_data &= child.has_cost_data();
        has_size_data &= child.has_size_data();
    }
    marketplaces.sort();
    marketplaces.dedup();

    // sort_by is stable: equal revenue keeps input order.
    let mut ranked: Vec<&&C> = children.iter().collect();
    ranked.sort_by(|a, b| b.totals().revenue.cmp(&a.totals().revenue));
    let top = ranked
        .into_iter()
        .take(top_n)
        .map(|c| ChildSample {
            key: c.label().to_string(),
            revenue: c.totals().revenue,
        })
        .collect();

    Ok(Folded {
        currency,
        marketplaces,
        fulfillment: fulfillment.unwrap_or(Fulfillment::Unknown),
        has_cost_data,
        has_size_data,
        ratios: ProfitRatios::from_totals(&totals),
        totals,
        top,
    })
}

/// Group by key, keeping groups and their members in first-seen order.
fn group_by<'a, C, F>(items: &'a [C], key: F) -> Vec<(String, Vec<&'a C>)>
where
    F: Fn(&C) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a C>)> = Vec::new();
    for item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

fn first_label<'a, C, F>(children: &[&'a C], field: F) -> Option<String>
where
    F: Fn(&'a C) -> Option<&'a str>,
{
    children
        .iter()
        .filter_map(|c| field(*c))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn by_revenue_desc<T, F>(mut rows: Vec<T>, totals: F) -> Vec<T>
where
    F: Fn(&T) -> &ProfitTotals,
{
    rows.sort_by(|a, b| totals(b).revenue.cmp(&totals(a).revenue));
    rows
}

/// Fold SKUs into products keyed by product name.
pub fn skus_to_products(
    skus: &[SkuProfitAnalysis],
    top_n: usize,
) -> Result<Vec<ProductProfitAnalysis>, EngineError> {
    let mut out = Vec::new();
    for (name, children) in group_by(skus, |s| s.name.clone()) {
        let folded = fold(&children, top_n)?;
        let parent = first_label(&children, |s| s.parent.as_deref()).unwrap_or_else(|| name.clone());
        let category = first_label(&children, |s| s.category.as_deref())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        out.push(ProductProfitAnalysis {
            name,
            parent,
            category,
            currency: folded.currency,
            marketplaces: folded.marketplaces,
            fulfillment: folded.fulfillment,
            has_cost_data: folded.has_cost_data,
            has_size_data: folded.has_size_data,
            totals: folded.totals,
            ratios: folded.ratios,
            top_skus: folded.top,
        });
    }
    Ok(by_revenue_desc(out, |p| &p.totals))
}

/// Fold products into parent groupings.
pub fn products_to_parents(
    products: &[ProductProfitAnalysis],
    top_n: usize,
) -> Result<Vec<ParentProfitAnalysis>, EngineError> {
    let mut out = Vec::new();
    for (parent, children) in group_by(products, |p| p.parent.clone()) {
        let folded = fold(&children, top_n)?;
        let category = first_label(&children, |p| Some(p.category.as_str()))
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        out.push(ParentProfitAnalysis {
            parent,
            category,
            currency: folded.currency,
            marketplaces: folded.marketplaces,
            fulfillment: folded.fulfillment,
            has_cost_data: folded.has_cost_data,
            has_size_data: folded.has_size_data,
            product_count: children.len(),
            totals: folded.totals,
            ratios: folded.ratios,
            top_products: folded.top,
        });
    }
    Ok(by_revenue_desc(out, |p| &p.totals))
}

/// Fold parents into categories.
pub fn parents_to_categories(
    parents: &[ParentProfitAnalysis],
    top_n: usize,
) -> Result<Vec<CategoryProfitAnalysis>, EngineError> {
    let mut out = Vec::new();
    for (category, children) in group_by(parents, |p| p.category.clone()) {
        let folded = fold(&children, top_n)?;
        out.push(CategoryProfitAnalysis {
            category,
            currency: folded.currency,
            marketplaces: folded.marketplaces,
            fulfillment: folded.fulfillment,
            has_cost_data: folded.has_cost_data,
            has_size_data: folded.has_size_data,
            parent_count: children.len(),
            totals: folded.totals,
            ratios: folded.ratios,
            top_parents: folded.top,
        });
    }
    Ok(by_revenue_desc(out, |c| &c.totals))
}
