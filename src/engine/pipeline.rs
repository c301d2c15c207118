// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use super::breakdown::{ProfitRatios, ProfitTotals};
use super::config::{AllCountryConfigs, CalculationOptions};
use super::cost_merge::{CostIndex, merge_cost_data};
use super::currency::{RateSource, RateTable};
use super::error::EngineError;
use super::global_costs::{GlobalCostPercentages, compute_global_percentages};
use super::percent;
use super::rollup::{
    CategoryProfitAnalysis, ParentProfitAnalysis, ProductProfitAnalysis, parents_to_categories,
    products_to_parents, skus_to_products,
};
use super::shipping::ShippingRateTable;
use super::sku::{SkuContext, SkuProfitAnalysis, calculate_sku};
use crate::models::{
    CategoryType, Channel, Currency, Marketplace, ProductCostData, ProductOverride,
    TransactionRecord,
};

/// Restricts which ledger lines feed SKU figures. Shared-cost percentages
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentFilter {
    #[default]
    All,
    Fba,
    Fbm,
}

impl FulfillmentFilter {
    pub fn admits(self, channel: Channel) -> bool {
        match self {
            FulfillmentFilter::All => true,
            FulfillmentFilter::Fba => channel == Channel::Fba,
            FulfillmentFilter::Fbm => channel == Channel::Fbm,
        }
    }
}

impl FromStr for FulfillmentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(FulfillmentFilter::All),
            "fba" => Ok(FulfillmentFilter::Fba),
            "fbm" => Ok(FulfillmentFilter::Fbm),
            other => Err(format!("Unknown fulfillment filter '{}' (use all|fba|fbm)", other)),
        }
    }
}

impl fmt::Display for FulfillmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FulfillmentFilter::All => "all",
            FulfillmentFilter::Fba => "fba",
            FulfillmentFilter::Fbm => "fbm",
        };
        f.write_str(s)
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn in_range(range: Option<DateRange>, date: NaiveDate) -> bool {
    range.is_none_or(|r| r.contains(date))
}

/// Everything the engine needs, already deserialized.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub transactions: Vec<TransactionRecord>,
    pub costs: Vec<ProductCostData>,
    pub overrides: Vec<ProductOverride>,
    pub shipping: ShippingRateTable,
    pub countries: AllCountryConfigs,
    pub rates: RateTable,
}

impl AnalysisInput {
    /// Marketplaces that have at least one transaction, in code order.
    pub fn marketplaces(&self) -> Vec<Marketplace> {
        let mut out: Vec<Marketplace> = self.transactions.iter().map(|t| t.marketplace).collect();
        out.sort();
        out.dedup();
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub marketplace: Marketplace,
    pub fulfillment: FulfillmentFilter,
    pub date_range: Option<DateRange>,
    /// Restate results in this currency instead of the marketplace's own.
    pub reporting_currency: Option<Currency>,
}

impl AnalysisRequest {
    pub fn new(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            fulfillment: FulfillmentFilter::All,
            date_range: None,
            reporting_currency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub totals: ProfitTotals,
    pub ratios: ProfitRatios,
    pub excluded_revenue: Decimal,
    pub excluded_revenue_percent: Decimal,
}

impl ReportSummary {
    fn from_skus(skus: &[SkuProfitAnalysis]) -> Self {
        let totals: ProfitTotals = skus.iter().map(|s| &s.totals).sum();
        Self {
            ratios: ProfitRatios::from_totals(&totals),
            excluded_revenue: totals.excluded_revenue(),
            excluded_revenue_percent: percent(totals.excluded_revenue(), totals.revenue),
            totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub marketplaces: Vec<Marketplace>,
    pub currency: Currency,
    pub fulfillment: FulfillmentFilter,
    pub date_range: Option<DateRange>,
    pub rate_source: RateSource,
    pub globals: Vec<GlobalCostPercentages>,
    pub skus: Vec<SkuProfitAnalysis>,
    pub products: Vec<ProductProfitAnalysis>,
    pub parents: Vec<ParentProfitAnalysis>,
    pub categories: Vec<CategoryProfitAnalysis>,
    pub summary: ReportSummary,
}

struct ReportMeta {
    marketplaces: Vec<Marketplace>,
    currency: Currency,
    fulfillment: FulfillmentFilter,
    date_range: Option<DateRange>,
    rate_source: RateSource,
}

fn assemble(
    meta: ReportMeta,
    globals: Vec<GlobalCostPercentages>,
    skus: Vec<SkuProfitAnalysis>,
    options: &CalculationOptions,
) -> Result<AnalysisReport, EngineError> {
    let products = skus_to_products(&skus, options.top_n)?;
    let parents = products_to_parents(&products, options.top_n)?;
    let categories = parents_to_categories(&parents, options.top_n)?;
    Ok(AnalysisReport {
        marketplaces: meta.marketplaces,
        currency: meta.currency,
        fulfillment: meta.fulfillment,
        date_range: meta.date_range,
        rate_source: meta.rate_source,
        globals,
        summary: ReportSummary::from_skus(&skus),
        skus,
        products,
        parents,
        categories,
    })
}

/// Group SKU-bearing order and refund lines, keeping first-seen SKU order.
fn group_sku_lines<'a, I>(lines: I) -> Vec<(String, Vec<&'a TransactionRecord>)>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a TransactionRecord>)> = Vec::new();
    for tx in lines {
        if !matches!(tx.category_type, CategoryType::Order | CategoryType::Refund) {
            continue;
        }
        let sku = tx.sku.trim();
        if sku.is_empty() {
            continue;
        }
        match index.get(sku) {
            Some(&i) => groups[i].1.push(tx),
            None => {
                index.insert(sku, groups.len());
                groups.push((sku.to_string(), vec![tx]));
            }
        }
    }
    groups
}

/// Run the full pipeline for one marketplace.
pub fn analyze(
    input: &AnalysisInput,
    request: &AnalysisRequest,
    options: &CalculationOptions,
) -> Result<AnalysisReport, EngineError> {
    let m = request.marketplace;
    let config = input.countries.get(m);
    if config.is_none() {
        tracing::warn!(marketplace = %m, "marketplace has no country config");
    }

    let in_scope = input
        .transactions
        .iter()
        .filter(|tx| tx.marketplace == m && in_range(request.date_range, tx.date));

    let recovery = config
        .and_then(|c| c.refund_recovery_rate)
        .unwrap_or(options.default_recovery_rate);
    let globals = compute_global_percentages(in_scope.clone(), Some(m), &input.rates)
        .with_recovery_rate(Some(recovery));

    let merged = merge_cost_data(&input.costs, &input.overrides, m);
    let index = CostIndex::new(&merged);
    let groups = group_sku_lines(in_scope.filter(|tx| request.fulfillment.admits(tx.fulfillment)));

    let ctx = SkuContext {
        marketplace: m,
        shipping: &input.shipping,
        config,
        globals: &globals,
        rates: &input.rates,
        options,
    };
    let target = request.reporting_currency.unwrap_or(m.currency());
    let skus: Vec<SkuProfitAnalysis> = groups
        .par_iter()
        .map(|(sku, lines)| {
            let name = lines.first().map(|tx| tx.name.as_str()).unwrap_or_default();
            calculate_sku(lines, index.resolve(sku, name), &ctx).converted(&input.rates, target)
        })
        .collect();

    tracing::info!(
        marketplace = %m,
        skus = skus.len(),
        complete = skus.iter().filter(|s| s.outcome.is_complete()).count(),
        "marketplace analysed"
    );

    assemble(
        ReportMeta {
            marketplaces: vec![m],
            currency: target,
            fulfillment: request.fulfillment,
            date_range: request.date_range,
            rate_source: input.rates.source(),
        },
        vec![globals],
        skus,
        options,
    )
}

/// Run one pipeline per marketplace in parallel and merge them into a
/// single report restated in `reporting_currency`.
pub fn analyze_all(
    input: &AnalysisInput,
    fulfillment: FulfillmentFilter,
    date_range: Option<DateRange>,
    reporting_currency: Currency,
    options: &CalculationOptions,
) -> Result<AnalysisReport, EngineError> {
    let marketplaces = input.marketplaces();
    let reports = marketplaces
        .par_iter()
        .map(|m| {
            let request = AnalysisRequest {
                marketplace: *m,
                fulfillment,
                date_range,
                reporting_currency: Some(reporting_currency),
            };
            analyze(input, &request, options)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut globals = Vec::with_capacity(reports.len());
    let mut skus = Vec::new();
    for report in reports {
        globals.extend(report.globals);
        skus.extend(report.skus);
    }
    assemble(
        ReportMeta {
            marketplaces,
            currency: reporting_currency,
            fulfillment,
            date_range,
            rate_source: input.rates.source(),
        },
        globals,
        skus,
        options,
    )
}
