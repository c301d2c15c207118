// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::{
    AnalysisInput, AnalysisReport, AnalysisRequest, CalculationOptions, DateRange,
    FulfillmentFilter, MixedFulfillmentPolicy, ProfitRatios, ProfitTotals, analyze, analyze_all,
};
use crate::inputs::InputPaths;
use crate::models::{Currency, Fulfillment, Marketplace};
use crate::utils::{
    fmt_money, fmt_pct, get_reporting_currency, load_rate_table, maybe_print_json,
    parse_currency, parse_date_range, pretty_table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Sku,
    Product,
    Parent,
    Category,
}

impl FromStr for ReportLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sku" => Ok(ReportLevel::Sku),
            "product" => Ok(ReportLevel::Product),
            "parent" => Ok(ReportLevel::Parent),
            "category" => Ok(ReportLevel::Category),
            other => anyhow::bail!("Unknown level '{}' (use sku|product|parent|category)", other),
        }
    }
}

impl ReportLevel {
    fn label(self) -> &'static str {
        match self {
            ReportLevel::Sku => "sku",
            ReportLevel::Product => "product",
            ReportLevel::Parent => "parent",
            ReportLevel::Category => "category",
        }
    }
}

/// What to analyse, resolved from flags and stored settings.
#[derive(Debug, Clone)]
pub struct Scope {
    pub marketplace: Option<Marketplace>,
    pub fulfillment: FulfillmentFilter,
    pub date_range: Option<DateRange>,
    /// Explicit `--currency`, if given.
    pub currency: Option<Currency>,
    pub options: CalculationOptions,
}

impl Scope {
    pub fn from_matches(m: &clap::ArgMatches) -> Result<Self> {
        let marketplace = m
            .get_one::<String>("marketplace")
            .map(|s| s.parse::<Marketplace>().map_err(anyhow::Error::msg))
            .transpose()?;
        let fulfillment = m
            .get_one::<String>("fulfillment")
            .map(|s| s.parse::<FulfillmentFilter>().map_err(anyhow::Error::msg))
            .transpose()?
            .unwrap_or_default();
        let date_range = parse_date_range(
            m.get_one::<String>("from").map(String::as_str),
            m.get_one::<String>("to").map(String::as_str),
        )?;
        let currency = m
            .get_one::<String>("currency")
            .map(|s| parse_currency(s))
            .transpose()?;
        let mixed_policy = match m.get_one::<String>("mixed-policy").map(String::as_str) {
            Some("weighted") => MixedFulfillmentPolicy::QuantityWeighted,
            _ => MixedFulfillmentPolicy::EvenSplit,
        };
        let mut options = CalculationOptions {
            mixed_policy,
            ..CalculationOptions::default()
        };
        if let Some(top) = m.get_one::<usize>("top") {
            options.top_n = *top;
        }
        Ok(Self {
            marketplace,
            fulfillment,
            date_range,
            currency,
            options,
        })
    }

    /// One marketplace reports in its own currency unless `--currency` is
    /// given; all marketplaces together report in `fallback_currency`.
    pub fn run(&self, input: &AnalysisInput, fallback_currency: Currency) -> Result<AnalysisReport> {
        let report = match self.marketplace {
            Some(marketplace) => {
                let request = AnalysisRequest {
                    marketplace,
                    fulfillment: self.fulfillment,
                    date_range: self.date_range,
                    reporting_currency: self.currency,
                };
                analyze(input, &request, &self.options)
            }
            None => analyze_all(
                input,
                self.fulfillment,
                self.date_range,
                self.currency.unwrap_or(fallback_currency),
                &self.options,
            ),
        };
        report.context("Profitability analysis failed")
    }
}

/// Load inputs and run the analysis described by `m`, keeping the inputs.
pub fn load_and_run(conn: &Connection, m: &clap::ArgMatches) -> Result<(AnalysisInput, AnalysisReport)> {
    let scope = Scope::from_matches(m)?;
    let rates = load_rate_table(conn);
    if rates.is_fallback() {
        tracing::warn!("no stored FX rates; using pinned rates (run `marginlens fx fetch`)");
    }
    let input = InputPaths::from_matches(m)?.load(rates)?;
    let reporting = get_reporting_currency(conn)?;
    let report = scope.run(&input, reporting)?;
    Ok((input, report))
}

pub fn report_from_matches(conn: &Connection, m: &clap::ArgMatches) -> Result<AnalysisReport> {
    load_and_run(conn, m).map(|(_, report)| report)
}

/// A flat record at any aggregation level. Incomplete records leave the
/// net columns empty and say why in `excluded_reason`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitRow {
    pub level: &'static str,
    pub key: String,
    pub parent: String,
    pub category: String,
    pub marketplaces: String,
    pub currency: Currency,
    pub fulfillment: Fulfillment,
    pub has_cost_data: bool,
    pub has_size_data: bool,
    pub quantity: i64,
    pub refunded_quantity: i64,
    pub revenue: Decimal,
    pub gross_refund: Decimal,
    pub avg_sale_price: Decimal,
    pub selling_fee: Decimal,
    pub fba_fee: Decimal,
    pub vat: Decimal,
    pub refund_loss: Decimal,
    pub product_cost: Decimal,
    pub shipping_cost: Decimal,
    pub customs_duty: Decimal,
    pub ddp_fee: Decimal,
    pub warehouse_cost: Decimal,
    pub advertising_cost: Decimal,
    pub fba_cost: Decimal,
    pub fbm_cost: Decimal,
    pub gst: Decimal,
    pub gross_profit: Decimal,
    pub gross_margin: Decimal,
    pub selling_fee_percent: Decimal,
    pub fba_fee_percent: Decimal,
    pub vat_percent: Decimal,
    pub refund_loss_percent: Decimal,
    pub refund_rate: Decimal,
    pub product_cost_percent: Decimal,
    pub shipping_percent: Decimal,
    pub customs_percent: Decimal,
    pub ddp_percent: Decimal,
    pub warehouse_percent: Decimal,
    pub advertising_percent: Decimal,
    pub fba_cost_percent: Decimal,
    pub fbm_cost_percent: Decimal,
    pub gst_percent: Decimal,
    pub net_profit: Option<Decimal>,
    pub net_margin: Option<Decimal>,
    pub roi: Option<Decimal>,
    pub excluded_reason: Option<String>,
}

struct RowParts<'a> {
    level: ReportLevel,
    key: &'a str,
    parent: &'a str,
    category: &'a str,
    marketplaces: &'a [Marketplace],
    currency: Currency,
    fulfillment: Fulfillment,
    has_cost_data: bool,
    has_size_data: bool,
    totals: &'a ProfitTotals,
    ratios: &'a ProfitRatios,
    excluded_reason: Option<String>,
}

fn rollup_reason(t: &ProfitTotals) -> Option<String> {
    let excluded = t.sku_count - t.complete_sku_count;
    (excluded > 0).then(|| format!("{} of {} SKUs excluded from net profit", excluded, t.sku_count))
}

impl ProfitRow {
    fn build(p: RowParts<'_>) -> Self {
        let t = p.totals;
        let r = p.ratios;
        let has_net = t.complete_sku_count > 0;
        Self {
            level: p.level.label(),
            key: p.key.to_string(),
            parent: p.parent.to_string(),
            category: p.category.to_string(),
            marketplaces: p
                .marketplaces
                .iter()
                .map(|m| m.code())
                .collect::<Vec<_>>()
                .join("|"),
            currency: p.currency,
            fulfillment: p.fulfillment,
            has_cost_data: p.has_cost_data,
            has_size_data: p.has_size_data,
            quantity: t.quantity,
            refunded_quantity: t.refunded_quantity,
            revenue: t.revenue.round_dp(2),
            gross_refund: t.gross_refund.round_dp(2),
            avg_sale_price: r.avg_sale_price.round_dp(2),
            selling_fee: t.selling_fee.round_dp(2),
            fba_fee: t.fba_fee.round_dp(2),
            vat: t.vat.round_dp(2),
            refund_loss: t.refund_loss.round_dp(2),
            product_cost: t.product_cost.round_dp(2),
            shipping_cost: t.shipping_cost.round_dp(2),
            customs_duty: t.customs_duty.round_dp(2),
            ddp_fee: t.ddp_fee.round_dp(2),
            warehouse_cost: t.warehouse_cost.round_dp(2),
            advertising_cost: t.advertising_cost.round_dp(2),
            fba_cost: t.fba_cost.round_dp(2),
            fbm_cost: t.fbm_cost.round_dp(2),
            gst: t.gst.round_dp(2),
            gross_profit: t.gross_profit.round_dp(2),
            gross_margin: r.gross_margin.round_dp(2),
            selling_fee_percent: r.selling_fee_percent.round_dp(2),
            fba_fee_percent: r.fba_fee_percent.round_dp(2),
            vat_percent: r.vat_percent.round_dp(2),
            refund_loss_percent: r.refund_loss_percent.round_dp(2),
            refund_rate: r.refund_rate.round_dp(2),
            product_cost_percent: r.product_cost_percent.round_dp(2),
            shipping_percent: r.shipping_percent.round_dp(2),
            customs_percent: r.customs_percent.round_dp(2),
            ddp_percent: r.ddp_percent.round_dp(2),
            warehouse_percent: r.warehouse_percent.round_dp(2),
            advertising_percent: r.advertising_percent.round_dp(2),
            fba_cost_percent: r.fba_cost_percent.round_dp(2),
            fbm_cost_percent: r.fbm_cost_percent.round_dp(2),
            gst_percent: r.gst_percent.round_dp(2),
            net_profit: has_net.then(|| t.net_profit.round_dp(2)),
            net_margin: has_net.then(|| r.net_margin.round_dp(2)),
            roi: has_net.then(|| r.roi.round_dp(2)),
            excluded_reason: p.excluded_reason,
        }
    }
}

/// Flatten one level of a report into rows, in report order.
pub fn rows(report: &AnalysisReport, level: ReportLevel) -> Vec<ProfitRow> {
    match level {
        ReportLevel::Sku => report
            .skus
            .iter()
            .map(|s| {
                ProfitRow::build(RowParts {
                    level,
                    key: &s.sku,
                    parent: s.parent.as_deref().unwrap_or_default(),
                    category: s.category.as_deref().unwrap_or_default(),
                    marketplaces: std::slice::from_ref(&s.marketplace),
                    currency: s.currency,
                    fulfillment: s.fulfillment,
                    has_cost_data: s.has_cost_data(),
                    has_size_data: s.has_size_data(),
                    totals: &s.totals,
                    ratios: &s.ratios,
                    excluded_reason: s.outcome.excluded_reason(),
                })
            })
            .collect(),
        ReportLevel::Product => report
            .products
            .iter()
            .map(|p| {
                ProfitRow::build(RowParts {
                    level,
                    key: &p.name,
                    parent: &p.parent,
                    category: &p.category,
                    marketplaces: &p.marketplaces,
                    currency: p.currency,
                    fulfillment: p.fulfillment,
                    has_cost_data: p.has_cost_data,
                    has_size_data: p.has_size_data,
                    totals: &p.totals,
                    ratios: &p.ratios,
                    excluded_reason: rollup_reason(&p.totals),
                })
            })
            .collect(),
        ReportLevel::Parent => report
            .parents
            .iter()
            .map(|p| {
                ProfitRow::build(RowParts {
                    level,
                    key: &p.parent,
                    parent: &p.parent,
                    category: &p.category,
                    marketplaces: &p.marketplaces,
                    currency: p.currency,
                    fulfillment: p.fulfillment,
                    has_cost_data: p.has_cost_data,
                    has_size_data: p.has_size_data,
                    totals: &p.totals,
                    ratios: &p.ratios,
                    excluded_reason: rollup_reason(&p.totals),
                })
            })
            .collect(),
        ReportLevel::Category => report
            .categories
            .iter()
            .map(|c| {
                ProfitRow::build(RowParts {
                    level,
                    key: &c.category,
                    parent: "",
                    category: &c.category,
                    marketplaces: &c.marketplaces,
                    currency: c.currency,
                    fulfillment: c.fulfillment,
                    has_cost_data: c.has_cost_data,
                    has_size_data: c.has_size_data,
                    totals: &c.totals,
                    ratios: &c.ratios,
                    excluded_reason: rollup_reason(&c.totals),
                })
            })
            .collect(),
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let report = report_from_matches(conn, m)?;
    let json = m.get_flag("json");
    let jsonl = m.get_flag("jsonl");

    if m.get_flag("summary") {
        if !maybe_print_json(json, jsonl, &report.summary)? {
            print_summary(&report);
        }
        return Ok(());
    }

    let level: ReportLevel = m
        .get_one::<String>("level")
        .map(String::as_str)
        .unwrap_or("product")
        .parse()?;
    let data = rows(&report, level);
    if maybe_print_json(json, jsonl, &data)? {
        return Ok(());
    }

    let table_rows = data
        .iter()
        .map(|r| {
            let or_dash = |v: Option<Decimal>, f: fn(&Decimal) -> String| {
                v.as_ref().map(f).unwrap_or_else(|| "-".into())
            };
            vec![
                r.key.clone(),
                r.marketplaces.clone(),
                r.fulfillment.to_string(),
                r.quantity.to_string(),
                r.revenue.to_string(),
                r.gross_profit.to_string(),
                or_dash(r.net_profit, |d: &Decimal| d.to_string()),
                or_dash(r.net_margin, fmt_pct),
                or_dash(r.roi, fmt_pct),
                r.excluded_reason.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "Key", "Mkt", "Channel", "Qty", "Revenue", "Gross", "Net", "Margin", "ROI", "Note",
            ],
            table_rows,
        )
    );
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let s = &report.summary;
    let ccy = report.currency;
    let rows = vec![
        vec!["Revenue".into(), fmt_money(&s.totals.revenue, ccy)],
        vec!["Gross profit".into(), fmt_money(&s.totals.gross_profit, ccy)],
        vec!["Net profit (complete SKUs)".into(), fmt_money(&s.totals.net_profit, ccy)],
        vec!["Net margin".into(), fmt_pct(&s.ratios.net_margin)],
        vec!["ROI".into(), fmt_pct(&s.ratios.roi)],
        vec![
            "SKUs complete".into(),
            format!("{} / {}", s.totals.complete_sku_count, s.totals.sku_count),
        ],
        vec![
            "Revenue excluded".into(),
            format!(
                "{} ({})",
                fmt_money(&s.excluded_revenue, ccy),
                fmt_pct(&s.excluded_revenue_percent)
            ),
        ],
    ];
    println!("{}", pretty_table(&["Summary", "Value"], rows));
}
