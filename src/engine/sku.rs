// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use super::breakdown::{ProfitRatios, ProfitTotals};
use super::config::{CalculationOptions, CountryProfitConfig};
use super::currency::RateTable;
use super::global_costs::GlobalCostPercentages;
use super::percent;
use super::refund::refund_loss;
use super::shipping::{FbmRequest, ShippingRateTable, resolve_fbm};
use crate::models::{
    CategoryType, Channel, Currency, FbmShippingMode, Fulfillment, Marketplace, Money,
    ProductCostData, TransactionRecord,
};

/// Why a SKU's net profit cannot be trusted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingInput {
    UnitCost,
    Size,
    ShippingRoute { mode: FbmShippingMode },
    ShippingBracket { route: String, size: Decimal },
    UnknownFulfillment,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingInput::UnitCost => write!(f, "missing unit cost"),
            MissingInput::Size => write!(f, "missing size"),
            MissingInput::ShippingRoute { mode } => {
                write!(f, "no shipping route configured for {} mode", mode)
            }
            MissingInput::ShippingBracket { route, size } => {
                write!(f, "size {} exceeds largest bracket on '{}'", size, route)
            }
            MissingInput::UnknownFulfillment => write!(f, "unknown fulfillment channel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProfitOutcome {
    Complete {
        net_profit: Decimal,
        net_margin: Decimal,
        roi: Decimal,
    },
    Incomplete {
        missing: Vec<MissingInput>,
    },
}

impl ProfitOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ProfitOutcome::Complete { .. })
    }

    /// Net profit, or the `0` sentinel for incomplete SKUs.
    pub fn net_profit(&self) -> Decimal {
        match self {
            ProfitOutcome::Complete { net_profit, .. } => *net_profit,
            ProfitOutcome::Incomplete { .. } => Decimal::ZERO,
        }
    }

    pub fn missing(&self) -> &[MissingInput] {
        match self {
            ProfitOutcome::Complete { .. } => &[],
            ProfitOutcome::Incomplete { missing } => missing,
        }
    }

    /// Human-readable exclusion reason, if any.
    pub fn excluded_reason(&self) -> Option<String> {
        match self {
            ProfitOutcome::Complete { .. } => None,
            ProfitOutcome::Incomplete { missing } => Some(
                missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }

    fn scaled(&self, factor: Decimal) -> ProfitOutcome {
        match self {
            ProfitOutcome::Complete {
                net_profit,
                net_margin,
                roi,
            } => ProfitOutcome::Complete {
                net_profit: *net_profit * factor,
                net_margin: *net_margin,
                roi: *roi,
            },
            other => other.clone(),
        }
    }
}

/// Profit record for one SKU on one marketplace, in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuProfitAnalysis {
    pub sku: String,
    pub name: String,
    pub parent: Option<String>,
    pub category: Option<String>,
    pub marketplace: Marketplace,
    pub currency: Currency,
    pub fulfillment: Fulfillment,
    pub fbm_mode: Option<FbmShippingMode>,
    /// Unit cost converted into `currency`.
    pub unit_cost: Option<Decimal>,
    pub size: Option<Decimal>,
    pub totals: ProfitTotals,
    pub ratios: ProfitRatios,
    pub outcome: ProfitOutcome,
}

impl SkuProfitAnalysis {
    /// False when the unit cost is absent or the channel could not be costed.
    pub fn has_cost_data(&self) -> bool {
        !self
            .outcome
            .missing()
            .iter()
            .any(|m| matches!(m, MissingInput::UnitCost | MissingInput::UnknownFulfillment))
    }

    /// False when the size is absent or no shipping bracket covers it.
    pub fn has_size_data(&self) -> bool {
        !self.outcome.missing().iter().any(|m| {
            matches!(
                m,
                MissingInput::Size
                    | MissingInput::ShippingRoute { .. }
                    | MissingInput::ShippingBracket { .. }
            )
        })
    }

    pub fn net_profit(&self) -> Decimal {
        self.outcome.net_profit()
    }

    pub fn revenue(&self) -> Decimal {
        self.totals.revenue
    }

    /// The same record restated in another currency.
    pub fn converted(&self, rates: &RateTable, to: Currency) -> SkuProfitAnalysis {
        if self.currency == to {
            return self.clone();
        }
        let factor = rates.factor(self.currency, to);
        let totals = self.totals.scaled(factor);
        SkuProfitAnalysis {
            currency: to,
            unit_cost: self.unit_cost.map(|c| c * factor),
            ratios: ProfitRatios::from_totals(&totals),
            outcome: self.outcome.scaled(factor),
            totals,
            ..self.clone()
        }
    }
}

/// Per-dataset inputs shared by every SKU of one marketplace.
#[derive(Debug, Clone, Copy)]
pub struct SkuContext<'a> {
    pub marketplace: Marketplace,
    pub shipping: &'a ShippingRateTable,
    pub config: Option<&'a CountryProfitConfig>,
    pub globals: &'a GlobalCostPercentages,
    pub rates: &'a RateTable,
    pub options: &'a CalculationOptions,
}

#[derive(Debug, Default)]
struct SalesTally {
    revenue: Decimal,
    quantity: i64,
    selling_fee: Decimal,
    fba_fee: Decimal,
    vat: Decimal,
    gross_refund: Decimal,
    refunded_quantity: i64,
    fba_units: i64,
    fbm_units: i64,
    saw_fba: bool,
    saw_fbm: bool,
}

impl SalesTally {
    fn from_transactions(transactions: &[&TransactionRecord]) -> Self {
        let mut t = SalesTally::default();
        for tx in transactions {
            match tx.fulfillment {
                Channel::Fba => t.saw_fba = true,
                Channel::Fbm => t.saw_fbm = true,
                Channel::Unknown => {}
            }
            match tx.category_type {
                CategoryType::Order => {
                    t.revenue += tx.product_sales;
                    t.quantity += tx.quantity;
                    t.selling_fee += tx.selling_fee;
                    t.fba_fee += tx.fba_fee;
                    t.vat += tx.vat;
                    match tx.fulfillment {
                        Channel::Fba => t.fba_units += tx.quantity,
                        Channel::Fbm => t.fbm_units += tx.quantity,
                        Channel::Unknown => {}
                    }
                }
                CategoryType::Refund => {
                    t.gross_refund += tx.product_sales;
                    t.refunded_quantity += tx.quantity.abs();
                }
                _ => {}
            }
        }
        // Ledgers book fees and refunds negative; the model works in magnitudes.
        t.selling_fee = t.selling_fee.abs();
        t.fba_fee = t.fba_fee.abs();
        t.vat = t.vat.abs();
        t.gross_refund = t.gross_refund.abs();
        t
    }

    fn classify(&self) -> Fulfillment {
        match (self.saw_fba, self.saw_fbm) {
            (true, true) => Fulfillment::Mixed,
            (true, false) => Fulfillment::Fba,
            (false, true) => Fulfillment::Fbm,
            (false, false) => Fulfillment::Unknown,
        }
    }
}

/// Per-unit channel costs in the marketplace currency, plus the share of
/// revenue charged as warehousing.
#[derive(Debug, Default)]
struct ChannelCosts {
    shipping: Decimal,
    customs: Decimal,
    ddp: Decimal,
    warehouse_percent: Decimal,
    fbm_mode: Option<FbmShippingMode>,
}

impl ChannelCosts {
    fn blend(fba: ChannelCosts, fbm: ChannelCosts, fba_weight: Decimal) -> ChannelCosts {
        let w = fba_weight;
        let v = Decimal::ONE - w;
        ChannelCosts {
            shipping: fba.shipping * w + fbm.shipping * v,
            customs: fba.customs * w + fbm.customs * v,
            ddp: fba.ddp * w + fbm.ddp * v,
            warehouse_percent: fba.warehouse_percent * w + fbm.warehouse_percent * v,
            fbm_mode: fbm.fbm_mode,
        }
    }
}

struct UnitInputs<'a> {
    cost: Option<&'a ProductCostData>,
    unit_cost: Option<Money>,
    size: Option<Decimal>,
    category: Option<&'a str>,
}

fn fba_costs(ctx: &SkuContext<'_>, cfg: &CountryProfitConfig, size: Option<Decimal>) -> ChannelCosts {
    let currency = ctx.marketplace.currency();
    let per_desi = Money::cost(cfg.fba.shipping_per_desi).convert(ctx.rates, currency);
    ChannelCosts {
        shipping: size.map(|s| s * per_desi.amount).unwrap_or(Decimal::ZERO),
        warehouse_percent: cfg.fba.warehouse_percent,
        ..ChannelCosts::default()
    }
}

fn fbm_costs(
    ctx: &SkuContext<'_>,
    cfg: &CountryProfitConfig,
    unit: &UnitInputs<'_>,
    missing: &mut Vec<MissingInput>,
) -> ChannelCosts {
    let currency = ctx.marketplace.currency();
    let override_mode = unit
        .cost
        .and_then(|c| c.fbm_source)
        .filter(|_| ctx.marketplace.has_split_sourcing());
    let mode = override_mode.unwrap_or(cfg.fbm.mode);
    let custom_shipping = unit
        .cost
        .and_then(|c| c.custom_shipping_money())
        .filter(|_| ctx.marketplace.has_split_sourcing());
    let priced = resolve_fbm(&FbmRequest {
        table: ctx.shipping,
        config: &cfg.fbm,
        mode,
        size: unit.size,
        unit_cost: unit.unit_cost,
        custom_shipping,
        category: unit.category,
        currency,
        rates: ctx.rates,
    });
    missing.extend(priced.missing);
    ChannelCosts {
        shipping: priced.shipping.amount,
        customs: priced.customs.amount,
        ddp: priced.ddp.amount,
        warehouse_percent: cfg.fbm.local_warehouse_percent * priced.warehouse_share,
        fbm_mode: Some(mode),
    }
}

fn first_present<'a, F>(transactions: &[&'a TransactionRecord], field: F) -> Option<String>
where
    F: Fn(&'a TransactionRecord) -> Option<&'a str>,
{
    transactions
        .iter()
        .filter_map(|tx| field(*tx))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Price one SKU from its transactions and merged cost row.
///
/// Shipping and customs are still attempted when cost or size is missing,
/// but the outcome is then `Incomplete` and net profit is the `0` sentinel.
pub fn calculate_sku(
    transactions: &[&TransactionRecord],
    cost: Option<&ProductCostData>,
    ctx: &SkuContext<'_>,
) -> SkuProfitAnalysis {
    let currency = ctx.marketplace.currency();
    let sku = transactions
        .first()
        .map(|tx| tx.sku.trim().to_string())
        .or_else(|| cost.map(|c| c.sku.trim().to_string()))
        .unwrap_or_default();
    let name = first_present(transactions, |tx| Some(tx.name.as_str()))
        .or_else(|| cost.map(|c| c.name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| sku.clone());
    let parent = first_present(transactions, |tx| tx.parent.as_deref());
    let category = first_present(transactions, |tx| tx.category.as_deref());

    let tally = SalesTally::from_transactions(transactions);
    let fulfillment = tally.classify();
    let loss = refund_loss(tally.gross_refund, ctx.globals.refund_recovery_rate);

    let mut missing = Vec::new();
    let unit_cost = cost
        .and_then(ProductCostData::unit_cost_money)
        .map(|m| m.convert(ctx.rates, currency));
    let size = cost.and_then(|c| c.size);
    if unit_cost.is_none() {
        missing.push(MissingInput::UnitCost);
    }
    if size.is_none() {
        missing.push(MissingInput::Size);
    }

    let unit = UnitInputs {
        cost,
        unit_cost,
        size,
        category: category.as_deref(),
    };
    let channel = match ctx.config {
        None => {
            tracing::warn!(marketplace = %ctx.marketplace, sku = %sku, "no country config; channel costs are zero");
            ChannelCosts::default()
        }
        Some(cfg) => match fulfillment {
            Fulfillment::Fba => fba_costs(ctx, cfg, size),
            Fulfillment::Fbm => fbm_costs(ctx, cfg, &unit, &mut missing),
            Fulfillment::Mixed => {
                tracing::warn!(sku = %sku, "SKU sold through both FBA and FBM");
                let w = ctx
                    .options
                    .mixed_policy
                    .fba_weight(tally.fba_units, tally.fbm_units);
                let fba = fba_costs(ctx, cfg, size);
                let fbm = fbm_costs(ctx, cfg, &unit, &mut missing);
                ChannelCosts::blend(fba, fbm, w)
            }
            Fulfillment::Unknown => ChannelCosts::default(),
        },
    };
    if fulfillment == Fulfillment::Unknown && tally.quantity != 0 {
        missing.push(MissingInput::UnknownFulfillment);
    }

    let qty = Decimal::from(tally.quantity);
    let revenue = tally.revenue;
    let share = |pct: Decimal| revenue * pct / Decimal::ONE_HUNDRED;

    let mut totals = ProfitTotals {
        revenue,
        quantity: tally.quantity,
        refunded_quantity: tally.refunded_quantity,
        selling_fee: tally.selling_fee,
        fba_fee: tally.fba_fee,
        vat: tally.vat,
        gross_refund: tally.gross_refund,
        refund_loss: loss,
        product_cost: unit_cost.map(|c| c.amount * qty).unwrap_or(Decimal::ZERO),
        shipping_cost: channel.shipping * qty,
        customs_duty: channel.customs * qty,
        ddp_fee: channel.ddp * qty,
        warehouse_cost: share(channel.warehouse_percent),
        advertising_cost: share(ctx.globals.advertising_percent),
        fba_cost: if fulfillment.touches_fba() {
            share(ctx.globals.fba_cost_percent)
        } else {
            Decimal::ZERO
        },
        fbm_cost: if fulfillment.touches_fbm() {
            share(ctx.globals.fbm_cost_percent)
        } else {
            Decimal::ZERO
        },
        gst: ctx
            .config
            .and_then(|c| c.gst.as_ref())
            .map(|g| g.tax_on(revenue))
            .unwrap_or(Decimal::ZERO),
        sku_count: 1,
        ..ProfitTotals::default()
    };
    totals.gross_profit = revenue - totals.marketplace_deductions();

    let outcome = if missing.is_empty() {
        let net_profit = totals.gross_profit - totals.total_costs();
        totals.net_profit = net_profit;
        totals.complete_revenue = revenue;
        totals.complete_product_cost = totals.product_cost;
        totals.complete_sku_count = 1;
        ProfitOutcome::Complete {
            net_profit,
            net_margin: percent(net_profit, revenue),
            roi: percent(net_profit, totals.product_cost),
        }
    } else {
        tracing::debug!(sku = %sku, ?missing, "SKU excluded from net profit");
        ProfitOutcome::Incomplete { missing }
    };

    SkuProfitAnalysis {
        sku,
        name,
        parent,
        category,
        marketplace: ctx.marketplace,
        currency,
        fulfillment,
        fbm_mode: channel.fbm_mode,
        unit_cost: unit_cost.map(|c| c.amount),
        size,
        ratios: ProfitRatios::from_totals(&totals),
        totals,
        outcome,
    }
}
