// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::iter::Sum;

use rust_decimal::Decimal;
use serde::Serialize;

use super::percent;

/// Additive figures of a SKU or rollup, in one currency.
///
/// Every field folds by plain addition, so partial folds combine in any
/// order. `net_profit`, `complete_revenue` and `complete_product_cost` only
/// ever include SKUs whose cost and size are known.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfitTotals {
    pub revenue: Decimal,
    pub quantity: i64,
    pub refunded_quantity: i64,
    pub selling_fee: Decimal,
    pub fba_fee: Decimal,
    pub vat: Decimal,
    pub gross_refund: Decimal,
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
    pub net_profit: Decimal,
    pub complete_revenue: Decimal,
    pub complete_product_cost: Decimal,
    pub sku_count: usize,
    pub complete_sku_count: usize,
}

impl ProfitTotals {
    pub fn merge(&mut self, other: &ProfitTotals) {
        self.revenue += other.revenue;
        self.quantity += other.quantity;
        self.refunded_quantity += other.refunded_quantity;
        self.selling_fee += other.selling_fee;
        self.fba_fee += other.fba_fee;
        self.vat += other.vat;
        self.gross_refund += other.gross_refund;
        self.refund_loss += other.refund_loss;
        self.product_cost += other.product_cost;
        self.shipping_cost += other.shipping_cost;
        self.customs_duty += other.customs_duty;
        self.ddp_fee += other.ddp_fee;
        self.warehouse_cost += other.warehouse_cost;
        self.advertising_cost += other.advertising_cost;
        self.fba_cost += other.fba_cost;
        self.fbm_cost += other.fbm_cost;
        self.gst += other.gst;
        self.gross_profit += other.gross_profit;
        self.net_profit += other.net_profit;
        self.complete_revenue += other.complete_revenue;
        self.complete_product_cost += other.complete_product_cost;
        self.sku_count += other.sku_count;
        self.complete_sku_count += other.complete_sku_count;
    }

    /// Deductions taken by the marketplace itself.
    pub fn marketplace_deductions(&self) -> Decimal {
        self.selling_fee + self.fba_fee + self.refund_loss + self.vat
    }

    /// Everything subtracted from gross profit to reach net profit.
    pub fn total_costs(&self) -> Decimal {
        self.product_cost
            + self.shipping_cost
            + self.customs_duty
            + self.ddp_fee
            + self.warehouse_cost
            + self.advertising_cost
            + self.fba_cost
            + self.fbm_cost
            + self.gst
    }

    pub fn excluded_revenue(&self) -> Decimal {
        self.revenue - self.complete_revenue
    }

    /// Multiply every monetary field by `factor`, e.g. an FX factor.
    pub fn scaled(&self, factor: Decimal) -> ProfitTotals {
        ProfitTotals {
            revenue: self.revenue * factor,
            quantity: self.quantity,
            refunded_quantity: self.refunded_quantity,
            selling_fee: self.selling_fee * factor,
            fba_fee: self.fba_fee * factor,
            vat: self.vat * factor,
            gross_refund: self.gross_refund * factor,
            refund_loss: self.refund_loss * factor,
            product_cost: self.product_cost * factor,
            shipping_cost: self.shipping_cost * factor,
            customs_duty: self.customs_duty * factor,
            ddp_fee: self.ddp_fee * factor,
            warehouse_cost: self.warehouse_cost * factor,
            advertising_cost: self.advertising_cost * factor,
            fba_cost: self.fba_cost * factor,
            fbm_cost: self.fbm_cost * factor,
            gst: self.gst * factor,
            gross_profit: self.gross_profit * factor,
            net_profit: self.net_profit * factor,
            complete_revenue: self.complete_revenue * factor,
            complete_product_cost: self.complete_product_cost * factor,
            sku_count: self.sku_count,
            complete_sku_count: self.complete_sku_count,
        }
    }
}

impl<'a> Sum<&'a ProfitTotals> for ProfitTotals {
    fn sum<I: Iterator<Item = &'a ProfitTotals>>(iter: I) -> Self {
        iter.fold(ProfitTotals::default(), |mut acc, t| {
            acc.merge(t);
            acc
        })
    }
}

/// Ratios derived from [`ProfitTotals`]. Never averaged: always recomputed
/// from the summed numerator and denominator. Percent fields are
/// percentage points of revenue unless noted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfitRatios {
    pub selling_fee_percent: Decimal,
    pub fba_fee_percent: Decimal,
    pub vat_percent: Decimal,
    pub refund_loss_percent: Decimal,
    pub product_cost_percent: Decimal,
    pub shipping_percent: Decimal,
    pub customs_percent: Decimal,
    pub ddp_percent: Decimal,
    pub warehouse_percent: Decimal,
    pub advertising_percent: Decimal,
    pub fba_cost_percent: Decimal,
    pub fbm_cost_percent: Decimal,
    pub gst_percent: Decimal,
    pub gross_margin: Decimal,
    /// Net profit over revenue of complete SKUs only.
    pub net_margin: Decimal,
    /// Net profit over product cost of complete SKUs only.
    pub roi: Decimal,
    pub avg_sale_price: Decimal,
    /// Refunded units over ordered units.
    pub refund_rate: Decimal,
}

impl ProfitRatios {
    pub fn from_totals(t: &ProfitTotals) -> Self {
        let rev = t.revenue;
        let avg_sale_price = if t.quantity == 0 {
            Decimal::ZERO
        } else {
            rev / Decimal::from(t.quantity)
        };
        Self {
            selling_fee_percent: percent(t.selling_fee, rev),
            fba_fee_percent: percent(t.fba_fee, rev),
            vat_percent: percent(t.vat, rev),
            refund_loss_percent: percent(t.refund_loss, rev),
            product_cost_percent: percent(t.product_cost, rev),
            shipping_percent: percent(t.shipping_cost, rev),
            customs_percent: percent(t.customs_duty, rev),
            ddp_percent: percent(t.ddp_fee, rev),
            warehouse_percent: percent(t.warehouse_cost, rev),
            advertising_percent: percent(t.advertising_cost, rev),
            fba_cost_percent: percent(t.fba_cost, rev),
            fbm_cost_percent: percent(t.fbm_cost, rev),
            gst_percent: percent(t.gst, rev),
            gross_margin: percent(t.gross_profit, rev),
            net_margin: percent(t.net_profit, t.complete_revenue),
            roi: percent(t.net_profit, t.complete_product_cost),
            avg_sale_price,
            refund_rate: percent(
                Decimal::from(t.refunded_quantity),
                Decimal::from(t.quantity),
            ),
        }
    }
}
