// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use super::currency::RateTable;
use super::percent;
use super::refund::default_recovery_rate;
use crate::models::{COST_CURRENCY, CategoryType, Channel, Marketplace, TransactionRecord};

static ADVERTISING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)advertis|sponsored").expect("advertising pattern is valid")
});

/// Marketplace-wide cost ratios, applied proportionally to each SKU.
/// Percent fields are percentage points; the recovery rate is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalCostPercentages {
    /// `None` when computed over the whole dataset.
    pub scope: Option<Marketplace>,
    pub advertising_percent: Decimal,
    pub fba_cost_percent: Decimal,
    pub fbm_cost_percent: Decimal,
    pub refund_recovery_rate: Decimal,
    pub advertising_total: Decimal,
    pub fba_cost_total: Decimal,
    pub fbm_cost_total: Decimal,
    pub fba_revenue: Decimal,
    pub fbm_revenue: Decimal,
}

impl GlobalCostPercentages {
    /// No shared costs to allocate.
    pub fn none(scope: Option<Marketplace>) -> Self {
        Self {
            scope,
            advertising_percent: Decimal::ZERO,
            fba_cost_percent: Decimal::ZERO,
            fbm_cost_percent: Decimal::ZERO,
            refund_recovery_rate: default_recovery_rate(),
            advertising_total: Decimal::ZERO,
            fba_cost_total: Decimal::ZERO,
            fbm_cost_total: Decimal::ZERO,
            fba_revenue: Decimal::ZERO,
            fbm_revenue: Decimal::ZERO,
        }
    }

    /// Replace the recovery rate with a configured one, if any.
    pub fn with_recovery_rate(mut self, rate: Option<Decimal>) -> Self {
        if let Some(r) = rate {
            self.refund_recovery_rate = r;
        }
        self
    }
}

pub fn is_advertising(tx: &TransactionRecord) -> bool {
    tx.category_type == CategoryType::ServiceFee
        && tx
            .description
            .as_deref()
            .is_some_and(|d| ADVERTISING.is_match(d))
}

fn is_fba_cost(tx: &TransactionRecord) -> bool {
    match tx.category_type {
        CategoryType::ServiceFee => !is_advertising(tx),
        CategoryType::FbaInventoryFee
        | CategoryType::FbaCustomerReturnFee
        | CategoryType::FbaTransactionFee => true,
        _ => false,
    }
}

fn is_fbm_cost(tx: &TransactionRecord) -> bool {
    tx.category_type == CategoryType::ShippingServices
}

/// Compute shared-cost ratios from the complete, fulfillment-unfiltered
/// transaction set. With `scope == None` every amount is normalised to the
/// cost currency first.
pub fn compute_global_percentages<'a, I>(
    all: I,
    scope: Option<Marketplace>,
    rates: &RateTable,
) -> GlobalCostPercentages
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut out = GlobalCostPercentages::none(scope);
    let mut advertising = Decimal::ZERO;
    let mut fba_cost = Decimal::ZERO;
    let mut fbm_cost = Decimal::ZERO;

    for tx in all {
        if scope.is_some_and(|m| m != tx.marketplace) {
            continue;
        }
        let norm = |amount: Decimal| match scope {
            Some(_) => amount,
            None => rates.convert(amount, tx.marketplace.currency(), COST_CURRENCY),
        };
        match tx.category_type {
            CategoryType::Order => match tx.fulfillment {
                Channel::Fba => out.fba_revenue += norm(tx.product_sales),
                Channel::Fbm => out.fbm_revenue += norm(tx.product_sales),
                Channel::Unknown => {}
            },
            _ if is_advertising(tx) => advertising += norm(tx.total),
            _ if is_fba_cost(tx) => fba_cost += norm(tx.total),
            _ if is_fbm_cost(tx) => fbm_cost += norm(tx.total),
            _ => {}
        }
    }

    // Fee lines are booked negative; a net credit allocates nothing.
    out.advertising_total = (-advertising).max(Decimal::ZERO);
    out.fba_cost_total = (-fba_cost).max(Decimal::ZERO);
    out.fbm_cost_total = (-fbm_cost).max(Decimal::ZERO);

    out.advertising_percent = percent(out.advertising_total, out.fba_revenue + out.fbm_revenue);
    out.fba_cost_percent = percent(out.fba_cost_total, out.fba_revenue);
    out.fbm_cost_percent = percent(out.fbm_cost_total, out.fbm_revenue);

    tracing::debug!(
        scope = ?scope,
        advertising = %out.advertising_percent,
        fba = %out.fba_cost_percent,
        fbm = %out.fbm_cost_percent,
        "global cost percentages computed"
    );
    out
}
