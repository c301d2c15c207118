// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::FbmCostConfig;
use super::currency::RateTable;
use super::error::EngineError;
use super::sku::MissingInput;
use crate::models::{COST_CURRENCY, Currency, FbmShippingMode, Money};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBracket {
    /// Upper size bound (desi) this rate covers, inclusive.
    pub threshold: Decimal,
    pub rate: Decimal,
}

/// A single named route: brackets ascend strictly by threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingRoute {
    pub currency: Currency,
    brackets: Vec<RateBracket>,
}

impl ShippingRoute {
    pub fn new(
        name: &str,
        currency: Currency,
        brackets: Vec<RateBracket>,
    ) -> Result<Self, EngineError> {
        if brackets.is_empty() {
            return Err(EngineError::EmptyRoute {
                route: name.to_string(),
            });
        }
        for b in &brackets {
            if b.threshold < Decimal::ZERO || b.rate < Decimal::ZERO {
                return Err(EngineError::NegativeBracket {
                    route: name.to_string(),
                    value: b.threshold.min(b.rate),
                });
            }
        }
        for pair in brackets.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(EngineError::UnsortedRoute {
                    route: name.to_string(),
                    previous: pair[0].threshold,
                    threshold: pair[1].threshold,
                });
            }
        }
        Ok(Self { currency, brackets })
    }

    pub fn brackets(&self) -> &[RateBracket] {
        &self.brackets
    }

    pub fn max_threshold(&self) -> Decimal {
        self.brackets
            .last()
            .map(|b| b.threshold)
            .unwrap_or(Decimal::ZERO)
    }

    /// Rate of the first bracket whose threshold is at or above `size`.
    pub fn rate_for(&self, size: Decimal) -> Option<Decimal> {
        self.brackets
            .iter()
            .find(|b| b.threshold >= size)
            .map(|b| b.rate)
    }
}

/// Result of a bracket lookup. `found == false` means the size cannot be
/// priced on that route; it is never a zero-cost shipment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShippingQuote {
    pub rate: Decimal,
    pub found: bool,
    pub currency: Currency,
}

impl ShippingQuote {
    fn not_found(currency: Currency) -> Self {
        Self {
            rate: Decimal::ZERO,
            found: false,
            currency,
        }
    }

    pub fn money(&self) -> Option<Money> {
        self.found.then(|| Money::new(self.rate, self.currency))
    }
}

#[derive(Deserialize)]
struct RawRoute {
    currency: Currency,
    brackets: Vec<RateBracket>,
}

#[derive(Deserialize)]
struct RawShippingRateTable {
    #[serde(default)]
    routes: BTreeMap<String, RawRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawShippingRateTable")]
pub struct ShippingRateTable {
    routes: BTreeMap<String, ShippingRoute>,
}

impl TryFrom<RawShippingRateTable> for ShippingRateTable {
    type Error = EngineError;

    fn try_from(raw: RawShippingRateTable) -> Result<Self, Self::Error> {
        let mut table = ShippingRateTable::default();
        for (name, route) in raw.routes {
            table.add_route(&name, route.currency, route.brackets)?;
        }
        Ok(table)
    }
}

impl ShippingRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(
        &mut self,
        name: &str,
        currency: Currency,
        brackets: Vec<RateBracket>,
    ) -> Result<(), EngineError> {
        let route = ShippingRoute::new(name, currency, brackets)?;
        self.routes.insert(name.to_string(), route);
        Ok(())
    }

    pub fn route(&self, name: &str) -> Option<&ShippingRoute> {
        self.routes.get(name)
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Round `size` up to the next bracket on `route`.
    pub fn lookup(&self, route: &str, size: Decimal) -> ShippingQuote {
        let Some(r) = self.routes.get(route) else {
            return ShippingQuote::not_found(COST_CURRENCY);
        };
        match r.rate_for(size) {
            Some(rate) => ShippingQuote {
                rate,
                found: true,
                currency: r.currency,
            },
            None => ShippingQuote::not_found(r.currency),
        }
    }
}

/// Per-unit FBM costs in the marketplace currency.
#[derive(Debug, Clone, PartialEq)]
pub struct FbmUnitCost {
    pub shipping: Money,
    pub customs: Money,
    pub ddp: Money,
    /// Fraction of the local-warehouse percentage that applies.
    pub warehouse_share: Decimal,
    pub missing: Vec<MissingInput>,
}

impl FbmUnitCost {
    fn zero(currency: Currency) -> Self {
        Self {
            shipping: Money::zero(currency),
            customs: Money::zero(currency),
            ddp: Money::zero(currency),
            warehouse_share: Decimal::ZERO,
            missing: Vec::new(),
        }
    }
}

/// Everything needed to price one FBM unit.
#[derive(Debug, Clone, Copy)]
pub struct FbmRequest<'a> {
    pub table: &'a ShippingRateTable,
    pub config: &'a FbmCostConfig,
    pub mode: FbmShippingMode,
    pub size: Option<Decimal>,
    /// Unit cost, already in `currency`.
    pub unit_cost: Option<Money>,
    pub custom_shipping: Option<Money>,
    pub category: Option<&'a str>,
    pub currency: Currency,
    pub rates: &'a RateTable,
}

impl FbmRequest<'_> {
    fn quote(&self, route: Option<&str>, size: Decimal, out: &mut FbmUnitCost) -> Money {
        let Some(route) = route else {
            out.missing.push(MissingInput::ShippingRoute {
                mode: self.mode,
            });
            return Money::zero(self.currency);
        };
        let quote = self.table.lookup(route, size);
        match quote.money() {
            Some(m) => m.convert(self.rates, self.currency),
            None => {
                tracing::warn!(route, %size, "size has no shipping bracket");
                out.missing.push(MissingInput::ShippingBracket {
                    route: route.to_string(),
                    size,
                });
                Money::zero(self.currency)
            }
        }
    }

    fn cost_fee(&self, amount: Decimal) -> Money {
        Money::cost(amount).convert(self.rates, self.currency)
    }
}

/// Direct shipment from Turkey: route rate, duty on the landed value, and
/// the flat border fee.
fn tr_leg(req: &FbmRequest<'_>) -> FbmUnitCost {
    let mut out = FbmUnitCost::zero(req.currency);
    out.ddp = req.cost_fee(req.config.ddp_fee);
    if let Some(size) = req.size {
        let shipping = req.quote(req.config.tr_route.as_deref(), size, &mut out);
        out.shipping = shipping;
    }
    let landed = req.unit_cost.map(|c| c.amount).unwrap_or(Decimal::ZERO) + out.shipping.amount;
    let duty = req.config.duty_percent(req.category);
    out.customs = Money::new(landed * duty / Decimal::ONE_HUNDRED, req.currency);
    out
}

/// Shipment from the local warehouse: inbound freight plus the domestic
/// route, or the manual flat price when one is set. No duty.
fn local_leg(req: &FbmRequest<'_>) -> FbmUnitCost {
    let mut out = FbmUnitCost::zero(req.currency);
    out.warehouse_share = Decimal::ONE;
    if let Some(flat) = req.custom_shipping {
        out.shipping = flat.convert(req.rates, req.currency);
        return out;
    }
    let Some(size) = req.size else {
        return out;
    };
    let inbound = req.cost_fee(size * req.config.inbound_per_desi);
    let domestic = req.quote(req.config.local_route.as_deref(), size, &mut out);
    out.shipping = Money::new(inbound.amount + domestic.amount, req.currency);
    out
}

/// Price one FBM unit under the requested sourcing mode.
pub fn resolve_fbm(req: &FbmRequest<'_>) -> FbmUnitCost {
    match req.mode {
        FbmShippingMode::Tr => tr_leg(req),
        FbmShippingMode::Local => local_leg(req),
        FbmShippingMode::Blended => {
            let tr = tr_leg(req);
            let local = local_leg(req);
            let half = Decimal::new(5, 1);
            let mut missing = tr.missing;
            missing.extend(local.missing);
            FbmUnitCost {
                shipping: Money::new(
                    (tr.shipping.amount + local.shipping.amount) * half,
                    req.currency,
                ),
                customs: tr.customs.scale(half),
                ddp: tr.ddp.scale(half),
                warehouse_share: half,
                missing,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(threshold: i64, rate: i64) -> RateBracket {
        RateBracket {
            threshold: Decimal::from(threshold),
            rate: Decimal::from(rate),
        }
    }

    #[test]
    fn rejects_unsorted_thresholds() {
        let err = ShippingRoute::new("x", Currency::Usd, vec![bracket(2, 10), bracket(1, 5)])
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsortedRoute { .. }));
    }

    #[test]
    fn rejects_empty_route() {
        let err = ShippingRoute::new("x", Currency::Usd, vec![]).unwrap_err();
        assert_eq!(
            err,
            EngineError::EmptyRoute {
                route: "x".to_string()
            }
        );
    }

    #[test]
    fn unknown_route_is_not_found() {
        let t = ShippingRateTable::new();
        let q = t.lookup("missing", Decimal::ONE);
        assert!(!q.found);
        assert_eq!(q.money(), None);
    }
}
