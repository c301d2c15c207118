// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::refund::default_recovery_rate;
use crate::models::{FbmShippingMode, Marketplace};

/// FBA cost model. `shipping_per_desi` is in the cost currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FbaCostConfig {
    #[serde(default)]
    pub shipping_per_desi: Decimal,
    /// Percent of revenue; only the split-sourcing marketplace sets this.
    #[serde(default)]
    pub warehouse_percent: Decimal,
}

/// FBM cost model. Flat fees and per-desi rates are in the cost currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FbmCostConfig {
    #[serde(default)]
    pub mode: FbmShippingMode,
    /// Route used for direct shipments from Turkey.
    #[serde(default)]
    pub tr_route: Option<String>,
    /// Destination-domestic route used for shipments out of the local warehouse.
    #[serde(default)]
    pub local_route: Option<String>,
    /// Inbound freight to the local warehouse, per desi.
    #[serde(default)]
    pub inbound_per_desi: Decimal,
    #[serde(default)]
    pub customs_duty_percent: Decimal,
    /// Per-category duty overrides, keyed by category name.
    #[serde(default)]
    pub category_duty_percent: HashMap<String, Decimal>,
    /// Flat delivered-duty-paid border fee, per unit.
    #[serde(default)]
    pub ddp_fee: Decimal,
    #[serde(default)]
    pub local_warehouse_percent: Decimal,
}

impl FbmCostConfig {
    pub fn duty_percent(&self, category: Option<&str>) -> Decimal {
        category
            .and_then(|c| self.category_duty_percent.get(c))
            .copied()
            .unwrap_or(self.customs_duty_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstConfig {
    /// Percentage points, e.g. 10 for 10%.
    pub rate: Decimal,
    #[serde(default)]
    pub included_in_price: bool,
}

impl GstConfig {
    pub fn tax_on(&self, revenue: Decimal) -> Decimal {
        if self.included_in_price {
            let divisor = Decimal::ONE_HUNDRED + self.rate;
            if divisor.is_zero() {
                return Decimal::ZERO;
            }
            revenue * self.rate / divisor
        } else {
            revenue * self.rate / Decimal::ONE_HUNDRED
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryProfitConfig {
    #[serde(default)]
    pub fba: FbaCostConfig,
    #[serde(default)]
    pub fbm: FbmCostConfig,
    #[serde(default)]
    pub gst: Option<GstConfig>,
    /// Fraction of refunded sales recovered through fee reversal.
    #[serde(default)]
    pub refund_recovery_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllCountryConfigs {
    configs: BTreeMap<Marketplace, CountryProfitConfig>,
}

impl AllCountryConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marketplace: Marketplace, config: CountryProfitConfig) {
        self.configs.insert(marketplace, config);
    }

    pub fn get(&self, marketplace: Marketplace) -> Option<&CountryProfitConfig> {
        self.configs.get(&marketplace)
    }

    pub fn marketplaces(&self) -> impl Iterator<Item = Marketplace> + '_ {
        self.configs.keys().copied()
    }
}

impl FromIterator<(Marketplace, CountryProfitConfig)> for AllCountryConfigs {
    fn from_iter<I: IntoIterator<Item = (Marketplace, CountryProfitConfig)>>(iter: I) -> Self {
        Self {
            configs: iter.into_iter().collect(),
        }
    }
}

/// How a SKU sold through both channels splits its channel cost models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedFulfillmentPolicy {
    /// Half FBA cost model, half FBM.
    #[default]
    EvenSplit,
    /// Weight each channel by its share of ordered units.
    QuantityWeighted,
}

impl MixedFulfillmentPolicy {
    /// Weight of the FBA cost model, in `[0, 1]`.
    pub fn fba_weight(self, fba_units: i64, fbm_units: i64) -> Decimal {
        match self {
            MixedFulfillmentPolicy::EvenSplit => Decimal::new(5, 1),
            MixedFulfillmentPolicy::QuantityWeighted => {
                let total = fba_units + fbm_units;
                if total <= 0 {
                    Decimal::new(5, 1)
                } else {
                    Decimal::from(fba_units) / Decimal::from(total)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOptions {
    pub mixed_policy: MixedFulfillmentPolicy,
    /// Size of the top-children sample kept on each rollup.
    pub top_n: usize,
    /// Recovery rate used when a marketplace has none configured.
    pub default_recovery_rate: Decimal,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            mixed_policy: MixedFulfillmentPolicy::default(),
            top_n: 5,
            default_recovery_rate: default_recovery_rate(),
        }
    }
}
