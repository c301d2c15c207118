// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Profitability calculation engine.
//!
//! Pure and synchronous: every stage takes resolved data and configuration
//! and returns a new value. Shared costs are computed once per marketplace
//! ([`global_costs`]), cost rows are merged once ([`cost_merge`]), each SKU
//! is priced independently ([`sku`]), and rollups fold SKU figures upward
//! ([`rollup`]).

pub mod breakdown;
pub mod cache;
pub mod config;
pub mod cost_merge;
pub mod currency;
pub mod error;
pub mod global_costs;
pub mod pipeline;
pub mod refund;
pub mod rollup;
pub mod shipping;
pub mod sku;

pub use breakdown::{ProfitRatios, ProfitTotals};
pub use cache::AnalysisCache;
pub use config::{
    AllCountryConfigs, CalculationOptions, CountryProfitConfig, FbaCostConfig, FbmCostConfig,
    GstConfig, MixedFulfillmentPolicy,
};
pub use cost_merge::{CostIndex, merge_cost_data};
pub use currency::{RateSource, RateTable};
pub use error::EngineError;
pub use global_costs::{GlobalCostPercentages, compute_global_percentages};
pub use pipeline::{
    AnalysisInput, AnalysisReport, AnalysisRequest, DateRange, FulfillmentFilter, analyze,
    analyze_all,
};
pub use refund::{default_recovery_rate, refund_loss};
pub use rollup::{
    CategoryProfitAnalysis, ParentProfitAnalysis, ProductProfitAnalysis, parents_to_categories,
    products_to_parents, skus_to_products,
};
pub use shipping::{RateBracket, ShippingQuote, ShippingRateTable, ShippingRoute};
pub use sku::{MissingInput, ProfitOutcome, SkuContext, SkuProfitAnalysis, calculate_sku};

use rust_decimal::Decimal;

/// `part / whole` in percentage points; 0 when `whole` is zero.
pub(crate) fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part * Decimal::ONE_HUNDRED / whole
}
