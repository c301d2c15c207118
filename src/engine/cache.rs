// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;
use std::time::Duration;

use super::error::EngineError;
use super::pipeline::{AnalysisReport, AnalysisRequest, DateRange, FulfillmentFilter};
use crate::models::{Currency, Marketplace};

/// Identifies a report computed from one snapshot of the input data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// `None` for a multi-marketplace report.
    pub marketplace: Option<Marketplace>,
    pub fulfillment: FulfillmentFilter,
    pub date_range: Option<DateRange>,
    pub reporting_currency: Option<Currency>,
    /// Transaction rows in the input, used as a cheap change detector.
    pub row_count: usize,
}

impl CacheKey {
    pub fn for_request(request: &AnalysisRequest, row_count: usize) -> Self {
        Self {
            marketplace: Some(request.marketplace),
            fulfillment: request.fulfillment,
            date_range: request.date_range,
            reporting_currency: request.reporting_currency,
            row_count,
        }
    }
}

/// Upper bound on memoized reports before the least recently used is evicted.
const MAX_REPORTS: u64 = 256;

/// Time-bounded memo of finished reports. Entries are replaced, never
/// mutated, so callers may hold an `Arc` past expiry.
#[derive(Clone)]
pub struct AnalysisCache {
    reports: moka::sync::Cache<CacheKey, Arc<AnalysisReport>>,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            reports: moka::sync::Cache::builder()
                .max_capacity(MAX_REPORTS)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnalysisReport>> {
        self.reports.get(key)
    }

    /// Return the cached report or compute, store and return a fresh one.
    /// A failed computation leaves the cache untouched.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<AnalysisReport>, EngineError>
    where
        F: FnOnce() -> Result<AnalysisReport, EngineError>,
    {
        if let Some(hit) = self.reports.get(&key) {
            tracing::debug!(?key, "analysis cache hit");
            return Ok(hit);
        }
        let report = Arc::new(compute()?);
        self.reports.insert(key, Arc::clone(&report));
        Ok(report)
    }

    /// Evict expired entries now instead of on the next write.
    pub fn purge_expired(&self) {
        self.reports.run_pending_tasks();
    }

    pub fn clear(&self) {
        self.reports.invalidate_all();
        self.reports.run_pending_tasks();
    }

    /// Live entries after pending evictions have run.
    pub fn len(&self) -> usize {
        self.reports.run_pending_tasks();
        self.reports.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
