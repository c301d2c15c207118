// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Currency;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("shipping route '{route}' has no rate brackets")]
    EmptyRoute { route: String },

    #[error("shipping route '{route}' thresholds must ascend strictly (found {threshold} after {previous})")]
    UnsortedRoute {
        route: String,
        previous: Decimal,
        threshold: Decimal,
    },

    #[error("shipping route '{route}' has negative value {value}")]
    NegativeBracket { route: String, value: Decimal },

    #[error("cannot combine {left} and {right} amounts without conversion")]
    CurrencyMismatch { left: Currency, right: Currency },
}
