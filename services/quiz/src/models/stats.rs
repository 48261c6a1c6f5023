//! Aggregate statistics over recorded results

use serde::Serialize;
use std::collections::BTreeMap;

/// Raw aggregates as computed by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub total_users: i64,
    pub total_tests: i64,
    /// Mean score, `None` when no result exists
    pub avg_score: Option<f64>,
    pub result_distribution: BTreeMap<String, i64>,
}

/// Statistics as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_users: i64,
    pub total_tests: i64,
    /// Mean score rounded to two decimals
    pub avg_score: Option<f64>,
    pub result_distribution: BTreeMap<String, i64>,
}
