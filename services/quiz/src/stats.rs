//! Aggregate statistics, recomputed on every call

use tracing::info;

use crate::{error::ApiResult, models::Stats, repositories::QuizStore};

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Clone)]
pub struct StatsAggregator<S> {
    store: S,
}

impl<S: QuizStore> StatsAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Point-in-time totals, mean score and result type distribution
    pub async fn compute_stats(&self) -> ApiResult<Stats> {
        let snapshot = self.store.stats_snapshot().await?;
        info!(
            total_users = snapshot.total_users,
            total_tests = snapshot.total_tests,
            "Computed stats"
        );

        Ok(Stats {
            total_users: snapshot.total_users,
            total_tests: snapshot.total_tests,
            avg_score: snapshot.avg_score.map(round_to_cents),
            result_distribution: snapshot.result_distribution,
        })
    }
}
