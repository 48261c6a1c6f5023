//! Application state shared across handlers

use chrono::Duration;

use crate::{
    identity::{AuthPolicy, IdentityService},
    repositories::QuizStore,
    results::ResultRecorder,
    session::SessionManager,
    stats::StatsAggregator,
};

/// Application state shared across handlers
///
/// Every component holds its own handle to the same store.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub identities: IdentityService<S>,
    pub sessions: SessionManager<S>,
    pub results: ResultRecorder<S>,
    pub stats: StatsAggregator<S>,
}

impl<S: QuizStore> AppState<S> {
    pub fn new(store: S, policy: AuthPolicy, session_ttl: Duration) -> Self {
        Self {
            identities: IdentityService::new(store.clone(), policy),
            sessions: SessionManager::new(store.clone(), session_ttl),
            results: ResultRecorder::new(store.clone()),
            stats: StatsAggregator::new(store.clone()),
            store,
        }
    }
}
