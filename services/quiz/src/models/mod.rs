//! Quiz service models

pub mod session;
pub mod stats;
pub mod test_result;
pub mod user;

// Re-export for convenience
pub use session::{NewSession, Session};
pub use stats::{Stats, StatsSnapshot};
pub use test_result::{NewTestResult, TestResult};
pub use user::{NewUser, User};
