//! Backend for the Biorobot Detector Telegram Mini App quiz
//!
//! Authenticates Telegram users (or fabricates demo identities), issues
//! session tokens and records quiz results against them.

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod results;
pub mod routes;
pub mod session;
pub mod state;
pub mod stats;
pub mod telegram;
pub mod validation;

pub use state::AppState;
