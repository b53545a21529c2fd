//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use neighbors_core::Clock;

use crate::auth::TokenIssuer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Source of "now" for timestamps, urgency and token expiry.
    pub clock: Arc<dyn Clock>,
    /// Bearer token signer.
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, clock: Arc<dyn Clock>, tokens: TokenIssuer) -> Self {
        Self { db, clock, tokens }
    }
}
