//! ============================================================================
//! Database Types - Summaries reported by GateDb
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row counts across the database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStats {
    pub total_content: usize,
    pub total_accounts: usize,
    pub admin_accounts: usize,
    pub total_subscriptions: usize,
    /// Stored status name -> count
    pub subscription_counts: HashMap<String, usize>,
}
