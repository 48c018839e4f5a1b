//! ============================================================================
//! Subscription Checker - Authoritative record lookup for a viewer
//! ============================================================================
//! Reads the store on every call. Only the newest record of an account
//! counts; older ones are history even if they still say `active`.
//! ============================================================================

use std::sync::Arc;
use tracing::debug;

use super::types::SubscriptionSummary;
use crate::clock::Clock;
use crate::store::SubscriptionStore;
use crate::subscription::{select_authoritative, SubscriptionRecord};
use crate::types::StoreError;

pub struct SubscriptionChecker {
    store: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionChecker {
    pub fn new(store: Arc<dyn SubscriptionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The account's most recently created record
    pub async fn authoritative(
        &self,
        account_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let records = self.store.subscriptions_for_account(account_id).await?;
        let chosen = select_authoritative(&records).cloned();

        debug!(
            "Account {} has {} subscription records, authoritative: {:?}",
            account_id,
            records.len(),
            chosen.as_ref().map(|r| (&r.id, r.status))
        );
        Ok(chosen)
    }

    /// Whether the account can watch content right now
    pub async fn is_usable(&self, account_id: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .authoritative(account_id)
            .await?
            .map(|r| r.is_usable(now))
            .unwrap_or(false))
    }

    /// Dashboard summary, `None` when the account never subscribed
    pub async fn summary(&self, account_id: &str) -> Result<Option<SubscriptionSummary>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .authoritative(account_id)
            .await?
            .map(|record| SubscriptionSummary::new(record, now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::GateDb;
    use crate::subscription::{StatusChange, SubscriptionStatus};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_newest_record_wins() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(GateDb::open(&dir.path().join("gate.redb")).unwrap());
        let t1 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t2 = t1 + Duration::days(1);
        let clock = Arc::new(ManualClock::new(t2 + Duration::hours(1)));
        let checker = SubscriptionChecker::new(db.clone(), clock.clone());

        assert_eq!(checker.authoritative("u1").await, Ok(None));
        assert_eq!(checker.is_usable("u1").await, Ok(false));
        assert_eq!(checker.summary("u1").await, Ok(None));

        let mut cancelled = SubscriptionRecord::active("u1", 2000, t1, Duration::days(30));
        StatusChange::close(SubscriptionStatus::Cancelled, t1).apply(&mut cancelled);
        let active = SubscriptionRecord::active("u1", 2000, t2, Duration::days(30));
        db.insert_subscription(&cancelled).await.unwrap();
        db.insert_subscription(&active).await.unwrap();

        let chosen = checker.authoritative("u1").await.unwrap().unwrap();
        assert_eq!(chosen.id, active.id);
        assert_eq!(checker.is_usable("u1").await, Ok(true));

        // A newer pending claim shadows the older active record
        let pending = SubscriptionRecord::pending("u1", 2000, t2 + Duration::minutes(30));
        db.insert_subscription(&pending).await.unwrap();
        assert_eq!(checker.is_usable("u1").await, Ok(false));

        let summary = checker.summary("u1").await.unwrap().unwrap();
        assert_eq!(summary.effective_status, SubscriptionStatus::PendingApproval);
    }
}
