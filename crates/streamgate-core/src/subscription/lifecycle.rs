//! ============================================================================
//! Subscription Lifecycle - pending -> active -> expired / cancelled
//! ============================================================================
//! Every administrative transition is a single conditional write against the
//! store. Losing a race is reported as `AlreadyResolved`, never as an error,
//! and never overwrites what the winner wrote.
//! ============================================================================

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{
    ConditionalUpdate, Precondition, StatusChange, SubscriptionRecord, SubscriptionStatus,
    TransitionOutcome, DEFAULT_PERIOD_DAYS,
};
use crate::clock::Clock;
use crate::store::SubscriptionStore;
use crate::types::{Account, GateError};

use super::types::SubscriptionStatus::{Active, Cancelled, Expired, PendingApproval};

/// Fails unless `actor` holds the administrator capability
pub fn require_admin(actor: &Account, operation: &str) -> Result<(), GateError> {
    if actor.is_admin {
        Ok(())
    } else {
        warn!("Account {} attempted {} without admin capability", actor.id, operation);
        Err(GateError::Unauthorized(operation.to_string()))
    }
}

/// Drives subscription records through their states
pub struct SubscriptionLifecycle {
    store: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl SubscriptionLifecycle {
    /// Lifecycle with the default 30-day activation period
    pub fn new(store: Arc<dyn SubscriptionStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_period(store, clock, Duration::days(DEFAULT_PERIOD_DAYS))
    }

    pub fn with_period(
        store: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Record a self-reported payment claim for the signed-in account.
    ///
    /// Several pending records per account are allowed; the newest one is
    /// the one that counts.
    pub async fn create_pending(
        &self,
        actor: Option<&Account>,
        amount_cents: u64,
    ) -> Result<SubscriptionRecord, GateError> {
        let actor = actor.ok_or(GateError::NotAuthenticated)?;
        if amount_cents == 0 {
            return Err(GateError::InvalidAmount);
        }

        let record = SubscriptionRecord::pending(&actor.id, amount_cents, self.clock.now());
        self.store.insert_subscription(&record).await?;

        info!(
            "Payment claim {} registered for account {} ({})",
            record.id,
            actor.id,
            record.amount_display()
        );
        Ok(record)
    }

    /// Administrator creates a record that is active straight away
    pub async fn grant(
        &self,
        actor: &Account,
        account_id: &str,
        amount_cents: u64,
    ) -> Result<SubscriptionRecord, GateError> {
        require_admin(actor, "grant")?;
        if amount_cents == 0 {
            return Err(GateError::InvalidAmount);
        }

        let record =
            SubscriptionRecord::active(account_id, amount_cents, self.clock.now(), self.period);
        self.store.insert_subscription(&record).await?;

        info!(
            "Admin {} granted subscription {} to account {} until {:?}",
            actor.id, record.id, account_id, record.expires_at
        );
        Ok(record)
    }

    /// pending_approval -> active, expiring one period from now
    pub async fn approve(
        &self,
        actor: &Account,
        record_id: &str,
    ) -> Result<TransitionOutcome, GateError> {
        require_admin(actor, "approve")?;
        let change = StatusChange::activate(self.clock.now(), self.period);
        self.transition(
            "approve",
            record_id,
            Precondition::status_in(&[PendingApproval]),
            &change,
            &[Active, Expired, Cancelled],
        )
        .await
    }

    /// pending_approval -> cancelled; repeating it on a cancelled record is a no-op
    pub async fn reject(
        &self,
        actor: &Account,
        record_id: &str,
    ) -> Result<TransitionOutcome, GateError> {
        require_admin(actor, "reject")?;
        let change = StatusChange::close(Cancelled, self.clock.now());
        self.transition(
            "reject",
            record_id,
            Precondition::status_in(&[PendingApproval]),
            &change,
            &[Cancelled],
        )
        .await
    }

    /// expired / cancelled -> active, expiring one period from now.
    ///
    /// A record still stored as active but past its expiry counts as expired.
    pub async fn reactivate(
        &self,
        actor: &Account,
        record_id: &str,
    ) -> Result<TransitionOutcome, GateError> {
        require_admin(actor, "reactivate")?;
        let now = self.clock.now();
        let change = StatusChange::activate(now, self.period);
        self.transition(
            "reactivate",
            record_id,
            Precondition::AnyOf(vec![
                Precondition::status_in(&[Expired, Cancelled]),
                Precondition::LapsedAt(now),
            ]),
            &change,
            &[Active],
        )
        .await
    }

    /// Rewrite every active-but-lapsed record to `expired`.
    ///
    /// Each rewrite is conditional, so a record reactivated in the meantime is
    /// left alone. Returns how many records were rewritten.
    pub async fn expire_lapsed(&self, actor: &Account) -> Result<usize, GateError> {
        require_admin(actor, "expire")?;
        let now = self.clock.now();

        let candidates = self.store.list_subscriptions(Some(Active)).await?;
        let change = StatusChange::close(Expired, now);
        let guard = Precondition::LapsedAt(now);

        let mut expired = 0;
        for record in candidates.iter().filter(|r| r.is_lapsed(now)) {
            match self
                .store
                .update_subscription_if(&record.id, &guard, &change)
                .await?
            {
                ConditionalUpdate::Applied(_) => expired += 1,
                ConditionalUpdate::Unchanged(_) | ConditionalUpdate::Missing => {
                    debug!("Subscription {} changed before it could be expired", record.id);
                }
            }
        }

        if expired > 0 {
            info!("Expired {} lapsed subscriptions", expired);
        }
        Ok(expired)
    }

    /// Records awaiting approval, newest first
    pub async fn pending_queue(&self, actor: &Account) -> Result<Vec<SubscriptionRecord>, GateError> {
        require_admin(actor, "list pending")?;
        Ok(self.store.list_subscriptions(Some(PendingApproval)).await?)
    }

    /// Every record of one account, newest first
    pub async fn history(&self, account_id: &str) -> Result<Vec<SubscriptionRecord>, GateError> {
        Ok(self.store.subscriptions_for_account(account_id).await?)
    }

    async fn transition(
        &self,
        operation: &'static str,
        record_id: &str,
        precondition: Precondition,
        change: &StatusChange,
        no_op_from: &[SubscriptionStatus],
    ) -> Result<TransitionOutcome, GateError> {
        match self
            .store
            .update_subscription_if(record_id, &precondition, change)
            .await?
        {
            ConditionalUpdate::Applied(record) => {
                info!(
                    "Subscription {} for account {}: {} -> {} (expires {:?})",
                    record.id, record.account_id, operation, record.status, record.expires_at
                );
                Ok(TransitionOutcome::Applied(record))
            }
            ConditionalUpdate::Unchanged(record) if no_op_from.contains(&record.status) => {
                debug!(
                    "Subscription {} already resolved ({}), {} is a no-op",
                    record.id, record.status, operation
                );
                Ok(TransitionOutcome::AlreadyResolved(record))
            }
            ConditionalUpdate::Unchanged(record) => Err(GateError::InvalidTransition {
                operation,
                from: record.status,
            }),
            ConditionalUpdate::Missing => {
                Err(GateError::SubscriptionNotFound(record_id.to_string()))
            }
        }
    }
}
