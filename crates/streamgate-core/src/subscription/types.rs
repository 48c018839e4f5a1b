//! ============================================================================
//! Subscription Types - Records, states and the usability predicate
//! ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default activation period
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Default self-service claim (R$ 20,00)
pub const DEFAULT_PLAN_AMOUNT_CENTS: u64 = 2_000;

/// Stored lifecycle state of a subscription record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Payment self-reported, waiting for an administrator
    PendingApproval,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pending_approval" | "pending" => Some(Self::PendingApproval),
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Dashboard label and description
    pub fn info(&self) -> StatusInfo {
        match self {
            Self::Active => StatusInfo {
                label: "Active",
                description: "Your subscription is active",
            },
            Self::PendingApproval => StatusInfo {
                label: "Awaiting Approval",
                description: "Payment registered, waiting for administrator confirmation",
            },
            Self::Expired => StatusInfo {
                label: "Expired",
                description: "Your subscription has expired",
            },
            Self::Cancelled => StatusInfo {
                label: "Cancelled",
                description: "Subscription was cancelled",
            },
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub label: &'static str,
    pub description: &'static str,
}

/// One billing-cycle attempt for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub account_id: String,
    pub status: SubscriptionStatus,
    /// Informational, in cents
    pub amount_cents: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only set while `status == Active`
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    /// New record awaiting approval
    pub fn pending(account_id: impl Into<String>, amount_cents: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            status: SubscriptionStatus::PendingApproval,
            amount_cents,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// New record that starts active immediately
    pub fn active(
        account_id: impl Into<String>,
        amount_cents: u64,
        now: DateTime<Utc>,
        period: Duration,
    ) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            expires_at: Some(now + period),
            ..Self::pending(account_id, amount_cents, now)
        }
    }

    /// Derived predicate: stored as active and not yet past expiry.
    ///
    /// The stored status alone is never enough; an `Active` record whose
    /// `expires_at` has passed is not usable.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.map(|exp| exp > now).unwrap_or(false)
    }

    /// Stored as active but already past its expiry
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && !self.is_usable(now)
    }

    /// Status as a viewer should see it right now
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        if self.is_lapsed(now) {
            SubscriptionStatus::Expired
        } else {
            self.status
        }
    }

    /// Whole days left (rounded up) for a usable record
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_usable(now) {
            return None;
        }
        let remaining = self.expires_at? - now;
        let secs = remaining.num_seconds();
        Some((secs + 86_399) / 86_400)
    }

    /// Amount formatted for display, e.g. `R$ 20.00`
    pub fn amount_display(&self) -> String {
        format!("R$ {}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }
}

/// Pick the authoritative record: latest `created_at`, ties broken by id.
///
/// Older records are history, whatever their status says.
pub fn select_authoritative<'a, I>(records: I) -> Option<&'a SubscriptionRecord>
where
    I: IntoIterator<Item = &'a SubscriptionRecord>,
{
    records
        .into_iter()
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

/// Guard evaluated by the store inside its atomic update
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Stored status must be one of these
    StatusIn(Vec<SubscriptionStatus>),
    /// Stored as active with `expires_at <= at`
    LapsedAt(DateTime<Utc>),
    /// At least one of the inner guards holds
    AnyOf(Vec<Precondition>),
}

impl Precondition {
    pub fn status_in(statuses: &[SubscriptionStatus]) -> Self {
        Precondition::StatusIn(statuses.to_vec())
    }

    pub fn holds(&self, record: &SubscriptionRecord) -> bool {
        match self {
            Precondition::StatusIn(allowed) => allowed.contains(&record.status),
            Precondition::LapsedAt(at) => record.is_lapsed(*at),
            Precondition::AnyOf(guards) => guards.iter().any(|g| g.holds(record)),
        }
    }
}

/// New values written when a precondition holds
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    pub fn activate(now: DateTime<Utc>, period: Duration) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            expires_at: Some(now + period),
            at: now,
        }
    }

    pub fn close(status: SubscriptionStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            expires_at: None,
            at: now,
        }
    }

    pub fn apply(&self, record: &mut SubscriptionRecord) {
        record.status = self.status;
        record.expires_at = self.expires_at;
        record.updated_at = self.at;
    }
}

/// Result of the store's compare-and-set primitive
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalUpdate {
    /// Precondition held; the record as written
    Applied(SubscriptionRecord),
    /// Precondition failed; the record as currently stored, untouched
    Unchanged(SubscriptionRecord),
    Missing,
}

/// Result of a lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(SubscriptionRecord),
    /// Someone else already moved the record; nothing was written
    AlreadyResolved(SubscriptionRecord),
}

impl TransitionOutcome {
    pub fn record(&self) -> &SubscriptionRecord {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::AlreadyResolved(r) => r,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_usable_requires_future_expiry() {
        let rec = SubscriptionRecord::active("acc", 2000, t(0), Duration::days(30));
        assert!(rec.is_usable(t(60)));
        assert!(!rec.is_usable(t(30 * 86_400)));
        assert!(!rec.is_usable(t(31 * 86_400)));
        assert_eq!(rec.effective_status(t(31 * 86_400)), SubscriptionStatus::Expired);
        assert_eq!(rec.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_active_without_expiry_is_not_usable() {
        let mut rec = SubscriptionRecord::pending("acc", 2000, t(0));
        rec.status = SubscriptionStatus::Active;
        assert!(!rec.is_usable(t(1)));
    }

    #[test]
    fn test_pending_and_cancelled_not_usable() {
        let pending = SubscriptionRecord::pending("acc", 2000, t(0));
        assert!(!pending.is_usable(t(1)));
        assert!(!pending.is_lapsed(t(1)));

        let mut cancelled = SubscriptionRecord::active("acc", 2000, t(0), Duration::days(30));
        StatusChange::close(SubscriptionStatus::Cancelled, t(5)).apply(&mut cancelled);
        assert!(!cancelled.is_usable(t(10)));
        assert_eq!(cancelled.expires_at, None);
        assert_eq!(cancelled.updated_at, t(5));
    }

    #[test]
    fn test_authoritative_is_latest_created() {
        let mut older = SubscriptionRecord::active("acc", 2000, t(0), Duration::days(30));
        older.id = "b".into();
        let mut newer = SubscriptionRecord::pending("acc", 2000, t(100));
        newer.id = "a".into();

        let records = vec![older.clone(), newer.clone()];
        assert_eq!(select_authoritative(&records).map(|r| r.id.as_str()), Some("a"));

        // Same timestamp: id decides
        let mut tie = newer.clone();
        tie.id = "z".into();
        let records = vec![newer, tie];
        assert_eq!(select_authoritative(&records).map(|r| r.id.as_str()), Some("z"));

        assert!(select_authoritative(&Vec::<SubscriptionRecord>::new()).is_none());
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let rec = SubscriptionRecord::active("acc", 2000, t(0), Duration::days(30));
        assert_eq!(rec.days_remaining(t(0)), Some(30));
        assert_eq!(rec.days_remaining(t(1)), Some(30));
        assert_eq!(rec.days_remaining(t(29 * 86_400 + 1)), Some(1));
        assert_eq!(rec.days_remaining(t(30 * 86_400)), None);
    }

    #[test]
    fn test_preconditions() {
        let rec = SubscriptionRecord::pending("acc", 2000, t(0));
        assert!(Precondition::status_in(&[SubscriptionStatus::PendingApproval]).holds(&rec));
        assert!(!Precondition::status_in(&[SubscriptionStatus::Active]).holds(&rec));
        assert!(!Precondition::LapsedAt(t(10)).holds(&rec));

        let active = SubscriptionRecord::active("acc", 2000, t(0), Duration::days(1));
        assert!(!Precondition::LapsedAt(t(10)).holds(&active));
        assert!(Precondition::LapsedAt(t(86_400)).holds(&active));

        let either = Precondition::AnyOf(vec![
            Precondition::status_in(&[SubscriptionStatus::Cancelled]),
            Precondition::LapsedAt(t(86_400)),
        ]);
        assert!(either.holds(&active));
        assert!(!either.holds(&rec));
    }

    #[test]
    fn test_status_parsing_and_display() {
        assert_eq!(
            SubscriptionStatus::from_str("pending-approval"),
            Some(SubscriptionStatus::PendingApproval)
        );
        assert_eq!(SubscriptionStatus::from_str("Canceled"), Some(SubscriptionStatus::Cancelled));
        assert_eq!(SubscriptionStatus::from_str("paused"), None);
        assert_eq!(SubscriptionStatus::Active.to_string(), "active");
        assert_eq!(SubscriptionStatus::PendingApproval.info().label, "Awaiting Approval");
    }

    #[test]
    fn test_amount_display() {
        let rec = SubscriptionRecord::pending("acc", 2005, t(0));
        assert_eq!(rec.amount_display(), "R$ 20.05");
    }
}
