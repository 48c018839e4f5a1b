//! ============================================================================
//! Access Types - The view decision and what a viewer gets back
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscription::{StatusInfo, SubscriptionRecord, SubscriptionStatus};
use crate::types::{Account, ContentItem, ContentPreview};

/// Outcome of the view policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    RequireLogin,
    RequireSubscription,
    NotFound,
}

impl AccessDecision {
    /// Pure policy over already-fetched state.
    ///
    /// `subscription` is the viewer's authoritative record, if any.
    pub fn decide(
        viewer: Option<&Account>,
        content_id: Option<&str>,
        subscription: Option<&SubscriptionRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        if content_id.is_none() {
            return AccessDecision::NotFound;
        }
        if viewer.is_none() {
            return AccessDecision::RequireLogin;
        }
        match subscription {
            Some(record) if record.is_usable(now) => AccessDecision::Allow,
            _ => AccessDecision::RequireSubscription,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AccessDecision::Allow => "Allowed",
            AccessDecision::RequireLogin => "Sign in required",
            AccessDecision::RequireSubscription => "Active plan required",
            AccessDecision::NotFound => "Not found",
        }
    }
}

/// Everything the view page needs for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewOutcome {
    pub decision: AccessDecision,
    /// Only on `Allow`
    pub content: Option<ContentItem>,
    /// Only on `RequireSubscription`, for the paywall
    pub preview: Option<ContentPreview>,
}

impl ViewOutcome {
    pub fn refused(decision: AccessDecision) -> Self {
        Self {
            decision,
            content: None,
            preview: None,
        }
    }

    pub fn allowed(content: ContentItem) -> Self {
        Self {
            decision: AccessDecision::Allow,
            content: Some(content),
            preview: None,
        }
    }

    pub fn paywalled(content: &ContentItem) -> Self {
        Self {
            decision: AccessDecision::RequireSubscription,
            content: None,
            preview: Some(content.preview()),
        }
    }
}

/// Dashboard view of an account's authoritative subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionSummary {
    pub record: SubscriptionRecord,
    pub effective_status: SubscriptionStatus,
    pub info: StatusInfo,
    pub usable: bool,
    pub days_remaining: Option<i64>,
}

impl SubscriptionSummary {
    pub fn new(record: SubscriptionRecord, now: DateTime<Utc>) -> Self {
        let effective_status = record.effective_status(now);
        Self {
            effective_status,
            info: effective_status.info(),
            usable: record.is_usable(now),
            days_remaining: record.days_remaining(now),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::StatusChange;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn viewer() -> Account {
        Account::new("u1", "u1@example.com")
    }

    #[test]
    fn test_missing_content_is_not_found() {
        let active = SubscriptionRecord::active("u1", 2000, now(), Duration::days(30));
        assert_eq!(
            AccessDecision::decide(Some(&viewer()), None, Some(&active), now()),
            AccessDecision::NotFound
        );
        assert_eq!(AccessDecision::decide(None, None, None, now()), AccessDecision::NotFound);
    }

    #[test]
    fn test_anonymous_requires_login() {
        assert_eq!(
            AccessDecision::decide(None, Some("id"), None, now()),
            AccessDecision::RequireLogin
        );
    }

    #[test]
    fn test_subscription_states() {
        let v = viewer();
        assert_eq!(
            AccessDecision::decide(Some(&v), Some("id"), None, now()),
            AccessDecision::RequireSubscription
        );

        let active = SubscriptionRecord::active("u1", 2000, now(), Duration::days(30));
        assert_eq!(
            AccessDecision::decide(Some(&v), Some("id"), Some(&active), now() + Duration::days(1)),
            AccessDecision::Allow
        );

        // Stored as active but past expiry
        assert_eq!(
            AccessDecision::decide(Some(&v), Some("id"), Some(&active), now() + Duration::days(31)),
            AccessDecision::RequireSubscription
        );

        let pending = SubscriptionRecord::pending("u1", 2000, now());
        assert_eq!(
            AccessDecision::decide(Some(&v), Some("id"), Some(&pending), now()),
            AccessDecision::RequireSubscription
        );

        let mut cancelled = active.clone();
        StatusChange::close(SubscriptionStatus::Cancelled, now()).apply(&mut cancelled);
        assert_eq!(
            AccessDecision::decide(Some(&v), Some("id"), Some(&cancelled), now()),
            AccessDecision::RequireSubscription
        );
    }

    #[test]
    fn test_summary_reports_lapsed_as_expired() {
        let active = SubscriptionRecord::active("u1", 2000, now(), Duration::days(30));
        let summary = SubscriptionSummary::new(active, now() + Duration::days(40));
        assert_eq!(summary.record.status, SubscriptionStatus::Active);
        assert_eq!(summary.effective_status, SubscriptionStatus::Expired);
        assert_eq!(summary.info.label, "Expired");
        assert!(!summary.usable);
        assert_eq!(summary.days_remaining, None);
    }
}
