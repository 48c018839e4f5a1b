//! ============================================================================
//! View Gate - One content view request, end to end
//! ============================================================================
//! token -> decode -> shape check -> viewer -> content -> subscription -> decide
//!
//! Each step gates the next. Anonymous visitors are answered from the token
//! alone, so they learn nothing about which identifiers exist.
//! ============================================================================

use std::sync::Arc;
use tracing::{debug, info};

use super::checker::SubscriptionChecker;
use super::types::{AccessDecision, ViewOutcome};
use crate::clock::Clock;
use crate::identity::IdentityProvider;
use crate::resolver::ContentResolver;
use crate::types::GateError;

pub struct ViewGate {
    resolver: ContentResolver,
    checker: SubscriptionChecker,
    identity: Arc<dyn IdentityProvider>,
}

impl ViewGate {
    pub fn new(
        resolver: ContentResolver,
        checker: SubscriptionChecker,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            resolver,
            checker,
            identity,
        }
    }

    /// Handle a request for `/v/{token}`.
    ///
    /// Storage and identity failures propagate; every token problem is
    /// `NotFound`.
    pub async fn view(&self, token: &str) -> Result<ViewOutcome, GateError> {
        let Some(content_id) = ContentResolver::identifier_for(token) else {
            return Ok(ViewOutcome::refused(AccessDecision::NotFound));
        };

        let viewer = self.identity.current_account().await?;
        let Some(viewer) = viewer else {
            debug!("Anonymous view request, asking for sign-in");
            return Ok(ViewOutcome::refused(AccessDecision::RequireLogin));
        };

        let Some(content) = self.resolver.lookup(&content_id).await? else {
            return Ok(ViewOutcome::refused(AccessDecision::NotFound));
        };

        let subscription = self.checker.authoritative(&viewer.id).await?;
        let decision = AccessDecision::decide(
            Some(&viewer),
            Some(&content.id),
            subscription.as_ref(),
            self.checker.clock().now(),
        );

        info!(
            "View {} by {}: {}",
            content.id,
            viewer.id,
            decision.display_name()
        );

        Ok(match decision {
            AccessDecision::Allow => ViewOutcome::allowed(content),
            AccessDecision::RequireSubscription => ViewOutcome::paywalled(&content),
            other => ViewOutcome::refused(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::codec;
    use crate::db::GateDb;
    use crate::identity::SessionIdentity;
    use crate::store::{ContentStore, SubscriptionStore};
    use crate::subscription::SubscriptionRecord;
    use crate::types::{Account, ContentItem};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    async fn setup(
        identity: SessionIdentity,
    ) -> (ViewGate, Arc<GateDb>, Arc<ManualClock>, ContentItem, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(GateDb::open(&dir.path().join("gate.redb")).unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let item = ContentItem::new("Title", "Desc", "https://img/p.jpg", "<iframe src=x>", clock.now());
        db.put_content(&item).await.unwrap();

        let gate = ViewGate::new(
            ContentResolver::new(db.clone()),
            SubscriptionChecker::new(db.clone(), clock.clone()),
            Arc::new(identity),
        );
        (gate, db, clock, item, dir)
    }

    #[tokio::test]
    async fn test_paywall_then_allow() {
        let viewer = Account::new("u1", "u1@example.com");
        let (gate, db, clock, item, _dir) = setup(SessionIdentity::signed_in(viewer)).await;
        let token = codec::encode(&item.id);

        let outcome = gate.view(&token).await.unwrap();
        assert_eq!(outcome.decision, AccessDecision::RequireSubscription);
        assert!(outcome.content.is_none());
        assert_eq!(outcome.preview.map(|p| p.title), Some("Title".to_string()));

        db.insert_subscription(&SubscriptionRecord::active("u1", 2000, clock.now(), Duration::days(30)))
            .await
            .unwrap();
        let outcome = gate.view(&token).await.unwrap();
        assert_eq!(outcome.decision, AccessDecision::Allow);
        assert_eq!(outcome.content, Some(item));

        clock.advance(Duration::days(30));
        let outcome = gate.view(&token).await.unwrap();
        assert_eq!(outcome.decision, AccessDecision::RequireSubscription);
    }

    #[tokio::test]
    async fn test_unknown_content_for_signed_in_viewer() {
        let viewer = Account::new("u1", "u1@example.com");
        let (gate, _db, _clock, _item, _dir) = setup(SessionIdentity::signed_in(viewer)).await;
        let token = codec::encode(&crate::identifier::new_identifier());
        assert_eq!(gate.view(&token).await.unwrap().decision, AccessDecision::NotFound);
    }

    #[tokio::test]
    async fn test_anonymous_gets_login_prompt() {
        let (gate, _db, _clock, item, _dir) = setup(SessionIdentity::anonymous()).await;
        let outcome = gate.view(&codec::encode(&item.id)).await.unwrap();
        assert_eq!(outcome, ViewOutcome::refused(AccessDecision::RequireLogin));
        assert_eq!(gate.view("garbage").await.unwrap().decision, AccessDecision::NotFound);
    }
}
