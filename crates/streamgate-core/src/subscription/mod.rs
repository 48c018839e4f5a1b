//! ============================================================================
//! Subscription Module - Paid access lifecycle
//! ============================================================================
//! A subscription record is one billing-cycle attempt for an account.
//!
//! ## States
//! - **pending_approval**: payment self-reported, waiting for an admin
//! - **active**: usable until `expires_at`
//! - **expired**: period ran out (written by an explicit sweep only)
//! - **cancelled**: rejected by an admin
//!
//! Usability is derived on every read (`active` and `expires_at > now`);
//! there is no background job rewriting stale records.
//!
//! ## Usage
//! ```rust,ignore
//! use streamgate_core::subscription::SubscriptionLifecycle;
//!
//! let lifecycle = SubscriptionLifecycle::new(store, clock);
//! let claim = lifecycle.create_pending(Some(&viewer), 2_000).await?;
//! let outcome = lifecycle.approve(&admin, &claim.id).await?;
//! ```
//! ============================================================================

mod lifecycle;
mod types;

pub use lifecycle::{require_admin, SubscriptionLifecycle};
pub use types::{
    select_authoritative, ConditionalUpdate, Precondition, StatusChange, StatusInfo,
    SubscriptionRecord, SubscriptionStatus, TransitionOutcome, DEFAULT_PERIOD_DAYS,
    DEFAULT_PLAN_AMOUNT_CENTS,
};
