//! ============================================================================
//! STREAMGATE-CORE: Who gets to watch what
//! ============================================================================
//! This crate holds the gating logic behind the video catalogue:
//! - Token codec turning content identifiers into unguessable link segments
//! - Identifier shape validation before any storage lookup
//! - Subscription lifecycle (pending -> active -> expired / cancelled)
//! - Access decision for a viewer and a piece of content
//! - redb-backed persistence for content, accounts and subscriptions
//! ============================================================================

pub mod access;
pub mod clock;
pub mod codec;
pub mod config;
pub mod db;
pub mod identifier;
pub mod identity;
pub mod resolver;
pub mod store;
pub mod subscription;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use access::{AccessDecision, SubscriptionChecker, ViewGate, ViewOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use db::{DbStats, GateDb};
pub use identity::{IdentityProvider, SessionIdentity};
pub use resolver::ContentResolver;
pub use store::{AccountStore, ContentStore, SubscriptionStore};
pub use subscription::{
    SubscriptionLifecycle, SubscriptionRecord, SubscriptionStatus, TransitionOutcome,
};
