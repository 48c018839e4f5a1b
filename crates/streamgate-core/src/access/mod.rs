//! ============================================================================
//! Access Module - Subscription-gated content viewing
//! ============================================================================
//! Decides whether the current visitor may watch a piece of content.
//!
//! ## Decisions
//! - **NotFound**: token did not decode, has the wrong shape, or names nothing
//! - **RequireLogin**: anonymous visitor
//! - **RequireSubscription**: signed in, newest subscription not usable
//! - **Allow**: signed in with a usable subscription
//!
//! ## Usage
//! ```rust,ignore
//! use streamgate_core::access::{SubscriptionChecker, ViewGate};
//! use streamgate_core::resolver::ContentResolver;
//!
//! let gate = ViewGate::new(
//!     ContentResolver::new(db.clone()),
//!     SubscriptionChecker::new(db.clone(), clock),
//!     identity,
//! );
//! let outcome = gate.view(token).await?;
//! ```
//! ============================================================================

mod checker;
mod gate;
mod types;

// Re-export public types
pub use checker::SubscriptionChecker;
pub use gate::ViewGate;
pub use types::{AccessDecision, SubscriptionSummary, ViewOutcome};
