//! ============================================================================
//! Core Types for Streamgate
//! ============================================================================
//! Catalogue and account entities plus the error taxonomy shared by the
//! store, lifecycle and access layers.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::subscription::SubscriptionStatus;

/// A piece of embeddable content in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Canonical identifier, never reused
    pub id: String,
    pub title: String,
    pub description: String,
    /// Cover image URL
    pub poster_url: String,
    /// Third-party embed markup or URL, stored verbatim
    pub embed_payload: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        poster_url: impl Into<String>,
        embed_payload: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::identifier::new_identifier(),
            title: title.into(),
            description: description.into(),
            poster_url: poster_url.into(),
            embed_payload: embed_payload.into(),
            tags: BTreeSet::new(),
            created_at: now,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Paywall view of the item, without the embed payload
    pub fn preview(&self) -> ContentPreview {
        ContentPreview {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            poster_url: self.poster_url.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// What a signed-in viewer without a usable subscription gets to see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPreview {
    pub id: String,
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub tags: BTreeSet<String>,
}

/// A signed-in account, as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Set out-of-band only
    pub is_admin: bool,
}

impl Account {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id, email)
        }
    }
}

/// Storage collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Error types for gate operations.
///
/// Malformed tokens never show up here; they are absorbed into a
/// not-found outcome by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Administrator capability required: {0}")]
    Unauthorized(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Cannot {operation} a subscription in state {from}")]
    InvalidTransition {
        operation: &'static str,
        from: SubscriptionStatus,
    },

    #[error("Subscription amount must be greater than zero")]
    InvalidAmount,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GateError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GateError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_preview_hides_embed() {
        let added = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let item = ContentItem::new("Title", "Desc", "https://img/p.jpg", "<iframe src=x>", added)
            .with_tags(["drama", "kdrama"]);
        assert_eq!(item.created_at, added);
        let preview = item.preview();
        assert_eq!(preview.title, "Title");
        assert_eq!(preview.tags.len(), 2);
        let json = serde_json::to_string(&preview).unwrap();
        assert!(!json.contains("iframe"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GateError::Storage(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!GateError::Storage(StoreError::Corrupt("bad".into())).is_retryable());
        assert!(!GateError::Unauthorized("approve".into()).is_retryable());
    }
}
