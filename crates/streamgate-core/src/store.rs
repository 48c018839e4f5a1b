//! ============================================================================
//! Store Interfaces - Persistent collaborators consumed by the gate
//! ============================================================================
//! Every call is a potential suspension point and may fail independently.
//! Nothing here caches; each request sees the store as it is.
//! ============================================================================

use async_trait::async_trait;

use crate::subscription::{
    ConditionalUpdate, Precondition, StatusChange, SubscriptionRecord, SubscriptionStatus,
};
use crate::types::{Account, ContentItem, StoreError};

/// Catalogue storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, StoreError>;

    /// Insert or fully replace
    async fn put_content(&self, item: &ContentItem) -> Result<(), StoreError>;

    async fn delete_content(&self, id: &str) -> Result<bool, StoreError>;

    /// Newest first, optionally restricted to one tag
    async fn list_content(&self, tag: Option<&str>) -> Result<Vec<ContentItem>, StoreError>;
}

/// Subscription record storage
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert_subscription(&self, record: &SubscriptionRecord) -> Result<(), StoreError>;

    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// All records of one account, newest first
    async fn subscriptions_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<SubscriptionRecord>, StoreError>;

    /// All records, newest first, optionally filtered by stored status
    async fn list_subscriptions(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<SubscriptionRecord>, StoreError>;

    /// Atomic compare-and-set: apply `change` only if `precondition` holds
    /// on the stored record at write time. No intermediate state is visible.
    async fn update_subscription_if(
        &self,
        id: &str,
        precondition: &Precondition,
        change: &StatusChange,
    ) -> Result<ConditionalUpdate, StoreError>;
}

/// Account profiles
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError>;

    async fn put_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
}
