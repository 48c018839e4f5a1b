// ============================================================================
// GateDb - Embedded Database (redb)
// ============================================================================
// Persistent storage for catalogue items, accounts and subscription records.
// Default path: ~/.streamgate/gate.redb (override via STREAMGATE_DB_PATH)
//
// redb admits one write transaction at a time, so a read-check-write inside
// a single write transaction is the compare-and-set primitive the lifecycle
// relies on.
//
// redb calls block, so every async store method runs its transaction on
// tokio's blocking pool.
// ============================================================================

pub mod types;

pub use types::DbStats;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::{AccountStore, ContentStore, SubscriptionStore};
use crate::subscription::{
    ConditionalUpdate, Precondition, StatusChange, SubscriptionRecord, SubscriptionStatus,
};
use crate::types::{Account, ContentItem, StoreError};

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

// Table definitions
const CONTENT: Table = TableDefinition::new("content");
const SUBSCRIPTIONS: Table = TableDefinition::new("subscriptions");
const ACCOUNTS: Table = TableDefinition::new("accounts");

/// Embedded database backing every store trait.
///
/// Cloning is cheap and shares the underlying database handle.
#[derive(Clone)]
pub struct GateDb {
    db: Arc<Database>,
    path: PathBuf,
}

impl GateDb {
    /// Open (or create) the database file and make sure all tables exist
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create {}: {}", parent.display(), e))?;
        }

        info!("Opening database at: {}", path.display());

        let db = Database::create(path).map_err(|e| anyhow!("Failed to open database: {}", e))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        for (name, table) in [
            ("content", CONTENT),
            ("subscriptions", SUBSCRIPTIONS),
            ("accounts", ACCOUNTS),
        ] {
            write_txn
                .open_table(table)
                .map_err(|e| anyhow!("Failed to create {} table: {}", name, e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        info!("Database ready");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a synchronous database operation off the async worker threads
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&GateDb) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| {
                warn!("Database task failed: {}", e);
                unavailable(e)
            })?
    }

    // ========================================================================
    // Generic table access
    // ========================================================================

    fn put<T: Serialize>(&self, table: Table, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value).map_err(corrupt)?;

        let write_txn = self.db.begin_write().map_err(unavailable)?;
        {
            let mut t = write_txn.open_table(table).map_err(unavailable)?;
            t.insert(key, bytes.as_slice()).map_err(unavailable)?;
        }
        write_txn.commit().map_err(unavailable)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let t = read_txn.open_table(table).map_err(unavailable)?;

        let found = match t.get(key).map_err(unavailable)? {
            Some(value) => Some(bincode::deserialize(value.value()).map_err(corrupt)?),
            None => None,
        };
        Ok(found)
    }

    fn scan<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let t = read_txn.open_table(table).map_err(unavailable)?;

        let mut results = Vec::new();
        for entry in t.range::<&str>(..).map_err(unavailable)? {
            let (_key, value) = entry.map_err(unavailable)?;
            results.push(bincode::deserialize(value.value()).map_err(corrupt)?);
        }
        Ok(results)
    }

    fn remove(&self, table: Table, key: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let removed;
        {
            let mut t = write_txn.open_table(table).map_err(unavailable)?;
            removed = t.remove(key).map_err(unavailable)?.is_some();
        }
        write_txn.commit().map_err(unavailable)?;
        Ok(removed)
    }

    /// Read, check and write one subscription inside a single write transaction
    fn compare_and_set(
        &self,
        id: &str,
        precondition: &Precondition,
        change: &StatusChange,
    ) -> Result<ConditionalUpdate, StoreError> {
        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let outcome;
        {
            let mut t = write_txn.open_table(SUBSCRIPTIONS).map_err(unavailable)?;

            let current: Option<SubscriptionRecord> = match t.get(id).map_err(unavailable)? {
                Some(value) => Some(bincode::deserialize(value.value()).map_err(corrupt)?),
                None => None,
            };

            outcome = match current {
                None => ConditionalUpdate::Missing,
                Some(record) if !precondition.holds(&record) => {
                    ConditionalUpdate::Unchanged(record)
                }
                Some(mut record) => {
                    change.apply(&mut record);
                    let bytes = bincode::serialize(&record).map_err(corrupt)?;
                    t.insert(id, bytes.as_slice()).map_err(unavailable)?;
                    ConditionalUpdate::Applied(record)
                }
            };
        }

        if matches!(outcome, ConditionalUpdate::Applied(_)) {
            write_txn.commit().map_err(unavailable)?;
        } else {
            write_txn.abort().map_err(unavailable)?;
        }
        Ok(outcome)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<DbStats, StoreError> {
        let content: Vec<ContentItem> = self.scan(CONTENT)?;
        let accounts: Vec<Account> = self.scan(ACCOUNTS)?;
        let subscriptions: Vec<SubscriptionRecord> = self.scan(SUBSCRIPTIONS)?;

        let mut subscription_counts = HashMap::new();
        for record in &subscriptions {
            *subscription_counts
                .entry(record.status.as_str().to_string())
                .or_insert(0usize) += 1;
        }

        Ok(DbStats {
            total_content: content.len(),
            total_accounts: accounts.len(),
            admin_accounts: accounts.iter().filter(|a| a.is_admin).count(),
            total_subscriptions: subscriptions.len(),
            subscription_counts,
        })
    }
}

fn unavailable<E: Display>(e: E) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn corrupt<E: Display>(e: E) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn newest_first(records: &mut [SubscriptionRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl ContentStore for GateDb {
    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        let id = id.to_owned();
        self.blocking(move |db| db.get(CONTENT, &id)).await
    }

    async fn put_content(&self, item: &ContentItem) -> Result<(), StoreError> {
        let owned = item.clone();
        self.blocking(move |db| db.put(CONTENT, &owned.id, &owned))
            .await?;
        debug!("Stored content: {}", item.id);
        Ok(())
    }

    async fn delete_content(&self, id: &str) -> Result<bool, StoreError> {
        let key = id.to_owned();
        let removed = self.blocking(move |db| db.remove(CONTENT, &key)).await?;
        if removed {
            debug!("Deleted content: {}", id);
        }
        Ok(removed)
    }

    async fn list_content(&self, tag: Option<&str>) -> Result<Vec<ContentItem>, StoreError> {
        let mut items: Vec<ContentItem> = self.blocking(|db| db.scan(CONTENT)).await?;
        if let Some(tag) = tag {
            items.retain(|item| item.has_tag(tag));
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

#[async_trait]
impl SubscriptionStore for GateDb {
    async fn insert_subscription(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
        let owned = record.clone();
        self.blocking(move |db| db.put(SUBSCRIPTIONS, &owned.id, &owned))
            .await?;
        debug!(
            "Stored subscription {} for account {} ({})",
            record.id, record.account_id, record.status
        );
        Ok(())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionRecord>, StoreError> {
        let id = id.to_owned();
        self.blocking(move |db| db.get(SUBSCRIPTIONS, &id)).await
    }

    async fn subscriptions_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<SubscriptionRecord>, StoreError> {
        let mut records: Vec<SubscriptionRecord> =
            self.blocking(|db| db.scan(SUBSCRIPTIONS)).await?;
        records.retain(|r| r.account_id == account_id);
        newest_first(&mut records);
        Ok(records)
    }

    async fn list_subscriptions(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<SubscriptionRecord>, StoreError> {
        let mut records: Vec<SubscriptionRecord> =
            self.blocking(|db| db.scan(SUBSCRIPTIONS)).await?;
        if let Some(status) = status {
            records.retain(|r| r.status == status);
        }
        newest_first(&mut records);
        Ok(records)
    }

    async fn update_subscription_if(
        &self,
        id: &str,
        precondition: &Precondition,
        change: &StatusChange,
    ) -> Result<ConditionalUpdate, StoreError> {
        let id = id.to_owned();
        let precondition = precondition.clone();
        let change = change.clone();
        let outcome = self
            .blocking(move |db| db.compare_and_set(&id, &precondition, &change))
            .await?;
        if let ConditionalUpdate::Applied(record) = &outcome {
            debug!("Subscription {} now {}", record.id, record.status);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl AccountStore for GateDb {
    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let id = id.to_owned();
        self.blocking(move |db| db.get(ACCOUNTS, &id)).await
    }

    async fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        let owned = account.clone();
        self.blocking(move |db| db.put(ACCOUNTS, &owned.id, &owned))
            .await?;
        debug!("Stored account: {}", account.id);
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.blocking(|db| db.scan(ACCOUNTS)).await?;
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }
}
