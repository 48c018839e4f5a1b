//! ============================================================================
//! Content Resolver - Public token to catalogue item
//! ============================================================================
//! decode -> shape check -> store lookup. The first two steps never touch the
//! store, so garbage tokens are rejected without a round trip. Every token
//! problem collapses into the same "not found" answer.
//! ============================================================================

use std::sync::Arc;
use tracing::debug;

use crate::codec;
use crate::identifier;
use crate::store::ContentStore;
use crate::types::{ContentItem, StoreError};

pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Decode and shape-check a token without touching storage
    pub fn identifier_for(token: &str) -> Option<String> {
        let id = codec::decode(token)?;
        if !identifier::is_well_formed(&id) {
            debug!("Decoded identifier has the wrong shape; treating token as unknown");
            return None;
        }
        Some(id)
    }

    /// Fetch an item by its already-validated identifier
    pub async fn lookup(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        self.store.get_content(id).await
    }

    /// Resolve a public token.
    ///
    /// `Ok(None)` covers every flavour of not-found; only storage failures
    /// are reported as errors.
    pub async fn resolve(&self, token: &str) -> Result<Option<ContentItem>, StoreError> {
        match Self::identifier_for(token) {
            Some(id) => self.lookup(&id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::GateDb;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_identifier_for() {
        let id = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        assert_eq!(ContentResolver::identifier_for(&codec::encode(id)).as_deref(), Some(id));
        // Decodes fine but is not an issued identifier shape
        assert_eq!(ContentResolver::identifier_for(&codec::encode("abc-123")), None);
        assert_eq!(ContentResolver::identifier_for("%%%"), None);
    }

    #[tokio::test]
    async fn test_resolve() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(GateDb::open(&dir.path().join("gate.redb")).unwrap());
        let item = ContentItem::new("T", "D", "https://img/p.jpg", "https://embed/1", Utc::now());
        db.put_content(&item).await.unwrap();

        let resolver = ContentResolver::new(db);
        assert_eq!(resolver.resolve(&codec::encode(&item.id)).await, Ok(Some(item)));

        let unknown = identifier::new_identifier();
        assert_eq!(resolver.resolve(&codec::encode(&unknown)).await, Ok(None));
        assert_eq!(resolver.resolve("not-a-token").await, Ok(None));
    }
}
