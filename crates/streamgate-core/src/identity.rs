//! ============================================================================
//! Identity - Who is asking
//! ============================================================================
//! The identity provider is an external collaborator; the gate only needs the
//! current account (or none) and a way to sign out.
//! ============================================================================

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{Account, GateError};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in account, or `None` for an anonymous visitor
    async fn current_account(&self) -> Result<Option<Account>, GateError>;

    async fn sign_out(&self) -> Result<(), GateError>;
}

/// In-process session holding at most one signed-in account
#[derive(Debug, Default)]
pub struct SessionIdentity {
    account: RwLock<Option<Account>>,
}

impl SessionIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(account: Account) -> Self {
        Self {
            account: RwLock::new(Some(account)),
        }
    }

    pub async fn sign_in(&self, account: Account) {
        info!("Signed in as {}", account.email);
        *self.account.write().await = Some(account);
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_account(&self) -> Result<Option<Account>, GateError> {
        Ok(self.account.read().await.clone())
    }

    async fn sign_out(&self) -> Result<(), GateError> {
        if let Some(account) = self.account.write().await.take() {
            info!("Signed out {}", account.email);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_sign_in_out() {
        let session = SessionIdentity::anonymous();
        assert_eq!(session.current_account().await, Ok(None));

        let account = Account::new("u1", "u1@example.com");
        session.sign_in(account.clone()).await;
        assert_eq!(session.current_account().await, Ok(Some(account)));

        session.sign_out().await.unwrap();
        assert_eq!(session.current_account().await, Ok(None));
        // Signing out twice is harmless
        session.sign_out().await.unwrap();
    }
}
