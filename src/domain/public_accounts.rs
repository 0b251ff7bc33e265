//! Set of identities eligible for mention-based redirection.

use std::collections::HashSet;

use tokio::sync::RwLock;

/// Mutable set of public account identities.
///
/// Read on every mention resolution; `add` is safe to call concurrently
/// with reads. Seeded from configuration at startup, extendable at runtime.
#[derive(Debug, Default)]
pub struct PublicAccountSet {
    accounts: RwLock<HashSet<String>>,
}

impl PublicAccountSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set seeded with the given account names.
    #[must_use]
    pub fn with_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds an account to the set.
    pub async fn add(&self, account: impl Into<String>) {
        let account = account.into();
        tracing::debug!(%account, "public account added");
        self.accounts.write().await.insert(account);
    }

    /// Removes an account from the set.
    pub async fn remove(&self, account: &str) {
        self.accounts.write().await.remove(account);
    }

    /// Returns `true` if the account is a known public account.
    pub async fn contains(&self, account: &str) -> bool {
        self.accounts.read().await.contains(account)
    }

    /// Returns the number of registered public accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Returns `true` if no public accounts are registered.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}
