//! Per-visitor token store shared by every API call of one request.
//!
//! The visitor's access and refresh tokens live in the session. At the start
//! of a request the session middleware copies them into a [`TokenStore`]; API
//! calls read the access token from it and, on a 401, refresh it in place.
//! After the handler returns, the middleware inspects [`TokenStore::state`]
//! and writes refreshed tokens back or wipes the session.
//!
//! Refreshes are serialised by an async mutex. A call that waited on the
//! mutex compares the current access token with the one its request was sent
//! with, and reuses the new token instead of refreshing a second time.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, MutexGuard};

/// Lifecycle of the tokens during one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Tokens are as loaded from the session.
    Unchanged,
    /// A refresh succeeded; the session must be updated.
    Refreshed,
    /// Refresh failed or was impossible; the session must be cleared.
    Expired,
}

/// The visitor's bearer tokens for the lifetime of one request.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

struct TokenStoreInner {
    tokens: RwLock<Tokens>,
    refresh_lock: Mutex<()>,
}

struct Tokens {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    state: TokenState,
}

impl TokenStore {
    /// Create a store from the tokens held in the visitor session.
    #[must_use]
    pub fn new(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            inner: Arc::new(TokenStoreInner {
                tokens: RwLock::new(Tokens {
                    access: access.filter(|t| !t.is_empty()).map(SecretString::from),
                    refresh: refresh.filter(|t| !t.is_empty()).map(SecretString::from),
                    state: TokenState::Unchanged,
                }),
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// A store without any tokens.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None, None)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read(|t| t.access.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read(|t| t.refresh.clone())
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.read(|t| t.access.is_some())
    }

    #[must_use]
    pub fn state(&self) -> TokenState {
        self.read(|t| t.state)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state() == TokenState::Expired
    }

    /// Record a successful refresh. A rotated refresh token replaces the old one.
    pub fn store_refreshed(&self, access: SecretString, refresh: Option<SecretString>) {
        self.write(|t| {
            t.access = Some(access);
            if refresh.is_some() {
                t.refresh = refresh;
            }
            t.state = TokenState::Refreshed;
        });
    }

    /// Drop both tokens and mark the session for clearing.
    pub fn expire(&self) {
        self.write(|t| {
            t.access = None;
            t.refresh = None;
            t.state = TokenState::Expired;
        });
    }

    /// Whether the current access token differs from `sent_with`.
    ///
    /// Used after waiting on the refresh lock to detect a refresh performed
    /// by a concurrent call.
    #[must_use]
    pub fn rotated_since(&self, sent_with: Option<&SecretString>) -> Option<SecretString> {
        let current = self.access_token()?;
        let unchanged = sent_with.is_some_and(|s| s.expose_secret() == current.expose_secret());
        (!unchanged).then_some(current)
    }

    pub(crate) async fn refresh_guard(&self) -> MutexGuard<'_, ()> {
        self.inner.refresh_lock.lock().await
    }

    fn read<T>(&self, f: impl FnOnce(&Tokens) -> T) -> T {
        let guard = self
            .inner
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut Tokens)) {
        let mut guard = self
            .inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("access", &self.has_access_token().then_some("[REDACTED]"))
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_are_no_token() {
        let store = TokenStore::new(Some(String::new()), Some(String::new()));
        assert!(!store.has_access_token());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_store_refreshed_keeps_refresh_when_not_rotated() {
        let store = TokenStore::new(Some("a1".into()), Some("r1".into()));
        store.store_refreshed(SecretString::from("a2"), None);

        assert_eq!(store.access_token().unwrap().expose_secret(), "a2");
        assert_eq!(store.refresh_token().unwrap().expose_secret(), "r1");
        assert_eq!(store.state(), TokenState::Refreshed);
    }

    #[test]
    fn test_expire_clears_everything() {
        let store = TokenStore::new(Some("a1".into()), Some("r1".into()));
        store.expire();

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.is_expired());
    }

    #[test]
    fn test_rotated_since() {
        let store = TokenStore::new(Some("a1".into()), None);
        let sent = store.access_token();
        assert!(store.rotated_since(sent.as_ref()).is_none());

        store.store_refreshed(SecretString::from("a2"), None);
        let current = store.rotated_since(sent.as_ref()).unwrap();
        assert_eq!(current.expose_secret(), "a2");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let store = TokenStore::new(Some("very-secret-access".into()), None);
        let debug = format!("{store:?}");
        assert!(!debug.contains("very-secret-access"));
    }
}
