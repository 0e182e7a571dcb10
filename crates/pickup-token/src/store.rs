use std::collections::HashMap;
use std::sync::RwLock;

use pickup_types::Digest;

use crate::error::{TokenError, TokenResult};
use crate::token::AuthorizationToken;

/// Persistence boundary for scan-code tokens.
///
/// `consume` must be an atomic compare-and-set: of any number of concurrent
/// calls for the same token, at most one returns `Ok`.
pub trait TokenStore: Send + Sync {
    fn insert(&self, token: AuthorizationToken) -> TokenResult<()>;

    fn get(&self, token_id: &str) -> TokenResult<Option<AuthorizationToken>>;

    /// Check `supplied` against the token and mark it used, in one step.
    fn consume(&self, token_id: &str, supplied: &Digest, now: u64)
        -> TokenResult<AuthorizationToken>;

    fn deactivate(&self, token_id: &str) -> TokenResult<AuthorizationToken>;

    /// Drop expired tokens that were never used. Returns how many were removed.
    fn purge_expired(&self, now: u64) -> TokenResult<usize>;

    fn len(&self) -> TokenResult<usize>;

    fn is_empty(&self) -> TokenResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Token store backed by a `HashMap` behind a single `RwLock`.
#[derive(Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<HashMap<String, AuthorizationToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> TokenError {
    TokenError::Store("token store lock poisoned".into())
}

impl TokenStore for InMemoryTokenStore {
    fn insert(&self, token: AuthorizationToken) -> TokenResult<()> {
        let mut tokens = self.inner.write().map_err(poisoned)?;
        if tokens.contains_key(&token.token_id) {
            return Err(TokenError::DuplicateToken(token.token_id));
        }
        tokens.insert(token.token_id.clone(), token);
        Ok(())
    }

    fn get(&self, token_id: &str) -> TokenResult<Option<AuthorizationToken>> {
        let tokens = self.inner.read().map_err(poisoned)?;
        Ok(tokens.get(token_id).cloned())
    }

    fn consume(
        &self,
        token_id: &str,
        supplied: &Digest,
        now: u64,
    ) -> TokenResult<AuthorizationToken> {
        let mut tokens = self.inner.write().map_err(poisoned)?;
        let token = tokens
            .get_mut(token_id)
            .ok_or_else(|| TokenError::NotFound(token_id.to_string()))?;
        token.check(supplied, now)?;
        token.used = true;
        token.used_at = Some(now);
        Ok(token.clone())
    }

    fn deactivate(&self, token_id: &str) -> TokenResult<AuthorizationToken> {
        let mut tokens = self.inner.write().map_err(poisoned)?;
        let token = tokens
            .get_mut(token_id)
            .ok_or_else(|| TokenError::NotFound(token_id.to_string()))?;
        token.active = false;
        Ok(token.clone())
    }

    fn purge_expired(&self, now: u64) -> TokenResult<usize> {
        let mut tokens = self.inner.write().map_err(poisoned)?;
        let before = tokens.len();
        tokens.retain(|_, t| t.used || !t.is_expired(now));
        Ok(before - tokens.len())
    }

    fn len(&self) -> TokenResult<usize> {
        Ok(self.inner.read().map_err(poisoned)?.len())
    }
}
