use std::sync::Arc;

use pickup_crypto::{scan_code_hash, student_hash, verify_signature_with_timestamp, KeyedHasher};
use pickup_types::{Address, Digest, PickupEventData};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::error::{TokenError, TokenResult};
use crate::store::TokenStore;
use crate::token::{AuthorizationToken, ScanCode};

/// Issues and redeems single-use scan codes.
pub struct ScanCodeService {
    store: Arc<dyn TokenStore>,
    hasher: KeyedHasher,
    config: TokenConfig,
}

impl ScanCodeService {
    /// Fails if the configured secret is empty or the ttl is zero.
    pub fn new(config: TokenConfig, store: Arc<dyn TokenStore>) -> TokenResult<Self> {
        if config.ttl_secs == 0 {
            return Err(TokenError::ZeroTtl);
        }
        let hasher = KeyedHasher::new(config.secret.as_bytes())?;
        Ok(Self {
            store,
            hasher,
            config,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn issue(
        &self,
        student_id: &str,
        pickup: Address,
        guardian: Address,
        now: u64,
    ) -> TokenResult<(AuthorizationToken, ScanCode)> {
        let ttl_secs = self.config.ttl_secs;
        let expires_at = now
            .checked_add(ttl_secs)
            .ok_or(TokenError::ExpiryOverflow {
                issued_at: now,
                ttl_secs,
            })?;
        let token = AuthorizationToken {
            token_id: Uuid::new_v4().to_string(),
            keyed_hash: self.hasher.token_hash(student_id, &pickup, now),
            student_id: student_id.to_string(),
            pickup,
            guardian,
            issued_at: now,
            expires_at,
            used: false,
            active: true,
            used_at: None,
        };
        self.store.insert(token.clone())?;
        info!(
            token = %token.token_id,
            pickup = %pickup,
            expires_at = token.expires_at,
            "scan code issued"
        );
        let code = token.scan_code();
        Ok((token, code))
    }

    /// Validate a scan code without consuming it.
    pub fn peek(&self, code: &ScanCode, now: u64) -> TokenResult<AuthorizationToken> {
        let token = self
            .store
            .get(&code.token_id)?
            .ok_or_else(|| TokenError::NotFound(code.token_id.clone()))?;
        token.check(&code.keyed_hash, now)?;
        Ok(token)
    }

    /// Redeem a scan code. Succeeds at most once per token.
    pub fn consume(&self, code: &ScanCode, now: u64) -> TokenResult<AuthorizationToken> {
        match self.store.consume(&code.token_id, &code.keyed_hash, now) {
            Ok(token) => {
                info!(token = %token.token_id, "scan code consumed");
                Ok(token)
            }
            Err(err) => {
                warn!(token = %code.token_id, error = %err, "scan code rejected");
                Err(err)
            }
        }
    }

    /// Parse the wire form and redeem it.
    pub fn consume_wire(&self, wire: &str, now: u64) -> TokenResult<AuthorizationToken> {
        let code = ScanCode::parse(wire)?;
        self.consume(&code, now)
    }

    /// Redeem a scan code only once the pickup person has signed its
    /// scan-code hash within the signature window.
    pub fn confirm_with_signature(
        &self,
        code: &ScanCode,
        signature: &[u8],
        signed_at: u64,
        now: u64,
    ) -> TokenResult<AuthorizationToken> {
        let token = self.peek(code, now)?;
        verify_signature_with_timestamp(
            &self.scan_code_hash(&token),
            signature,
            &token.pickup,
            signed_at,
            now,
            self.config.signature_window,
        )?;
        debug!(token = %token.token_id, "pickup signature accepted");
        self.consume(code, now)
    }

    pub fn revoke(&self, token_id: &str) -> TokenResult<()> {
        let token = self.store.deactivate(token_id)?;
        info!(token = %token.token_id, "scan code revoked");
        Ok(())
    }

    pub fn purge_expired(&self, now: u64) -> TokenResult<usize> {
        let removed = self.store.purge_expired(now)?;
        if removed > 0 {
            debug!(removed, "purged expired scan codes");
        }
        Ok(removed)
    }

    /// The `scanCodeHash` recorded in the pickup event for `token`.
    pub fn scan_code_hash(&self, token: &AuthorizationToken) -> Digest {
        scan_code_hash(
            &token.token_id,
            &token.keyed_hash,
            &token.pickup,
            token.issued_at,
        )
    }

    /// Build the pickup event for a consumed token.
    pub fn pickup_event(
        &self,
        token: &AuthorizationToken,
        staff: Address,
        timestamp: u64,
    ) -> PickupEventData {
        PickupEventData {
            student_hash: student_hash(&token.student_id),
            pickup: token.pickup,
            staff,
            scan_code_hash: self.scan_code_hash(token),
            timestamp,
        }
    }
}
