use pickup_anchor::AnchorClient;
use pickup_batch::{validate_batch, BatchConfig, BatchProof};
use pickup_crypto::{
    authorization_hash, authorization_signing_message, pickup_event_hash, verify_proof,
    verify_signature_with_timestamp,
};
use pickup_types::{within_window, Address, AuthorizationData, Digest, PickupEventData};
use tracing::{debug, info};

use crate::config::VerificationConfig;
use crate::verdict::{AuthorizationVerdict, BatchVerdict, PickupVerdict};

/// Checks supplied data against ledger facts.
///
/// Every entry point returns a verdict and never fails. The caller supplies
/// `now` so results are reproducible.
#[derive(Clone)]
pub struct VerificationEngine {
    anchor: AnchorClient,
    config: VerificationConfig,
    batch_config: BatchConfig,
}

impl VerificationEngine {
    pub fn new(anchor: AnchorClient, config: VerificationConfig) -> Self {
        Self {
            anchor,
            config,
            batch_config: BatchConfig::default(),
        }
    }

    pub fn with_batch_config(mut self, batch_config: BatchConfig) -> Self {
        self.batch_config = batch_config;
        self
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Malformed input is rejected before any hashing. An authorization is
    /// `Expired` when `now` is more than the window away from its start
    /// time, or past its end time.
    pub async fn verify_authorization(
        &self,
        auth: &AuthorizationData,
        now: u64,
    ) -> AuthorizationVerdict {
        if let Err(err) = auth.validate() {
            debug!(error = %err, "malformed authorization");
            return AuthorizationVerdict::Malformed(err);
        }

        let hash = authorization_hash(auth);
        let window = self.config.authorization_window;

        let verdict = if !within_window(now, auth.start_time, window) || now > auth.end_time {
            AuthorizationVerdict::Expired
        } else if let Err(err) = verify_signature_with_timestamp(
            &authorization_signing_message(auth),
            auth.signature.as_slice(),
            &auth.guardian,
            auth.start_time,
            now,
            window,
        ) {
            debug!(authorization = %hash.short_hex(), error = %err, "guardian signature rejected");
            AuthorizationVerdict::SignatureInvalid
        } else {
            self.authorization_on_ledger(hash).await
        };

        info!(authorization = %hash.short_hex(), ?verdict, "authorization verified");
        verdict
    }

    async fn authorization_on_ledger(&self, hash: Digest) -> AuthorizationVerdict {
        match self.anchor.try_is_authorization_registered(hash).await {
            Ok(true) => {}
            Ok(false) => return AuthorizationVerdict::NotFound,
            Err(err) => return AuthorizationVerdict::LedgerUnavailable(err),
        }
        match self.anchor.try_get_authorization(hash).await {
            Ok(None) => AuthorizationVerdict::NotFound,
            Ok(Some(record)) if record.revoked => AuthorizationVerdict::Revoked,
            Ok(Some(record)) => AuthorizationVerdict::Valid(record),
            Err(err) => AuthorizationVerdict::LedgerUnavailable(err),
        }
    }

    /// The proof is checked against the recomputed event hash, not the leaf
    /// recorded in the proof. A ledger that cannot be read yields
    /// `LedgerUnavailable`, never `ProofInvalid`.
    pub async fn verify_pickup_event(
        &self,
        event: &PickupEventData,
        proof: &BatchProof,
        now: u64,
    ) -> PickupVerdict {
        if let Err(err) = event.validate() {
            debug!(error = %err, "malformed pickup event");
            return PickupVerdict::Malformed(err);
        }

        let leaf = pickup_event_hash(event);

        let verdict = if !within_window(now, event.timestamp, self.config.signature_window) {
            PickupVerdict::TooOld
        } else {
            self.event_on_ledger(leaf, proof).await
        };

        info!(
            event = %leaf.short_hex(),
            batch_number = proof.batch_number,
            ?verdict,
            "pickup event verified"
        );
        verdict
    }

    async fn event_on_ledger(&self, leaf: Digest, proof: &BatchProof) -> PickupVerdict {
        let batch = match self.anchor.try_get_batch(proof.batch_number).await {
            Ok(Some(batch)) => batch,
            Ok(None) => return PickupVerdict::ProofInvalid,
            Err(err) => return PickupVerdict::LedgerUnavailable(err),
        };
        if !verify_proof(&leaf, &proof.siblings, &batch.merkle_root) {
            return PickupVerdict::ProofInvalid;
        }
        match self.anchor.try_get_pickup_event(leaf).await {
            Ok(Some(record)) => PickupVerdict::Valid(record),
            Ok(None) => PickupVerdict::NotFound,
            Err(err) => PickupVerdict::LedgerUnavailable(err),
        }
    }

    /// Recover the signer of `message` and require it to be `expected`, with
    /// `timestamp` inside the signature window.
    pub fn verify_signature_with_timestamp(
        &self,
        message: &Digest,
        signature: &[u8],
        expected: &Address,
        timestamp: u64,
        now: u64,
    ) -> bool {
        match verify_signature_with_timestamp(
            message,
            signature,
            expected,
            timestamp,
            now,
            self.config.signature_window,
        ) {
            Ok(()) => true,
            Err(err) => {
                debug!(signer = %expected, error = %err, "signature rejected");
                false
            }
        }
    }

    /// Check a complete event set against the batch anchored under `batch_number`.
    pub async fn verify_batch(&self, batch_number: u64, events: &[PickupEventData]) -> BatchVerdict {
        let batch = match self.anchor.try_get_batch(batch_number).await {
            Ok(Some(batch)) => batch,
            Ok(None) => return BatchVerdict::NotAnchored,
            Err(err) => return BatchVerdict::LedgerUnavailable(err),
        };
        let verdict = match validate_batch(
            events,
            &batch.merkle_root,
            batch.event_count,
            &self.batch_config,
        ) {
            Ok(()) => BatchVerdict::Valid(batch),
            Err(err) => BatchVerdict::Invalid(err),
        };
        info!(batch_number, ?verdict, "batch verified");
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AUTHORIZATION_WINDOW_SECS;
    use crate::verdict::{RecommendedAction, Verdict};
    use pickup_anchor::{InMemoryLedger, LedgerError};
    use pickup_batch::{BatchAllocator, BatchBuilder, BatchError, SealedBatch};
    use pickup_crypto::{student_hash, SigningKey};
    use pickup_types::{HexBytes, TypeError};
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000;

    struct Harness {
        ledger: Arc<InMemoryLedger>,
        anchor: AnchorClient,
        engine: VerificationEngine,
        guardian: SigningKey,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let anchor = AnchorClient::new(ledger.clone());
        let engine = VerificationEngine::new(anchor.clone(), VerificationConfig::default());
        Harness {
            ledger,
            anchor,
            engine,
            guardian: SigningKey::from_bytes([7; 32]).unwrap(),
        }
    }

    fn signed_authorization(guardian: &SigningKey, start: u64, end: u64) -> AuthorizationData {
        let mut auth = AuthorizationData {
            guardian: guardian.address(),
            pickup: Address::from_bytes([2; 20]),
            student_hash: student_hash("S-1001"),
            start_time: start,
            end_time: end,
            signature: HexBytes::new(vec![]),
        };
        let sig = guardian
            .sign_message(&authorization_signing_message(&auth))
            .unwrap();
        auth.signature = HexBytes::new(sig.to_vec());
        auth
    }

    async fn register(h: &Harness, auth: &AuthorizationData) {
        assert!(h
            .anchor
            .create_authorization(authorization_hash(auth), auth.guardian)
            .await
            .is_confirmed());
    }

    fn event(n: u64) -> PickupEventData {
        PickupEventData {
            student_hash: student_hash("S-1001"),
            pickup: Address::from_bytes([2; 20]),
            staff: Address::from_bytes([3; 20]),
            scan_code_hash: Digest::from_hash([4; 32]),
            timestamp: NOW + n,
        }
    }

    async fn anchored_batch(h: &Harness, n: u64) -> SealedBatch {
        let mut builder = BatchBuilder::new(BatchConfig::default());
        for i in 0..n {
            let e = event(i);
            builder.push(e.clone()).unwrap();
            h.anchor.record_pickup_event(pickup_event_hash(&e), &e).await;
        }
        let batch = builder.seal(&BatchAllocator::new(), NOW, "mem://").unwrap();
        assert!(h.anchor.anchor_batch(batch.data()).await.outcome.is_confirmed());
        batch
    }

    #[tokio::test]
    async fn fresh_authorization_is_valid_until_the_window_closes() {
        let h = harness();
        let auth = signed_authorization(&h.guardian, NOW, NOW + 7 * AUTHORIZATION_WINDOW_SECS);
        register(&h, &auth).await;

        let verdict = h.engine.verify_authorization(&auth, NOW).await;
        assert!(verdict.is_valid());
        match verdict {
            AuthorizationVerdict::Valid(record) => assert_eq!(record.guardian, auth.guardian),
            other => panic!("expected valid, got {other:?}"),
        }

        assert!(h
            .engine
            .verify_authorization(&auth, NOW + AUTHORIZATION_WINDOW_SECS)
            .await
            .is_valid());
        assert_eq!(
            h.engine
                .verify_authorization(&auth, NOW + AUTHORIZATION_WINDOW_SECS + 1)
                .await,
            AuthorizationVerdict::Expired
        );
    }

    #[tokio::test]
    async fn past_end_time_is_expired() {
        let h = harness();
        let auth = signed_authorization(&h.guardian, NOW - 100, NOW - 1);
        register(&h, &auth).await;
        assert_eq!(
            h.engine.verify_authorization(&auth, NOW).await,
            AuthorizationVerdict::Expired
        );
        assert!(h.engine.verify_authorization(&auth, NOW - 1).await.is_valid());
    }

    #[tokio::test]
    async fn wrong_signer_is_rejected_before_the_ledger() {
        let h = harness();
        let mut auth = signed_authorization(&h.guardian, NOW, NOW + 3600);
        let imposter = SigningKey::from_bytes([9; 32]).unwrap();
        let forged = imposter
            .sign_message(&authorization_signing_message(&auth))
            .unwrap();
        auth.signature = HexBytes::new(forged.to_vec());
        register(&h, &auth).await;

        let verdict = h.engine.verify_authorization(&auth, NOW).await;
        assert_eq!(verdict, AuthorizationVerdict::SignatureInvalid);
        assert_eq!(verdict.recommended_action(), RecommendedAction::Reissue);
    }

    #[tokio::test]
    async fn unregistered_and_revoked_authorizations() {
        let h = harness();
        let auth = signed_authorization(&h.guardian, NOW, NOW + 3600);
        assert_eq!(
            h.engine.verify_authorization(&auth, NOW).await,
            AuthorizationVerdict::NotFound
        );

        register(&h, &auth).await;
        h.anchor.revoke_authorization(authorization_hash(&auth)).await;
        assert_eq!(
            h.engine.verify_authorization(&auth, NOW).await,
            AuthorizationVerdict::Revoked
        );
    }

    #[tokio::test]
    async fn unreachable_ledger_asks_for_a_retry() {
        let h = harness();
        let auth = signed_authorization(&h.guardian, NOW, NOW + 3600);
        register(&h, &auth).await;
        h.ledger.set_reachable(false);
        let verdict = h.engine.verify_authorization(&auth, NOW).await;
        assert!(matches!(
            verdict,
            AuthorizationVerdict::LedgerUnavailable(LedgerError::Unreachable(_))
        ));
        assert_eq!(verdict.recommended_action(), RecommendedAction::Retry);
    }

    #[tokio::test]
    async fn outage_is_not_reported_as_tampering() {
        let h = harness();
        let batch = anchored_batch(&h, 1).await;
        let proof = batch.proof_for_event(&event(0)).unwrap();
        h.ledger.set_reachable(false);

        let verdict = h.engine.verify_pickup_event(&event(0), &proof, NOW).await;
        assert!(matches!(verdict, PickupVerdict::LedgerUnavailable(_)));
        assert_eq!(verdict.category(), Some(pickup_types::ErrorCategory::Ledger));
        assert_eq!(verdict.recommended_action(), RecommendedAction::Retry);

        assert!(matches!(
            h.engine.verify_batch(1, batch.events()).await,
            BatchVerdict::LedgerUnavailable(_)
        ));

        h.ledger.set_reachable(true);
        assert!(h
            .engine
            .verify_pickup_event(&event(0), &proof, NOW)
            .await
            .is_valid());
    }

    #[tokio::test]
    async fn inverted_time_range_is_malformed() {
        let h = harness();
        let auth = signed_authorization(&h.guardian, NOW + 100, NOW + 50);
        register(&h, &auth).await;

        let verdict = h.engine.verify_authorization(&auth, NOW).await;
        assert_eq!(
            verdict,
            AuthorizationVerdict::Malformed(TypeError::InvalidTimeRange {
                start: NOW + 100,
                end: NOW + 50,
            })
        );
        assert_eq!(verdict.category(), Some(pickup_types::ErrorCategory::Validation));
    }

    #[tokio::test]
    async fn event_without_scan_code_is_malformed() {
        let h = harness();
        let batch = anchored_batch(&h, 2).await;
        let proof = batch.proof_for_event(&event(0)).unwrap();

        let mut e = event(0);
        e.scan_code_hash = Digest::zero();
        assert_eq!(
            h.engine.verify_pickup_event(&e, &proof, NOW).await,
            PickupVerdict::Malformed(TypeError::MissingField("scanCodeHash"))
        );
    }

    #[tokio::test]
    async fn anchored_event_verifies() {
        let h = harness();
        let batch = anchored_batch(&h, 3).await;
        let e1 = event(1);
        let proof = batch.proof_for_event(&e1).unwrap();

        match h.engine.verify_pickup_event(&e1, &proof, NOW + 10).await {
            PickupVerdict::Valid(record) => assert_eq!(record.event, e1),
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tampered_event_fails_its_proof() {
        let h = harness();
        let batch = anchored_batch(&h, 3).await;
        let proof = batch.proof_for_event(&event(1)).unwrap();

        let mut tampered = event(1);
        tampered.timestamp += 1;
        let verdict = h.engine.verify_pickup_event(&tampered, &proof, NOW).await;
        assert_eq!(verdict, PickupVerdict::ProofInvalid);
        assert_eq!(verdict.category(), Some(pickup_types::ErrorCategory::Proof));
    }

    #[tokio::test]
    async fn stale_event_and_missing_batch() {
        let h = harness();
        let batch = anchored_batch(&h, 2).await;
        let mut proof = batch.proof_for_event(&event(0)).unwrap();

        assert_eq!(
            h.engine.verify_pickup_event(&event(0), &proof, NOW + 301).await,
            PickupVerdict::TooOld
        );

        proof.batch_number = 99;
        assert_eq!(
            h.engine.verify_pickup_event(&event(0), &proof, NOW).await,
            PickupVerdict::ProofInvalid
        );
    }

    #[tokio::test]
    async fn event_in_batch_but_not_recorded() {
        let h = harness();
        let mut builder = BatchBuilder::new(BatchConfig::default());
        builder.push(event(0)).unwrap();
        builder.push(event(1)).unwrap();
        let batch = builder.seal(&BatchAllocator::new(), NOW, "mem://").unwrap();
        h.anchor.anchor_batch(batch.data()).await;

        let proof = batch.proof_for_event(&event(0)).unwrap();
        assert_eq!(
            h.engine.verify_pickup_event(&event(0), &proof, NOW).await,
            PickupVerdict::NotFound
        );
    }

    #[test]
    fn signature_window_is_inclusive() {
        let h = harness();
        let message = Digest::from_hash([3; 32]);
        let sig = h.guardian.sign_message(&message).unwrap();
        let signer = h.guardian.address();

        assert!(h.engine.verify_signature_with_timestamp(&message, sig.as_bytes(), &signer, NOW, NOW + 300));
        assert!(h.engine.verify_signature_with_timestamp(&message, sig.as_bytes(), &signer, NOW, NOW - 300));
        assert!(!h.engine.verify_signature_with_timestamp(&message, sig.as_bytes(), &signer, NOW, NOW + 301));
        assert!(!h.engine.verify_signature_with_timestamp(
            &message,
            sig.as_bytes(),
            &Address::from_bytes([1; 20]),
            NOW,
            NOW
        ));
    }

    #[tokio::test]
    async fn full_batch_verification() {
        let h = harness();
        let batch = anchored_batch(&h, 5).await;
        assert!(h.engine.verify_batch(1, batch.events()).await.is_valid());

        assert_eq!(
            h.engine.verify_batch(1, &batch.events()[..4]).await,
            BatchVerdict::Invalid(BatchError::CountMismatch { claimed: 5, actual: 4 })
        );
        assert_eq!(h.engine.verify_batch(2, batch.events()).await, BatchVerdict::NotAnchored);
    }
}
