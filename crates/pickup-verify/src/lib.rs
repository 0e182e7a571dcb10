//! Verification of pickup authorizations and pickup events against the
//! ledger.
//!
//! Each entity kind has its own small state machine ending in a verdict.
//! Verdicts carry an [`ErrorCategory`](pickup_types::ErrorCategory) and a
//! [`RecommendedAction`] so surfaces can tell "expired" from "tampered"
//! from "try again".

pub mod config;
pub mod engine;
pub mod verdict;

pub use config::{VerificationConfig, AUTHORIZATION_WINDOW_SECS};
pub use engine::VerificationEngine;
pub use verdict::{AuthorizationVerdict, BatchVerdict, PickupVerdict, RecommendedAction, Verdict};
