//! Single-use scan codes for physical pickup confirmation.
//!
//! A guardian's device shows a short-lived code; staff scan it once. The
//! code carries a keyed hash, so it cannot be forged without the service
//! secret, and consumption is an atomic compare-and-set in the
//! [`TokenStore`], so two scans of one code can never both succeed.

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod token;

pub use config::{TokenConfig, DEFAULT_TOKEN_TTL_SECS};
pub use error::{TokenError, TokenResult};
pub use service::ScanCodeService;
pub use store::{InMemoryTokenStore, TokenStore};
pub use token::{AuthorizationToken, ScanCode};
