use std::path::Path;

use anyhow::Context;
use pickup_batch::BatchConfig;
use pickup_token::TokenConfig;
use pickup_verify::VerificationConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable that overrides `[token].secret`.
pub const TOKEN_SECRET_ENV: &str = "PICKUP_TOKEN_SECRET";

/// Top-level engine configuration, one table per component.
///
/// ```toml
/// [batch]
/// max_events = 128
///
/// [verification]
/// signature_window = 300
///
/// [token]
/// ttl_secs = 300
/// secret = "..."
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub batch: BatchConfig,
    pub verification: VerificationConfig,
    pub token: TokenConfig,
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid engine configuration")
    }

    /// Load from `path` if given, otherwise defaults, then apply the
    /// environment override for the token secret.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_secret(path, std::env::var(TOKEN_SECRET_ENV).ok())
    }

    pub fn load_with_secret(path: Option<&Path>, secret: Option<String>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                debug!(path = %path.display(), "loaded engine configuration");
                Self::from_toml(&text)?
            }
            None => {
                debug!("using default engine configuration");
                Self::default()
            }
        };
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            debug!(env = TOKEN_SECRET_ENV, "token secret taken from the environment");
            config.token.secret = secret;
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serializing engine configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_means_defaults() {
        let config = EngineConfig::load_with_secret(None, None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.batch.max_events, 256);
        assert_eq!(config.verification.authorization_window, 86_400);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\nmax_events = 16\n\n[token]\nsecret = \"from-file\"").unwrap();

        let config = EngineConfig::load_with_secret(Some(file.path()), None).unwrap();
        assert_eq!(config.batch.max_events, 16);
        assert_eq!(config.batch.min_events, 1);
        assert_eq!(config.token.ttl_secs, 300);
        assert_eq!(config.token.secret, "from-file");
    }

    #[test]
    fn environment_secret_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[token]\nsecret = \"from-file\"").unwrap();
        let config =
            EngineConfig::load_with_secret(Some(file.path()), Some("from-env".into())).unwrap();
        assert_eq!(config.token.secret, "from-env");

        let config = EngineConfig::load_with_secret(Some(file.path()), Some(String::new())).unwrap();
        assert_eq!(config.token.secret, "from-file");
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn loading_logs_the_source_but_not_the_secret() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            EngineConfig::load_with_secret(None, Some("s3cret-value".into())).unwrap();
        });

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("using default engine configuration"));
        assert!(output.contains(TOKEN_SECRET_ENV));
        assert!(!output.contains("s3cret-value"));
    }

    #[test]
    fn rendered_config_hides_the_secret() {
        let mut config = EngineConfig::default();
        config.token.secret = "hunter2".into();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[batch]"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch\nmax_events = ").unwrap();
        assert!(EngineConfig::load_with_secret(Some(file.path()), None).is_err());
    }

    #[test]
    fn unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(EngineConfig::load_with_secret(Some(&missing), None).is_err());
    }
}
