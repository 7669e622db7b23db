use std::path::PathBuf;
use std::time::Duration;

use crate::locator::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_PREFIX_LEN, LocatorConfig};

#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint of the writing check service; checks are disabled without it
    pub check_url: Option<String>,
    /// How long a single check request may take
    pub check_timeout: Duration,
    /// Minimum similarity for a fuzzy anchor
    pub fuzzy_threshold: f64,
    /// Leading chars a fuzzy candidate must share with the proposed text
    pub match_prefix_len: usize,
    /// Directory holding one JSON file per draft
    pub drafts_dir: PathBuf,
    /// Where the terminal app writes its log
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fuzzy_threshold = env_parse(&lookup, "QUILL_FUZZY_THRESHOLD", DEFAULT_FUZZY_THRESHOLD)?;
        if !(fuzzy_threshold > 0.0 && fuzzy_threshold <= 1.0) {
            anyhow::bail!("QUILL_FUZZY_THRESHOLD must be in (0, 1], got {fuzzy_threshold}");
        }
        let match_prefix_len = env_parse(&lookup, "QUILL_MATCH_PREFIX_LEN", DEFAULT_PREFIX_LEN)?;
        if match_prefix_len == 0 {
            anyhow::bail!("QUILL_MATCH_PREFIX_LEN must be at least 1");
        }

        Ok(Self {
            check_url: lookup("QUILL_CHECK_URL").filter(|url| !url.trim().is_empty()),
            check_timeout: Duration::from_secs(env_parse(&lookup, "QUILL_CHECK_TIMEOUT_SECS", 30)?),
            fuzzy_threshold,
            match_prefix_len,
            drafts_dir: PathBuf::from(env_str(&lookup, "QUILL_DRAFTS_DIR", "drafts")),
            log_file: PathBuf::from(env_str(&lookup, "QUILL_LOG_FILE", "quill.log")),
        })
    }

    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            threshold: self.fuzzy_threshold,
            prefix_len: self.match_prefix_len,
        }
    }
}

fn env_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.check_url, None);
        assert_eq!(config.check_timeout, Duration::from_secs(30));
        assert_eq!(config.locator_config(), LocatorConfig::default());
        assert_eq!(config.drafts_dir, PathBuf::from("drafts"));
    }

    #[test]
    fn values_are_read_and_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("QUILL_CHECK_URL", "http://localhost:3000/api/check-writing"),
            ("QUILL_CHECK_TIMEOUT_SECS", "5"),
            ("QUILL_FUZZY_THRESHOLD", "0.85"),
            ("QUILL_MATCH_PREFIX_LEN", " 2 "),
        ]))
        .unwrap();
        assert_eq!(
            config.check_url.as_deref(),
            Some("http://localhost:3000/api/check-writing")
        );
        assert_eq!(config.check_timeout, Duration::from_secs(5));
        assert_eq!(config.locator_config().threshold, 0.85);
        assert_eq!(config.locator_config().prefix_len, 2);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("QUILL_CHECK_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("QUILL_CHECK_TIMEOUT_SECS"));

        let err = Config::from_lookup(lookup(&[("QUILL_FUZZY_THRESHOLD", "1.5")])).unwrap_err();
        assert!(err.to_string().contains("QUILL_FUZZY_THRESHOLD"));

        let err = Config::from_lookup(lookup(&[("QUILL_MATCH_PREFIX_LEN", "0")])).unwrap_err();
        assert!(err.to_string().contains("QUILL_MATCH_PREFIX_LEN"));
    }
}
