use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://app.webfuze.in/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the platform REST API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read `EXAM_API_BASE_URL` and `EXAM_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup("EXAM_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(secs) = lookup("EXAM_API_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs.max(1));
        }
        config
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn env_overrides_base_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("EXAM_API_BASE_URL", " http://localhost:3000/api "),
            ("EXAM_API_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn garbage_timeout_is_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[("EXAM_API_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
