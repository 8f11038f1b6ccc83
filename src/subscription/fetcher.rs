//! Subscription fetcher
//!
//! Resolves the set of subscription URLs (CLI flags, a local override file,
//! or an environment variable) and downloads each payload over HTTP.

use crate::error::{Error, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the subscription URL
pub const SUBSCRIBE_URL_ENV: &str = "SUBSCRIBE_URL";

fn default_user_agent() -> String {
    format!("subprobe/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for the subscription fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Fetcher for subscription payloads
pub struct SubscriptionFetcher {
    client: Client,
}

impl SubscriptionFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(FetchConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fetch one subscription payload; the body is returned raw for the decoder
    pub async fn fetch_payload(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))
    }
}

/// Collect the subscription URLs for this run
///
/// Priority: explicit URLs (CLI flags) win outright; otherwise a local
/// line-delimited override file (blank lines and `#` comments ignored);
/// otherwise the `SUBSCRIBE_URL` environment variable. An empty return means
/// there is nothing to do.
pub fn collect_subscribe_urls(explicit: &[String], url_file: &Path) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    if let Ok(content) = std::fs::read_to_string(url_file) {
        let urls: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        if !urls.is_empty() {
            info!("using {} URL(s) from {}", urls.len(), url_file.display());
            return urls;
        }
    }

    if let Ok(url) = std::env::var(SUBSCRIBE_URL_ENV) {
        if !url.trim().is_empty() {
            info!("using URL from {}", SUBSCRIBE_URL_ENV);
            return vec![url.trim().to_string()];
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Tests touching SUBSCRIBE_URL share process state and must not overlap
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.user_agent.starts_with("subprobe/"));
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("custom-agent".to_string());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "custom-agent");
    }

    #[tokio::test]
    async fn test_fetch_payload_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sub"))
            .and(header("user-agent", "subprobe/test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cGF5bG9hZA=="))
            .mount(&server)
            .await;

        let fetcher = SubscriptionFetcher::with_config(
            FetchConfig::new().with_user_agent("subprobe/test".to_string()),
        )
        .unwrap();
        let body = fetcher
            .fetch_payload(&format!("{}/sub", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "cGF5bG9hZA==");
    }

    #[tokio::test]
    async fn test_fetch_payload_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = SubscriptionFetcher::new().unwrap();
        let err = fetcher.fetch_payload(&server.uri()).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn test_collect_urls_explicit_wins() {
        let explicit = vec!["https://example.com/a".to_string()];
        let urls = collect_subscribe_urls(&explicit, Path::new("does-not-exist.txt"));
        assert_eq!(urls, explicit);
    }

    #[test]
    fn test_collect_urls_from_file_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "https://example.com/a").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://example.com/b").unwrap();

        let urls = collect_subscribe_urls(&[], file.path());
        assert_eq!(
            urls,
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string()
            ]
        );
    }

    #[test]
    fn test_collect_urls_env_fallback() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(SUBSCRIBE_URL_ENV, "https://example.com/env");

        let urls = collect_subscribe_urls(&[], Path::new("does-not-exist.txt"));
        std::env::remove_var(SUBSCRIBE_URL_ENV);

        assert_eq!(urls, vec!["https://example.com/env".to_string()]);
    }

    #[test]
    fn test_collect_urls_file_shadows_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(SUBSCRIBE_URL_ENV, "https://example.com/env");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://example.com/from-file").unwrap();

        let urls = collect_subscribe_urls(&[], file.path());
        std::env::remove_var(SUBSCRIBE_URL_ENV);

        assert_eq!(urls, vec!["https://example.com/from-file".to_string()]);
    }

    #[test]
    fn test_collect_urls_empty_file_falls_through_to_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(SUBSCRIBE_URL_ENV, "https://example.com/env");

        // A file holding only comments and blank lines does not count as
        // present-and-non-empty
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        writeln!(file).unwrap();

        let urls = collect_subscribe_urls(&[], file.path());
        std::env::remove_var(SUBSCRIBE_URL_ENV);

        assert_eq!(urls, vec!["https://example.com/env".to_string()]);
    }

    #[test]
    fn test_collect_urls_empty_when_nothing_configured() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(SUBSCRIBE_URL_ENV);
        let urls = collect_subscribe_urls(&[], Path::new("does-not-exist.txt"));
        assert!(urls.is_empty());
    }
}
