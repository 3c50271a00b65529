//! Application configuration structures.
//!
//! Values come from built-in defaults, an optional TOML file, and finally
//! environment variables (a `.env` file is honoured by the CLI).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// What to search for
    #[serde(default)]
    pub search: SearchConfig,

    /// Polling, snapshot size and cooldown
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Where state and history live
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Notification identity and destination
    #[serde(default)]
    pub email: EmailConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults when the file is missing.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config file at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment-style lookup.
    ///
    /// Blank values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("MS_KEYWORD") {
            self.search.keyword = v;
        }
        if let Some(v) = get("MS_LOCATION") {
            self.search.location = v;
        }
        if let Some(v) = get("MS_SEARCH_BASE") {
            self.search.base_url = v;
        }
        if let Some(v) = get("MS_SEARCH_URL") {
            self.search.url = Some(v);
        }
        if let Some(v) = get("MS_TOP_K") {
            self.monitor.top_k = parse_env("MS_TOP_K", &v)?;
        }
        if let Some(v) = get("MS_POLL_MIN_SECONDS") {
            self.monitor.poll_min_secs = parse_env("MS_POLL_MIN_SECONDS", &v)?;
        }
        if let Some(v) = get("MS_POLL_MAX_SECONDS") {
            self.monitor.poll_max_secs = parse_env("MS_POLL_MAX_SECONDS", &v)?;
        }
        if let Some(v) = get("MS_COOLDOWN_SECONDS") {
            self.monitor.cooldown_secs = parse_env("MS_COOLDOWN_SECONDS", &v)?;
        }
        if let Some(v) = get("MS_FIRST_RUN") {
            self.monitor.first_run = parse_env("MS_FIRST_RUN", &v)?;
        }
        if let Some(v) = get("MS_STATE_DIR") {
            self.storage.state_dir = PathBuf::from(v);
        }
        if let Some(v) = get("MS_FETCHER") {
            self.http.fetcher = parse_env("MS_FETCHER", &v)?;
        }
        if let Some(v) = get("CHROME_PATH") {
            self.http.chrome_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SMTP_HOST") {
            self.email.smtp_host = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            self.email.smtp_port = parse_env("SMTP_PORT", &v)?;
        }
        if let Some(v) = get("GMAIL_USER") {
            self.email.username = v;
        }
        if let Some(v) = get("GMAIL_APP_PASS") {
            self.email.password = v;
        }
        if let Some(v) = get("EMAIL_FROM") {
            self.email.from = Some(v);
        }
        if let Some(v) = get("EMAIL_TO") {
            self.email.to = v;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Email credentials are only required when real mail will be sent.
    pub fn validate(&self, require_email: bool) -> Result<()> {
        let monitor = &self.monitor;
        if monitor.top_k == 0 {
            return Err(AppError::validation("monitor.top_k must be >= 1"));
        }
        if monitor.poll_min_secs == 0 || monitor.poll_max_secs == 0 {
            return Err(AppError::validation("Polling interval must be positive"));
        }
        if monitor.poll_min_secs > monitor.poll_max_secs {
            return Err(AppError::validation(
                "monitor.poll_min_secs cannot exceed monitor.poll_max_secs",
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 || self.http.ip_timeout_secs == 0 {
            return Err(AppError::validation("http timeouts must be > 0"));
        }
        if self.http.fetcher == FetchMode::Browser {
            if let Some(path) = &self.http.chrome_path {
                if !path.exists() {
                    return Err(AppError::config(format!(
                        "http.chrome_path {} does not exist",
                        path.display()
                    )));
                }
            }
        }
        self.search.search_url()?;
        Url::parse(&self.http.ip_lookup_url)?;

        if require_email {
            let email = &self.email;
            if email.username.is_empty() || email.password.is_empty() || email.to.is_empty() {
                return Err(AppError::config(
                    "Set GMAIL_USER, GMAIL_APP_PASS and EMAIL_TO (and optionally EMAIL_FROM)",
                ));
            }
            if email.smtp_host.trim().is_empty() {
                return Err(AppError::validation("email.smtp_host is empty"));
            }
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::config(format!("{key}={value:?} is invalid: {e}")))
}

/// Search target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search keyword
    #[serde(default = "defaults::keyword")]
    pub keyword: String,

    /// Search location
    #[serde(default = "defaults::location")]
    pub location: String,

    /// Results page the query string is appended to
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Full URL override; bypasses keyword/location composition
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword: defaults::keyword(),
            location: defaults::location(),
            base_url: defaults::base_url(),
            url: None,
        }
    }
}

impl SearchConfig {
    /// Build the URL to poll.
    ///
    /// Results are requested newest-first so page order tracks recency.
    pub fn search_url(&self) -> Result<Url> {
        if let Some(url) = &self.url {
            return Ok(Url::parse(url)?);
        }
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("keywords", self.keyword.as_str()),
                ("location", self.location.as_str()),
                ("sortBy", "DT_DESC"),
            ],
        )?;
        Ok(url)
    }

    /// Short human label for the search, used in subjects and logs.
    pub fn label(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("{} ({})", self.keyword, self.location),
        }
    }
}

/// What to do when there is no previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FirstRunPolicy {
    /// Announce the first populated snapshot
    #[default]
    Notify,
    /// Store the first snapshot silently
    Baseline,
}

impl FromStr for FirstRunPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notify" => Ok(Self::Notify),
            "baseline" => Ok(Self::Baseline),
            other => Err(format!("unknown first-run policy '{other}'")),
        }
    }
}

/// How result pages are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Render in headless Chromium (client-rendered pages)
    #[default]
    Browser,
    /// Plain GET (server-rendered pages only)
    Http,
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown fetcher '{other}'")),
        }
    }
}

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of top postings tracked per snapshot
    #[serde(default = "defaults::top_k")]
    pub top_k: usize,

    /// Lower bound of the randomized sleep
    #[serde(default = "defaults::poll_min")]
    pub poll_min_secs: u64,

    /// Upper bound of the randomized sleep
    #[serde(default = "defaults::poll_max")]
    pub poll_max_secs: u64,

    /// Minimum spacing between two notifications
    #[serde(default = "defaults::cooldown")]
    pub cooldown_secs: u64,

    /// Behaviour when no previous snapshot exists
    #[serde(default)]
    pub first_run: FirstRunPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::top_k(),
            poll_min_secs: defaults::poll_min(),
            poll_max_secs: defaults::poll_max(),
            cooldown_secs: defaults::cooldown(),
            first_run: FirstRunPolicy::default(),
        }
    }
}

/// Snapshot store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding state and history files
    #[serde(default = "defaults::state_dir")]
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: defaults::state_dir(),
        }
    }
}

/// HTTP client settings for page fetches and IP lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Referer header
    #[serde(default = "defaults::referer")]
    pub referer: String,

    /// Plain-text public IP echo endpoint
    #[serde(default = "defaults::ip_lookup_url")]
    pub ip_lookup_url: String,

    /// IP lookup timeout in seconds
    #[serde(default = "defaults::ip_timeout")]
    pub ip_timeout_secs: u64,

    /// Page fetch strategy
    #[serde(default)]
    pub fetcher: FetchMode,

    /// Chromium executable; auto-detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// How long to wait for the first posting link to render
    #[serde(default = "defaults::render_wait")]
    pub render_wait_secs: u64,

    /// Extra settle time after the wait, for lazily painted cards
    #[serde(default = "defaults::render_settle")]
    pub render_settle_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            accept_language: defaults::accept_language(),
            referer: defaults::referer(),
            ip_lookup_url: defaults::ip_lookup_url(),
            ip_timeout_secs: defaults::ip_timeout(),
            fetcher: FetchMode::default(),
            chrome_path: None,
            render_wait_secs: defaults::render_wait(),
            render_settle_ms: defaults::render_settle(),
        }
    }
}

/// SMTP identity and recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "defaults::smtp_host")]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Sender address; defaults to the SMTP username
    #[serde(default)]
    pub from: Option<String>,

    /// Recipient address
    #[serde(default)]
    pub to: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: defaults::smtp_host(),
            smtp_port: defaults::smtp_port(),
            username: String::new(),
            password: String::new(),
            from: None,
            to: String::new(),
        }
    }
}

impl EmailConfig {
    /// Effective sender address.
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

mod defaults {
    use std::path::PathBuf;

    // Search defaults
    pub fn keyword() -> String {
        "software engineer".into()
    }
    pub fn location() -> String {
        "United States".into()
    }
    pub fn base_url() -> String {
        "https://jobs.careers.microsoft.com/global/en/search".into()
    }

    // Monitor defaults
    pub fn top_k() -> usize {
        5
    }
    pub fn poll_min() -> u64 {
        120
    }
    pub fn poll_max() -> u64 {
        180
    }
    pub fn cooldown() -> u64 {
        600
    }

    // Storage defaults
    pub fn state_dir() -> PathBuf {
        PathBuf::from("storage")
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; job-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn referer() -> String {
        "https://careers.microsoft.com/".into()
    }
    pub fn ip_lookup_url() -> String {
        "https://api.ipify.org".into()
    }
    pub fn ip_timeout() -> u64 {
        8
    }
    pub fn render_wait() -> u64 {
        10
    }
    pub fn render_settle() -> u64 {
        2000
    }

    // Email defaults
    pub fn smtp_host() -> String {
        "smtp.gmail.com".into()
    }
    pub fn smtp_port() -> u16 {
        587
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate(false).is_ok());
    }

    #[test]
    fn validate_requires_email_when_sending() {
        let config = Config::default();
        assert!(matches!(config.validate(true), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_rejects_inverted_poll_bounds() {
        let mut config = Config::default();
        config.monitor.poll_min_secs = 300;
        config.monitor.poll_max_secs = 200;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.monitor.top_k = 0;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars = env(&[
            ("MS_KEYWORD", "data scientist"),
            ("MS_TOP_K", "3"),
            ("MS_COOLDOWN_SECONDS", "900"),
            ("MS_FIRST_RUN", "baseline"),
            ("GMAIL_USER", "me@example.com"),
            ("EMAIL_TO", "  "),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.search.keyword, "data scientist");
        assert_eq!(config.monitor.top_k, 3);
        assert_eq!(config.monitor.cooldown_secs, 900);
        assert_eq!(config.monitor.first_run, FirstRunPolicy::Baseline);
        assert_eq!(config.email.sender(), "me@example.com");
        // blank values are ignored
        assert!(config.email.to.is_empty());
    }

    #[test]
    fn env_selects_fetcher() {
        let vars = env(&[("MS_FETCHER", "HTTP"), ("CHROME_PATH", "/opt/chrome")]);
        let mut config = Config::default();
        assert_eq!(config.http.fetcher, FetchMode::Browser);

        config.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.http.fetcher, FetchMode::Http);
        assert_eq!(config.http.chrome_path, Some(PathBuf::from("/opt/chrome")));

        let vars = env(&[("MS_FETCHER", "curl")]);
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn validate_rejects_missing_chrome_path() {
        let mut config = Config::default();
        config.http.chrome_path = Some(PathBuf::from("/nonexistent/chromium-browser"));
        assert!(matches!(config.validate(false), Err(AppError::Config(_))));

        config.http.fetcher = FetchMode::Http;
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn env_override_rejects_garbage_number() {
        let vars = env(&[("MS_TOP_K", "five")]);
        let mut config = Config::default();
        let err = config.apply_env(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("MS_TOP_K"));
    }

    #[test]
    fn search_url_composes_query() {
        let search = SearchConfig::default();
        let url = search.search_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://jobs.careers.microsoft.com/global/en/search?keywords=software+engineer&location=United+States&sortBy=DT_DESC"
        );
    }

    #[test]
    fn search_url_override_wins() {
        let search = SearchConfig {
            url: Some("https://example.com/jobs?q=rust".into()),
            ..SearchConfig::default()
        };
        assert_eq!(
            search.search_url().unwrap().as_str(),
            "https://example.com/jobs?q=rust"
        );
        assert_eq!(search.label(), "https://example.com/jobs?q=rust");
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [monitor]
            top_k = 10

            [email]
            to = "alerts@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.top_k, 10);
        assert_eq!(config.monitor.cooldown_secs, 600);
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.search.keyword, "software engineer");
    }
}
