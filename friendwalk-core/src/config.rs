// Crawl configuration, persisted as JSON in the user's config directory

use crate::error::{CrawlError, Result};
use friendwalk_scanner::{Credentials, SessionOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/friendwalk/";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const USERNAME_ENV: &str = "FRIENDWALK_USERNAME";
pub const PASSWORD_ENV: &str = "FRIENDWALK_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub home_path: String,
    /// `{id}` is replaced with the node id.
    pub listing_url: String,
    /// `{id}` is replaced with the node id.
    pub node_url: String,
    pub request_list_url: String,
    pub next_page_text: String,
    pub logout_text: String,
    /// Regex over raw link hrefs; capture group 1 is the neighbor id.
    pub friend_href_pattern: String,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let session = SessionOptions::default();
        Self {
            base_url: session.base_url,
            home_path: session.home_path,
            listing_url: "http://mixi.jp/list_friend.pl?id={id}".to_string(),
            node_url: "http://mixi.jp/show_photo.pl?id={id}".to_string(),
            request_list_url: "http://mixi.jp/list_request.pl".to_string(),
            next_page_text: "次を表示".to_string(),
            logout_text: session.logout_text,
            friend_href_pattern: r"^show_friend.pl\?id=(\d+)".to_string(),
            user_agent: session.user_agent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    pub ban_cooldown_secs: u64,
    pub pagination_delay_secs: u64,
    pub fetch_jitter_step_secs: u64,
    pub fetch_jitter_steps: u32,
    pub login_settle_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            ban_cooldown_secs: 1800,
            pagination_delay_secs: 2,
            fetch_jitter_step_secs: 3,
            fetch_jitter_steps: 10,
            login_settle_secs: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub site: SiteConfig,
    pub credentials: Credentials,
    pub seed: String,
    pub database: PathBuf,
    pub media_dir: PathBuf,
    pub politeness: PolitenessConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            credentials: Credentials::default(),
            seed: "14820421".to_string(),
            database: PathBuf::from("id_queue.db"),
            media_dir: PathBuf::from("image"),
            politeness: PolitenessConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CrawlError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CrawlError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Credentials from the environment take precedence over the file.
    pub fn apply_env(&mut self) {
        self.apply_credentials(
            std::env::var(USERNAME_ENV).ok(),
            std::env::var(PASSWORD_ENV).ok(),
        );
    }

    pub fn apply_credentials(&mut self, username: Option<String>, password: Option<String>) {
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            self.credentials.username = username;
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.credentials.password = password;
        }
    }

    pub fn ban_cooldown(&self) -> Duration {
        Duration::from_secs(self.politeness.ban_cooldown_secs)
    }

    pub fn pagination_delay(&self) -> Duration {
        Duration::from_secs(self.politeness.pagination_delay_secs)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            base_url: self.site.base_url.clone(),
            home_path: self.site.home_path.clone(),
            logout_text: self.site.logout_text.clone(),
            user_agent: self.site.user_agent.clone(),
            timeout: Duration::from_secs(self.politeness.timeout_secs),
            jitter_step: Duration::from_secs(self.politeness.fetch_jitter_step_secs),
            jitter_steps: self.politeness.fetch_jitter_steps,
            login_settle: Duration::from_secs(self.politeness.login_settle_secs),
            credentials: self.credentials.clone(),
        }
    }
}

/// Expand a `~`-prefixed directory and return the config file inside it.
pub fn config_file_in(dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(dir);
    Path::new(expanded.as_ref()).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CrawlConfig =
            serde_json::from_str(r#"{"seed": "99", "politeness": {"ban_cooldown_secs": 60}}"#)
                .unwrap();
        assert_eq!(config.seed, "99");
        assert_eq!(config.ban_cooldown(), Duration::from_secs(60));
        assert_eq!(config.politeness.pagination_delay_secs, 2);
        assert_eq!(config.site.next_page_text, "次を表示");
        assert_eq!(config.media_dir, PathBuf::from("image"));
    }

    #[test]
    fn test_apply_credentials_ignores_empty() {
        let mut config = CrawlConfig::default();
        config.credentials = Credentials::new("file-user", "file-pass");
        config.apply_credentials(Some("env-user".into()), Some(String::new()));
        assert_eq!(config.credentials.username, "env-user");
        assert_eq!(config.credentials.password, "file-pass");
    }

    #[test]
    fn test_session_options_follow_politeness() {
        let mut config = CrawlConfig::default();
        config.politeness.fetch_jitter_steps = 0;
        config.politeness.timeout_secs = 7;
        let options = config.session_options();
        assert_eq!(options.jitter_steps, 0);
        assert_eq!(options.timeout, Duration::from_secs(7));
        assert_eq!(options.home_path, "/home.pl");
    }

    #[test]
    fn test_config_file_in_joins_file_name() {
        let path = config_file_in("/tmp/friendwalk/");
        assert_eq!(path, PathBuf::from("/tmp/friendwalk/config.json"));
    }
}
