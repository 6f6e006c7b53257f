use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const APP_DIR: &str = "gmail_discord_relay";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub user_email: Option<String>,
    pub redirect_uri: Option<String>,
    pub webhook_url: Option<String>,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_true")]
    pub mark_as_read: bool,
    pub state_dir: Option<String>,
}

fn default_check_interval() -> u64 {
    300
}

fn default_throttle_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_state_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| anyhow!("no data dir available"))?
        .join(APP_DIR))
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            user_email: Some("you@example.com".to_string()),
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            webhook_url: Some("https://discord.com/api/webhooks/ID/TOKEN".to_string()),
            check_interval_secs: default_check_interval(),
            throttle_ms: default_throttle_ms(),
            mark_as_read: true,
            state_dir: None,
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow!(
            "Created template config at {} - edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg = Config::from_toml(&s)?;
    cfg.with_env_overrides(|k| std::env::var(k).ok())
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        if cfg.check_interval_secs == 0 {
            return Err(anyhow!("check_interval_secs must be at least 1"));
        }
        Ok(cfg)
    }

    /// Applies `DISCORD_WEBHOOK_URL` and `CHECK_INTERVAL` on top of the file.
    pub fn with_env_overrides<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DISCORD_WEBHOOK_URL").filter(|u| !u.trim().is_empty()) {
            self.webhook_url = Some(url);
        }
        if let Some(secs) = var("CHECK_INTERVAL") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| anyhow!("CHECK_INTERVAL must be a number of seconds: {e}"))?;
            if secs == 0 {
                return Err(anyhow!("CHECK_INTERVAL must be at least 1 second"));
            }
            self.check_interval_secs = secs;
        }
        Ok(self)
    }

    pub fn webhook_url(&self) -> Result<&str> {
        self.webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("webhook_url not set in config or DISCORD_WEBHOOK_URL"))
    }

    pub fn user_email(&self) -> Result<&str> {
        self.user_email
            .as_deref()
            .ok_or_else(|| anyhow!("user_email not set in config"))
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn resolve_state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(p) => Ok(PathBuf::from(p)),
            None => default_state_dir(),
        }
    }
}
