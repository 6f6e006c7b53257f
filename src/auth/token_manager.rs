use anyhow::{Result, anyhow};
use log::{debug, info};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{oauth, token_store, tokens_file};
use crate::config::Config;

/// Anything that can hand out a bearer token for Gmail calls.
pub trait AccessTokenSource {
    fn access_token(&self) -> Result<String>;
}

/// A fixed token, for tools and tests that already hold one.
pub struct StaticToken(pub String);

impl AccessTokenSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub user_email: String,
    /// Whether the browser flow may run when no refresh token works.
    pub interactive: bool,
}

fn now_epoch() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

impl TokenManager {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_id = cfg.client_id.clone();
        let client_secret = token_store::load_client_secret(&client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: cfg.redirect_uri().to_string(),
            user_email: cfg.user_email()?.to_string(),
            interactive: true,
        })
    }

    /// Same credentials, but never opens a browser.
    pub fn unattended(&self) -> Self {
        Self {
            interactive: false,
            ..self.clone()
        }
    }

    /// Returns a valid access token; refreshes or runs PKCE if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let now = now_epoch()?;

        // 1) cached & not expired
        if let Some(tf) = tokens_file::load_tokens()?
            && let Some(at) = tf.valid_at(now)
        {
            return Ok(at.to_string());
        }

        // 2) refresh if possible
        if let Some(rt) = token_store::load_refresh_token(&self.user_email)? {
            debug!("Access token expired; refreshing");
            let t =
                oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)?;
            return self.remember(t, now);
        }

        // 3) otherwise PKCE, when someone is there to click
        if !self.interactive {
            return Err(anyhow!(
                "no refresh token stored for {}; run the `auth` command",
                self.user_email
            ));
        }
        info!("No usable credentials; starting browser authorization");
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            &self.user_email,
        )?;
        self.remember(t, now)
    }

    fn remember(&self, t: oauth::Tokens, now: i64) -> Result<String> {
        let exp = t.expires_in.map(|s| now + s as i64).unwrap_or(now + 3500);
        tokens_file::save_tokens(Some(&t.access_token), Some(exp))?;
        Ok(t.access_token)
    }
}

impl AccessTokenSource for TokenManager {
    fn access_token(&self) -> Result<String> {
        self.get_access_token()
    }
}
