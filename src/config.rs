use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Everything the operations need from the environment, resolved once at
/// startup and handed in explicitly; nothing reads the environment
/// mid-run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Rentman instance.
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Chromium profile directory; carries the authenticated session
    /// between runs.
    pub user_data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("RENTMAN_URL")
            .ok()
            .map(|v| strip_quotes(&v).to_string())
            .filter(|v| !v.is_empty())
            .context("RENTMAN_URL environment variable must be set")?;

        let user_data_dir = env::var("RENTMAN_USER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("rentman-user-data"));

        Ok(Self {
            base_url,
            user: env::var("RENTMAN_USER").ok().filter(|v| !v.is_empty()),
            password: env::var("RENTMAN_PASSWORD").ok().filter(|v| !v.is_empty()),
            user_data_dir,
        })
    }

    pub fn tasks_url(&self) -> String {
        format!("{}#/tasks", self.base_url)
    }

    /// Login needs both; every other operation rides the saved session.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Ok((u, p)),
            _ => bail!("RENTMAN_USER and RENTMAN_PASSWORD environment variables must be set"),
        }
    }
}

/// Values pasted into .env files tend to keep their surrounding quotes.
fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

// ── Tests ──
