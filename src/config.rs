use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::{
    auth::Credentials,
    engine::CHUNK_SIZE,
    retry::RetryPolicy,
    transport::AppKey,
};

pub const DEFAULT_ROOT: &str = "Arbiem Sounds Uploads";

/// Storage account configuration, usually read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_key: String,
    pub app_secret: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default = "default_root")]
    pub root_folder: String,
    #[serde(default)]
    pub transfer: TransferOptions,
}

fn default_root() -> String {
    DEFAULT_ROOT.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub chunk_size: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            timeout_secs: 60,
            max_attempts: 3,
            backoff_secs: 2,
        }
    }
}

impl TransferOptions {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_secs(self.backoff_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Config {
    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read config file '{}'", path.display()))?;

        Self::from_json(&config)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config = serde_json::from_str::<Config>(json)?;

        let credentials = &config.credentials;
        if credentials.access_token.is_empty() && credentials.refresh_token.is_none() {
            anyhow::bail!("either `access_token` or `refresh_token` must be set");
        }

        Ok(config)
    }

    pub fn app(&self) -> AppKey {
        AppKey {
            key: self.app_key.clone(),
            secret: self.app_secret.clone(),
        }
    }
}
