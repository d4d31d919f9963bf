// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use userdocs_client::{DEFAULT_API_PREFIX, DEFAULT_BASE_URL};

pub const APP_NAME: &str = "userdocs";
pub const CONFIG_PATH_ENV: &str = "USERDOCS_CONFIG_PATH";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_NOTIFICATION_TTL: &str = "3s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            auth: Auth::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub api_prefix: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            api_prefix: Some(DEFAULT_API_PREFIX.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub notification_ttl: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            notification_ttl: Some(DEFAULT_NOTIFICATION_TTL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [server], [auth], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let base_url = self.base_url();
        let parsed = Url::parse(base_url).with_context(|| {
            format!(
                "server.base_url in {} is not a valid URL: {base_url:?}",
                path.display()
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url in {} must use http or https, got {base_url:?}",
                path.display()
            );
        }

        for (key, raw) in [
            ("server.timeout", self.server.timeout.as_deref()),
            ("ui.notification_ttl", self.ui.notification_ttl.as_deref()),
        ] {
            let Some(raw) = raw else { continue };
            if parse_duration(raw)? <= Duration::ZERO {
                bail!(
                    "{key} in {} must be positive, got {raw}",
                    path.display()
                );
            }
        }

        if let Some(username) = &self.auth.username
            && username.trim().is_empty()
        {
            bail!(
                "auth.username in {} must not be empty; remove it to be prompted",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn api_prefix(&self) -> &str {
        self.server
            .api_prefix
            .as_deref()
            .unwrap_or(DEFAULT_API_PREFIX)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn username(&self) -> Option<&str> {
        self.auth.username.as_deref()
    }

    pub fn notification_ttl(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .notification_ttl
                .as_deref()
                .unwrap_or(DEFAULT_NOTIFICATION_TTL),
        )
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# userdocs config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\napi_prefix = \"{}\"\ntimeout = \"{}\"\n\n[auth]\n# Password comes from USERDOCS_PASSWORD or a prompt; USERDOCS_TOKEN skips login.\n# username = \"user1\"\n\n[ui]\nnotification_ttl = \"{}\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_API_PREFIX,
            DEFAULT_TIMEOUT,
            DEFAULT_NOTIFICATION_TTL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 3s)")
}
