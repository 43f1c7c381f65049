//! Configuration management for the prodshot CLI.
//!
//! Configuration is stored in ~/.prodshot/{app_name}/config.yaml and holds
//! any number of named contexts, one of which is current.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use prodshot_client::{ClientBuilder, ImageMode, PollConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::paths::Paths;

/// Context created when a token is stored and none exists yet.
pub const DEFAULT_CONTEXT: &str = "default";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    /// Name of the currently active context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_context: String,

    /// Map of context name to context configuration.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub contexts: HashMap<String, Context>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// One backend the CLI can talk to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Context name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Bearer token. Empty means anonymous (free tier).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token: String,

    /// Backend base URL (uses the local default if empty).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    /// Origin of the image proxy, if result URLs should be absolute.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_origin: String,

    /// Link images straight to backend storage instead of the proxy route.
    #[serde(default, skip_serializing_if = "is_false")]
    pub direct_images: bool,

    /// Request timeout in seconds (optional).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout: u64,

    /// Poll interval in milliseconds (optional).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub poll_interval_ms: u64,

    /// Give up polling after this many seconds (optional).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_poll_secs: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Config {
    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Paths::new(app_name).ok().map(|p| p.config_file())
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a context.
    pub fn add_context(&mut self, name: &str, mut ctx: Context) -> anyhow::Result<()> {
        if name.trim().is_empty() {
            anyhow::bail!("context name must not be empty");
        }
        ctx.name = name.to_string();
        self.contexts.insert(name.to_string(), ctx);
        self.save()
    }

    /// Deletes a context.
    pub fn delete_context(&mut self, name: &str) -> anyhow::Result<()> {
        if self.contexts.remove(name).is_none() {
            anyhow::bail!("context '{}' not found", name);
        }
        if self.current_context == name {
            self.current_context.clear();
        }
        self.save()
    }

    /// Sets the current context.
    pub fn use_context(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.contexts.contains_key(name) {
            anyhow::bail!("context '{}' not found", name);
        }
        self.current_context = name.to_string();
        self.save()
    }

    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn get_current_context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }

    /// Resolves the context by name, or current context if name is empty.
    pub fn resolve_context(&self, name: Option<&str>) -> Option<&Context> {
        match name {
            Some(n) if !n.is_empty() => self.get_context(n),
            _ => self.get_current_context(),
        }
    }

    /// Lists all context names, sorted.
    pub fn list_contexts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contexts.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Stores a bearer token in the named, current or `default` context.
    ///
    /// A missing `default` context is created and made current. Returns the
    /// name of the context that was updated.
    pub fn set_auth_token(&mut self, name: Option<&str>, token: &str) -> anyhow::Result<String> {
        let target = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ if !self.current_context.is_empty() => self.current_context.clone(),
            _ => DEFAULT_CONTEXT.to_string(),
        };

        let ctx = self
            .contexts
            .entry(target.clone())
            .or_insert_with(|| Context {
                name: target.clone(),
                ..Default::default()
            });
        ctx.auth_token = token.to_string();
        if self.current_context.is_empty() {
            self.current_context = target.clone();
        }
        self.save()?;
        Ok(target)
    }

    /// Removes the token from the named or current context.
    ///
    /// Returns the context name, or `None` if there was nothing to clear.
    pub fn clear_auth_token(&mut self, name: Option<&str>) -> anyhow::Result<Option<String>> {
        let target = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.current_context.clone(),
        };
        let Some(ctx) = self.contexts.get_mut(&target) else {
            return Ok(None);
        };
        if ctx.auth_token.is_empty() {
            return Ok(None);
        }
        ctx.auth_token.clear();
        self.save()?;
        Ok(Some(target))
    }
}

impl Context {
    /// Returns the base URL, falling back to the default.
    pub fn effective_base_url(&self) -> &str {
        if self.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &self.base_url
        }
    }

    pub fn image_mode(&self) -> ImageMode {
        if self.direct_images {
            ImageMode::Direct
        } else {
            ImageMode::Proxy {
                origin: (!self.proxy_origin.is_empty()).then(|| self.proxy_origin.clone()),
            }
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        let mut poll = PollConfig::default();
        if self.poll_interval_ms > 0 {
            poll.interval = Duration::from_millis(self.poll_interval_ms);
        }
        if self.max_poll_secs > 0 {
            poll.max_duration = Some(Duration::from_secs(self.max_poll_secs));
        }
        poll
    }

    /// Returns a client builder configured from this context.
    pub fn client_builder(&self) -> ClientBuilder {
        let mut builder = ClientBuilder::new(self.effective_base_url())
            .image_mode(self.image_mode())
            .poll_config(self.poll_config());
        if !self.auth_token.is_empty() {
            builder = builder.auth_token(&self.auth_token);
        }
        if self.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(self.timeout));
        }
        builder
    }
}

/// Loads configuration for the specified app, creating an empty file if needed.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path(app_name)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;

    Ok(cfg)
}

/// Masks a token for display.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
    }
}
