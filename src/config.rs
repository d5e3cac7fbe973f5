//! Application configuration.
//!
//! Loaded from a TOML file; every field has a default so a minimal file (or
//! no file at all) works:
//!
//! ```toml
//! bind_address = "0.0.0.0:8008"
//! script_name = "/blog"
//!
//! [session]
//! secret = "change me"
//! max_age = 3300
//!
//! [assets]
//! paths = ["static"]
//! base_path = "/static"
//!
//! [views]
//! paths = ["templates"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::Assets;
use crate::error::Error;
use crate::session::SessionProvider;
use crate::views::Views;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Listen address (e.g. `"0.0.0.0:8008"`).
    pub bind_address: String,

    /// Mount point of the application, empty for the root.
    pub script_name: String,

    pub session: SessionConfig,
    pub assets: AssetsConfig,
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key signing session cookies. Left empty, a random key is generated
    /// at startup and sessions do not survive a restart.
    pub secret: String,
    pub cookie_name: String,
    /// Cookie lifetime in seconds.
    pub max_age: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub paths: Vec<PathBuf>,
    pub base_path: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8008".to_owned(),
            script_name: String::new(),
            session: SessionConfig::default(),
            assets: AssetsConfig::default(),
            views: ViewsConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "aurora-sid".to_owned(),
            max_age: 3300,
        }
    }
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }
}

impl From<&SessionConfig> for SessionProvider {
    fn from(config: &SessionConfig) -> Self {
        SessionProvider::new(config.secret.clone())
            .with_cookie_name(config.cookie_name.clone())
            .with_max_age(config.max_age)
    }
}

impl From<&AssetsConfig> for Assets {
    fn from(config: &AssetsConfig) -> Self {
        let mut assets = Assets::new().with_base_path(config.base_path.clone());
        for path in &config.paths {
            assets.add_path(path.clone());
        }
        assets
    }
}

impl From<&ViewsConfig> for Views {
    fn from(config: &ViewsConfig) -> Self {
        let mut views = Views::new();
        for path in &config.paths {
            views.add_path(path.clone());
        }
        views
    }
}
