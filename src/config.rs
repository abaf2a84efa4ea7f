use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};

use crate::error::{Error, Result};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub imap: ImapConfig,
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub starttls: bool,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl Config {
    /// Reads the config file at `path`. Files ending in `.json` are parsed as
    /// JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            Self::from_json_str(&data)
        } else {
            Self::from_toml_str(&data)
        };
        parsed.map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(data).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(data).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.imap.host.trim().is_empty() {
            return Err(Error::Config("imap.host is empty".into()));
        }
        if self.imap.port == 0 {
            return Err(Error::Config("imap.port must be non-zero".into()));
        }
        Ok(())
    }
}
