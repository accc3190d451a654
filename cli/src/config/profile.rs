//! Deployment profile
//!
//! The profile is the mutable collection buffer for run inputs: it can be
//! pre-filled from a JSON file and `--key=value` arguments, and whatever is
//! still missing is asked interactively before it freezes into a
//! [`DeployConfig`](super::DeployConfig).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::DeployError;
use crate::logs::LogLevel;

/// Collected run inputs, all optional until resolution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Repository URL
    #[serde(default)]
    pub repo_url: Option<String>,

    /// Optional access token for http(s) remotes
    #[serde(default)]
    pub credential: Option<SecretString>,

    /// Target branch; blank means the default
    #[serde(default)]
    pub branch: Option<String>,

    /// SSH login user
    #[serde(default)]
    pub ssh_user: Option<String>,

    /// SSH host
    #[serde(default)]
    pub ssh_host: Option<String>,

    /// Private key path
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Application port
    #[serde(default)]
    pub app_port: Option<u16>,

    /// Reverse proxy answer, matched against the affirmative pattern
    #[serde(default)]
    pub proxy: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Profile {
    /// Read a profile from a JSON file
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DeployError::ConfigError(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        let profile = serde_json::from_str(&contents)?;
        Ok(profile)
    }

    /// Overlay `--key=value` arguments onto the profile.
    ///
    /// Arguments win over the profile file. Unknown keys are ignored here;
    /// they are either flags handled by `main` or typos surfaced by the
    /// prompt summary.
    pub fn apply_args(&mut self, args: &HashMap<String, String>) -> Result<(), DeployError> {
        if let Some(v) = args.get("repo") {
            self.repo_url = Some(v.clone());
        }
        if let Some(v) = args.get("token") {
            self.credential = Some(SecretString::from(v.clone()));
        }
        if let Some(v) = args.get("branch") {
            self.branch = Some(v.clone());
        }
        if let Some(v) = args.get("user") {
            self.ssh_user = Some(v.clone());
        }
        if let Some(v) = args.get("host") {
            self.ssh_host = Some(v.clone());
        }
        if let Some(v) = args.get("key") {
            self.key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = args.get("port") {
            let port: u16 = v
                .parse()
                .map_err(|_| DeployError::ConfigError(format!("invalid port: {}", v)))?;
            self.app_port = Some(port);
        }
        if let Some(v) = args.get("proxy") {
            self.proxy = Some(v.clone());
        }
        if let Some(v) = args.get("log-level") {
            self.log_level = v.parse().map_err(DeployError::ConfigError)?;
        }
        Ok(())
    }
}
