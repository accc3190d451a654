//! Deployment configuration
//!
//! All inputs are collected once at startup (arguments, profile file,
//! interactive prompts) and frozen into a [`DeployConfig`] that every stage
//! receives read-only.

pub mod profile;
pub mod prompt;

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::DeployError;
use crate::logs::LogLevel;

pub use profile::Profile;

/// Branch used when the input is left blank
pub const DEFAULT_BRANCH: &str = "main";

/// Remote base directory for deployed trees
pub const REMOTE_BASE_DIR: &str = "/opt";

/// SSH target for the deployment
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    /// Login user
    pub user: String,

    /// Host name or address
    pub host: String,

    /// Private key path on the local machine
    pub key_path: PathBuf,
}

impl RemoteTarget {
    /// `user@host` form passed to the ssh client
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Whether remote commands need a sudo prefix
    pub fn needs_sudo(&self) -> bool {
        self.user != "root"
    }
}

/// Immutable configuration for a single run
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Repository URL as entered, without any credential
    pub repo_url: String,

    /// Optional access token, embedded into the clone URL only
    pub credential: Option<SecretString>,

    /// Target branch
    pub branch: String,

    /// SSH target
    pub remote: RemoteTarget,

    /// Container's internal listening port, also the publish port
    pub app_port: u16,

    /// Whether to render and activate the reverse proxy site
    pub proxy_enabled: bool,

    /// Log level for the run
    pub log_level: LogLevel,
}

impl DeployConfig {
    /// Build the frozen config from a fully collected profile.
    ///
    /// The profile may still have optional fields unset; required ones
    /// missing here mean prompt collection was skipped or aborted.
    pub fn from_profile(profile: Profile) -> Result<Self, DeployError> {
        let repo_url = profile
            .repo_url
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DeployError::ConfigError("repository URL is required".to_string()))?;

        let host = profile
            .ssh_host
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DeployError::ConfigError("SSH host is required".to_string()))?;

        let user = profile
            .ssh_user
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "root".to_string());

        let key_path = profile
            .key_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| DeployError::ConfigError("SSH key path is required".to_string()))?;

        let app_port = profile
            .app_port
            .ok_or_else(|| DeployError::ConfigError("application port is required".to_string()))?;
        if app_port == 0 {
            return Err(DeployError::ConfigError(
                "application port must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            repo_url: repo_url.trim().to_string(),
            credential: profile.credential.filter(|c| !c.expose_secret().is_empty()),
            branch: resolve_branch(profile.branch.as_deref()),
            remote: RemoteTarget {
                user,
                host: host.trim().to_string(),
                key_path: expand_tilde(&key_path),
            },
            app_port,
            proxy_enabled: profile
                .proxy
                .as_deref()
                .map(parse_affirmative)
                .unwrap_or(false),
            log_level: profile.log_level,
        })
    }

    /// Application name, derived from the repository URL's last segment
    pub fn app_name(&self) -> String {
        repo_name(&self.repo_url)
    }

    /// Remote deployment directory; its base name is the container identity
    pub fn remote_dir(&self) -> String {
        format!("{}/{}", REMOTE_BASE_DIR, self.app_name())
    }

    /// Container and image name
    pub fn container_name(&self) -> String {
        self.app_name()
    }

    /// Local checkout directory, under the invoking directory
    pub fn checkout_dir(&self) -> PathBuf {
        PathBuf::from(self.app_name())
    }

    /// Clone URL with the credential injected, when one is configured.
    ///
    /// The token only ever appears in the argument list of the clone/fetch
    /// process; it is never written to disk or logged.
    pub fn clone_url(&self) -> Result<String, DeployError> {
        let Some(credential) = &self.credential else {
            return Ok(self.repo_url.clone());
        };

        // Token auth only applies to http(s) remotes; ssh and scp-style
        // remotes authenticate with the key.
        let Ok(mut url) = Url::parse(&self.repo_url) else {
            return Ok(self.repo_url.clone());
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Ok(self.repo_url.clone());
        }

        url.set_username(credential.expose_secret()).map_err(|_| {
            DeployError::ConfigError("repository URL does not accept a credential".to_string())
        })?;

        Ok(url.to_string())
    }
}

/// Resolve the effective branch: blank input means the default
pub fn resolve_branch(input: Option<&str>) -> String {
    match input {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_BRANCH.to_string(),
    }
}

/// Whether an input matches the affirmative pattern ("y"/"yes", any case)
pub fn parse_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Last path segment of a repository URL, without a `.git` suffix
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let tail = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    tail.trim_end_matches(".git").to_string()
}

/// Expand a leading `~/` against the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if s == "~" || s.starts_with("~/") {
        if let Some(home) = home_dir() {
            if s == "~" {
                return home;
            }
            return home.join(&s[2..]);
        }
    }
    path.to_path_buf()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
