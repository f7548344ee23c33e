//! Environment-backed configuration.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SMTP_HOST` | Default SMTP server hostname |
//! | `SMTP_PORT` | Default SMTP port |
//! | `SMTP_USER` | Default SMTP username |
//! | `SMTP_PASS` | Default SMTP password |
//! | `SMTP_FROM` | Default sender address |
//! | `RELAY_PORT` | HTTP listen port (default: 3000) |
//! | `RELAY_POLICY` | `lenient` (default) or `strict`, see [`MergePolicy`] |

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub use config::ConfigError;

/// Loads a value from environment variables. Variables set to an empty string
/// count as unset, so `SMTP_PORT=` in a `.env` template leaves the field empty
/// instead of failing to parse.
pub trait EnvConfig: Sized {
    fn from_env() -> Result<Self, ConfigError>;
    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError>;
}

impl<D> EnvConfig for D
where
    D: DeserializeOwned,
{
    fn from_env() -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default().ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).ignore_empty(true))
            .build()?
            .try_deserialize()
    }
}

/// Process-wide SMTP defaults, read once at startup and handed to the relay.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SmtpDefaults {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: Option<String>,
}

impl SmtpDefaults {
    pub const ENV_PREFIX: &'static str = "SMTP";

    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS` and `SMTP_FROM`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(Self::ENV_PREFIX)
    }
}

impl fmt::Debug for SmtpDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpDefaults")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .finish()
    }
}

/// How inline SMTP values in a request combine with [`SmtpDefaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Each inline field that is present wins; absent fields fall back to the
    /// environment default.
    #[default]
    Lenient,
    /// The request must carry an `smtp` object and only its values are used.
    Strict,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(MergePolicy::Lenient),
            "strict" => Ok(MergePolicy::Strict),
            other => Err(format!("unknown merge policy '{other}', expected lenient or strict")),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub policy: MergePolicy,
}

impl ServerConfig {
    pub const ENV_PREFIX: &'static str = "RELAY";

    /// Reads `RELAY_PORT` and `RELAY_POLICY`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(Self::ENV_PREFIX)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            policy: MergePolicy::default(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
