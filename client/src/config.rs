//! Client configuration.
//!
//! Loaded from environment variables:
//!
//! | Variable                       | Required | Default  |
//! |--------------------------------|----------|----------|
//! | `FIXED_TERM_MIRROR_URL`        | yes      |          |
//! | `FIXED_TERM_MIRROR_ANON_KEY`   | yes      |          |
//! | `FIXED_TERM_WALLET_PROJECT_ID` | no       | empty    |
//! | `FIXED_TERM_CLUSTER`           | no       | `devnet` |
//! | `FIXED_TERM_REFRESH_SECS`      | no       | `30`     |
//! | `FIXED_TERM_ACTIVITY_LIMIT`    | no       | `10`     |
//! | `FIXED_TERM_JOURNAL_PATH`      | no       | unset    |
//!
//! The program id is not configurable; it is `fixed_term_staking::ID`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const ENV_MIRROR_URL: &str = "FIXED_TERM_MIRROR_URL";
pub const ENV_MIRROR_ANON_KEY: &str = "FIXED_TERM_MIRROR_ANON_KEY";
pub const ENV_WALLET_PROJECT_ID: &str = "FIXED_TERM_WALLET_PROJECT_ID";
pub const ENV_CLUSTER: &str = "FIXED_TERM_CLUSTER";
pub const ENV_REFRESH_SECS: &str = "FIXED_TERM_REFRESH_SECS";
pub const ENV_ACTIVITY_LIMIT: &str = "FIXED_TERM_ACTIVITY_LIMIT";
pub const ENV_JOURNAL_PATH: &str = "FIXED_TERM_JOURNAL_PATH";

pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// Network a wallet or RPC endpoint is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Mainnet,
    Devnet,
    Testnet,
    Localnet,
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cluster::Mainnet => "mainnet",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Cluster {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(ClientError::Config(format!("unknown cluster '{}'", other))),
        }
    }
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hosted database endpoint
    pub mirror_url: String,
    /// Hosted database public key
    pub mirror_anon_key: String,
    /// Wallet connector project id
    pub wallet_project_id: String,
    /// Cluster the session must be on
    pub cluster: Cluster,
    /// Period of the background refresh timer
    pub refresh_interval_secs: u64,
    /// Number of activities fetched per refresh
    pub activity_limit: usize,
    /// Where the reconciliation journal lives; in-memory when unset
    pub journal_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Config with defaults for everything but the mirror endpoint.
    pub fn new(mirror_url: impl Into<String>, mirror_anon_key: impl Into<String>) -> Self {
        Self {
            mirror_url: mirror_url.into(),
            mirror_anon_key: mirror_anon_key.into(),
            wallet_project_id: String::new(),
            cluster: Cluster::Devnet,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            journal_path: None,
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ClientError::Config(format!("missing {}", key)))
        };

        let mut config = Self::new(required(ENV_MIRROR_URL)?, required(ENV_MIRROR_ANON_KEY)?);

        if let Some(project_id) = lookup(ENV_WALLET_PROJECT_ID) {
            config.wallet_project_id = project_id;
        }
        if let Some(cluster) = lookup(ENV_CLUSTER) {
            config.cluster = cluster.parse()?;
        }
        if let Some(secs) = lookup(ENV_REFRESH_SECS) {
            config.refresh_interval_secs = parse_number(ENV_REFRESH_SECS, &secs)?;
        }
        if let Some(limit) = lookup(ENV_ACTIVITY_LIMIT) {
            config.activity_limit = parse_number(ENV_ACTIVITY_LIMIT, &limit)?;
        }
        config.journal_path = lookup(ENV_JOURNAL_PATH).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(ClientError::Config(
                "refresh interval must be at least one second".into(),
            ));
        }
        if self.activity_limit == 0 {
            return Err(ClientError::Config("activity limit must be positive".into()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn program_id(&self) -> Pubkey {
        fixed_term_staking::ID
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{} is not a number: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_optional_vars_missing() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_MIRROR_URL, "https://mirror.example"),
            (ENV_MIRROR_ANON_KEY, "anon"),
        ]))
        .unwrap();

        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.activity_limit, 10);
        assert!(config.journal_path.is_none());
        assert_eq!(config.program_id(), fixed_term_staking::ID);
    }

    #[test]
    fn test_missing_mirror_credentials_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_MIRROR_URL, "https://x")]))
            .unwrap_err();
        assert_eq!(err, ClientError::Config(format!("missing {}", ENV_MIRROR_ANON_KEY)));

        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_MIRROR_URL, "  "),
            (ENV_MIRROR_ANON_KEY, "anon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_MIRROR_URL, "https://mirror.example"),
            (ENV_MIRROR_ANON_KEY, "anon"),
            (ENV_CLUSTER, "Mainnet-Beta"),
            (ENV_REFRESH_SECS, "5"),
            (ENV_ACTIVITY_LIMIT, "25"),
            (ENV_JOURNAL_PATH, "/tmp/journal.json"),
        ]))
        .unwrap();

        assert_eq!(config.cluster, Cluster::Mainnet);
        assert_eq!(config.refresh_interval_secs, 5);
        assert_eq!(config.activity_limit, 25);
        assert_eq!(config.journal_path, Some(PathBuf::from("/tmp/journal.json")));
    }

    #[test]
    fn test_bad_values_rejected() {
        let base = [
            (ENV_MIRROR_URL, "https://mirror.example"),
            (ENV_MIRROR_ANON_KEY, "anon"),
        ];

        let mut pairs = base.to_vec();
        pairs.push((ENV_REFRESH_SECS, "soon"));
        assert!(ClientConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push((ENV_REFRESH_SECS, "0"));
        assert!(ClientConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push((ENV_CLUSTER, "goerli"));
        assert!(ClientConfig::from_lookup(lookup_from(&pairs)).is_err());
    }
}
