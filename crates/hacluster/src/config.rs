//! Tool settings for the hacluster binary.
//!
//! These are local settings (paths, timeouts, relation names), not the
//! charm configuration, which is read through the hook tools.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use hacluster_common::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_COROSYNC_CONF, DEFAULT_HA_RELATION,
    DEFAULT_PEER_RELATION, maas,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Where the rendered corosync configuration is written
    #[serde(default = "default_corosync_conf")]
    pub corosync_conf: PathBuf,

    /// Upper bound for every external command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Peer relation carrying the other cluster members
    #[serde(default = "default_peer_relation")]
    pub peer_relation: String,

    /// Relation to the principal charm
    #[serde(default = "default_ha_relation")]
    pub ha_relation: String,

    /// MAAS client configuration
    #[serde(default)]
    pub maas: MaasConfig,
}

/// MAAS-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MaasConfig {
    #[serde(default = "default_maas_cli")]
    pub cli: String,

    #[serde(default = "default_maas_profile")]
    pub profile: String,

    #[serde(default = "default_maas_package")]
    pub package: String,

    /// Package source added when the package is unknown
    #[serde(default = "default_maas_ppa")]
    pub ppa: String,
}

impl Default for MaasConfig {
    fn default() -> Self {
        Self {
            cli: default_maas_cli(),
            profile: default_maas_profile(),
            package: default_maas_package(),
            ppa: default_maas_ppa(),
        }
    }
}

// Default value functions
fn default_corosync_conf() -> PathBuf { PathBuf::from(DEFAULT_COROSYNC_CONF) }
fn default_command_timeout() -> u64 { DEFAULT_COMMAND_TIMEOUT_SECS }
fn default_peer_relation() -> String { DEFAULT_PEER_RELATION.to_string() }
fn default_ha_relation() -> String { DEFAULT_HA_RELATION.to_string() }
fn default_maas_cli() -> String { maas::CLI.to_string() }
fn default_maas_profile() -> String { maas::PROFILE_NAME.to_string() }
fn default_maas_package() -> String { maas::PACKAGE.to_string() }
fn default_maas_ppa() -> String { maas::STABLE_PPA.to_string() }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!(path = config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref path) = args.corosync_conf {
            config.corosync_conf = path.clone();
        }
        if let Some(timeout) = args.command_timeout {
            config.command_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            bail!("command_timeout_secs must be greater than zero");
        }
        if self.peer_relation.is_empty() || self.ha_relation.is_empty() {
            bail!("relation names must not be empty");
        }
        if self.corosync_conf.as_os_str().is_empty() {
            bail!("corosync_conf must not be empty");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corosync_conf: default_corosync_conf(),
            command_timeout_secs: default_command_timeout(),
            peer_relation: default_peer_relation(),
            ha_relation: default_ha_relation(),
            maas: MaasConfig::default(),
        }
    }
}
