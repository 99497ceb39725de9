//! MAAS CLI integration
//!
//! Drives `maas-cli` to fetch the node inventory:
//! - Ensures the client package is installed (falling back to the stable PPA)
//! - Logs in with a dedicated profile
//! - Lists nodes as JSON and always logs out again

use hacluster_common::HaclusterError;
use hacluster_common::constants::MAX_PACKAGE_SOURCE_RETRIES;
use serde_json::Value;
use std::sync::Arc;

use crate::apt::{Apt, PackageState};
use crate::config::MaasConfig;
use crate::process::{CommandRunner, CommandSpec};

/// MAAS CLI client
pub struct MaasHelper {
    /// MAAS API endpoint
    url: String,
    /// API key handed to `login`
    credentials: String,
    settings: MaasConfig,
    runner: Arc<dyn CommandRunner>,
    apt: Apt,
}

impl MaasHelper {
    pub fn new(
        url: String,
        credentials: String,
        settings: MaasConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let apt = Apt::new(runner.clone());
        Self {
            url,
            credentials,
            settings,
            runner,
            apt,
        }
    }

    /// Make sure the CLI package is installed.
    ///
    /// A package unknown to the cache triggers one fallback: add the PPA,
    /// refresh, and look again.
    pub async fn ensure_client_installed(&self) -> Result<(), HaclusterError> {
        let package = self.settings.package.as_str();

        for attempt in 0..=MAX_PACKAGE_SOURCE_RETRIES {
            match self.apt.package_state(package).await? {
                PackageState::Installed => {
                    tracing::debug!(package = package, "Package already installed");
                    return Ok(());
                }
                PackageState::Available => {
                    return self.apt.install(&[package]).await;
                }
                PackageState::Unknown if attempt < MAX_PACKAGE_SOURCE_RETRIES => {
                    tracing::info!(
                        package = package,
                        source = %self.settings.ppa,
                        "Package unknown to cache, adding fallback source"
                    );
                    self.apt.add_source(&self.settings.ppa).await?;
                    self.apt.update().await?;
                }
                PackageState::Unknown => {}
            }
        }

        Err(HaclusterError::PackageUnavailable {
            package: package.to_string(),
            attempts: MAX_PACKAGE_SOURCE_RETRIES + 1,
        })
    }

    /// Log in with the configured profile. Failures are logged, not raised.
    pub async fn login(&self) -> bool {
        let cmd = CommandSpec::new(&self.settings.cli)
            .args([
                "login",
                self.settings.profile.as_str(),
                self.url.as_str(),
                self.credentials.as_str(),
            ])
            .sensitive();

        match self.runner.check_call(&cmd).await {
            Ok(()) => {
                tracing::debug!(url = %self.url, "Logged in to MAAS");
                true
            }
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Could not login to MAAS");
                false
            }
        }
    }

    pub async fn logout(&self) -> Result<(), HaclusterError> {
        let cmd = CommandSpec::new(&self.settings.cli)
            .args(["logout", self.settings.profile.as_str()]);

        self.runner
            .check_call(&cmd)
            .await
            .map_err(|e| HaclusterError::Session(format!("logout failed: {}", e)))
    }

    /// Fetch the node inventory.
    ///
    /// Returns `None` when login or listing fails. Once logged in, the
    /// session is closed on every path.
    pub async fn list_nodes(&self) -> Result<Option<Vec<Value>>, HaclusterError> {
        if !self.login().await {
            return Ok(None);
        }

        let listing = self.fetch_nodes().await;
        if let Err(e) = &listing {
            tracing::error!(error = %e, "Could not get node inventory from MAAS");
        }

        match (listing, self.logout().await) {
            (Ok(out), Ok(())) => parse_inventory(&out).map(Some),
            (Err(_), Ok(())) => Ok(None),
            (Ok(_), Err(e)) => Err(e),
            (Err(list_err), Err(logout_err)) => Err(HaclusterError::Session(format!(
                "{}; node listing had failed: {}",
                logout_err, list_err
            ))),
        }
    }

    async fn fetch_nodes(&self) -> Result<String, HaclusterError> {
        let cmd = CommandSpec::new(&self.settings.cli)
            .args([self.settings.profile.as_str(), "nodes", "list"]);
        self.runner.check_output(&cmd).await
    }
}

/// Node records are passed through untouched
fn parse_inventory(out: &str) -> Result<Vec<Value>, HaclusterError> {
    match serde_json::from_str(out) {
        Ok(Value::Array(nodes)) => Ok(nodes),
        Ok(other) => Err(HaclusterError::Inventory(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(HaclusterError::Inventory(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
