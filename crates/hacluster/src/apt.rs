//! Package cache queries and installation through apt.

use hacluster_common::HaclusterError;
use std::sync::Arc;

use crate::process::{CommandRunner, CommandSpec};

/// Where a package stands in the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// No configured source knows the package
    Unknown,
    /// Installable but not installed
    Available,
    Installed,
}

/// Classify `apt-cache policy <pkg>` output
pub fn parse_policy(output: &str) -> PackageState {
    let field = |name: &str| {
        output
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(name))
            .map(str::trim)
    };

    match (field("Installed:"), field("Candidate:")) {
        (Some(installed), _) if installed != "(none)" => PackageState::Installed,
        (Some(_), Some(candidate)) if candidate != "(none)" => PackageState::Available,
        _ => PackageState::Unknown,
    }
}

/// Thin wrapper over apt-cache/apt-get/add-apt-repository
#[derive(Clone)]
pub struct Apt {
    runner: Arc<dyn CommandRunner>,
}

impl Apt {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn package_state(&self, package: &str) -> Result<PackageState, HaclusterError> {
        let out = self
            .runner
            .check_output(
                &CommandSpec::new("apt-cache")
                    .args(["policy", package])
                    .env("LC_ALL", "C"),
            )
            .await?;
        Ok(parse_policy(&out))
    }

    pub async fn add_source(&self, source: &str) -> Result<(), HaclusterError> {
        tracing::info!(source = source, "Adding package source");
        self.runner
            .check_call(&CommandSpec::new("add-apt-repository").args(["-y", source]))
            .await
    }

    pub async fn update(&self) -> Result<(), HaclusterError> {
        tracing::info!("Refreshing package cache");
        self.runner
            .check_call(&CommandSpec::new("apt-get").arg("update"))
            .await
    }

    pub async fn install(&self, packages: &[&str]) -> Result<(), HaclusterError> {
        tracing::info!(packages = ?packages, "Installing packages");
        let cmd = CommandSpec::new("apt-get")
            .args([
                "--assume-yes",
                "--option=Dpkg::Options::=--force-confold",
                "install",
            ])
            .args(packages.iter().copied())
            .env("DEBIAN_FRONTEND", "noninteractive");
        self.runner.check_call(&cmd).await
    }
}
