//! Deployment-system collaborators.
//!
//! The charm's configuration and relation data are only reachable through
//! the hook tools (`config-get`, `relation-get`, ...) while a hook runs.
//! [`HookTools`] wraps them behind the [`CharmConfig`] and [`Relations`]
//! capabilities.

use async_trait::async_trait;
use hacluster_common::HaclusterError;
use hacluster_common::constants::{UNIT_NAME_ENV, relation_keys};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::process::{CommandRunner, CommandSpec};

/// Charm configuration key/value store
#[async_trait]
pub trait CharmConfig: Send + Sync {
    /// Raw value, `Value::Null` when unset
    async fn get(&self, key: &str) -> Result<Value, HaclusterError>;

    /// Boolean option; unset counts as false
    async fn get_bool(&self, key: &str) -> Result<bool, HaclusterError> {
        match self.get(key).await? {
            Value::Null => Ok(false),
            Value::Bool(flag) => Ok(flag),
            other => Err(HaclusterError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a boolean, got {}", other),
            }),
        }
    }

    /// String option; numbers are rendered as text
    async fn get_string(&self, key: &str) -> Result<Option<String>, HaclusterError> {
        match self.get(key).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(HaclusterError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string, got {}", other),
            }),
        }
    }
}

/// Relation enumeration and per-unit relation data
#[async_trait]
pub trait Relations: Send + Sync {
    /// Ids of every established relation named `relation`
    async fn relation_ids(&self, relation: &str) -> Result<Vec<String>, HaclusterError>;

    /// Remote units participating in `relation_id`
    async fn related_units(&self, relation_id: &str) -> Result<Vec<String>, HaclusterError>;

    /// Value `unit` published under `key`, if any
    async fn relation_get(
        &self,
        key: &str,
        unit: &str,
        relation_id: &str,
    ) -> Result<Option<String>, HaclusterError>;

    /// Private address the deployment system advertises for this unit
    async fn unit_private_address(&self) -> Result<Option<String>, HaclusterError>;

    /// Name of the unit running the hook, e.g. `hanode/0`
    fn local_unit(&self) -> Result<String, HaclusterError>;
}

/// Hook tool backed collaborators
pub struct HookTools {
    runner: Arc<dyn CommandRunner>,
    unit_name: Option<String>,
}

impl HookTools {
    pub fn new(runner: Arc<dyn CommandRunner>, unit_name: Option<String>) -> Self {
        Self { runner, unit_name }
    }

    /// Take the local unit name from the hook environment
    pub fn from_env(runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(runner, std::env::var(UNIT_NAME_ENV).ok())
    }

    async fn query<T: DeserializeOwned>(&self, command: CommandSpec) -> Result<T, HaclusterError> {
        let stdout = self.runner.check_output(&command).await?;
        let stdout = stdout.trim();
        let stdout = if stdout.is_empty() { "null" } else { stdout };

        serde_json::from_str(stdout).map_err(|e| HaclusterError::InvalidValue {
            key: command.line(),
            reason: format!("unparseable output: {}", e),
        })
    }
}

/// Relation data is stringly typed; anything else is rendered as JSON
fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl CharmConfig for HookTools {
    async fn get(&self, key: &str) -> Result<Value, HaclusterError> {
        self.query(CommandSpec::new("config-get").args(["--format=json", key]))
            .await
    }
}

#[async_trait]
impl Relations for HookTools {
    async fn relation_ids(&self, relation: &str) -> Result<Vec<String>, HaclusterError> {
        let ids: Option<Vec<String>> = self
            .query(CommandSpec::new("relation-ids").args(["--format=json", relation]))
            .await?;
        Ok(ids.unwrap_or_default())
    }

    async fn related_units(&self, relation_id: &str) -> Result<Vec<String>, HaclusterError> {
        let units: Option<Vec<String>> = self
            .query(CommandSpec::new("relation-list").args(["--format=json", "-r", relation_id]))
            .await?;
        Ok(units.unwrap_or_default())
    }

    async fn relation_get(
        &self,
        key: &str,
        unit: &str,
        relation_id: &str,
    ) -> Result<Option<String>, HaclusterError> {
        let value: Value = self
            .query(
                CommandSpec::new("relation-get").args(["--format=json", "-r", relation_id, key, unit]),
            )
            .await?;
        Ok(value_to_string(value))
    }

    async fn unit_private_address(&self) -> Result<Option<String>, HaclusterError> {
        let value: Value = self
            .query(
                CommandSpec::new("unit-get").args(["--format=json", relation_keys::PRIVATE_ADDRESS]),
            )
            .await?;
        Ok(value_to_string(value))
    }

    fn local_unit(&self) -> Result<String, HaclusterError> {
        self.unit_name
            .clone()
            .ok_or_else(|| HaclusterError::Config(format!("{} is not set", UNIT_NAME_ENV)))
    }
}
