//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use hacluster_common::HaclusterError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;

use crate::hookenv::{CharmConfig, Relations};
use crate::network::AddressResolver;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

/// Replays scripted output keyed by full command line.
///
/// The last response queued for a line is repeated once the queue drains.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn ok(self, line: &str, stdout: &str) -> Self {
        self.respond(
            line,
            CommandOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    pub fn fail(self, line: &str, code: i32) -> Self {
        self.respond(
            line,
            CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: "scripted failure".to_string(),
            },
        )
    }

    /// Command lines run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(CommandSpec::line).collect()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, HaclusterError> {
        self.calls.lock().unwrap().push(command.clone());

        let line = command.line();
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(&line)
            .ok_or_else(|| HaclusterError::Command {
                command: line.clone(),
                reason: "no scripted response".to_string(),
            })?;

        match queue.len() {
            0 => Err(HaclusterError::Command {
                command: line,
                reason: "no scripted response".to_string(),
            }),
            1 => Ok(queue[0].clone()),
            _ => Ok(queue.pop_front().unwrap_or_default()),
        }
    }
}

/// Charm configuration backed by a map
#[derive(Default)]
pub struct FakeConfig {
    values: HashMap<String, Value>,
}

impl FakeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl CharmConfig for FakeConfig {
    async fn get(&self, key: &str) -> Result<Value, HaclusterError> {
        Ok(self.values.get(key).cloned().unwrap_or(Value::Null))
    }
}

/// Relation topology and data held in memory
pub struct FakeRelations {
    local_unit: String,
    private_address: Option<String>,
    relations: BTreeMap<String, Vec<String>>,
    units: BTreeMap<String, Vec<String>>,
    data: HashMap<(String, String, String), String>,
}

impl FakeRelations {
    pub fn new(local_unit: &str) -> Self {
        Self {
            local_unit: local_unit.to_string(),
            private_address: None,
            relations: BTreeMap::new(),
            units: BTreeMap::new(),
            data: HashMap::new(),
        }
    }

    pub fn private_address(mut self, addr: &str) -> Self {
        self.private_address = Some(addr.to_string());
        self
    }

    /// Register `unit` on `relation_id`, which belongs to `relation`
    pub fn unit(mut self, relation: &str, relation_id: &str, unit: &str) -> Self {
        let ids = self.relations.entry(relation.to_string()).or_default();
        if !ids.iter().any(|id| id == relation_id) {
            ids.push(relation_id.to_string());
        }
        self.units
            .entry(relation_id.to_string())
            .or_default()
            .push(unit.to_string());
        self
    }

    pub fn data(mut self, relation_id: &str, unit: &str, key: &str, value: &str) -> Self {
        self.data.insert(
            (relation_id.to_string(), unit.to_string(), key.to_string()),
            value.to_string(),
        );
        self
    }
}

#[async_trait]
impl Relations for FakeRelations {
    async fn relation_ids(&self, relation: &str) -> Result<Vec<String>, HaclusterError> {
        Ok(self.relations.get(relation).cloned().unwrap_or_default())
    }

    async fn related_units(&self, relation_id: &str) -> Result<Vec<String>, HaclusterError> {
        Ok(self.units.get(relation_id).cloned().unwrap_or_default())
    }

    async fn relation_get(
        &self,
        key: &str,
        unit: &str,
        relation_id: &str,
    ) -> Result<Option<String>, HaclusterError> {
        Ok(self
            .data
            .get(&(relation_id.to_string(), unit.to_string(), key.to_string()))
            .cloned())
    }

    async fn unit_private_address(&self) -> Result<Option<String>, HaclusterError> {
        Ok(self.private_address.clone())
    }

    fn local_unit(&self) -> Result<String, HaclusterError> {
        Ok(self.local_unit.clone())
    }
}

/// Address lookups that record which path was taken
#[derive(Default)]
pub struct FakeResolver {
    hosts: HashMap<String, Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
    networks: HashMap<String, Ipv4Addr>,
    host_lookups: Mutex<Vec<String>>,
    ipv6_lookups: Mutex<u32>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, name: &str, addr: &str) -> Self {
        self.hosts.insert(name.to_string(), addr.parse().unwrap());
        self
    }

    pub fn ipv6(mut self, addr: &str) -> Self {
        self.ipv6 = Some(addr.parse().unwrap());
        self
    }

    pub fn network(mut self, iface: &str, addr: &str) -> Self {
        self.networks.insert(iface.to_string(), addr.parse().unwrap());
        self
    }

    pub fn host_lookups(&self) -> Vec<String> {
        self.host_lookups.lock().unwrap().clone()
    }

    pub fn ipv6_lookups(&self) -> u32 {
        *self.ipv6_lookups.lock().unwrap()
    }
}

#[async_trait]
impl AddressResolver for FakeResolver {
    async fn host_ip(&self, host: &str) -> Result<Ipv4Addr, HaclusterError> {
        self.host_lookups.lock().unwrap().push(host.to_string());

        if let Some(addr) = self.hosts.get(host) {
            return Ok(*addr);
        }
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok(addr),
            _ => Err(HaclusterError::UnresolvableAddress {
                target: host.to_string(),
                family: "ipv4".to_string(),
                reason: "unknown host".to_string(),
            }),
        }
    }

    async fn ipv6_addr(&self) -> Result<Ipv6Addr, HaclusterError> {
        *self.ipv6_lookups.lock().unwrap() += 1;
        self.ipv6.ok_or_else(|| HaclusterError::UnresolvableAddress {
            target: "local host".to_string(),
            family: "ipv6".to_string(),
            reason: "no global address".to_string(),
        })
    }

    async fn network_address(&self, iface: &str) -> Result<Ipv4Addr, HaclusterError> {
        self.networks
            .get(iface)
            .copied()
            .ok_or_else(|| HaclusterError::UnresolvableAddress {
                target: iface.to_string(),
                family: "ipv4".to_string(),
                reason: "no such interface".to_string(),
            })
    }
}
