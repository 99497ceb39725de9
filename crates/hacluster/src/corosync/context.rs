//! Values fed into the corosync template.

use hacluster_common::constants::{config_keys, relation_keys};
use hacluster_common::{AddressFamily, HaclusterError, Membership, NodeId, Transport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use super::CorosyncRenderer;

/// Everything the template needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorosyncContext {
    pub transport: Transport,
    pub membership: Membership,
    /// Only present for udp
    pub multicast: Option<Multicast>,
    /// Only present for IPv6
    pub local_node_id: Option<NodeId>,
    pub debug: bool,
}

/// Multicast interface settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multicast {
    /// Only known for IPv4
    pub bindnetaddr: Option<Ipv4Addr>,
    pub mcastaddr: IpAddr,
    pub mcastport: u16,
}

/// Validate the configured transport
pub fn get_transport(configured: Option<&str>) -> Result<Transport, HaclusterError> {
    match configured {
        Some(value) => value.parse(),
        None => Err(HaclusterError::InvalidTransport("<unset>".to_string())),
    }
}

/// Keys whose value is null or an empty string. `false` is a real value.
pub fn nulls(values: &BTreeMap<String, Value>) -> Vec<String> {
    values
        .iter()
        .filter(|(_, value)| match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Raw multicast settings from one source (charm config or a principal)
struct MulticastSource {
    bind_iface: Option<String>,
    mcastaddr: Option<String>,
    mcastport: Option<String>,
}

impl MulticastSource {
    fn missing(&self, family: AddressFamily) -> Vec<String> {
        let as_value = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);

        let mut values = BTreeMap::new();
        values.insert(config_keys::MCAST_ADDR.to_string(), as_value(&self.mcastaddr));
        values.insert(config_keys::MCAST_PORT.to_string(), as_value(&self.mcastport));
        if family == AddressFamily::Ipv4 {
            values.insert(config_keys::BIND_IFACE.to_string(), as_value(&self.bind_iface));
        }
        nulls(&values)
    }
}

fn parse_port(value: &str) -> Result<u16, HaclusterError> {
    value.trim().parse().map_err(|_| HaclusterError::InvalidValue {
        key: config_keys::MCAST_PORT.to_string(),
        reason: format!("'{}' is not a port number", value),
    })
}

fn parse_mcastaddr(value: &str) -> Result<IpAddr, HaclusterError> {
    value.trim().parse().map_err(|_| HaclusterError::InvalidValue {
        key: config_keys::MCAST_ADDR.to_string(),
        reason: format!("'{}' is not an IP address", value),
    })
}

impl CorosyncRenderer {
    /// Assemble the template context.
    ///
    /// `None` means required multicast settings are missing from both the
    /// charm config and every principal unit.
    pub async fn context(&self) -> Result<Option<CorosyncContext>, HaclusterError> {
        let family = AddressFamily::select(self.config.get_bool(config_keys::PREFER_IPV6).await?);
        let transport = get_transport(self.config.get_string(config_keys::TRANSPORT).await?.as_deref())?;
        let debug = self.config.get_bool(config_keys::DEBUG).await?;
        let membership = self.ha_nodes(family).await?;

        let local_node_id = match family {
            AddressFamily::Ipv6 => Some(NodeId::from_unit_name(&self.relations.local_unit()?)?),
            AddressFamily::Ipv4 => None,
        };

        let mut context = CorosyncContext {
            transport,
            membership,
            multicast: None,
            local_node_id,
            debug,
        };

        if transport == Transport::Udpu {
            return Ok(Some(context));
        }

        let mcastaddr = self.config.get_string(config_keys::MCAST_ADDR).await?;
        let local = MulticastSource {
            bind_iface: self.config.get_string(config_keys::BIND_IFACE).await?,
            mcastaddr: mcastaddr.clone(),
            mcastport: self.config.get_string(config_keys::MCAST_PORT).await?,
        };

        let mut missing = local.missing(family);
        if missing.is_empty() {
            context.multicast = Some(self.multicast(family, local).await?);
            return Ok(Some(context));
        }

        // Local charm config wins; otherwise take the first principal unit
        // that supplies everything.
        let ha_relation = self.settings.ha_relation.as_str();
        for relation_id in self.relations.relation_ids(ha_relation).await? {
            for unit in self.relations.related_units(&relation_id).await? {
                let remote = MulticastSource {
                    bind_iface: self
                        .relations
                        .relation_get(relation_keys::BIND_IFACE, &unit, &relation_id)
                        .await?,
                    mcastaddr: mcastaddr.clone(),
                    mcastport: self
                        .relations
                        .relation_get(relation_keys::MCAST_PORT, &unit, &relation_id)
                        .await?,
                };

                missing = remote.missing(family);
                if missing.is_empty() {
                    tracing::debug!(unit = %unit, "Using multicast settings from principal");
                    context.multicast = Some(self.multicast(family, remote).await?);
                    return Ok(Some(context));
                }
            }
        }

        tracing::warn!(missing = ?missing, "Missing required corosync configuration");
        Ok(None)
    }

    async fn multicast(
        &self,
        family: AddressFamily,
        source: MulticastSource,
    ) -> Result<Multicast, HaclusterError> {
        let bindnetaddr = match (family, source.bind_iface.as_deref()) {
            (AddressFamily::Ipv4, Some(iface)) => Some(self.resolver.network_address(iface).await?),
            _ => None,
        };

        Ok(Multicast {
            bindnetaddr,
            mcastaddr: parse_mcastaddr(source.mcastaddr.as_deref().unwrap_or_default())?,
            mcastport: parse_port(source.mcastport.as_deref().unwrap_or_default())?,
        })
    }
}
