//! Cluster member discovery.

use hacluster_common::constants::relation_keys;
use hacluster_common::{AddressFamily, HaclusterError, Membership};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv6Addr};

use super::CorosyncRenderer;

impl CorosyncRenderer {
    /// This unit's address in `family`
    pub async fn resolve_own_address(&self, family: AddressFamily) -> Result<IpAddr, HaclusterError> {
        match family {
            AddressFamily::Ipv4 => {
                let unit = self.relations.local_unit()?;
                let private = self.relations.unit_private_address().await?.ok_or_else(|| {
                    HaclusterError::UnresolvableAddress {
                        target: unit,
                        family: family.to_string(),
                        reason: "no private-address advertised".to_string(),
                    }
                })?;
                Ok(IpAddr::V4(self.resolver.host_ip(&private).await?))
            }
            AddressFamily::Ipv6 => Ok(IpAddr::V6(self.resolver.ipv6_addr().await?)),
        }
    }

    /// Addresses of every unit on the peer relation.
    ///
    /// A peer without a usable address in `family` fails the whole lookup.
    pub async fn collect_peer_addresses(
        &self,
        family: AddressFamily,
    ) -> Result<BTreeMap<String, IpAddr>, HaclusterError> {
        let mut peers = BTreeMap::new();

        for relation_id in self.relations.relation_ids(&self.settings.peer_relation).await? {
            for unit in self.relations.related_units(&relation_id).await? {
                let advertised = self
                    .relations
                    .relation_get(relation_keys::PRIVATE_ADDRESS, &unit, &relation_id)
                    .await?
                    .filter(|addr| !addr.is_empty())
                    .ok_or_else(|| HaclusterError::UnresolvableAddress {
                        target: unit.clone(),
                        family: family.to_string(),
                        reason: "peer has not published an address".to_string(),
                    })?;

                let addr = match family {
                    AddressFamily::Ipv4 => IpAddr::V4(self.resolver.host_ip(&advertised).await?),
                    AddressFamily::Ipv6 => {
                        let addr: Ipv6Addr = advertised.parse().map_err(|_| {
                            HaclusterError::UnresolvableAddress {
                                target: unit.clone(),
                                family: family.to_string(),
                                reason: format!("{} is not an IPv6 address", advertised),
                            }
                        })?;
                        IpAddr::V6(addr)
                    }
                };

                tracing::debug!(unit = %unit, address = %addr, "Found cluster peer");
                peers.insert(unit, addr);
            }
        }

        Ok(peers)
    }

    /// Peers plus this unit, keyed by corosync node id
    pub async fn ha_nodes(&self, family: AddressFamily) -> Result<Membership, HaclusterError> {
        let mut units = self.collect_peer_addresses(family).await?;
        let local = self.relations.local_unit()?;
        units.insert(local, self.resolve_own_address(family).await?);

        let membership = Membership::build(family, &units)?;
        tracing::info!(
            members = membership.len(),
            family = %family,
            "Resolved cluster membership"
        );
        Ok(membership)
    }
}
