//! Core types shared across hacluster components.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::constants::COROSYNC_NODE_ID_OFFSET;
use crate::error::HaclusterError;

/// IP family used for every member of the cluster.
///
/// A membership is either all-IPv4 or all-IPv6, never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Pick the family from the `prefer-ipv6` setting
    pub fn select(prefer_ipv6: bool) -> Self {
        if prefer_ipv6 { Self::Ipv6 } else { Self::Ipv4 }
    }

    /// Value of corosync's `ip_version` key
    pub fn ip_version(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }

    /// Returns true if the address belongs to this family
    pub fn contains(&self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (Self::Ipv4, IpAddr::V4(_)) | (Self::Ipv6, IpAddr::V6(_))
        )
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ip_version())
    }
}

/// Corosync totem transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Multicast
    Udp,
    /// Unicast, peers listed explicitly in a nodelist
    Udpu,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Udpu => "udpu",
        }
    }
}

impl FromStr for Transport {
    type Err = HaclusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(Self::Udp),
            "udpu" => Ok(Self::Udpu),
            other => Err(HaclusterError::InvalidTransport(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corosync node id derived from a unit name.
///
/// `service/N` maps to `N + 1000`; the same name always yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Derive the id for a unit name such as `hanode/3`
    pub fn from_unit_name(unit: &str) -> Result<Self, HaclusterError> {
        let invalid = || HaclusterError::InvalidUnitName(unit.to_string());

        let (service, number) = unit.rsplit_once('/').ok_or_else(invalid)?;
        // Only plain decimal suffixes; `+1` or `01` would alias `1`
        if service.is_empty()
            || number.is_empty()
            || !number.bytes().all(|b| b.is_ascii_digit())
            || (number.len() > 1 && number.starts_with('0'))
        {
            return Err(invalid());
        }

        let number: u32 = number.parse().map_err(|_| invalid())?;
        number
            .checked_add(COROSYNC_NODE_ID_OFFSET)
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final node id → address mapping handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    family: AddressFamily,
    nodes: BTreeMap<NodeId, IpAddr>,
}

impl Membership {
    /// Build the membership from unit → address pairs.
    ///
    /// Fails when two units derive the same node id or when an address is
    /// outside `family`.
    pub fn build(
        family: AddressFamily,
        units: &BTreeMap<String, IpAddr>,
    ) -> Result<Self, HaclusterError> {
        let mut owners: BTreeMap<NodeId, &str> = BTreeMap::new();
        let mut nodes = BTreeMap::new();

        for (unit, addr) in units {
            if !family.contains(addr) {
                return Err(HaclusterError::AddressFamilyMismatch {
                    unit: unit.clone(),
                    address: addr.to_string(),
                    family: family.to_string(),
                });
            }

            let id = NodeId::from_unit_name(unit)?;
            if let Some(first) = owners.insert(id, unit) {
                return Err(HaclusterError::NodeIdCollision {
                    id: id.value(),
                    first: first.to_string(),
                    second: unit.clone(),
                });
            }
            nodes.insert(id, *addr);
        }

        Ok(Self { family, nodes })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Members ordered by node id
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &IpAddr)> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(pairs: &[(&str, &str)]) -> BTreeMap<String, IpAddr> {
        pairs
            .iter()
            .map(|(unit, addr)| (unit.to_string(), addr.parse().unwrap()))
            .collect()
    }

    #[test]
    fn test_select_address_family() {
        assert_eq!(AddressFamily::select(false), AddressFamily::Ipv4);
        assert_eq!(AddressFamily::select(true), AddressFamily::Ipv6);
        assert_eq!(AddressFamily::Ipv6.ip_version(), "ipv6");
    }

    #[test]
    fn test_transport_parse() {
        assert_eq!("udp".parse::<Transport>().unwrap(), Transport::Udp);
        assert_eq!("udpu".parse::<Transport>().unwrap(), Transport::Udpu);
        assert!("hafu".parse::<Transport>().is_err());
        assert!("UDP".parse::<Transport>().is_err());
        assert!("".parse::<Transport>().is_err());
    }

    #[test]
    fn test_node_id_is_deterministic() {
        let first = NodeId::from_unit_name("hanode/0").unwrap();
        let second = NodeId::from_unit_name("hanode/0").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value(), 1000);
        assert_eq!(NodeId::from_unit_name("hanode/12").unwrap().value(), 1012);
    }

    #[test]
    fn test_node_id_rejects_malformed_names() {
        for name in [
            "hanode", "hanode/", "/3", "hanode/x", "hanode/-1", "hanode/+1", "hanode/01", "hanode/ 1",
        ] {
            assert!(
                matches!(
                    NodeId::from_unit_name(name),
                    Err(HaclusterError::InvalidUnitName(_))
                ),
                "{name} should be rejected"
            );
        }
        assert!(NodeId::from_unit_name(&format!("hanode/{}", u32::MAX)).is_err());
    }

    #[test]
    fn test_membership_distinct_ids() {
        let membership = Membership::build(
            AddressFamily::Ipv4,
            &units(&[
                ("hanode/0", "10.0.0.1"),
                ("hanode/1", "10.0.0.2"),
                ("hanode/2", "10.0.0.3"),
            ]),
        )
        .unwrap();

        let ids: Vec<u32> = membership.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![1000, 1001, 1002]);
        assert_eq!(membership.family(), AddressFamily::Ipv4);
    }

    #[test]
    fn test_membership_detects_collision() {
        let err = Membership::build(
            AddressFamily::Ipv4,
            &units(&[("hanode/1", "10.0.0.1"), ("other/1", "10.0.0.2")]),
        )
        .unwrap_err();

        match err {
            HaclusterError::NodeIdCollision { id, first, second } => {
                assert_eq!(id, 1001);
                assert_eq!(first, "hanode/1");
                assert_eq!(second, "other/1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_membership_rejects_mixed_families() {
        let err = Membership::build(
            AddressFamily::Ipv6,
            &units(&[("hanode/0", "2001:db8::1"), ("hanode/1", "10.0.0.2")]),
        )
        .unwrap_err();
        assert!(matches!(err, HaclusterError::AddressFamilyMismatch { .. }));
    }
}
