//! Shared constants for hacluster components.

/// Default location of the rendered corosync configuration
pub const DEFAULT_COROSYNC_CONF: &str = "/etc/corosync/corosync.conf";

/// Corosync reserves node id 0, so every derived id is shifted by this
pub const COROSYNC_NODE_ID_OFFSET: u32 = 1000;

/// Default timeout for any external process (5 minutes)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Peer relation between hacluster units
pub const DEFAULT_PEER_RELATION: &str = "hanode";

/// Relation to the principal charm being clustered
pub const DEFAULT_HA_RELATION: &str = "ha";

/// How many times a missing package may trigger the fallback source
pub const MAX_PACKAGE_SOURCE_RETRIES: u32 = 1;

/// MAAS client defaults
pub mod maas {
    /// CLI executable
    pub const CLI: &str = "maas-cli";

    /// Package providing the CLI
    pub const PACKAGE: &str = "maas-cli";

    /// Fallback package source when the package is unknown to the cache
    pub const STABLE_PPA: &str = "ppa:maas-maintainers/stable";

    /// Login profile used for every session
    pub const PROFILE_NAME: &str = "maas-juju-hacluster";
}

/// Charm configuration keys
pub mod config_keys {
    pub const DEBUG: &str = "debug";
    pub const PREFER_IPV6: &str = "prefer-ipv6";
    pub const MCAST_PORT: &str = "corosync_mcastport";
    pub const MCAST_ADDR: &str = "corosync_mcastaddr";
    pub const TRANSPORT: &str = "corosync_transport";
    pub const BIND_IFACE: &str = "corosync_bindiface";
}

/// Relation data keys
pub mod relation_keys {
    /// Address every unit publishes on its relations
    pub const PRIVATE_ADDRESS: &str = "private-address";

    /// Interface the principal wants corosync bound to
    pub const BIND_IFACE: &str = "corosync_bindiface";

    /// Multicast port offered by the principal
    pub const MCAST_PORT: &str = "corosync_mcastport";
}

/// Environment variable carrying the local unit name during hook execution
pub const UNIT_NAME_ENV: &str = "JUJU_UNIT_NAME";
