//! Common error types for hacluster components.

use thiserror::Error;

/// Errors across hacluster components
#[derive(Debug, Error)]
pub enum HaclusterError {
    /// Tool settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command could not be spawned or exited non-zero
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// External command exceeded its time budget
    #[error("Command `{command}` timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    /// Package is still unknown after the fallback source was added
    #[error("Package {package} unavailable after {attempts} attempt(s)")]
    PackageUnavailable { package: String, attempts: u32 },

    /// Login/logout against the provisioning service failed
    #[error("Session error: {0}")]
    Session(String),

    /// Provisioning service returned something other than a node list
    #[error("Invalid inventory response: {0}")]
    Inventory(String),

    /// Transport is not one of udp/udpu
    #[error("Invalid transport '{0}', expected one of: udp, udpu")]
    InvalidTransport(String),

    /// Unit name has no numeric suffix
    #[error("Invalid unit name '{0}', expected <service>/<number>")]
    InvalidUnitName(String),

    /// No address in the selected family
    #[error("Unable to resolve {family} address for {target}: {reason}")]
    UnresolvableAddress {
        target: String,
        family: String,
        reason: String,
    },

    /// Two units map onto the same corosync node id
    #[error("Node id {id} derived for both {first} and {second}")]
    NodeIdCollision {
        id: u32,
        first: String,
        second: String,
    },

    /// Membership would mix IPv4 and IPv6
    #[error("Address {address} of {unit} is not {family}")]
    AddressFamilyMismatch {
        unit: String,
        address: String,
        family: String,
    },

    /// Configuration value has the wrong shape
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl HaclusterError {
    /// Process exit code reported to the deployment system
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,
            Self::Command { .. } | Self::CommandTimeout { .. } | Self::PackageUnavailable { .. } => 69,
            Self::Session(_) | Self::Inventory(_) => 75,
            Self::InvalidTransport(_)
            | Self::InvalidUnitName(_)
            | Self::UnresolvableAddress { .. }
            | Self::NodeIdCollision { .. }
            | Self::AddressFamilyMismatch { .. }
            | Self::InvalidValue { .. } => 65,
        }
    }

    /// Returns true if the hook must abort rather than skip the step
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Session(_) | Self::Inventory(_))
    }
}
