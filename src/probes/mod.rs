//! Leaf network checks. Every check absorbs its own failures and returns a
//! best-effort result; nothing here returns an error to the caller.

pub mod directory;
pub mod network;
pub mod subdomain;
pub mod tls;
pub mod wordlists;

use async_trait::async_trait;

use crate::models::{DiscoveredPath, PortFinding, SubdomainFinding, TlsFinding};

pub use directory::DirectoryProber;
pub use network::{NetworkProbe, ServicePort, PORT_CATALOG};
pub use subdomain::SubdomainResolver;
pub use tls::TlsInspector;

/// Open ports of a host.
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn scan_ports(&self, host: &str) -> Vec<PortFinding>;
}

#[async_trait]
pub trait TlsProbe: Send + Sync {
    async fn inspect(&self, domain: &str) -> TlsFinding;
}

#[async_trait]
pub trait SubdomainDiscovery: Send + Sync {
    async fn discover_subdomains(&self, domain: &str) -> Vec<SubdomainFinding>;

    /// Resolve externally supplied candidate names. Unresolvable names come back inactive.
    async fn resolve_names(&self, names: &[String]) -> Vec<SubdomainFinding>;
}

#[async_trait]
pub trait PathDiscovery: Send + Sync {
    async fn discover_paths(&self, domain: &str) -> Vec<DiscoveredPath>;
}
