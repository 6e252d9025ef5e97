//! # Directory Boundary
//!
//! The engine does not perform service directory lookups itself; it only consumes the
//! result of one. This module pins down that interface: a directory resolves a service
//! name to one or more instances, each carrying a host, a registered port and free-form
//! metadata.
//!
//! Servers commonly expose their admin/reflection endpoint on a different port than
//! their main service port, advertised through an `admin-port` metadata entry; that
//! override is applied here so callers can hand [`ResolvedInstance::grpc_uri`] straight
//! to [`crate::client::GrapnelClient::connect`].
use std::collections::HashMap;

/// Metadata key carrying the admin/reflection port override.
const ADMIN_PORT_KEY: &str = "admin-port";

/// One service instance as reported by a directory.
#[derive(Debug, Clone)]
pub struct ResolvedInstance {
    pub host: String,
    pub port: u16,
    pub metadata: HashMap<String, String>,
}

impl ResolvedInstance {
    /// The port to reach the gRPC admin endpoint on: the `admin-port` metadata
    /// override if present and parseable, otherwise the registered port.
    pub fn admin_port(&self) -> u16 {
        self.metadata
            .get(ADMIN_PORT_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.port)
    }

    /// The URI to connect the engine to, e.g. `http://10.0.0.7:9090`.
    pub fn grpc_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.admin_port())
    }
}

/// A directory service that maps service names to live instances.
///
/// Implemented by an external collaborator (e.g. a Consul client); the engine never
/// picks among instances itself.
pub trait Directory {
    type Error: std::error::Error + Send + Sync + 'static;

    fn resolve_address(
        &self,
        service: &str,
    ) -> impl Future<Output = Result<Vec<ResolvedInstance>, Self::Error>> + Send;
}
