//! # Grapnel Client
//!
//! The high-level entry point of the engine. A [`GrapnelClient`] owns one connection to
//! one server, runs schema discovery over it, and dispatches dynamic unary invocations.
//!
//! ## Connection lifecycle
//!
//! The channel is established eagerly on [`GrapnelClient::connect`] and kept for the
//! lifetime of the client. When an invocation fails for a transport-level reason, the
//! client makes exactly **one** reconnection attempt with the original address and
//! timeout. On success the old channel is discarded and the new one installed for
//! subsequent calls — the failed invocation itself is still reported as failed, it is
//! never replayed. On failure the session is fatally broken.
//!
//! The schema registry produced by [`GrapnelClient::discover`] is bound to this client's
//! session: it is built once per connection and not refreshed automatically. Re-run
//! discovery if the server's schema may have changed.
use crate::{
    grpc::client::{GrpcClient, GrpcRequestError},
    reflection::client::{DiscoveryError, DiscoveryWarning, ReflectionClient},
    registry::SchemaRegistry,
};
use prost_reflect::{DescriptorError, DynamicMessage, MethodDescriptor};
use std::time::Duration;
use tonic::{
    Code, Status,
    transport::{Channel, Endpoint},
};

/// Default budget for establishing a connection. Invocation itself is not
/// independently time-bounded beyond what the transport enforces.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// Errors that can occur while discovering the server's schema.
#[derive(Debug, thiserror::Error)]
pub enum ClientDiscoveryError {
    #[error("Reflection discovery failed: '{0}'")]
    Reflection(#[from] DiscoveryError),
    #[error("Failed to build registry from discovered descriptors: '{0}'")]
    Descriptor(#[from] DescriptorError),
}

/// Errors that can occur during a dynamic invocation.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// Only unary methods are supported; streaming calls are rejected up front.
    #[error("Method '{0}' is streaming; only unary methods are supported")]
    StreamingUnsupported(String),

    /// The server answered with a non-transport error status. The connection is left
    /// untouched; the caller may retry with a new request.
    #[error("Server returned error status: '{0}'")]
    Rpc(Status),

    /// The call failed for a transport reason but the single reconnection attempt
    /// succeeded. The channel is restored; the caller must retry the call explicitly.
    #[error("Call failed with transport error '{status}'; the connection was re-established")]
    ConnectionRecovered { status: Status },

    /// The call failed for a transport reason and the reconnection attempt failed too.
    /// The session is fatally broken.
    #[error("Connection lost and reconnection failed: '{reconnect}' (call failed with '{status}')")]
    ConnectionLost {
        status: Status,
        #[source]
        reconnect: ConnectError,
    },
}

/// The result of a discovery session: the registry plus any non-fatal warnings.
#[derive(Debug)]
pub struct Discovery {
    pub registry: SchemaRegistry,
    /// Symbols or dependency files that could not be resolved. They contribute no
    /// methods but did not abort discovery.
    pub warnings: Vec<DiscoveryWarning>,
}

/// A dynamic gRPC client bound to one server address.
pub struct GrapnelClient {
    addr: String,
    connect_timeout: Duration,
    grpc_client: GrpcClient<Channel>,
    reflection_client: ReflectionClient<Channel>,
}

impl GrapnelClient {
    /// Connects to a gRPC server with the default connect timeout.
    ///
    /// # Arguments
    ///
    /// * `addr` - The server URI (e.g., `http://localhost:50051`).
    pub async fn connect(addr: &str) -> Result<Self, ConnectError> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connects to a gRPC server, bounding connection establishment by `timeout`.
    ///
    /// The same address and timeout are reused for the reconnection attempt after a
    /// transport failure.
    pub async fn connect_with_timeout(
        addr: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let channel = open_channel(addr, timeout).await?;
        Ok(Self {
            addr: addr.to_string(),
            connect_timeout: timeout,
            grpc_client: GrpcClient::new(channel.clone()),
            reflection_client: ReflectionClient::new(channel),
        })
    }

    /// Discovers the full schema of every service the server hosts.
    ///
    /// Builds a fresh [`SchemaRegistry`] over one reflection stream. Individual symbols
    /// that fail to resolve are reported in [`Discovery::warnings`] and skipped.
    pub async fn discover(&mut self) -> Result<Discovery, ClientDiscoveryError> {
        let mut schema = self.reflection_client.discover().await?;
        let warnings = std::mem::take(&mut schema.warnings);
        let registry = SchemaRegistry::from_discovered(schema)?;
        Ok(Discovery { registry, warnings })
    }

    /// Invokes a discovered unary method with a request built against its input type.
    ///
    /// # Returns
    ///
    /// * `Ok(DynamicMessage)` - The response, decodable against the method's output type.
    /// * `Err(InvokeError)` - See the variants for the recovery semantics.
    pub async fn invoke(
        &mut self,
        method: &MethodDescriptor,
        request: DynamicMessage,
    ) -> Result<DynamicMessage, InvokeError> {
        if method.is_client_streaming() || method.is_server_streaming() {
            return Err(InvokeError::StreamingUnsupported(
                method.full_name().to_string(),
            ));
        }

        let status = match self.grpc_client.unary(method, request).await {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(status)) if !is_transport_failure(&status) => {
                return Err(InvokeError::Rpc(status));
            }
            Ok(Err(status)) => status,
            // `ready()` failing means the transport itself is broken.
            Err(GrpcRequestError::ClientNotReady(source)) => Status::unavailable(source.to_string()),
        };

        tracing::warn!(%status, addr = %self.addr, "transport failure during invocation, reconnecting");

        match open_channel(&self.addr, self.connect_timeout).await {
            Ok(channel) => {
                self.install_channel(channel);
                Err(InvokeError::ConnectionRecovered { status })
            }
            Err(reconnect) => Err(InvokeError::ConnectionLost { status, reconnect }),
        }
    }

    /// The address this client connects (and reconnects) to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn install_channel(&mut self, channel: Channel) {
        self.grpc_client = GrpcClient::new(channel.clone());
        self.reflection_client = ReflectionClient::new(channel);
    }
}

async fn open_channel(addr: &str, timeout: Duration) -> Result<Channel, ConnectError> {
    let endpoint = Endpoint::new(addr.to_string())
        .map_err(|e| ConnectError::InvalidUrl(addr.to_string(), e))?
        .connect_timeout(timeout);

    endpoint
        .connect()
        .await
        .map_err(|e| ConnectError::ConnectionFailed(addr.to_string(), e))
}

/// Classifies an invocation failure. Transport-layer failures are eligible for the
/// single reconnection attempt; everything else is an application-level error that
/// leaves the connection untouched.
fn is_transport_failure(status: &Status) -> bool {
    if matches!(status.code(), Code::Unavailable | Code::DeadlineExceeded) {
        return true;
    }

    let message = status.message().to_lowercase();
    ["connection refused", "connection reset", "broken pipe", "transport is closing"]
        .iter()
        .any(|needle| message.contains(needle))
}
