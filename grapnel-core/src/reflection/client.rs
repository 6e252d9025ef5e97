//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1` that performs full schema discovery.
//!
//! A single discovery session opens one bidirectional stream and uses it for every request:
//! first a `ListServices` round trip, then one `FileContainingSymbol` round trip per reported
//! service, then one `FileByFilename` round trip per not-yet-seen dependency. The protocol is
//! stateful and stream-oriented, so requests are strictly serialized: a request is sent only
//! after the response to the previous one has been read.
//!
//! Dependency traversal is an explicit worklist rather than recursion. A file is marked as
//! seen *before* its dependencies are queued, which is what breaks import cycles: the moment
//! a cycle leads back to its entry file, that file is already in the seen set and nothing is
//! queued again.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use super::generated::reflection_v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};
use crate::BoxError;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashSet, VecDeque};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Streaming, client::GrpcService};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error("The server stream returned an error status: '{0}'")]
    ServerStreamFailure(#[source] tonic::Status),

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: Received unexpected response type: {0}")]
    UnexpectedResponseType(String),

    #[error("Failed to decode FileDescriptorProto: {0}")]
    DecodeError(#[from] prost::DecodeError),
}

/// Errors that abort a discovery session entirely.
///
/// Anything past the initial service listing is handled as a per-symbol
/// [`DiscoveryWarning`] instead.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("Failed to list services: '{0}'")]
    ListServices(#[source] ReflectionResolveError),
}

/// A non-fatal resolution failure for one symbol or dependency file.
///
/// The affected file is simply absent from the discovered schema; the symbol it was
/// requested for will not offer any methods.
#[derive(Debug)]
pub struct DiscoveryWarning {
    /// The service symbol or dependency file name whose resolution failed.
    pub symbol: String,
    pub error: ReflectionResolveError,
}

/// The complete output of one discovery session.
#[derive(Debug)]
pub struct DiscoveredSchema {
    /// Every resolved file, exactly once, in first-resolution order.
    pub file_descriptor_set: FileDescriptorSet,
    /// Service symbols in server-reported order. This is the canonical order for
    /// presenting services and methods to a caller.
    pub service_symbols: Vec<String>,
    pub warnings: Vec<DiscoveryWarning>,
}

// The host defined in the reflection requests doesn't seem to be a mandatory field
// and there is no documentation about what it is about.
// So we won't enforce it from the user.
const EMPTY_HOST: &str = "";

// The reflection service reports itself (and other grpc.* infrastructure services);
// those are not part of the server's own schema.
const RESERVED_NAMESPACE: &str = "grpc.";

/// A generic client for the gRPC Server Reflection Protocol.
pub struct ReflectionClient<T = Channel> {
    client: ServerReflectionClient<T>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(channel: S) -> Self {
        let client = ServerReflectionClient::new(channel);
        Self { client }
    }

    /// Runs a full discovery session against the server.
    ///
    /// Lists every service the server reports (excluding the `grpc.*` namespace) and
    /// resolves the transitive closure of file descriptors for each of them, all over a
    /// single reflection stream.
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveredSchema)` - The resolved schema, possibly with per-symbol warnings.
    /// * `Err(DiscoveryError)` - The stream could not be opened or the initial service
    ///   list could not be read; there is nothing useful to return.
    pub async fn discover(&mut self) -> Result<DiscoveredSchema, DiscoveryError> {
        let (tx, rx) = mpsc::channel(16);

        let responses = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(DiscoveryError::ServerStreamInitFailed)?
            .into_inner();

        let mut session = ResolveSession::new(tx, responses);

        let service_symbols = session
            .list_services()
            .await
            .map_err(DiscoveryError::ListServices)?;

        for symbol in &service_symbols {
            session.resolve_symbol(symbol).await;
        }

        Ok(DiscoveredSchema {
            file_descriptor_set: FileDescriptorSet {
                file: session.files,
            },
            service_symbols,
            warnings: session.warnings,
        })
    }
}

/// State of one discovery session: the shared stream plus the cycle guard.
struct ResolveSession {
    tx: mpsc::Sender<ServerReflectionRequest>,
    responses: Streaming<ServerReflectionResponse>,
    /// File names already collected. Guarded *before* dependencies are queued.
    seen: HashSet<String>,
    /// Dependency files already requested, so a shared import is fetched only once.
    requested: HashSet<String>,
    /// Collected files in first-resolution order.
    files: Vec<FileDescriptorProto>,
    warnings: Vec<DiscoveryWarning>,
}

impl ResolveSession {
    fn new(
        tx: mpsc::Sender<ServerReflectionRequest>,
        responses: Streaming<ServerReflectionResponse>,
    ) -> Self {
        Self {
            tx,
            responses,
            seen: HashSet::new(),
            requested: HashSet::new(),
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    async fn list_services(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        match self
            .round_trip(MessageRequest::ListServices(String::new()))
            .await?
        {
            MessageResponse::ListServicesResponse(resp) => Ok(resp
                .service
                .into_iter()
                .map(|s| s.name)
                .filter(|name| !name.starts_with(RESERVED_NAMESPACE))
                .collect()),
            other => Err(ReflectionResolveError::UnexpectedResponseType(format!(
                "{other:?}",
            ))),
        }
    }

    /// Resolves the file containing `symbol` plus all transitively imported files.
    ///
    /// Failures are recorded as warnings, not returned: the file that could not be
    /// fetched is skipped and the remaining worklist is still drained.
    async fn resolve_symbol(&mut self, symbol: &str) {
        let mut pending = VecDeque::new();
        pending.push_back((
            symbol.to_string(),
            MessageRequest::FileContainingSymbol(symbol.to_string()),
        ));

        while let Some((name, request)) = pending.pop_front() {
            match self.fetch_files(request).await {
                Ok(protos) => {
                    for fd in protos {
                        self.record_file(fd, &mut pending);
                    }
                }
                Err(error) => {
                    tracing::warn!(symbol = %name, %error, "could not resolve schema file");
                    self.warnings.push(DiscoveryWarning {
                        symbol: name,
                        error,
                    });
                }
            }
        }
    }

    /// Sends one request and reads the matching response. The stream is strictly
    /// request-then-response; there is never more than one request in flight.
    async fn round_trip(
        &mut self,
        request: MessageRequest,
    ) -> Result<MessageResponse, ReflectionResolveError> {
        let req = ServerReflectionRequest {
            host: EMPTY_HOST.to_string(),
            message_request: Some(request),
        };

        self.tx
            .send(req)
            .await
            .map_err(|_| ReflectionResolveError::SendFailed)?;

        let response = self
            .responses
            .message()
            .await
            .map_err(ReflectionResolveError::ServerStreamFailure)?
            .ok_or(ReflectionResolveError::StreamClosed)?;

        match response.message_response {
            Some(MessageResponse::ErrorResponse(e)) => Err(ReflectionResolveError::ServerError {
                code: e.error_code,
                message: e.error_message,
            }),
            Some(other) => Ok(other),
            None => Err(ReflectionResolveError::UnexpectedResponseType(
                "Empty Message".into(),
            )),
        }
    }

    async fn fetch_files(
        &mut self,
        request: MessageRequest,
    ) -> Result<Vec<FileDescriptorProto>, ReflectionResolveError> {
        match self.round_trip(request).await? {
            MessageResponse::FileDescriptorResponse(res) => res
                .file_descriptor_proto
                .iter()
                .map(|raw| FileDescriptorProto::decode(raw.as_ref()).map_err(Into::into))
                .collect(),
            other => Err(ReflectionResolveError::UnexpectedResponseType(format!(
                "{other:?}",
            ))),
        }
    }

    /// Records a resolved file and queues its unresolved dependencies.
    ///
    /// The file name enters the seen set before its dependencies are queued; this is the
    /// insert-before-recurse ordering that keeps cyclic import graphs terminating.
    fn record_file(
        &mut self,
        fd: FileDescriptorProto,
        pending: &mut VecDeque<(String, MessageRequest)>,
    ) {
        let name = fd.name().to_string();
        if !self.seen.insert(name) {
            return;
        }

        for dep in &fd.dependency {
            if !self.seen.contains(dep) && self.requested.insert(dep.clone()) {
                pending.push_back((dep.clone(), MessageRequest::FileByFilename(dep.clone())));
            }
        }

        self.files.push(fd);
    }
}
