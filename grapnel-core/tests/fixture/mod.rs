//! Shared test support: hand-assembled file descriptors (no protoc needed), a
//! scriptable reflection service and a dynamic "probe" echo server.
#![allow(dead_code)]

use grapnel_core::grpc::codec::DynamicCodec;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::collections::{HashMap, HashSet};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{StreamExt, wrappers::ReceiverStream, wrappers::TcpListenerStream};
use tonic::codegen::{BoxFuture, http};
use tonic::{Request, Response, Status, Streaming};
use tonic_reflection::pb::v1::{
    ErrorResponse, FileDescriptorResponse, ListServiceResponse, ServerReflectionRequest,
    ServerReflectionResponse, ServiceResponse, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};

// --- Descriptor builders -----------------------------------------------------------

pub fn field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn repeated_field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field(name, number, r#type)
    }
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// The schema served by the probe fixture server. `PingRequest` deliberately carries
/// one field of every scalar kind the converter supports, plus two it must reject.
pub fn probe_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("probe.proto".to_string()),
        package: Some("probe".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "PingRequest",
                vec![
                    field("text", 1, Type::String),
                    field("count", 2, Type::Int64),
                    field("level", 3, Type::Int32),
                    field("ratio", 4, Type::Double),
                    field("flag", 5, Type::Bool),
                    field("payload", 6, Type::Bytes),
                    repeated_field("tags", 7, Type::String),
                ],
            ),
            message(
                "PingResponse",
                vec![
                    field("echo", 1, Type::String),
                    field("count", 2, Type::Int64),
                ],
            ),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("ProbeService".to_string()),
            method: vec![
                method("Ping", ".probe.PingRequest", ".probe.PingResponse"),
                method("Flaky", ".probe.PingRequest", ".probe.PingResponse"),
                MethodDescriptorProto {
                    server_streaming: Some(true),
                    ..method("Watch", ".probe.PingRequest", ".probe.PingResponse")
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn probe_file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![probe_file()],
    }
}

pub fn probe_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(probe_file_descriptor_set())
        .expect("probe fixture descriptors are valid")
}

// --- Scriptable reflection service -------------------------------------------------

/// A reflection service answering from a fixed script, so tests can serve cyclic
/// dependency graphs and inject per-file failures that a real server never produces.
#[derive(Clone, Default)]
pub struct ScriptedReflection {
    /// Symbols reported by ListServices, in order.
    pub services: Vec<String>,
    /// Known files by name.
    pub files: HashMap<String, FileDescriptorProto>,
    /// Symbol -> owning file name.
    pub symbols: HashMap<String, String>,
    /// Files whose lookup is answered with a stream error.
    pub broken_files: HashSet<String>,
}

impl ScriptedReflection {
    pub fn into_server(self) -> ServerReflectionServer<Self> {
        ServerReflectionServer::new(self)
    }

    fn respond(
        &self,
        request: Option<MessageRequest>,
    ) -> Result<ServerReflectionResponse, Status> {
        let message_response = match request {
            Some(MessageRequest::ListServices(_)) => {
                MessageResponse::ListServicesResponse(ListServiceResponse {
                    service: self
                        .services
                        .iter()
                        .map(|name| ServiceResponse { name: name.clone() })
                        .collect(),
                })
            }
            Some(MessageRequest::FileContainingSymbol(symbol)) => {
                match self.symbols.get(&symbol).and_then(|f| self.files.get(f)) {
                    Some(fd) => file_response(fd),
                    None => not_found(&symbol),
                }
            }
            Some(MessageRequest::FileByFilename(name)) => {
                if self.broken_files.contains(&name) {
                    return Err(Status::internal(format!("simulated failure for {name}")));
                }
                match self.files.get(&name) {
                    Some(fd) => file_response(fd),
                    None => not_found(&name),
                }
            }
            _ => MessageResponse::ErrorResponse(ErrorResponse {
                error_code: tonic::Code::Unimplemented as i32,
                error_message: "unsupported reflection request".to_string(),
            }),
        };

        Ok(ServerReflectionResponse {
            valid_host: String::new(),
            original_request: None,
            message_response: Some(message_response),
        })
    }
}

fn file_response(fd: &FileDescriptorProto) -> MessageResponse {
    MessageResponse::FileDescriptorResponse(FileDescriptorResponse {
        file_descriptor_proto: vec![fd.encode_to_vec()],
    })
}

fn not_found(what: &str) -> MessageResponse {
    MessageResponse::ErrorResponse(ErrorResponse {
        error_code: tonic::Code::NotFound as i32,
        error_message: format!("not found: {what}"),
    })
}

#[tonic::async_trait]
impl ServerReflection for ScriptedReflection {
    type ServerReflectionInfoStream = ReceiverStream<Result<ServerReflectionResponse, Status>>;

    async fn server_reflection_info(
        &self,
        request: Request<Streaming<ServerReflectionRequest>>,
    ) -> Result<Response<Self::ServerReflectionInfoStream>, Status> {
        let mut requests = request.into_inner();
        let (tx, rx) = mpsc::channel(16);
        let script = self.clone();

        tokio::spawn(async move {
            while let Ok(Some(req)) = requests.message().await {
                let reply = script.respond(req.message_request);
                if tx.send(reply).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

// --- Dynamic probe server ----------------------------------------------------------

/// A hand-rolled gRPC server for `probe.ProbeService`, shaped like generated tonic
/// server code but speaking `DynamicMessage` so the fixture needs no protoc run.
///
/// `Ping` echoes `text`/`count` back as `echo`/`count`. `Flaky` always answers with
/// `Unavailable`, which the client classifies as a recoverable transport failure.
#[derive(Clone)]
pub struct ProbeServer {
    input: MessageDescriptor,
    output: MessageDescriptor,
}

impl ProbeServer {
    pub fn new() -> Self {
        let pool = probe_pool();
        Self {
            input: pool
                .get_message_by_name("probe.PingRequest")
                .expect("fixture request type"),
            output: pool
                .get_message_by_name("probe.PingResponse")
                .expect("fixture response type"),
        }
    }
}

struct PingHandler {
    output: MessageDescriptor,
}

impl tonic::server::UnaryService<DynamicMessage> for PingHandler {
    type Response = DynamicMessage;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        let output = self.output.clone();
        Box::pin(async move {
            let req = request.into_inner();
            let mut resp = DynamicMessage::new(output);
            if let Some(text) = req.get_field_by_name("text") {
                resp.set_field_by_name("echo", text.into_owned());
            }
            if let Some(count) = req.get_field_by_name("count") {
                resp.set_field_by_name("count", count.into_owned());
            }
            Ok(Response::new(resp))
        })
    }
}

struct FlakyHandler;

impl tonic::server::UnaryService<DynamicMessage> for FlakyHandler {
    type Response = DynamicMessage;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, _request: Request<DynamicMessage>) -> Self::Future {
        Box::pin(async move { Err(Status::unavailable("probe service restarting")) })
    }
}

impl tonic::codegen::Service<http::Request<tonic::body::Body>> for ProbeServer {
    type Response = http::Response<tonic::body::Body>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<tonic::body::Body>) -> Self::Future {
        let input = self.input.clone();
        let output = self.output.clone();
        match req.uri().path() {
            "/probe.ProbeService/Ping" => Box::pin(async move {
                let codec = DynamicCodec::new(output.clone(), input);
                let mut grpc = tonic::server::Grpc::new(codec);
                Ok(grpc.unary(PingHandler { output }, req).await)
            }),
            "/probe.ProbeService/Flaky" => Box::pin(async move {
                let codec = DynamicCodec::new(output, input);
                let mut grpc = tonic::server::Grpc::new(codec);
                Ok(grpc.unary(FlakyHandler, req).await)
            }),
            _ => Box::pin(async move {
                let mut response = http::Response::new(tonic::body::Body::default());
                let headers = response.headers_mut();
                headers.insert(
                    tonic::Status::GRPC_STATUS,
                    (tonic::Code::Unimplemented as i32).into(),
                );
                headers.insert(http::header::CONTENT_TYPE, tonic::metadata::GRPC_CONTENT_TYPE);
                Ok(response)
            }),
        }
    }
}

impl tonic::server::NamedService for ProbeServer {
    const NAME: &'static str = "probe.ProbeService";
}

// --- TCP test server ---------------------------------------------------------------

/// A probe + reflection server on a real TCP port, with a connection counter and a
/// shutdown handle so tests can observe reconnects and kill the transport.
pub struct TestServer {
    pub uri: String,
    pub port: u16,
    pub connections: Arc<AtomicUsize>,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_on(0).await
    }

    /// Binds to `port` (0 picks a free one) and serves until [`Self::shutdown`].
    pub async fn start_on(port: u16) -> Self {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("bind test listener");
        let port = listener.local_addr().expect("listener addr").port();

        let connections = Arc::new(AtomicUsize::new(0));
        let counted = {
            let connections = connections.clone();
            TcpListenerStream::new(listener).map(move |conn| {
                connections.fetch_add(1, Ordering::SeqCst);
                conn
            })
        };

        let reflection = tonic_reflection::server::Builder::configure()
            .register_file_descriptor_set(probe_file_descriptor_set())
            .build_v1()
            .expect("build reflection service");

        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(reflection)
                .add_service(ProbeServer::new())
                .serve_with_incoming_shutdown(counted, async {
                    let _ = rx.await;
                })
                .await
                .expect("test server failed");
        });

        TestServer {
            uri: format!("http://127.0.0.1:{port}"),
            port,
            connections,
            shutdown,
            handle,
        }
    }

    /// Stops the server and waits until the port is released.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}
