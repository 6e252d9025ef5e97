//! # Generic gRPC Client
//!
//! This module wraps a standard `tonic` client to provide a generic interface for
//! unary gRPC communication. It is agnostic to the specific Protobuf messages being
//! exchanged.
//!
//! ## How it works
//!
//! The [`GrpcClient`] utilizes the [`super::codec::DynamicCodec`] to handle serialization.
//! It does not need to know the structure of the data it is sending; it simply ensures
//! the connection is established and passes the `DynamicMessage` and `MethodDescriptor`
//! to the codec. The HTTP/2 routing path (e.g., `/package.Service/Method`) is constructed
//! from the method descriptor at call time.
use super::codec::DynamicCodec;
use crate::BoxError;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::str::FromStr;
use tonic::{client::GrpcService, transport::Channel};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
}

/// A generic client for unary gRPC calls on dynamically discovered methods.
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(DynamicMessage))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send request or connect.
    pub async fn unary(
        &mut self,
        method: &MethodDescriptor,
        payload: DynamicMessage,
    ) -> Result<Result<DynamicMessage, tonic::Status>, GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;

        let codec = DynamicCodec::new(method.input(), method.output());
        let path = http_path(method);
        let request = tonic::Request::new(payload);

        match self.client.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }
}

/// The wire-level routing key: `/<fully-qualified service name>/<method name>`.
pub fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}
