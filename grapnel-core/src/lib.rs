//! # Grapnel Core
//!
//! `grapnel-core` is a dynamic gRPC discovery & invocation engine. Given nothing but the
//! address of a server that exposes the gRPC Server Reflection endpoint, it discovers the
//! full schema of every hosted service, builds well-typed request messages from plain
//! textual input, invokes arbitrary unary methods over the wire, and recovers from
//! transport failures with a single reconnection attempt.
//!
//! ## Key Components
//!
//! * **[`GrapnelClient`]:** The main entry point. It owns the connection, runs schema
//!   discovery and dispatches invocations through the generic gRPC transport.
//! * **[`SchemaRegistry`]:** The session-scoped, read-only store of resolved descriptors,
//!   produced by discovery and queried by fully-qualified symbol.
//! * **[`message`] & [`convert`]:** Schema-driven message construction. Because method
//!   input/output types are known only at runtime, every field access goes through a
//!   descriptor rather than a compiled struct.
//!
//! ## Internal clients
//!
//! The lower-level clients are exposed for callers that want to drive them directly:
//!
//! * **[`GrpcClient`]:** A generic unary gRPC transport using a descriptor-driven codec.
//! * **[`ReflectionClient`]:** A `grpc.reflection.v1` client that resolves the transitive
//!   closure of file descriptors for every service a server reports.
//!
//! ## Feature Flags (Internal use only)
//!
//! * `gen-proto`: Enables support for regenerating the reflection service bindings.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
//!
//! [`GrapnelClient`]: client::GrapnelClient
//! [`SchemaRegistry`]: registry::SchemaRegistry
//! [`GrpcClient`]: grpc::client::GrpcClient
//! [`ReflectionClient`]: reflection::client::ReflectionClient
pub mod client;
pub mod convert;
pub mod directory;
pub mod grpc;
pub mod message;
pub mod reflection;
pub mod registry;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
