//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server Reflection Protocol.
//!
//! It enables the engine to query a server for its own Protobuf schema at runtime, so that
//! services can be discovered and invoked without pre-compiled descriptors.
pub mod client;
mod generated;
