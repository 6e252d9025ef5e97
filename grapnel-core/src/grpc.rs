//! # Generic gRPC Transport
//!
//! This module contains the low-level building blocks for performing gRPC calls using
//! dynamic message types.
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g., `HelloRequest`),
//! the components here work with `prost_reflect::DynamicMessage`, so any unary method
//! discovered at runtime can be invoked without generated stubs.
pub mod client;
pub mod codec;
