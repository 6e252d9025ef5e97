//! Committed bindings for the `grpc.reflection.v1` protocol.
//!
//! Regenerate with `cargo run --bin generate-reflection-service --features gen-proto`.
#[path = "generated/grpc.reflection.v1.rs"]
pub mod reflection_v1;
