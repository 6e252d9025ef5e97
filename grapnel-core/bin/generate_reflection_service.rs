//! Regenerates the committed `grpc.reflection.v1` client bindings from
//! `proto/reflection.proto`. Run with `--features gen-proto` after touching the proto.
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let proto_dir = manifest_dir.join("proto");
    let out_dir = manifest_dir.join("src/reflection/generated");

    fs::create_dir_all(&out_dir)?;

    tonic_prost_build::configure()
        .build_client(true)
        .build_server(false)
        .out_dir(&out_dir)
        .compile_protos(&[proto_dir.join("reflection.proto")], &[proto_dir])?;

    println!("regenerated bindings in {}", out_dir.display());
    Ok(())
}
