//! # Dynamic Message Codec
//!
//! This module implements `tonic::codec::Codec` for `prost_reflect::DynamicMessage`,
//! letting `tonic` transport messages whose types exist only as runtime descriptors.
//!
//! ## How it works
//!
//! 1. **Encoder (DynamicMessage -> bytes)**: the message already carries its descriptor,
//!    so encoding is a plain Protobuf wire serialization into the gRPC byte buffer.
//! 2. **Decoder (bytes -> DynamicMessage)**: raw bytes from the wire are merged into a
//!    fresh `DynamicMessage` built from the response `MessageDescriptor`.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A custom Codec that bridges `DynamicMessage` and the Protobuf binary format.
///
/// It holds the descriptors (schemas) for both the request and the response messages,
/// allowing it to perform dynamic serialization.
pub struct DynamicCodec {
    /// Schema for the input message.
    req_desc: MessageDescriptor,
    /// Schema for the output message.
    res_desc: MessageDescriptor,
}

impl DynamicCodec {
    /// Creates a new `DynamicCodec`.
    ///
    /// # Arguments
    /// * `req_desc` - Descriptor for the request message type.
    /// * `res_desc` - Descriptor for the response message type.
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder(self.req_desc.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.res_desc.clone())
    }
}

/// Responsible for encoding a `DynamicMessage` into Protobuf bytes.
pub struct DynamicEncoder(MessageDescriptor);

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        // DynamicMessage implements prost::Message, and the EncodeBuf always has
        // sufficient capacity, so raw encoding cannot fail.
        item.encode_raw(dst);
        Ok(())
    }
}

/// Responsible for decoding Protobuf bytes into a `DynamicMessage`.
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;
        Ok(Some(msg))
    }
}
