//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Unit tests for wiregate-codec components

use bytes::BytesMut;
use std::time::Duration;
use tokio_util::codec::{Decoder, Encoder};
use wiregate_codec::{BINARY_ACK, Frame, FramingScheme, GatewayCodec, Reply, TEXT_ACK};

// ============================================================================
// Helper Functions
// ============================================================================

fn decode_one(codec: &mut GatewayCodec, bytes: &[u8]) -> Frame {
    let mut buffer = BytesMut::from(bytes);
    let frame = codec.decode(&mut buffer).unwrap().unwrap();
    assert!(buffer.is_empty(), "decode must drain the read buffer");
    frame
}

// ============================================================================
// FramingScheme Tests
// ============================================================================

#[test]
fn binary_scheme_constants() {
    let scheme = FramingScheme::Binary;
    assert_eq!(scheme.ack().payload().as_ref(), &BINARY_ACK[..]);
    assert_eq!(scheme.settle_delay(), Duration::from_millis(200));
    assert_eq!(scheme.to_string(), "binary");
}

#[test]
fn text_scheme_constants() {
    let scheme = FramingScheme::Text;
    assert_eq!(scheme.ack().payload().as_ref(), TEXT_ACK);
    assert_eq!(scheme.settle_delay(), Duration::from_secs(10));
    assert_eq!(scheme.to_string(), "text");
}

// ============================================================================
// Decode Tests
// ============================================================================

#[test]
fn binary_decode_renders_uppercase_hex() {
    let mut codec = GatewayCodec::new(FramingScheme::Binary);
    let frame = decode_one(&mut codec, &[0x01, 0x02]);
    assert_eq!(frame.to_hex(), "0102");
}

#[test]
fn text_decode_high_byte_renders_two_digits() {
    // 0x9F must not produce a truncated or sign-mangled rendering.
    let mut codec = GatewayCodec::new(FramingScheme::Text);
    let frame = decode_one(&mut codec, &[0x9F]);
    assert_eq!(frame.to_hex(), "9F");
}

#[test]
fn decode_accepts_any_byte_sequence() {
    let mut codec = GatewayCodec::new(FramingScheme::Binary);
    let frame = decode_one(&mut codec, &[0x00, 0x7F, 0x80, 0xFF]);
    assert_eq!(frame.to_hex(), "007F80FF");
    assert_eq!(frame.len(), 4);
}

#[test]
fn decode_is_stateless_between_messages() {
    let mut codec = GatewayCodec::new(FramingScheme::Text);

    let first = decode_one(&mut codec, b"first");
    let second = decode_one(&mut codec, b"second");
    assert_eq!(first.as_text(), "first");
    assert_eq!(second.as_text(), "second");
}

#[test]
fn decode_empty_buffer_waits_for_data() {
    let mut codec = GatewayCodec::new(FramingScheme::Binary);
    let mut buffer = BytesMut::new();
    assert!(codec.decode(&mut buffer).unwrap().is_none());
}

// ============================================================================
// Encode Tests
// ============================================================================

#[test]
fn encode_writes_reply_verbatim() {
    let mut codec = GatewayCodec::new(FramingScheme::Binary);
    let mut buffer = BytesMut::new();

    codec
        .encode(Reply::from(&[0xEFu8, 0x10, 0x09, 0x09, 0x08][..]), &mut buffer)
        .unwrap();
    assert_eq!(buffer.as_ref(), &[0xEF, 0x10, 0x09, 0x09, 0x08]);
}

#[test]
fn encode_text_ack() {
    let mut codec = GatewayCodec::new(FramingScheme::Text);
    let mut buffer = BytesMut::new();

    codec.encode(codec.ack(), &mut buffer).unwrap();
    assert_eq!(buffer.as_ref(), b"123456789");
}

#[test]
fn encode_appends_to_existing_buffer() {
    let mut codec = GatewayCodec::new(FramingScheme::Binary);
    let mut buffer = BytesMut::new();

    codec.encode(codec.ack(), &mut buffer).unwrap();
    codec.encode(codec.ack(), &mut buffer).unwrap();
    assert_eq!(buffer.len(), BINARY_ACK.len() * 2);
}
