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

//! # Wiregate Frame Codec
//!
//! This crate provides the framing layer for the wiregate TCP gateway. It
//! converts inbound raw byte streams into discrete logical [`Frame`]s and
//! converts outbound [`Reply`]s back into bytes on the wire. It is designed
//! to work with asynchronous networking libraries like Tokio and plugs
//! directly into `tokio_util::codec::Framed`.
//!
//! ## Overview
//!
//! Two interchangeable framing schemes are supported, selected per
//! connection via [`FramingScheme`]:
//!
//! - **`Binary`**: every read event yields exactly one opaque frame of raw
//!   bytes. The fixed acknowledgement is the 5-byte sequence
//!   `EF 10 09 09 08` and the post-reply settle delay is 200ms.
//! - **`Text`**: the inbound stream is treated as text. The frame retains
//!   the raw bytes so observability hex rendering is exact even for byte
//!   values above 0x7F; a lossy UTF-8 view is available for consumers. The
//!   fixed acknowledgement is the literal `"123456789"` and the settle
//!   delay is 10s.
//!
//! In both schemes decode accepts any byte sequence as exactly one message
//! and encode always succeeds; framing carries no state from message to
//! message.
//!
//! ## Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use wiregate_codec::{FramingScheme, GatewayCodec};
//!
//! let mut codec = GatewayCodec::new(FramingScheme::Binary);
//! let mut buffer = BytesMut::from(&[0x01u8, 0x02][..]);
//! let frame = codec.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(frame.to_hex(), "0102");
//! ```

mod codec;
mod frame;
mod result;

pub use self::codec::{FramingScheme, GatewayCodec};
pub use self::frame::{Frame, Reply};
pub use self::result::{CodecResult, FrameError};

/// Fixed acknowledgement written for every binary-scheme frame.
pub const BINARY_ACK: [u8; 5] = [0xEF, 0x10, 0x09, 0x09, 0x08];

/// Fixed acknowledgement written for every text-scheme frame.
pub const TEXT_ACK: &[u8] = b"123456789";
