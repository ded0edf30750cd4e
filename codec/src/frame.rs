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

use bytes::Bytes;
use std::borrow::Cow;

/// A single decoded inbound message.
///
/// A `Frame` always carries the raw bytes as they arrived on the wire,
/// regardless of the active framing scheme. The text scheme layers a lossy
/// UTF-8 view on top via [`Frame::as_text`]; the hex rendering used for
/// observability is always computed over the raw bytes, so byte values
/// above 0x7F render correctly (0x9F renders as `"9F"`, never a truncated
/// or sign-mangled form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Create a frame from raw payload bytes.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Render the payload as uppercase hexadecimal for observability.
    ///
    /// Each byte becomes exactly two characters, zero-padded for values
    /// below 0x10.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.payload.len() * 2);
        for byte in self.payload.iter() {
            out.push_str(&format!("{:02X}", byte));
        }
        out
    }

    /// View the payload as text, replacing invalid UTF-8 sequences.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<&[u8]> for Frame {
    fn from(payload: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(payload))
    }
}

/// A single outbound response payload, written verbatim to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    payload: Bytes,
}

impl Reply {
    /// Create a reply from payload bytes.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// The reply payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl From<Bytes> for Reply {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<&[u8]> for Reply {
    fn from(payload: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(payload))
    }
}

impl From<&str> for Reply {
    fn from(payload: &str) -> Self {
        Self::new(Bytes::copy_from_slice(payload.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rendering() {
        let frame = Frame::from(&[0x01u8, 0x02][..]);
        assert_eq!(frame.to_hex(), "0102");
    }

    #[test]
    fn test_hex_rendering_high_bytes() {
        // Bytes above 0x7F must render as two full uppercase digits.
        let frame = Frame::from(&[0x9Fu8, 0xEF, 0x00, 0xFF][..]);
        assert_eq!(frame.to_hex(), "9FEF00FF");
    }

    #[test]
    fn test_text_view_lossy() {
        let frame = Frame::from(&b"ping\x9F"[..]);
        assert_eq!(frame.to_hex(), "70696E679F");
        assert!(frame.as_text().starts_with("ping"));
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::from(&[][..]);
        assert!(frame.is_empty());
        assert_eq!(frame.to_hex(), "");
    }
}
