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

use super::{BINARY_ACK, Frame, FrameError, Reply, TEXT_ACK};
use bytes::{BufMut, BytesMut};
use std::time::Duration;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Which framing scheme a connection speaks.
///
/// Selected at connection-setup time; both variants are served by the same
/// [`GatewayCodec`] rather than separate codec types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingScheme {
    /// Binary passthrough: one opaque raw-byte message per read event,
    /// acknowledged with the fixed 5-byte sequence `EF 10 09 09 08`.
    Binary,
    /// Text framing: inbound treated as text (raw bytes retained for exact
    /// hex rendering), acknowledged with the literal `"123456789"`.
    Text,
}

impl FramingScheme {
    /// The fixed acknowledgement payload for this scheme.
    pub fn ack(&self) -> Reply {
        match self {
            FramingScheme::Binary => Reply::from(&BINARY_ACK[..]),
            FramingScheme::Text => Reply::from(TEXT_ACK),
        }
    }

    /// The post-reply settle delay for this scheme.
    ///
    /// The exchange is not considered complete until this delay has
    /// elapsed. It must be scheduled as a deferred timer, never a
    /// thread-blocking sleep.
    pub fn settle_delay(&self) -> Duration {
        match self {
            FramingScheme::Binary => Duration::from_millis(200),
            FramingScheme::Text => Duration::from_secs(10),
        }
    }
}

impl std::fmt::Display for FramingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramingScheme::Binary => write!(f, "binary"),
            FramingScheme::Text => write!(f, "text"),
        }
    }
}

/// A codec for the gateway wire protocol, providing functionality to decode
/// inbound byte streams into [`Frame`]s and encode outbound [`Reply`]s.
///
/// `GatewayCodec` treats each read event as exactly one message boundary:
/// whatever bytes are available in the read buffer when `decode` is called
/// become one frame. No length-prefix framing is applied at this layer and
/// no state is carried between messages.
///
/// This struct is typically paired with `tokio_util::codec::Framed` to
/// facilitate stream I/O management for a gateway connection.
#[derive(Debug, Clone)]
pub struct GatewayCodec {
    scheme: FramingScheme,
}

impl GatewayCodec {
    /// Creates a new `GatewayCodec` speaking the given framing scheme.
    ///
    /// # Example
    /// ```
    /// use wiregate_codec::{FramingScheme, GatewayCodec};
    ///
    /// let codec = GatewayCodec::new(FramingScheme::Binary);
    /// ```
    pub fn new(scheme: FramingScheme) -> GatewayCodec {
        GatewayCodec { scheme }
    }

    /// The framing scheme this codec speaks.
    pub fn scheme(&self) -> FramingScheme {
        self.scheme
    }

    /// The fixed acknowledgement payload for this codec's scheme.
    pub fn ack(&self) -> Reply {
        self.scheme.ack()
    }

    /// The post-reply settle delay for this codec's scheme.
    pub fn settle_delay(&self) -> Duration {
        self.scheme.settle_delay()
    }
}

impl Default for GatewayCodec {
    fn default() -> Self {
        GatewayCodec::new(FramingScheme::Binary)
    }
}

impl Decoder for GatewayCodec {
    type Item = Frame;
    type Error = FrameError;

    /// Decodes all bytes currently available in `src` into exactly one
    /// [`Frame`].
    ///
    /// Every byte sequence is accepted as a well-formed message; an empty
    /// buffer yields `Ok(None)` so the transport reads more data. This
    /// matches the protocol contract that each underlying read event
    /// produces one message boundary.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let payload = src.split_to(src.len()).freeze();
        trace!(
            scheme = %self.scheme,
            length = payload.len(),
            "Decoded inbound frame"
        );
        Ok(Some(Frame::new(payload)))
    }
}

impl Encoder<Reply> for GatewayCodec {
    type Error = FrameError;

    /// Writes the reply payload verbatim. Always succeeds.
    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item.payload());
        Ok(())
    }
}
