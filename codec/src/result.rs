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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, FrameError>;

/// Represents possible errors that can occur in the framing layer.
///
/// The current framing schemes accept any byte sequence as a well-formed
/// message, so decode never produces `Malformed` today; the variant exists
/// so that a future length- or structure-validated scheme has a defined
/// error path that closes the connection without crashing its worker.
#[derive(Debug)]
pub enum FrameError {
    /// An I/O error occurred while reading from or writing to the
    /// underlying stream.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A frame failed structural validation.
    Malformed {
        /// Description of what was wrong with the frame
        reason: String,
    },
}

impl std::error::Error for FrameError {}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            FrameError::Malformed { reason } => {
                write!(f, "Malformed frame: {}", reason)
            }
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(error: std::io::Error) -> Self {
        FrameError::IOError {
            kind: error.kind(),
            operation: "stream I/O".to_string(),
        }
    }
}
