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

//! Server and idle-monitor configuration
//!
//! All values arrive here already resolved; this core does no file or
//! environment loading of its own. The demos show wiring from the process
//! environment.
//!
//! # Example
//!
//! ```
//! use wiregate_service::{FramingScheme, IdleConfig, ServerConfig};
//! use std::time::Duration;
//!
//! let config = ServerConfig::new("0.0.0.0:7000".parse().unwrap())
//!     .with_framing(FramingScheme::Binary)
//!     .with_idle(IdleConfig::default().with_read_idle(Some(Duration::from_secs(120))));
//! ```

use crate::registry::RegistryPolicy;
use std::net::SocketAddr;
use std::time::Duration;
use wiregate_codec::FramingScheme;

/// Normalize a threshold: a zero duration disables the timer entirely.
fn normalize(threshold: Option<Duration>) -> Option<Duration> {
    threshold.filter(|d| !d.is_zero())
}

/// Per-direction idle thresholds for a connection.
///
/// A threshold of `None` (or a zero duration, normalized to `None`) never
/// fires. Only the read-idle threshold triggers forced closure; write-idle
/// and all-idle are part of the contract but disabled by default, matching
/// the protocol's current behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    /// Close the connection after this long without inbound data
    pub read_idle: Option<Duration>,
    /// Tracked on writes; no closure behavior is attached
    pub write_idle: Option<Duration>,
    /// Defined for contract completeness; disabled
    pub all_idle: Option<Duration>,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            read_idle: Some(Duration::from_secs(300)),
            write_idle: None,
            all_idle: None,
        }
    }
}

impl IdleConfig {
    /// All thresholds disabled; connections are never reaped for idleness.
    pub fn disabled() -> Self {
        Self {
            read_idle: None,
            write_idle: None,
            all_idle: None,
        }
    }

    /// Set the read-idle threshold (zero disables)
    pub fn with_read_idle(mut self, threshold: Option<Duration>) -> Self {
        self.read_idle = normalize(threshold);
        self
    }

    /// Set the write-idle threshold (zero disables)
    pub fn with_write_idle(mut self, threshold: Option<Duration>) -> Self {
        self.write_idle = normalize(threshold);
        self
    }

    /// Set the all-idle threshold (zero disables)
    pub fn with_all_idle(mut self, threshold: Option<Duration>) -> Self {
        self.all_idle = normalize(threshold);
        self
    }
}

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listening socket to
    pub bind_address: SocketAddr,

    /// Listen backlog
    pub backlog: u32,

    /// Enable SO_KEEPALIVE on the listening socket
    pub keepalive: bool,

    /// Disable Nagle's algorithm on accepted sockets
    pub nodelay: bool,

    /// Maximum number of simultaneous connections
    pub max_connections: usize,

    /// Framing scheme spoken by accepted connections
    pub framing: FramingScheme,

    /// Idle thresholds applied to every connection
    pub idle: IdleConfig,

    /// Duplicate-registration policy for the connection registry
    pub registry_policy: RegistryPolicy,

    /// Control channel buffer size per connection
    pub control_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7000".parse().expect("static address"),
            backlog: 128,
            keepalive: true,
            nodelay: true,
            max_connections: 10_000,
            framing: FramingScheme::Binary,
            idle: IdleConfig::default(),
            registry_policy: RegistryPolicy::KeepFirst,
            control_buffer_size: 100,
        }
    }
}

impl ServerConfig {
    /// Create a configuration bound to the given address
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Enable or disable SO_KEEPALIVE
    pub fn with_keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }

    /// Enable or disable TCP_NODELAY on accepted sockets
    pub fn with_nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Set the connection limit
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the framing scheme
    pub fn with_framing(mut self, framing: FramingScheme) -> Self {
        self.framing = framing;
        self
    }

    /// Set the idle thresholds
    pub fn with_idle(mut self, idle: IdleConfig) -> Self {
        self.idle = idle;
        self
    }

    /// Set the registry duplicate policy
    pub fn with_registry_policy(mut self, policy: RegistryPolicy) -> Self {
        self.registry_policy = policy;
        self
    }

    /// Set the per-connection control channel buffer size
    pub fn with_control_buffer_size(mut self, size: usize) -> Self {
        self.control_buffer_size = size;
        self
    }
}
