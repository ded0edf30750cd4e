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

//! Peer-keyed connection registry
//!
//! The registry maps peer identifiers (remote address strings) to live
//! connection handles so that out-of-band collaborators can look up a
//! peer's connection and push data to it. It is an explicitly constructed
//! component owned by the server instance, never a process-wide singleton,
//! so independent server instances (and tests) get independent registries.
//!
//! The registry holds non-owning handles: it never closes a connection
//! itself. The owning worker registers on activation and deregisters by
//! identity during teardown.

use crate::GatewayConnection;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// What `register` does when an entry already exists for the peer id.
///
/// `KeepFirst` preserves the historical behavior: a reconnecting peer under
/// the same network-level identifier keeps routing to the stale entry until
/// the old connection is reaped. That is likely a defect for such peers,
/// which is why `Replace` exists as an opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryPolicy {
    /// First registration wins; duplicates are silently ignored
    #[default]
    KeepFirst,
    /// Newest registration wins; the previous entry is replaced
    Replace,
}

/// Concurrent mapping from peer identifier to live connection handle.
pub struct ConnectionRegistry {
    entries: DashMap<String, GatewayConnection>,
    policy: RegistryPolicy,
}

impl ConnectionRegistry {
    /// Create an empty registry with the given duplicate policy
    pub fn new(policy: RegistryPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    /// The duplicate-registration policy in effect
    pub fn policy(&self) -> RegistryPolicy {
        self.policy
    }

    /// Register a connection under its peer identifier.
    ///
    /// Returns `true` if the connection now holds the entry for its peer
    /// id. Under `KeepFirst`, a duplicate registration is a silent no-op
    /// and returns `false`.
    pub fn register(&self, connection: &GatewayConnection) -> bool {
        let peer_id = connection.peer_id().to_string();
        match self.entries.entry(peer_id) {
            Entry::Vacant(vacant) => {
                vacant.insert(connection.clone());
                debug!(peer_id = %connection.peer_id(), id = %connection.id(), "Peer registered");
                true
            }
            Entry::Occupied(mut occupied) => match self.policy {
                RegistryPolicy::KeepFirst => false,
                RegistryPolicy::Replace => {
                    occupied.insert(connection.clone());
                    debug!(peer_id = %connection.peer_id(), id = %connection.id(), "Peer re-registered");
                    true
                }
            },
        }
    }

    /// Look up the registered connection for a peer identifier
    pub fn lookup(&self, peer_id: &str) -> Option<GatewayConnection> {
        self.entries.get(peer_id).map(|entry| entry.value().clone())
    }

    /// Remove the entry holding exactly this connection.
    ///
    /// Removal is by identity, not by key: if a newer connection has since
    /// registered under the same peer identifier, its entry is left alone.
    /// Idempotent; a second call for the same connection returns `false`.
    pub fn remove_by_connection(&self, connection: &GatewayConnection) -> bool {
        let removed = self
            .entries
            .remove_if(connection.peer_id(), |_, value| value.id() == connection.id())
            .is_some();
        if removed {
            debug!(peer_id = %connection.peer_id(), id = %connection.id(), "Peer deregistered");
        }
        removed
    }

    /// Number of registered peers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered peer identifiers
    pub fn peer_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionId;
    use wiregate_codec::FramingScheme;

    async fn connected_pair() -> (tokio::net::TcpStream, tokio::net::TcpStream) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client_task =
            tokio::spawn(async move { tokio::net::TcpStream::connect(addr).await.unwrap() });
        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();
        (server, client)
    }

    async fn test_connection(id: u64) -> (GatewayConnection, tokio::net::TcpStream) {
        let (server, client) = connected_pair().await;
        let connection =
            GatewayConnection::wrap(server, ConnectionId::new(id), FramingScheme::Binary).unwrap();
        (connection, client)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ConnectionRegistry::new(RegistryPolicy::KeepFirst);
        let (connection, _client) = test_connection(1).await;

        assert!(registry.register(&connection));
        assert_eq!(registry.len(), 1);

        let found = registry.lookup(connection.peer_id()).unwrap();
        assert_eq!(found.id(), connection.id());
        assert!(registry.lookup("10.0.0.1:9999").is_none());
    }

    #[tokio::test]
    async fn test_keep_first_ignores_duplicates() {
        let registry = ConnectionRegistry::new(RegistryPolicy::KeepFirst);
        let (first, _c1) = test_connection(1).await;
        assert!(registry.register(&first));

        // Forge a second connection claiming the same peer id by using the
        // first one's registry slot: register must be a silent no-op.
        assert!(!registry.register(&first.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(first.peer_id()).unwrap().id(), first.id());
    }

    #[tokio::test]
    async fn test_remove_by_connection_is_identity_safe() {
        let registry = ConnectionRegistry::new(RegistryPolicy::Replace);
        let (first, _c1) = test_connection(1).await;
        let (second, _c2) = test_connection(2).await;

        registry.register(&first);
        registry.register(&second);
        assert_eq!(registry.len(), 2);

        // Removing the first connection must not disturb the second entry.
        assert!(registry.remove_by_connection(&first));
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(second.peer_id()).is_some());

        // Idempotent: second removal is a no-op.
        assert!(!registry.remove_by_connection(&first));
    }

    #[tokio::test]
    async fn test_remove_never_removes_newer_entry_under_same_key() {
        // Simulate key reuse: under Replace, a newer connection takes over
        // the peer id; removing the older one by identity must leave the
        // newer entry in place.
        let registry = ConnectionRegistry::new(RegistryPolicy::Replace);
        let (old, _c1) = test_connection(1).await;
        registry.register(&old);

        // A replacement handle for the same underlying peer slot with a new
        // identity, as a reconnect would produce.
        let newer = old.with_id(ConnectionId::new(2));
        registry.register(&newer);
        assert_eq!(registry.len(), 1);

        assert!(!registry.remove_by_connection(&old));
        assert_eq!(registry.lookup(old.peer_id()).unwrap().id(), newer.id());

        assert!(registry.remove_by_connection(&newer));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_replace_policy_updates_entry() {
        let registry = ConnectionRegistry::new(RegistryPolicy::Replace);
        let (old, _c1) = test_connection(1).await;
        registry.register(&old);

        let newer = old.with_id(ConnectionId::new(2));
        assert!(registry.register(&newer));
        assert_eq!(registry.lookup(old.peer_id()).unwrap().id(), newer.id());
    }
}
