//! Session registry
//!
//! Concurrent map of session key to its live connections. Shared by all
//! request handlers and generation tasks in the process; constructed per
//! process (or per test) and torn down with it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use chat_core::{ChatConfig, ChatEvent};

use crate::connection::{Connection, ConnectionHandle, Envelope};

#[derive(Default)]
struct SessionEntry {
    connections: Vec<Arc<Connection>>,
}

pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    keepalive: Duration,
    ping_interval: Duration,
    pong_grace: Duration,
}

impl SessionRegistry {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            keepalive: config.keepalive_interval(),
            ping_interval: config.ping_interval(),
            pong_grace: Duration::from_secs(config.pong_grace_secs),
        }
    }

    /// Open a connection under `session_key`. The connection immediately
    /// receives a `connected` acknowledgment in its own queue only.
    pub fn register(&self, session_key: &str) -> ConnectionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Connection::new(Uuid::new_v4(), tx));
        let connection_id = connection.id;

        self.sessions
            .entry(session_key.to_string())
            .or_default()
            .connections
            .push(connection.clone());

        connection.send(Envelope::Event(ChatEvent::Connected {
            session_key: session_key.to_string(),
        }));

        log::info!("[{}] connection {} registered", session_key, connection_id);

        ConnectionHandle {
            session_key: session_key.to_string(),
            connection_id,
            receiver: rx,
            keepalive: self.keepalive,
        }
    }

    /// Multicast an event to every live connection of the session.
    /// Returns how many queues accepted it. Connections whose delivery
    /// loop is gone are pruned on the way.
    pub fn broadcast(&self, session_key: &str, event: ChatEvent) -> usize {
        let Some(mut entry) = self.sessions.get_mut(session_key) else {
            return 0;
        };

        let mut delivered = 0;
        entry.connections.retain(|conn| {
            if conn.send(Envelope::Event(event.clone())) {
                delivered += 1;
                true
            } else {
                log::debug!("[{}] pruning dead connection {}", session_key, conn.id);
                false
            }
        });

        let now_empty = entry.connections.is_empty();
        drop(entry);
        if now_empty {
            self.sessions
                .remove_if(session_key, |_, entry| entry.connections.is_empty());
        }

        delivered
    }

    /// Push an event to a single connection of the session.
    pub fn send_to(&self, session_key: &str, connection_id: Uuid, event: ChatEvent) -> bool {
        self.with_connection(session_key, connection_id, |conn| {
            conn.send(Envelope::Event(event))
        })
        .unwrap_or(false)
    }

    /// Pong side channel, keyed by session: refreshes the liveness stamp
    /// of every connection currently in the session.
    pub fn record_pong(&self, session_key: &str) -> bool {
        let Some(entry) = self.sessions.get(session_key) else {
            return false;
        };
        for conn in &entry.connections {
            conn.mark_pong();
        }
        true
    }

    /// Remove one connection; the session entry goes with it when the
    /// list empties. Sibling connections are untouched.
    pub fn remove_connection(&self, session_key: &str, connection_id: Uuid) {
        let removed = {
            let Some(mut entry) = self.sessions.get_mut(session_key) else {
                return;
            };
            let before = entry.connections.len();
            entry.connections.retain(|c| c.id != connection_id);
            before != entry.connections.len()
        };

        if removed {
            log::info!("[{}] connection {} removed", session_key, connection_id);
        }
        self.sessions
            .remove_if(session_key, |_, entry| entry.connections.is_empty());
    }

    /// Push the close sentinel to every connection of the session and
    /// drop the entry. Each delivery loop drains its queue and exits.
    pub fn close_session(&self, session_key: &str) -> usize {
        let Some((_, entry)) = self.sessions.remove(session_key) else {
            return 0;
        };
        let mut closed = 0;
        for conn in &entry.connections {
            if conn.send(Envelope::Close) {
                closed += 1;
            }
        }
        log::info!("[{}] session closed ({} connections)", session_key, closed);
        closed
    }

    pub fn has_session(&self, session_key: &str) -> bool {
        self.sessions.contains_key(session_key)
    }

    pub fn connection_count(&self, session_key: &str) -> usize {
        self.sessions
            .get(session_key)
            .map(|e| e.connections.len())
            .unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn with_connection<T>(
        &self,
        session_key: &str,
        connection_id: Uuid,
        f: impl FnOnce(&Arc<Connection>) -> T,
    ) -> Option<T> {
        let entry = self.sessions.get(session_key)?;
        let conn = entry.connections.iter().find(|c| c.id == connection_id)?;
        Some(f(conn))
    }

}

/// Periodic liveness probe for one connection: send a ping, give the
/// client `pong_grace` to answer through the pong side channel, and tear
/// down this one connection when no pong arrives. Detects transports
/// that died without either side noticing.
pub fn spawn_liveness_probe(
    registry: Arc<SessionRegistry>,
    session_key: String,
    connection_id: Uuid,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(registry.ping_interval).await;

            let ping_sent = Instant::now();
            let alive = registry.send_to(
                &session_key,
                connection_id,
                ChatEvent::Ping {
                    timestamp: Utc::now().timestamp_millis(),
                },
            );
            if !alive {
                registry.remove_connection(&session_key, connection_id);
                break;
            }

            tokio::time::sleep(registry.pong_grace).await;

            let last_pong =
                registry.with_connection(&session_key, connection_id, |c| c.last_pong());
            match last_pong {
                None => break,
                Some(last) if last < ping_sent => {
                    log::warn!(
                        "[{}] connection {} missed pong window, closing",
                        session_key,
                        connection_id
                    );
                    let _ = registry.with_connection(&session_key, connection_id, |c| {
                        c.send(Envelope::Close)
                    });
                    registry.remove_connection(&session_key, connection_id);
                    break;
                }
                Some(_) => {}
            }
        }
    })
}
