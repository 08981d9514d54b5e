//! Topic-scoped fan-out to live subscribers.
//!
//! The hub owns the registry of connected clients and their topic
//! subscriptions. It is deliberately decoupled from any socket transport:
//! `connect` hands back a plain message receiver, and whatever layer drains
//! it (WebSocket, SSE, a test) is none of the hub's business. Domain events
//! are wrapped `{type, data, timestamp}` and delivered only to clients
//! subscribed to the matching topic; generic notifications go to everyone.

use crate::event::NoteEvent;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Maximum note content length fanned out on the raw feed.
const NOTE_CONTENT_CAP: usize = 200;

/// Topics a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Completed verification results.
    VerificationResults,
    /// Raw incoming notes (truncated).
    NostrEvents,
    /// Issued zaps.
    LightningZaps,
    /// System statistics updates.
    SystemStats,
}

impl Topic {
    /// Subscription name used by clients.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerificationResults => "verification_results",
            Self::NostrEvents => "nostr_events",
            Self::LightningZaps => "lightning_zaps",
            Self::SystemStats => "system_stats",
        }
    }

    /// Message type emitted on this topic.
    #[must_use]
    pub fn message_type(self) -> &'static str {
        match self {
            Self::VerificationResults => "verification_result",
            Self::NostrEvents => "nostr_event",
            Self::LightningZaps => "lightning_zap",
            Self::SystemStats => "system_stats",
        }
    }

    /// Parse a client-supplied subscription name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "verification_results" => Some(Self::VerificationResults),
            "nostr_events" => Some(Self::NostrEvents),
            "lightning_zaps" => Some(Self::LightningZaps),
            "system_stats" => Some(Self::SystemStats),
            _ => None,
        }
    }
}

/// Identifier for a connected client.
pub type ClientId = u64;

/// Live-feed status summary for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutStatus {
    /// Whether the hub is accepting connections.
    pub initialized: bool,
    /// Currently connected client count.
    pub connected_clients: usize,
}

struct ClientHandle {
    sender: mpsc::UnboundedSender<Value>,
    topics: HashSet<Topic>,
}

/// Registry of live subscribers.
pub struct FanoutHub {
    clients: RwLock<HashMap<ClientId, ClientHandle>>,
    next_id: AtomicU64,
}

impl FanoutHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection. The client starts with no subscriptions and
    /// immediately receives a `connection_established` acknowledgment.
    pub fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        let welcome = json!({
            "type": "connection_established",
            "data": {
                "message": "Connected to nostr-oracle live feed",
                "clientId": id,
            },
            "timestamp": Utc::now().to_rfc3339(),
        });
        let _ = sender.send(welcome);

        self.clients
            .write()
            .insert(id, ClientHandle { sender, topics: HashSet::new() });

        debug!("Client {id} connected");
        (id, receiver)
    }

    /// Remove a connection and its subscriptions.
    pub fn disconnect(&self, id: ClientId) {
        self.clients.write().remove(&id);
        debug!("Client {id} disconnected");
    }

    /// Subscribe a client to the named topics. Unknown names are ignored;
    /// repeat subscriptions are no-ops.
    pub fn subscribe(&self, id: ClientId, event_types: &[String]) {
        let mut clients = self.clients.write();
        if let Some(client) = clients.get_mut(&id) {
            for name in event_types {
                if let Some(topic) = Topic::from_name(name) {
                    client.topics.insert(topic);
                }
            }
        }
    }

    /// Unsubscribe a client from the named topics. Idempotent.
    pub fn unsubscribe(&self, id: ClientId, event_types: &[String]) {
        let mut clients = self.clients.write();
        if let Some(client) = clients.get_mut(&id) {
            for name in event_types {
                if let Some(topic) = Topic::from_name(name) {
                    client.topics.remove(&topic);
                }
            }
        }
    }

    /// Liveness probe: reply with a `pong` on the client's own channel.
    pub fn ping(&self, id: ClientId) {
        let clients = self.clients.read();
        if let Some(client) = clients.get(&id) {
            let _ = client.sender.send(json!({
                "type": "pong",
                "data": { "timestamp": Utc::now().timestamp_millis() },
                "timestamp": Utc::now().to_rfc3339(),
            }));
        }
    }

    /// Publish a domain event to all clients subscribed to `topic`.
    pub fn publish(&self, topic: Topic, data: Value) {
        let envelope = json!({
            "type": topic.message_type(),
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let clients = self.clients.read();
        let mut delivered = 0usize;
        for client in clients.values() {
            if client.topics.contains(&topic) {
                let _ = client.sender.send(envelope.clone());
                delivered += 1;
            }
        }
        debug!("Published {} to {delivered} subscribers", topic.message_type());
    }

    /// Publish a raw note to the live feed, content capped for payload size.
    pub fn publish_note(&self, note: &NoteEvent) {
        self.publish(
            Topic::NostrEvents,
            json!({
                "id": note.id,
                "pubkey": note.pubkey,
                "content": truncate_content(&note.content),
                "kind": note.kind,
                "created_at": note.created_at,
            }),
        );
    }

    /// Broadcast a generic notification to every connection.
    pub fn notify_all(&self, message: &str, level: &str) {
        let envelope = json!({
            "type": "notification",
            "data": {
                "message": message,
                "type": level,
                "id": format!("notif_{}", Utc::now().timestamp_millis()),
            },
            "timestamp": Utc::now().to_rfc3339(),
        });

        let clients = self.clients.read();
        for client in clients.values() {
            let _ = client.sender.send(envelope.clone());
        }
    }

    /// Number of connected clients.
    #[must_use]
    pub fn connected_clients(&self) -> usize {
        self.clients.read().len()
    }

    /// Status summary for the HTTP surface.
    #[must_use]
    pub fn status(&self) -> FanoutStatus {
        FanoutStatus {
            initialized: true,
            connected_clients: self.connected_clients(),
        }
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_content(content: &str) -> String {
    if content.chars().count() <= NOTE_CONTENT_CAP {
        return content.to_string();
    }
    let mut capped: String = content.chars().take(NOTE_CONTENT_CAP).collect();
    capped.push_str("...");
    capped
}
