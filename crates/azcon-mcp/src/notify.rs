//! Tool-list change notifications.
//!
//! The coordinator announces registry growth through this seam so it never
//! depends on the transport. The wire notification is
//! `notifications/tools/list_changed`, emitted by the rmcp peer.

use async_trait::async_trait;
use rmcp::service::{Peer, RoleServer};
use tracing::{debug, warn};

/// Receiver of tool-list change announcements.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn tools_list_changed(&self);
}

/// Discards notifications. Used while no client peer is attached.
pub struct NullNotifier;

#[async_trait]
impl ChangeNotifier for NullNotifier {
    async fn tools_list_changed(&self) {
        debug!("tool list changed (no peer to notify)");
    }
}

/// Forwards notifications to the connected MCP client.
pub struct PeerNotifier {
    peer: Peer<RoleServer>,
}

impl PeerNotifier {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }
}

#[async_trait]
impl ChangeNotifier for PeerNotifier {
    async fn tools_list_changed(&self) {
        if let Err(err) = self.peer.notify_tool_list_changed().await {
            warn!(error = %err, "failed to send tools/list_changed notification");
        }
    }
}
