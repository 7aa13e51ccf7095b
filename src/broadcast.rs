//! Broadcast fan-out
//!
//! Delivers one message to every registered connection except an optional
//! excluded sender.

use tracing::{debug, warn};

use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::ClientId;

/// Queue `msg` for every registered connection except `exclude`
///
/// Returns how many recipients accepted the message. A recipient whose
/// queue is closed or full is logged and skipped; delivery to the others
/// continues, and the registry is left untouched (the failing connection's
/// own handler takes care of its removal).
pub fn broadcast(registry: &Registry, msg: &ServerMessage, exclude: Option<ClientId>) -> usize {
    let recipients = registry.snapshot_for_broadcast();
    let mut delivered = 0;

    for conn in recipients.iter().filter(|c| Some(c.id) != exclude) {
        if !conn.is_alive() {
            // Writer already gone; its handler is about to unregister it
            debug!("Skipping closed connection {} ({})", conn.nickname, conn.id);
            continue;
        }

        match conn.send(msg.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(
                    "Broadcast to {} ({}) failed: {}",
                    conn.nickname, conn.id, e
                );
            }
        }
    }

    debug!(
        "Broadcast {:?} from {:?} delivered to {}/{} connections",
        msg.delivery(),
        msg.sender().map(|n| n.as_str()),
        delivered,
        recipients.len()
    );
    delivered
}
