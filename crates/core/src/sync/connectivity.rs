//! Host connectivity signal.

use log::info;
use tokio::sync::watch;

/// Single authoritative "is the host online" flag.
///
/// No debouncing is applied: every flip is visible to gateways immediately
/// and every offline→online transition wakes subscribers.
pub trait ConnectivityMonitor: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receiver that observes every change of the flag.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity flag driven by the host's network-status primitive.
#[derive(Debug)]
pub struct ConnectivityState {
    sender: watch::Sender<bool>,
}

impl ConnectivityState {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self { sender }
    }

    /// Records a network-status change reported by the host.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            info!(
                "[Connectivity] Host is now {}",
                if online { "online" } else { "offline" }
            );
        }
    }
}

impl ConnectivityMonitor for ConnectivityState {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
