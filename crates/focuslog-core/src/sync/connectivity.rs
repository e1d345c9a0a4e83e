//! Connectivity seam.
//!
//! Reachability detection itself lives with the platform; this module only
//! carries the online/offline signal into the scheduler.

use tokio::sync::watch;

/// Read side of the connectivity signal.
pub trait Connectivity: Send + Sync {
    /// Current online state.
    fn is_online(&self) -> bool;

    /// Subscribe to online/offline edges.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Watch-channel backed monitor. The platform reachability callback (or a
/// test) feeds it through [`ConnectivityMonitor::set_online`].
#[derive(Debug)]
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self { sender }
    }

    /// Record a connectivity change. Duplicate reports are dropped so
    /// subscribers only ever see edges.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
