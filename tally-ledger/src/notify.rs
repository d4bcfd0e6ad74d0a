//! Fire-and-forget signals for whoever caches balance state outside the engine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use tally_types::primitives::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChanged {
    pub balance_id: BalanceId,
    pub account: AccountRef,
    pub key: BalanceKey,
    pub asset: AssetCode,
    pub version: u64,
}

/// Called after a balance write has landed. Must not block and cannot fail the write.
pub trait BalanceChangeNotifier: Send + Sync {
    fn balance_changed(&self, event: BalanceChanged);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl BalanceChangeNotifier for NoopNotifier {
    fn balance_changed(&self, _: BalanceChanged) {}
}

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<BalanceChanged>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BalanceChanged> {
        self.sender.subscribe()
    }
}

impl BalanceChangeNotifier for BroadcastNotifier {
    fn balance_changed(&self, event: BalanceChanged) {
        if self.sender.send(event).is_err() {
            tracing::trace!("no balance change subscribers");
        }
    }
}
