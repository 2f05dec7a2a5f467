//! Subscription lifecycle over an `IntrospectionHook`

use std::collections::BTreeSet;

use tokio::sync::mpsc::{self, error::TryRecvError};

use super::errors::{BridgeError, BridgeResult};
use super::hook::{CommitBatch, CommitReceiver, HookSubscription, IntrospectionHook, RootId};
use crate::observability::{Event, Logger};

/// Owns the hook subscription and per-root notification flags
pub struct TreeBridge<N, H> {
    hook: H,
    subscription: Option<HookSubscription>,
    receiver: Option<CommitReceiver<N>>,
    enabled_roots: BTreeSet<RootId>,
    /// Roots the caller switched off; `attach` and `sync_roots` leave them off
    muted_roots: BTreeSet<RootId>,
    logger: Logger,
}

impl<N, H: IntrospectionHook<N>> TreeBridge<N, H> {
    /// Create a detached bridge
    pub fn new(hook: H, logger: Logger) -> Self {
        Self {
            hook,
            subscription: None,
            receiver: None,
            enabled_roots: BTreeSet::new(),
            muted_roots: BTreeSet::new(),
            logger,
        }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Roots with notifications currently on
    pub fn enabled_roots(&self) -> Vec<RootId> {
        self.enabled_roots.iter().copied().collect()
    }

    /// Subscribe and enable notifications on every known root
    ///
    /// Returns false if already attached.
    pub fn attach(&mut self) -> bool {
        if self.is_attached() {
            return false;
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscription = Some(self.hook.subscribe(sender));
        self.receiver = Some(receiver);
        self.sync_roots();
        self.logger.info(
            Event::BridgeAttached,
            &[("roots", &self.enabled_roots.len().to_string())],
        );
        true
    }

    /// Disable notifications and unsubscribe
    ///
    /// Returns false if already detached. Batches still queued are dropped.
    pub fn detach(&mut self) -> bool {
        let Some(subscription) = self.subscription.take() else {
            return false;
        };
        for root in std::mem::take(&mut self.enabled_roots) {
            self.hook.set_notifications_enabled(root, false);
        }
        self.hook.unsubscribe(subscription);
        self.receiver = None;
        self.logger.info(Event::BridgeDetached, &[]);
        true
    }

    /// Enable notifications on roots the host learned about since attaching
    pub fn sync_roots(&mut self) {
        if !self.is_attached() {
            return;
        }
        for root in self.hook.roots() {
            if !self.muted_roots.contains(&root) && self.enabled_roots.insert(root) {
                self.hook.set_notifications_enabled(root, true);
            }
        }
    }

    /// Turn notifications on for one root
    pub fn enable_root(&mut self, root: RootId) {
        self.muted_roots.remove(&root);
        if self.is_attached() && self.enabled_roots.insert(root) {
            self.hook.set_notifications_enabled(root, true);
            self.logger.info(
                Event::RootNotifications,
                &[("root", &root.to_string()), ("enabled", "true")],
            );
        }
    }

    /// Turn notifications off for one root
    pub fn disable_root(&mut self, root: RootId) {
        self.muted_roots.insert(root);
        if self.enabled_roots.remove(&root) {
            self.hook.set_notifications_enabled(root, false);
            self.logger.info(
                Event::RootNotifications,
                &[("root", &root.to_string()), ("enabled", "false")],
            );
        }
    }

    /// Next queued batch without waiting
    pub fn try_next_batch(&mut self) -> BridgeResult<Option<CommitBatch<N>>> {
        let receiver = self.receiver.as_mut().ok_or(BridgeError::Detached)?;
        match receiver.try_recv() {
            Ok(batch) => Ok(Some(batch)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BridgeError::ChannelClosed),
        }
    }

    /// Wait for the next batch
    pub async fn next_batch(&mut self) -> BridgeResult<CommitBatch<N>> {
        let receiver = self.receiver.as_mut().ok_or(BridgeError::Detached)?;
        receiver.recv().await.ok_or(BridgeError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugVerbosity;
    use crate::host::{MemoryHost, NodeSpec};

    fn bridge() -> (MemoryHost, TreeBridge<crate::host::MemoryNode, MemoryHost>) {
        let host = MemoryHost::new();
        host.mount(NodeSpec::view(1, "RCTView"));
        let bridge = TreeBridge::new(host.clone(), Logger::new(DebugVerbosity::Off));
        (host, bridge)
    }

    #[test]
    fn test_attach_enables_known_roots() {
        let (host, mut bridge) = bridge();
        assert!(!host.notifications_enabled(RootId(0)));
        assert!(bridge.attach());
        assert!(!bridge.attach());
        assert!(host.notifications_enabled(RootId(0)));
        assert_eq!(host.subscriber_count(), 1);
    }

    #[test]
    fn test_detach_disables_and_unsubscribes() {
        let (host, mut bridge) = bridge();
        bridge.attach();
        assert!(bridge.detach());
        assert!(!bridge.detach());
        assert!(!host.notifications_enabled(RootId(0)));
        assert_eq!(host.subscriber_count(), 0);
        assert_eq!(bridge.try_next_batch().unwrap_err(), BridgeError::Detached);
    }

    #[test]
    fn test_batches_flow_through() {
        let (host, mut bridge) = bridge();
        bridge.attach();
        let node = host.current(crate::host::NodeTag(1)).unwrap();
        host.commit(RootId(0), vec![node]);

        let batch = bridge.try_next_batch().unwrap().unwrap();
        assert_eq!(batch.nodes, vec![node]);
        assert!(bridge.try_next_batch().unwrap().is_none());
    }

    #[test]
    fn test_disabled_root_stays_muted_across_sync() {
        let (host, mut bridge) = bridge();
        bridge.attach();
        bridge.disable_root(RootId(0));
        bridge.sync_roots();
        assert!(!host.notifications_enabled(RootId(0)));

        bridge.enable_root(RootId(0));
        assert!(host.notifications_enabled(RootId(0)));
    }

    #[test]
    fn test_sync_picks_up_new_roots() {
        let (host, mut bridge) = bridge();
        bridge.attach();
        host.mount(NodeSpec::view(2, "RCTView").root(RootId(7)));
        bridge.sync_roots();
        assert!(host.notifications_enabled(RootId(7)));
        assert_eq!(bridge.enabled_roots(), vec![RootId(0), RootId(7)]);
    }

    #[tokio::test]
    async fn test_next_batch_waits() {
        let (host, mut bridge) = bridge();
        bridge.attach();
        let node = host.current(crate::host::NodeTag(1)).unwrap();
        host.commit(RootId(0), vec![node, node]);
        let batch = bridge.next_batch().await.unwrap();
        assert_eq!(batch.nodes.len(), 2);
    }
}
