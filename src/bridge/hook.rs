//! Host introspection hook interface

use std::fmt;

use tokio::sync::mpsc;

/// Identifier of one renderer root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(pub u32);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nodes whose output changed in one commit of one root
#[derive(Debug, Clone)]
pub struct CommitBatch<N> {
    pub root: RootId,
    pub nodes: Vec<N>,
}

/// Sending half handed to the host on subscription
pub type CommitSender<N> = mpsc::UnboundedSender<CommitBatch<N>>;

/// Receiving half kept by the bridge
pub type CommitReceiver<N> = mpsc::UnboundedReceiver<CommitBatch<N>>;

/// Handle for one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookSubscription(pub u64);

/// The host runtime's commit notification hook
pub trait IntrospectionHook<N> {
    /// Start delivering commit batches to `sender`
    fn subscribe(&mut self, sender: CommitSender<N>) -> HookSubscription;

    /// Stop delivering to a subscription
    fn unsubscribe(&mut self, subscription: HookSubscription);

    /// Enable or disable commit notifications for one root
    fn set_notifications_enabled(&mut self, root: RootId, enabled: bool);

    /// Roots currently known to the host
    fn roots(&self) -> Vec<RootId>;
}
