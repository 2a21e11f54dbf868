//! Subscription handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity of one subscription. Ids grow with registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Handle controlling one subscription.
///
/// Clones share state. Cancelling only affects events not yet delivered, so
/// a handler may cancel its own token and still finish the current call.
#[derive(Clone, Debug)]
pub struct HandlerToken {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
}

impl HandlerToken {
    pub(crate) fn new(id: SubscriptionId) -> Self {
        Self {
            id,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Subscription this token controls.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops delivery. Returns `true` if the subscription was active.
    pub fn cancel(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Restarts delivery. Returns `true` if the subscription was cancelled.
    pub fn resume(&self) -> bool {
        !self.active.swap(true, Ordering::AcqRel)
    }

    /// True while events are delivered.
    #[must_use]
    pub fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_resume() {
        let token = HandlerToken::new(SubscriptionId(7));
        let clone = token.clone();
        assert!(token.active());
        assert!(clone.cancel());
        assert!(!token.active());
        assert!(!token.cancel());
        assert!(token.resume());
        assert!(!clone.resume());
        assert!(clone.active());
        assert_eq!(token.id().to_string(), "sub#7");
    }
}
