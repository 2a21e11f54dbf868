//! One-shot completion slots.
//!
//! A [`Pending`] is a plain [`Future`]: the tick thread completes it, any
//! executor (or a polling loop using [`Pending::try_take`]) consumes it.
//! Completion never blocks and a slot resolves at most once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    completed: bool,
    waker: Option<Waker>,
}

/// Consumer half of a one-shot slot.
#[derive(Debug)]
pub struct Pending<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

/// Producer half of a one-shot slot.
#[derive(Debug)]
pub struct Completer<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

/// Creates a connected completer/pending pair.
#[must_use]
pub fn channel<T>() -> (Completer<T>, Pending<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        completed: false,
        waker: None,
    }));
    (
        Completer {
            slot: Arc::clone(&slot),
        },
        Pending { slot },
    )
}

impl<T> Completer<T> {
    /// Resolves the slot and wakes its consumer.
    pub fn complete(self, value: T) {
        let waker = {
            let mut slot = self.slot.lock();
            slot.value = Some(value);
            slot.completed = true;
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// True if the consumer was dropped; completing is then pointless.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.slot) == 1
    }
}

impl<T> Pending<T> {
    /// A slot that is already resolved.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let (completer, pending) = channel();
        completer.complete(value);
        pending
    }

    /// True once the slot has been resolved, even if the value was taken.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slot.lock().completed
    }

    /// Takes the value if it has arrived.
    pub fn try_take(&mut self) -> Option<T> {
        self.slot.lock().value.take()
    }
}

impl<T> Future for Pending<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.lock();
        match slot.value.take() {
            Some(value) => Poll::Ready(value),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_poll_then_complete_wakes() {
        let (completer, mut pending) = channel::<u32>();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut pending).poll(&mut cx).is_pending());
        completer.complete(42);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(Pin::new(&mut pending).poll(&mut cx), Poll::Ready(42));
        assert!(pending.is_complete());
    }

    #[test]
    fn test_try_take_once() {
        let mut pending = Pending::ready("done");
        assert_eq!(pending.try_take(), Some("done"));
        assert_eq!(pending.try_take(), None);
    }

    #[test]
    fn test_abandoned() {
        let (completer, pending) = channel::<()>();
        assert!(!completer.is_abandoned());
        drop(pending);
        assert!(completer.is_abandoned());
    }
}
