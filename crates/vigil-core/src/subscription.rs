//! Cancellation handles for push-style subscriptions
//!
//! Every subscribe operation in Vigil hands the consumer a
//! [`SubscriptionHandle`] and the producer a [`CancelSignal`]. Cancelling is
//! idempotent and also happens when the handle is dropped, so a forgotten
//! unsubscribe cannot leave a producer running.

use tokio::sync::watch;

/// Consumer side of a subscription; cancels the producer on `cancel` or drop
#[derive(Debug)]
pub struct SubscriptionHandle {
    shutdown: watch::Sender<bool>,
}

/// Producer side of a subscription; observes cancellation
#[derive(Debug, Clone)]
pub struct CancelSignal {
    shutdown: watch::Receiver<bool>,
}

impl SubscriptionHandle {
    /// Create a linked handle/signal pair
    pub fn new() -> (Self, CancelSignal) {
        let (shutdown, rx) = watch::channel(false);
        (Self { shutdown }, CancelSignal { shutdown: rx })
    }

    /// Cancel the subscription.
    ///
    /// Returns `true` only for the call that actually performed the
    /// cancellation; later calls are no-ops returning `false`.
    pub fn cancel(&self) -> bool {
        !self.shutdown.send_replace(true)
    }

    /// Whether the subscription has been cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Another signal observing this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            shutdown: self.shutdown.subscribe(),
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl CancelSignal {
    /// Whether the owning handle has cancelled (or been dropped)
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Resolve once the owning handle cancels or is dropped
    pub async fn cancelled(&mut self) {
        loop {
            if *self.shutdown.borrow_and_update() {
                return;
            }
            if self.shutdown.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let (handle, signal) = SubscriptionHandle::new();
        assert!(!signal.is_cancelled());
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_cancelled());
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_handle_resolves_signal() {
        let (handle, mut signal) = SubscriptionHandle::new();
        drop(handle);
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn late_signal_sees_earlier_cancel() {
        let (handle, _signal) = SubscriptionHandle::new();
        handle.cancel();
        let mut late = handle.signal();
        late.cancelled().await;
    }
}
