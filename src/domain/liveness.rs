//! Connection liveness flag.
//!
//! [`Liveness`] wraps a [`tokio::sync::watch`] channel initialized to
//! `true`. The flag only ever moves from `true` to `false`, and it does so
//! at most once. Observers hold a [`LivenessSignal`], which always exposes
//! the latest value, so subscribing after the connection closed still
//! reports `false`.

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::watch;

/// Writer side of the liveness flag, shared by a connection's I/O tasks.
#[derive(Debug)]
pub struct Liveness {
    sender: watch::Sender<bool>,
}

impl Liveness {
    /// Creates a flag in the connected state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(true);
        Self { sender }
    }

    /// Flips the flag to `false`.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// observers are notified exactly once.
    pub fn mark_closed(&self) -> bool {
        self.sender.send_if_modified(|connected| {
            if *connected {
                *connected = false;
                true
            } else {
                false
            }
        })
    }

    /// Returns the current value.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates a new observer handle.
    #[must_use]
    pub fn signal(&self) -> LivenessSignal {
        LivenessSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Liveness {
    // The I/O tasks can be torn down with the runtime before they observe a
    // close; observers must still see `false`.
    fn drop(&mut self) {
        self.mark_closed();
    }
}

/// Read side of the liveness flag with latest-value semantics.
#[derive(Debug, Clone)]
pub struct LivenessSignal {
    receiver: watch::Receiver<bool>,
}

impl LivenessSignal {
    /// Returns `true` while the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the connection is closed. Returns immediately if it
    /// already is.
    pub async fn closed(&self) {
        let mut receiver = self.receiver.clone();
        // An error means the writer is gone, which only happens after close.
        let _ = receiver.wait_for(|connected| !*connected).await;
    }

    /// Converts the signal into a stream that yields the current value
    /// first and then every change.
    ///
    /// The stream ends once the writer side is dropped.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, bool> {
        stream::unfold(
            (self.receiver, true),
            |(mut receiver, first)| async move {
                if !first {
                    receiver.changed().await.ok()?;
                }
                let connected = *receiver.borrow_and_update();
                Some((connected, (receiver, false)))
            },
        )
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn starts_connected() {
        let liveness = Liveness::new();
        assert!(liveness.is_connected());
        assert!(liveness.signal().is_connected());
    }

    #[test]
    fn mark_closed_transitions_once() {
        let liveness = Liveness::new();
        assert!(liveness.mark_closed());
        assert!(!liveness.mark_closed());
        assert!(!liveness.is_connected());
    }

    #[tokio::test]
    async fn late_signal_sees_closed_state() {
        let liveness = Liveness::new();
        liveness.mark_closed();

        let signal = liveness.signal();
        assert!(!signal.is_connected());
        signal.closed().await;

        let mut values = signal.into_stream();
        assert_eq!(values.next().await, Some(false));
    }

    #[tokio::test]
    async fn stream_reports_transition_then_ends_when_writer_drops() {
        let liveness = Liveness::new();
        let mut values = liveness.signal().into_stream();
        assert_eq!(values.next().await, Some(true));

        liveness.mark_closed();
        assert_eq!(values.next().await, Some(false));

        drop(liveness);
        assert_eq!(values.next().await, None);
    }

    #[tokio::test]
    async fn dropping_writer_closes_signal() {
        let liveness = Liveness::new();
        let signal = liveness.signal();
        drop(liveness);
        assert!(!signal.is_connected());
        signal.closed().await;
    }
}
