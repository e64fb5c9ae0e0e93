//! Fan-out feed of normalized inbound payloads.
//!
//! The reader task of a connection owns the only [`InboundFeed`]; consumers
//! obtain streams through a [`FeedSubscriber`]. Every subscriber gets its
//! own unbounded queue, so a slow consumer never loses payloads and never
//! slows the reader down.
//!
//! Payloads published before anyone subscribed are held and handed to the
//! first subscriber. Later subscribers only see payloads published after
//! they subscribed. When the reader task finishes the feed is dropped and
//! every subscriber stream ends after draining what it already queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::mpsc;

#[derive(Debug)]
struct FeedState {
    subscribers: Vec<mpsc::UnboundedSender<Bytes>>,
    /// `Some` until the first subscription takes it.
    backlog: Option<Vec<Bytes>>,
    open: bool,
}

type SharedState = Arc<Mutex<FeedState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishing side of the feed.
#[derive(Debug)]
pub struct InboundFeed {
    state: SharedState,
}

impl InboundFeed {
    /// Creates a feed and the subscriber handle for it.
    #[must_use]
    pub fn new() -> (Self, FeedSubscriber) {
        let state = Arc::new(Mutex::new(FeedState {
            subscribers: Vec::new(),
            backlog: Some(Vec::new()),
            open: true,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            FeedSubscriber { state },
        )
    }

    /// Publishes a payload to all current subscribers, or holds it for the
    /// first one if nobody has subscribed yet.
    ///
    /// Subscribers whose stream was dropped are pruned.
    pub fn publish(&self, payload: Bytes) {
        let mut state = lock(&self.state);
        if let Some(backlog) = state.backlog.as_mut() {
            backlog.push(payload);
            return;
        }
        state
            .subscribers
            .retain(|subscriber| subscriber.send(payload.clone()).is_ok());
    }
}

impl Drop for InboundFeed {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.open = false;
        state.subscribers.clear();
    }
}

/// Hands out subscriber streams for an [`InboundFeed`].
#[derive(Debug)]
pub struct FeedSubscriber {
    state: SharedState,
}

impl FeedSubscriber {
    /// Returns a stream of every payload published after this call. The
    /// first call also yields the payloads held before it.
    ///
    /// The stream ends once the feed is dropped and its queue is drained.
    #[must_use]
    pub fn subscribe(&self) -> BoxStream<'static, Bytes> {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut state = lock(&self.state);
            for payload in state.backlog.take().unwrap_or_default() {
                let _ = sender.send(payload);
            }
            if state.open {
                state.subscribers.push(sender);
            }
        }

        stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|payload| (payload, receiver))
        })
        .boxed()
    }
}
