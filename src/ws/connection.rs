//! WebSocket connection adapter.
//!
//! [`WebSocketConnection`] owns one upgraded socket and presents it as a
//! duplex byte channel:
//!
//! - a reader task normalizes inbound binary and text frames into the
//!   [`InboundFeed`] and flips [`Liveness`] when the socket closes;
//! - a writer task drains an unbounded queue of outbound payloads and
//!   writes each one as a binary frame.
//!
//! Both tasks are spawned by the constructor, so nothing the peer sends can
//! arrive before it is observed. Neither task ever panics or propagates an
//! error; failures end up as a dropped frame or as liveness going `false`.

use std::fmt::Display;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use super::frame::{self, Inbound};
use crate::domain::{ConnectionId, FeedSubscriber, InboundFeed, Liveness, LivenessSignal};
use crate::engine::Connection;

/// Consecutive undecodable frames after which the transport is considered
/// dead.
const MAX_CONSECUTIVE_MALFORMED: u32 = 16;

/// Work item for the writer task.
#[derive(Debug)]
enum Outbound {
    Frame(Bytes),
    Close,
}

/// Duplex byte channel over one WebSocket.
///
/// Implements [`Connection`]; the synchronization engine only ever sees it
/// through that trait.
#[derive(Debug)]
pub struct WebSocketConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    feed: FeedSubscriber,
    liveness: Arc<Liveness>,
}

impl WebSocketConnection {
    /// Wraps an upgraded axum socket.
    ///
    /// Payloads read before the first [`Connection::receive`] call are held
    /// for that first subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self::from_parts(sink, stream)
    }

    /// Wraps the two halves of a message transport.
    ///
    /// Any item error on `stream` is treated as a malformed frame.
    #[must_use]
    pub fn from_parts<Si, St, E>(sink: Si, stream: St) -> Self
    where
        Si: Sink<Message> + Send + Unpin + 'static,
        Si::Error: Display + Send,
        St: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: Display + 'static,
    {
        let id = ConnectionId::new();
        let liveness = Arc::new(Liveness::new());
        let (feed, subscriber) = InboundFeed::new();
        let (outbound, queue) = mpsc::unbounded_channel();

        tokio::spawn(read_frames(id, stream, feed, Arc::clone(&liveness)));
        tokio::spawn(write_frames(id, sink, queue, liveness.signal()));
        tracing::debug!(connection_id = %id, "connection adapter started");

        Self {
            id,
            outbound,
            feed: subscriber,
            liveness,
        }
    }
}

impl Connection for WebSocketConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.liveness.is_connected()
    }

    fn liveness(&self) -> LivenessSignal {
        self.liveness.signal()
    }

    fn send(&self, data: Bytes) {
        // Fails only once the writer is gone, i.e. the socket is closed.
        let _ = self.outbound.send(Outbound::Frame(data));
    }

    fn disconnect(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    fn receive(&self) -> BoxStream<'static, Bytes> {
        self.feed.subscribe()
    }
}

/// Reads frames until the transport ends, publishing data payloads.
async fn read_frames<St, E>(
    connection_id: ConnectionId,
    mut stream: St,
    feed: InboundFeed,
    liveness: Arc<Liveness>,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut malformed_run = 0u32;

    while let Some(item) = stream.next().await {
        match frame::normalize(item) {
            Inbound::Payload(payload) => {
                malformed_run = 0;
                if liveness.is_connected() {
                    feed.publish(payload);
                }
            }
            Inbound::Control => malformed_run = 0,
            Inbound::Closed => {
                // Keep polling so the transport can finish the close handshake.
                if liveness.mark_closed() {
                    tracing::debug!(%connection_id, "peer closed connection");
                }
            }
            Inbound::Malformed(reason) => {
                malformed_run = malformed_run.saturating_add(1);
                tracing::debug!(%connection_id, %reason, "dropping malformed frame");
                if malformed_run >= MAX_CONSECUTIVE_MALFORMED {
                    tracing::warn!(%connection_id, "too many malformed frames; treating transport as closed");
                    break;
                }
            }
        }
    }

    if liveness.mark_closed() {
        tracing::debug!(%connection_id, "transport ended");
    }
}

/// Writes queued payloads as binary frames until the connection closes,
/// a local close is requested, or every adapter handle is dropped.
async fn write_frames<Si>(
    connection_id: ConnectionId,
    mut sink: Si,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    liveness: LivenessSignal,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    loop {
        tokio::select! {
            biased;
            command = queue.recv() => match command {
                Some(Outbound::Frame(payload)) => {
                    if let Err(error) = sink.send(Message::Binary(payload)).await {
                        // A sink that failed must not be polled again.
                        tracing::debug!(%connection_id, %error, "failed to write frame");
                        return;
                    }
                }
                Some(Outbound::Close) => {
                    tracing::debug!(%connection_id, "local disconnect requested");
                    break;
                }
                None => break,
            },
            () = liveness.closed() => break,
        }
    }

    let close = Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: Utf8Bytes::from_static(""),
    }));
    match sink.send(close).await {
        Ok(()) => {
            let _ = sink.close().await;
        }
        Err(error) => tracing::debug!(%connection_id, %error, "failed to write close frame"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for driving a [`WebSocketConnection`] in tests.

    use std::sync::Arc;

    use axum::extract::ws::Message;
    use futures_util::{StreamExt, sink, stream};
    use tokio::sync::mpsc;

    use super::WebSocketConnection;

    /// Peer side of an in-memory connection.
    pub(crate) struct Harness {
        /// Frames (or transport errors) the peer "sends" to the adapter.
        pub(crate) peer_tx: mpsc::UnboundedSender<Result<Message, String>>,
        /// Frames the adapter wrote to the peer.
        pub(crate) peer_rx: mpsc::UnboundedReceiver<Message>,
        /// The adapter under test.
        pub(crate) connection: Arc<WebSocketConnection>,
    }

    /// Builds an adapter over unbounded channels. Dropping `peer_tx` ends
    /// the inbound stream like an abrupt disconnect.
    pub(crate) fn in_memory() -> Harness {
        let (peer_tx, inbound) = mpsc::unbounded_channel::<Result<Message, String>>();
        let (outbound, peer_rx) = mpsc::unbounded_channel::<Message>();

        let stream = stream::unfold(inbound, |mut inbound| async move {
            inbound.recv().await.map(|item| (item, inbound))
        })
        .boxed();
        let sink = Box::pin(sink::unfold(outbound, |outbound, message: Message| async move {
            outbound
                .send(message)
                .map_err(|_| "peer dropped".to_string())?;
            Ok::<_, String>(outbound)
        }));

        Harness {
            peer_tx,
            peer_rx,
            connection: Arc::new(WebSocketConnection::from_parts(sink, stream)),
        }
    }
}
