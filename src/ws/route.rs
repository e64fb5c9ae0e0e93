//! Sync route: WebSocket upgrade, initial snapshot and engine handover.
//!
//! For every accepted request the route:
//!
//! 1. runs the [`UpgradeGuard`] (rejection → HTTP error, no upgrade);
//! 2. upgrades and asks the [`ValueProducer`] for the value;
//! 3. encodes the initial snapshot with the [`Codec`];
//! 4. wraps the socket in a [`WebSocketConnection`] and sends the snapshot
//!    as the first binary frame;
//! 5. hands value and connection to the [`SyncEngine`] and registers the
//!    returned handle in the [`ConnectionRegistry`] until the socket closes.
//!
//! If step 2 or 3 fails the socket is closed with [`SyncError::close_code`]
//! and nothing else is sent.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::SinkExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::connection::WebSocketConnection;
use super::upgrade::{AllowAll, UpgradeContext, UpgradeGuard, ValueProducer};
use crate::codec::{Codec, JsonCodec};
use crate::domain::{ConnectionRegistry, RegisteredConnection};
use crate::engine::{Connection, SyncEngine};
use crate::error::SyncError;

/// Builder and request state for one sync endpoint.
pub struct SyncRoute<V> {
    path: String,
    max_frame_size: Option<usize>,
    max_message_size: Option<usize>,
    guard: Arc<dyn UpgradeGuard>,
    codec: Arc<dyn Codec<V>>,
    producer: Arc<dyn ValueProducer<V>>,
    engine: Arc<dyn SyncEngine<V>>,
    registry: Arc<ConnectionRegistry>,
}

impl<V> fmt::Debug for SyncRoute<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRoute")
            .field("path", &self.path)
            .field("max_frame_size", &self.max_frame_size)
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

impl<V> SyncRoute<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    /// Creates a route at `path` using the JSON codec and no upgrade guard.
    pub fn new<P, E>(path: impl AsRef<str>, producer: P, engine: E) -> Self
    where
        P: ValueProducer<V> + 'static,
        E: SyncEngine<V> + 'static,
    {
        Self {
            path: normalize_path(path.as_ref()),
            max_frame_size: None,
            max_message_size: None,
            guard: Arc::new(AllowAll),
            codec: Arc::new(JsonCodec),
            producer: Arc::new(producer),
            engine: Arc::new(engine),
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }
}

impl<V> SyncRoute<V>
where
    V: Send + 'static,
{
    /// Replaces the codec used for the initial snapshot.
    #[must_use]
    pub fn codec<C: Codec<V> + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Installs an upgrade guard.
    #[must_use]
    pub fn guard<G: UpgradeGuard + 'static>(mut self, guard: G) -> Self {
        self.guard = Arc::new(guard);
        self
    }

    /// Limits the size of a single WebSocket frame.
    #[must_use]
    pub const fn max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = Some(bytes);
        self
    }

    /// Limits the size of a reassembled WebSocket message.
    #[must_use]
    pub const fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Shares an existing registry, e.g. the one the system endpoints read.
    #[must_use]
    pub fn registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the normalized route path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Builds an axum router serving this route, mergeable into a router
    /// with any state.
    pub fn into_router<S>(self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let path = self.path.clone();
        Router::new()
            .route(&path, get(sync_handler::<V>))
            .with_state(Arc::new(self))
    }

    /// Produces the value and its encoded snapshot.
    async fn prepare(&self, context: &UpgradeContext) -> Result<(V, Vec<u8>), SyncError> {
        let value = self.producer.produce(context).await?;
        let snapshot = self.codec.encode(&value)?;
        Ok((value, snapshot))
    }

    /// Drives one upgraded socket from snapshot to close.
    async fn serve(self: Arc<Self>, mut socket: WebSocket, context: UpgradeContext) {
        let (value, snapshot) = match self.prepare(&context).await {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::warn!(path = %self.path, %error, "sync setup failed; closing socket");
                close_with_error(&mut socket, &error).await;
                return;
            }
        };

        let connection = Arc::new(WebSocketConnection::new(socket));
        let connection_id = connection.id();
        let liveness = connection.liveness();
        connection.send(Bytes::from(snapshot));

        let handle = self.engine.synchronize(value, connection);
        let entry = RegisteredConnection::new(connection_id, self.path.clone(), handle);
        if let Err(error) = self.registry.insert(entry).await {
            tracing::error!(%connection_id, %error, "failed to register connection");
            return;
        }
        tracing::info!(%connection_id, path = %self.path, "sync connection established");

        liveness.closed().await;

        // Dropping the entry releases the engine handle.
        let _ = self.registry.remove(connection_id).await;
        tracing::info!(%connection_id, path = %self.path, "sync connection closed");
    }
}

/// `GET <path>`: upgrade to WebSocket and start synchronizing.
async fn sync_handler<V>(
    ws: WebSocketUpgrade,
    uri: Uri,
    headers: HeaderMap,
    State(route): State<Arc<SyncRoute<V>>>,
) -> Response
where
    V: Send + 'static,
{
    let context = UpgradeContext { uri, headers };

    let extra_headers = match route.guard.check(&context).await {
        Ok(extra_headers) => extra_headers,
        Err(error) => {
            tracing::debug!(path = %route.path, %error, "upgrade rejected");
            return error.into_response();
        }
    };

    let mut ws = ws;
    if let Some(bytes) = route.max_frame_size {
        ws = ws.max_frame_size(bytes);
    }
    if let Some(bytes) = route.max_message_size {
        ws = ws.max_message_size(bytes);
    }

    let mut response = ws.on_upgrade(move |socket| route.serve(socket, context));
    response.headers_mut().extend(extra_headers);
    response
}

/// Closes a socket that never got an adapter.
async fn close_with_error(socket: &mut WebSocket, error: &SyncError) {
    let frame = CloseFrame {
        code: error.close_code(),
        reason: Utf8Bytes::from_static(error.close_reason()),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
    let _ = socket.close().await;
}

/// Ensures a leading `/` and strips a trailing one (except for the root).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

/// Joins path segments into a route path, e.g. `["rooms", "sync"]` →
/// `/rooms/sync`.
#[must_use]
pub fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined: Vec<String> = segments
        .into_iter()
        .map(|segment| segment.as_ref().trim_matches('/').to_string())
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", joined.join("/"))
}
