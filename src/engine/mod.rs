//! Boundary between the transport and the synchronization engine.
//!
//! The engine is an opaque consumer: the sync route hands it the initial
//! value and a [`Connection`], and keeps the returned [`SyncHandle`] alive
//! until the socket closes. The engine never sees the raw socket.

pub mod counter;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::stream::BoxStream;
use tokio::task::JoinHandle;

use crate::domain::{ConnectionId, LivenessSignal};

pub use counter::{Counter, CounterCommand, CounterEngine};

/// Opaque value returned by [`SyncEngine::synchronize`].
///
/// The route only holds it; dropping it is how the engine learns the
/// connection is gone.
pub type SyncHandle = Box<dyn Any + Send + Sync>;

/// Duplex byte channel with an observable liveness flag.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Identifier assigned when the connection was accepted.
    fn id(&self) -> ConnectionId;

    /// Point-in-time liveness read.
    fn is_connected(&self) -> bool;

    /// Latest-value liveness observer.
    fn liveness(&self) -> LivenessSignal;

    /// Queues `data` as one binary frame. Never blocks and never fails;
    /// a dead transport shows up only as liveness turning `false`.
    fn send(&self, data: Bytes);

    /// Requests a normal close. Calling it again has no further effect.
    fn disconnect(&self);

    /// Returns a stream of payloads received after this call, in wire
    /// order. The stream ends once the connection is closed.
    fn receive(&self) -> BoxStream<'static, Bytes>;
}

/// Entry point of a synchronization engine for values of type `V`.
pub trait SyncEngine<V>: Send + Sync {
    /// Starts synchronizing `value` over `connection`.
    ///
    /// Called after the initial snapshot has been queued on the connection.
    fn synchronize(&self, value: V, connection: Arc<dyn Connection>) -> SyncHandle;
}

/// Background task that is aborted when the handle is dropped.
///
/// Engines that drive a connection from a spawned task return one of these
/// (boxed) as their [`SyncHandle`].
#[derive(Debug)]
pub struct TaskHandle(JoinHandle<()>);

impl TaskHandle {
    /// Spawns `future` on the current Tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn dropping_task_handle_aborts_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = TaskHandle::spawn(async move {
            // Held until the task is aborted.
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;

        drop(handle);
        let result = tokio::time::timeout(Duration::from_secs(1), rx).await;
        let Ok(Err(_)) = result else {
            panic!("task was not aborted");
        };
    }
}
