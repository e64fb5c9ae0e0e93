//! Reference engine synchronizing a single counter.
//!
//! Used by the server binary and the integration tests. The client sends
//! JSON commands such as `{"op":"increment"}`; after every change the engine
//! sends the full encoded [`Counter`] back as one binary frame.

use std::sync::Arc;

use axum::body::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::{Connection, SyncEngine, SyncHandle, TaskHandle};
use crate::codec::{Codec, JsonCodec};

/// Synchronized counter value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Current count.
    pub counter: i64,
}

impl Counter {
    /// Creates a counter starting at `counter`.
    #[must_use]
    pub const fn new(counter: i64) -> Self {
        Self { counter }
    }

    /// Applies a command. Overflow saturates.
    pub fn apply(&mut self, command: CounterCommand) {
        self.counter = match command {
            CounterCommand::Increment => self.counter.saturating_add(1),
            CounterCommand::Decrement => self.counter.saturating_sub(1),
            CounterCommand::Reset => 0,
        };
    }
}

/// Commands accepted from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CounterCommand {
    /// Add one.
    Increment,
    /// Subtract one.
    Decrement,
    /// Set back to zero.
    Reset,
}

/// [`SyncEngine`] for [`Counter`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterEngine {
    codec: JsonCodec,
}

impl CounterEngine {
    /// Creates the engine with the JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self { codec: JsonCodec }
    }
}

impl SyncEngine<Counter> for CounterEngine {
    fn synchronize(&self, value: Counter, connection: Arc<dyn Connection>) -> SyncHandle {
        // Subscribe before returning so no frame after the handover is missed.
        let mut inbound = connection.receive();
        let codec = self.codec;

        Box::new(TaskHandle::spawn(async move {
            let mut state = value;
            while let Some(payload) = inbound.next().await {
                let command: CounterCommand = match serde_json::from_slice(&payload) {
                    Ok(command) => command,
                    Err(error) => {
                        tracing::debug!(
                            connection_id = %connection.id(),
                            %error,
                            "ignoring unrecognized counter command"
                        );
                        continue;
                    }
                };
                state.apply(command);

                match Codec::<Counter>::encode(&codec, &state) {
                    Ok(snapshot) => connection.send(Bytes::from(snapshot)),
                    Err(error) => {
                        tracing::warn!(connection_id = %connection.id(), %error, "failed to encode counter");
                    }
                }
            }
            tracing::debug!(connection_id = %connection.id(), counter = state.counter, "counter sync finished");
        }))
    }
}
