//! WebSocket layer: the connection adapter, frame normalization and the
//! sync route that wires upgrades to the synchronization engine.

pub mod connection;
pub mod frame;
pub mod route;
pub mod upgrade;

pub use connection::WebSocketConnection;
pub use route::SyncRoute;
pub use upgrade::{
    AllowAll, UpgradeContext, UpgradeGuard, ValueProducer, from_async, from_fn, guard_fn,
    try_from_fn,
};
