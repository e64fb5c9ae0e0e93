//! # sync-ws-gateway
//!
//! WebSocket transport for remote object synchronization.
//!
//! The crate wraps an upgraded WebSocket in a duplex byte channel
//! ([`ws::WebSocketConnection`]) that a synchronization engine can drive
//! without touching the socket: outbound bytes become binary frames,
//! inbound binary and text frames become one ordered byte feed, and the
//! connection's liveness is observable as a latest-value signal.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── SyncRoute (ws/)          guard → value → snapshot → handover
//!     ├── REST handlers (api/)     health, live connections
//!     │
//!     ├── WebSocketConnection      reader task → InboundFeed
//!     │                            writer task ← send queue
//!     │                            Liveness (watch)
//!     │
//!     ├── SyncEngine (engine/)     opaque consumer of the connection
//!     └── ConnectionRegistry       keeps engine handles alive until close
//! ```

pub mod api;
pub mod app_state;
pub mod codec;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ws;
