//! Domain layer: connection identity, liveness, the inbound feed and the
//! registry of live sessions.

pub mod connection_id;
pub mod inbound_feed;
pub mod liveness;
pub mod registry;

pub use connection_id::ConnectionId;
pub use inbound_feed::{FeedSubscriber, InboundFeed};
pub use liveness::{Liveness, LivenessSignal};
pub use registry::{ConnectionRegistry, ConnectionSummary, RegisteredConnection};
