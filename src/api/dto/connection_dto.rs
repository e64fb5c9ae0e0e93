//! Connection and health DTOs for the system endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{ConnectionId, ConnectionSummary};

/// Response body for `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the server answers.
    pub status: String,
    /// RFC 3339 server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Number of live sync connections.
    pub active_connections: usize,
}

/// One live sync connection.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionSummaryDto {
    /// Connection identifier.
    #[schema(value_type = String, format = Uuid)]
    pub connection_id: ConnectionId,
    /// Route path the connection was accepted on.
    pub path: String,
    /// Time the connection was established.
    pub connected_at: DateTime<Utc>,
}

impl From<ConnectionSummary> for ConnectionSummaryDto {
    fn from(summary: ConnectionSummary) -> Self {
        Self {
            connection_id: summary.connection_id,
            path: summary.path,
            connected_at: summary.connected_at,
        }
    }
}

/// Response body for `GET /connections`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionListResponse {
    /// Connections on the requested page, oldest first.
    pub connections: Vec<ConnectionSummaryDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
