//! Client site rows (the visit destinations).
//!
//! Owned by the client directory; read-only to the session engine.

use serde::Serialize;
use sqlx::FromRow;

use careclock_core::types::{DbId, Timestamp};

/// A row from the `client_sites` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientSite {
    pub id: DbId,
    pub display_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Opaque care-level label (e.g. `standard`, `intensive`).
    pub care_level: Option<String>,
    /// Safety considerations for practitioners visiting this location.
    pub safety_notes: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
