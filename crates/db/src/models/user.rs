//! Practitioner/supervisor identity rows.
//!
//! Read-only to the session engine: account management belongs to the
//! identity service.

use serde::Serialize;
use sqlx::FromRow;

use careclock_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
    /// Role name: `practitioner`, `supervisor`, or `admin`.
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
