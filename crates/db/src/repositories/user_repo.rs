//! Read-only lookups against the `users` table.
//!
//! The engine only needs identity and role; account management belongs to
//! the identity service.

use sqlx::PgPool;

use careclock_core::types::DbId;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, display_name, role, is_active, created_at, updated_at";

/// Provides identity lookups for practitioners and supervisors.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by their ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
