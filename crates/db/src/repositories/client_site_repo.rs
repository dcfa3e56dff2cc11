//! Read-only lookups against the `client_sites` table.

use sqlx::PgPool;

use careclock_core::types::DbId;

use crate::models::client_site::ClientSite;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, display_name, address, latitude, longitude, \
                       care_level, safety_notes, is_active, created_at, updated_at";

/// Provides directory lookups for client sites.
pub struct ClientSiteRepo;

impl ClientSiteRepo {
    /// Find a client site by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClientSite>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM client_sites WHERE id = $1");
        sqlx::query_as::<_, ClientSite>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all active client sites, alphabetically.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<ClientSite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM client_sites \
             WHERE is_active = true \
             ORDER BY display_name ASC"
        );
        sqlx::query_as::<_, ClientSite>(&query).fetch_all(pool).await
    }
}
