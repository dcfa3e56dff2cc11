//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000001_create_users_table.sql`.

pub const ROLE_PRACTITIONER: &str = "practitioner";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_ADMIN: &str = "admin";
