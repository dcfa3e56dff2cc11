//! JWT token handling for authenticated requests.

pub mod jwt;

pub use jwt::{generate_access_token, validate_token, Claims, JwtConfig};
