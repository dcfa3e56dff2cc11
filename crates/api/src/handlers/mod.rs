pub mod clients;
pub mod sessions;
