pub mod client_site;
pub mod status;
pub mod user;
pub mod visit_session;
