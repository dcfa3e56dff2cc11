pub mod client_site_repo;
pub mod user_repo;
pub mod visit_session_repo;

pub use client_site_repo::ClientSiteRepo;
pub use user_repo::UserRepo;
pub use visit_session_repo::VisitSessionRepo;
