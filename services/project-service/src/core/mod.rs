// /project-management/services/project-service/src/core/mod.rs

pub mod jwt;
pub mod project;

// Re-export for easier access
pub mod services {
    pub use super::jwt::JwksVerifier;
    pub use super::project::ProjectService;
}
