// /project-management/services/project-service/src/middleware/mod.rs

pub mod auth;
pub mod error_path;
pub mod security;
