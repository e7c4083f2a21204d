// /project-management/services/project-service/src/api/mod.rs

pub mod handlers;
pub mod routes;
