// /project-management/services/project-service/src/utils/mod.rs
pub mod banner;
pub mod circuit_breaker;
pub mod cors;
pub mod error;
pub mod health;
pub mod logger;
pub mod validator;
