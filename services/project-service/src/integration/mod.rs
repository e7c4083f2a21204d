// /project-management/services/project-service/src/integration/mod.rs

pub mod employee;

pub use employee::{EmployeeDirectory, EmployeeServiceClient};
