// /project-management/services/project-service/src/utils/banner.rs

/// Print startup banner
pub fn print_startup_banner(bind_address: &str, storage: &str, auth_enabled: bool) {
    println!(r#"
╔══════════════════════════════════════════════════════════╗
║                 PROJECT SERVICE v{:<8}                 ║
║          Projects & Employee Assignments API             ║
╚══════════════════════════════════════════════════════════╝
    "#, env!("CARGO_PKG_VERSION"));

    tracing::info!("🚀 Project Service starting at {}", bind_address);
    tracing::info!("🗄️  Storage backend: {}", storage);
    tracing::info!("🔐 Authentication: {}", if auth_enabled { "enabled" } else { "DISABLED" });
    tracing::info!("📋 Available endpoints:");
    tracing::info!("  Public:");
    tracing::info!("    GET    /actuator/health                      - Health & circuit breaker status");
    tracing::info!("    GET    /swagger-ui                           - API documentation");
    tracing::info!("  Protected:");
    tracing::info!("    POST   /projects                             - Create project");
    tracing::info!("    GET    /projects                             - List projects");
    tracing::info!("    GET    /projects/{{id}}                        - Get project");
    tracing::info!("    PUT    /projects/{{id}}                        - Update project");
    tracing::info!("    DELETE /projects/{{id}}                        - Delete project");
    tracing::info!("    POST   /projects/{{id}}/employees              - Assign employee");
    tracing::info!("    GET    /projects/{{id}}/employees              - List assigned employees");
    tracing::info!("    DELETE /projects/{{id}}/employees/{{eid}}        - Remove employee");
    tracing::info!("    GET    /employees/{{id}}/projects              - Projects of an employee");
}
