// /project-management/services/project-service/src/utils/health.rs

use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::net::TcpStream;

use crate::{
    config::SecurityConfig,
    repository::ProjectRepository,
    utils::circuit_breaker::{CircuitBreakerManager, CircuitBreakerMetrics, CircuitState},
};

const IDP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub checks: BTreeMap<String, ComponentHealth>,
    pub circuit_breakers: Vec<CircuitBreakerMetrics>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

// ===== IDENTITY PROVIDER PROBE =====

/// Tracks whether the identity provider behind the JWK set URI accepts connections
pub struct IdentityProviderMonitor {
    enabled: bool,
    target: Option<(String, u16)>,
    reachable: AtomicBool,
}

impl IdentityProviderMonitor {
    pub fn new(config: &SecurityConfig) -> Self {
        let target = reqwest::Url::parse(&config.jwk_set_uri).ok().and_then(|url| {
            let host = url.host_str()?.to_string();
            let port = url.port_or_known_default()?;
            Some((host, port))
        });

        if target.is_none() && config.auth_enabled {
            tracing::warn!("JWK set URI '{}' has no usable host", config.jwk_set_uri);
        }

        Self {
            enabled: config.auth_enabled && config.idp_health_check_enabled,
            target,
            reachable: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled probes always report reachable
    pub fn is_reachable(&self) -> bool {
        !self.enabled || self.reachable.load(Ordering::Relaxed)
    }

    /// One TCP connect attempt, updating the cached status
    pub async fn probe(&self) -> bool {
        let reachable = match &self.target {
            Some((host, port)) => matches!(
                tokio::time::timeout(IDP_PROBE_TIMEOUT, TcpStream::connect((host.as_str(), *port))).await,
                Ok(Ok(_))
            ),
            None => false,
        };

        let previous = self.reachable.swap(reachable, Ordering::Relaxed);
        if previous != reachable {
            if reachable {
                tracing::info!("✅ Identity provider reachable again");
            } else {
                tracing::warn!("⚠️ Identity provider unreachable, protected endpoints answer 503");
            }
        }
        reachable
    }

    /// Probe now and then every `interval` in the background
    pub fn spawn(self: Arc<Self>, interval: Duration) {
        if !self.enabled {
            return;
        }

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.probe().await;
            }
        });
    }
}

// ===== HEALTH REPORT =====

pub async fn comprehensive_health_check(
    repository: &Arc<dyn ProjectRepository>,
    circuit_manager: &CircuitBreakerManager,
    idp: &IdentityProviderMonitor,
) -> HealthCheckResult {
    let mut checks = BTreeMap::new();

    checks.insert("database".to_string(), check_database_health(repository).await);
    checks.insert("identityProvider".to_string(), check_identity_provider(idp));

    let circuit_breakers = circuit_manager.get_all_metrics().await;
    checks.insert("circuitBreakers".to_string(), check_circuit_breakers(&circuit_breakers));

    HealthCheckResult {
        status: determine_overall_status(&checks),
        checks,
        circuit_breakers,
        timestamp: chrono::Utc::now(),
    }
}

async fn check_database_health(repository: &Arc<dyn ProjectRepository>) -> ComponentHealth {
    let start = Instant::now();

    match repository.ping().await {
        Ok(()) => ComponentHealth {
            name: repository.backend_name().to_string(),
            status: HealthStatus::Up,
            message: None,
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => ComponentHealth {
            name: repository.backend_name().to_string(),
            status: HealthStatus::Down,
            message: Some(format!("Database error: {}", e)),
            response_time_ms: None,
        },
    }
}

fn check_identity_provider(idp: &IdentityProviderMonitor) -> ComponentHealth {
    let (status, message) = if !idp.is_enabled() {
        (HealthStatus::Up, "probe disabled")
    } else if idp.is_reachable() {
        (HealthStatus::Up, "reachable")
    } else {
        (HealthStatus::Degraded, "unreachable")
    };

    ComponentHealth {
        name: "Identity Provider".to_string(),
        status,
        message: Some(message.to_string()),
        response_time_ms: None,
    }
}

fn check_circuit_breakers(metrics: &[CircuitBreakerMetrics]) -> ComponentHealth {
    let open_circuits = metrics
        .iter()
        .filter(|m| m.state == CircuitState::Open.as_str())
        .count();

    ComponentHealth {
        name: "Circuit Breakers".to_string(),
        status: if open_circuits == 0 {
            HealthStatus::Up
        } else {
            HealthStatus::Degraded
        },
        message: Some(format!("{} of {} circuits open", open_circuits, metrics.len())),
        response_time_ms: None,
    }
}

fn determine_overall_status(checks: &BTreeMap<String, ComponentHealth>) -> HealthStatus {
    if checks.values().any(|c| c.status == HealthStatus::Down) {
        HealthStatus::Down
    } else if checks.values().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::MemoryProjectRepository, utils::circuit_breaker::CircuitBreakerConfig};

    fn security(jwk_set_uri: &str) -> SecurityConfig {
        SecurityConfig {
            auth_enabled: true,
            jwk_set_uri: jwk_set_uri.to_string(),
            issuer: None,
            audience: None,
            client_id: "project-management-service".to_string(),
            required_role: "hitec-employee".to_string(),
            idp_health_check_enabled: true,
            idp_health_check_interval: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_probe_tracks_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let monitor = IdentityProviderMonitor::new(&security(&format!("http://127.0.0.1:{}/certs", port)));

        assert!(monitor.probe().await);
        assert!(monitor.is_reachable());

        drop(listener);
        assert!(!monitor.probe().await);
        assert!(!monitor.is_reachable());
    }

    #[tokio::test]
    async fn test_disabled_probe_is_always_reachable() {
        let mut config = security("not a url");
        config.idp_health_check_enabled = false;
        let monitor = IdentityProviderMonitor::new(&config);

        assert!(!monitor.probe().await);
        assert!(monitor.is_reachable());
    }

    #[tokio::test]
    async fn test_health_reports_open_circuit_as_degraded() {
        let repository: Arc<dyn ProjectRepository> = Arc::new(MemoryProjectRepository::new());
        let manager = CircuitBreakerManager::new(CircuitBreakerConfig {
            sliding_window_size: 2,
            minimum_number_of_calls: 2,
            max_attempts: 1,
            ..CircuitBreakerConfig::default()
        });
        let mut config = security("http://127.0.0.1:1/certs");
        config.idp_health_check_enabled = false;
        let idp = IdentityProviderMonitor::new(&config);

        let healthy = comprehensive_health_check(&repository, &manager, &idp).await;
        assert_eq!(healthy.status, HealthStatus::Up);
        assert_eq!(healthy.checks["database"].name, "memory");

        let breaker = manager.get_or_create("employeeService").await;
        for _ in 0..2 {
            let _ = breaker
                .call(async {
                    Err::<(), _>(crate::utils::error::AppError::EmployeeServiceUnavailable { upstream_status: Some(500) })
                })
                .await;
        }

        let degraded = comprehensive_health_check(&repository, &manager, &idp).await;
        assert_eq!(degraded.status, HealthStatus::Degraded);
        assert_eq!(degraded.circuit_breakers.len(), 1);
        assert_eq!(degraded.circuit_breakers[0].state, "OPEN");
    }
}
