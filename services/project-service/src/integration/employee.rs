// /project-management/services/project-service/src/integration/employee.rs

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::EmployeeServiceConfig,
    models::{EmployeeDto, EmployeeQualificationsDto},
    utils::{
        circuit_breaker::{CircuitBreaker, CircuitBreakerManager, EMPLOYEE_SERVICE_BREAKER},
        error::{AppError, AppResult},
    },
};

/// Employee lookups needed by the project service
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// `Ok(true)` for an existing active employee, ids `<= 0` are `Ok(false)`
    async fn validate_employee(&self, employee_id: i64, token: Option<&str>) -> AppResult<bool>;

    /// `Ok(true)` when the employee holds a valid qualification with that name
    async fn validate_qualification(
        &self,
        employee_id: i64,
        qualification: &str,
        token: Option<&str>,
    ) -> AppResult<bool>;

    /// Display name, never fails
    async fn employee_name(&self, employee_id: i64, token: Option<&str>) -> String;
}

/// HTTP client for the Employee Service guarded by the `employeeService` breaker
#[derive(Clone)]
pub struct EmployeeServiceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    breaker: Arc<CircuitBreaker>,
}

impl EmployeeServiceClient {
    pub async fn new(
        config: &EmployeeServiceConfig,
        circuit_manager: &CircuitBreakerManager,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let breaker = circuit_manager.get_or_create(EMPLOYEE_SERVICE_BREAKER).await;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            breaker,
        })
    }

    pub async fn get_employee(&self, employee_id: i64, token: Option<&str>) -> AppResult<EmployeeDto> {
        self.get_with_retry(format!("/employees/{}", employee_id), employee_id, token)
            .await
    }

    pub async fn get_qualifications(
        &self,
        employee_id: i64,
        token: Option<&str>,
    ) -> AppResult<EmployeeQualificationsDto> {
        self.get_with_retry(
            format!("/employees/{}/qualifications", employee_id),
            employee_id,
            token,
        )
        .await
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: String,
        employee_id: i64,
        token: Option<&str>,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let token = token.map(str::to_string);
        let timeout_ms = self.timeout.as_millis() as u64;

        self.breaker
            .call_with_retry(|| {
                let client = self.client.clone();
                let url = url.clone();
                let token = token.clone();
                async move { fetch_json(client, url, token, employee_id, timeout_ms).await }
            })
            .await
    }
}

async fn fetch_json<T: DeserializeOwned>(
    client: Client,
    url: String,
    token: Option<String>,
    employee_id: i64,
    timeout_ms: u64,
) -> AppResult<T> {
    tracing::debug!("GET {}", url);

    let mut request = client.get(&url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, timeout_ms))?;

    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                AppError::EmployeeServiceTimeout { timeout_ms }
            } else {
                tracing::error!("Malformed Employee Service response from {}: {}", url, e);
                AppError::EmployeeServiceUnavailable { upstream_status: Some(status.as_u16()) }
            }
        });
    }

    Err(decode_error_status(status, employee_id, timeout_ms))
}

/// Map an upstream error status to the service error
fn decode_error_status(status: StatusCode, employee_id: i64, timeout_ms: u64) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::EmployeeNotFound(employee_id),
        StatusCode::GATEWAY_TIMEOUT => AppError::EmployeeServiceTimeout { timeout_ms },
        other => {
            tracing::warn!("Employee Service answered with status {}", other);
            AppError::EmployeeServiceUnavailable { upstream_status: Some(other.as_u16()) }
        }
    }
}

fn transport_error(err: reqwest::Error, timeout_ms: u64) -> AppError {
    if err.is_timeout() {
        tracing::warn!("Employee Service timed out after {} ms", timeout_ms);
        AppError::EmployeeServiceTimeout { timeout_ms }
    } else {
        tracing::warn!("Employee Service unreachable: {}", err);
        AppError::EmployeeServiceUnavailable { upstream_status: None }
    }
}

#[async_trait]
impl EmployeeDirectory for EmployeeServiceClient {
    async fn validate_employee(&self, employee_id: i64, token: Option<&str>) -> AppResult<bool> {
        if employee_id <= 0 {
            return Ok(false);
        }
        tracing::debug!("Validating employee with ID: {}", employee_id);

        let employee = self.get_employee(employee_id, token).await?;
        let active = employee
            .status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("ACTIVE"))
            .unwrap_or(false);

        if !active {
            tracing::warn!(
                "Employee {} is not active. Status: {:?}",
                employee_id, employee.status
            );
            return Err(AppError::EmployeeNotFound(employee_id));
        }

        tracing::info!("Employee {} validated successfully", employee_id);
        Ok(true)
    }

    async fn validate_qualification(
        &self,
        employee_id: i64,
        qualification: &str,
        token: Option<&str>,
    ) -> AppResult<bool> {
        let wanted = qualification.trim();
        if employee_id <= 0 || wanted.is_empty() {
            return Ok(false);
        }

        let response = self.get_qualifications(employee_id, token).await?;
        let found = response
            .qualifications
            .into_iter()
            .find(|q| q.name.trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                tracing::warn!("Employee {} does not have qualification '{}'", employee_id, wanted);
                AppError::QualificationMissing(wanted.to_string())
            })?;

        if let Some(valid_until) = found.valid_until {
            if valid_until < Utc::now().date_naive() {
                tracing::warn!(
                    "Qualification '{}' of employee {} expired on {}",
                    found.name, employee_id, valid_until
                );
                return Err(AppError::QualificationExpired { name: found.name, valid_until });
            }
        }

        tracing::info!("Employee {} has valid qualification '{}'", employee_id, wanted);
        Ok(true)
    }

    async fn employee_name(&self, employee_id: i64, token: Option<&str>) -> String {
        let url = format!("{}/employees/{}", self.base_url, employee_id);
        let timeout_ms = self.timeout.as_millis() as u64;

        let result = self
            .breaker
            .call(fetch_json::<EmployeeDto>(
                self.client.clone(),
                url,
                token.map(str::to_string),
                employee_id,
                timeout_ms,
            ))
            .await;

        match result {
            Ok(EmployeeDto { first_name: Some(first), last_name: Some(last), .. }) => {
                format!("{} {}", first, last)
            }
            Ok(_) => format!("Employee {}", employee_id),
            Err(e) => {
                tracing::debug!(
                    "Could not fetch employee name for {} via {}: {}",
                    employee_id, self.breaker.name(), e
                );
                format!("Employee {}", employee_id)
            }
        }
    }
}
