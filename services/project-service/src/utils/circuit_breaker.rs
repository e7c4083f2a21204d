// /project-management/services/project-service/src/utils/circuit_breaker.rs

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::utils::error::{AppError, AppResult};

/// Breaker guarding every Employee Service call
pub const EMPLOYEE_SERVICE_BREAKER: &str = "employeeService";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    /// Percent of failed calls that opens the breaker
    pub failure_rate_threshold: f64,
    pub wait_duration_in_open_state: Duration,
    pub permitted_calls_in_half_open_state: usize,
    /// Total attempts per call, 1 disables retry
    pub max_attempts: u32,
    /// First back-off, doubled after every failed attempt
    pub retry_wait: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(60),
            permitted_calls_in_half_open_state: 3,
            max_attempts: 3,
            retry_wait: Duration::from_millis(500),
        }
    }
}

/// Snapshot reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerMetrics {
    pub name: String,
    pub state: String,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    /// Absent until enough calls are recorded
    pub failure_rate: Option<f64>,
    pub not_permitted_calls: u64,
    pub total_calls: u64,
    pub state_changed_seconds_ago: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Outcomes in CLOSED, `true` marks a failure
    window: VecDeque<bool>,
    /// Outcomes of the trial calls in HALF_OPEN
    half_open_results: Vec<bool>,
    half_open_admitted: usize,
    state_changed_at: Instant,
    /// Bumped on every transition so late results of an older state are dropped
    generation: u64,
    not_permitted_calls: u64,
    total_calls: u64,
}

impl BreakerInner {
    fn transition(&mut self, to: CircuitState) {
        self.state = to;
        self.state_changed_at = Instant::now();
        self.generation += 1;
        self.half_open_admitted = 0;
        self.half_open_results.clear();
        if to == CircuitState::Closed {
            self.window.clear();
        }
    }
}

fn failure_rate(outcomes: impl Iterator<Item = bool>) -> (usize, usize, f64) {
    let (mut total, mut failed) = (0usize, 0usize);
    for failure in outcomes {
        total += 1;
        if failure {
            failed += 1;
        }
    }
    let rate = if total == 0 {
        0.0
    } else {
        failed as f64 * 100.0 / total as f64
    };
    (total, failed, rate)
}

/// Admission of one call. A permit dropped before its outcome is recorded
/// belongs to a cancelled call.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    recorded: bool,
}

impl CallPermit<'_> {
    fn record(mut self, failed: bool) {
        self.recorded = true;
        self.breaker.record(self.generation, failed);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.release_cancelled(self.generation);
        }
    }
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    /// Never held across an await, so permits can release it from `Drop`
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.sliding_window_size),
                half_open_results: Vec::new(),
                half_open_admitted: 0,
                state_changed_at: Instant::now(),
                generation: 0,
                not_permitted_calls: 0,
                total_calls: 0,
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Execute a future under circuit breaker protection.
    /// Only upstream failures are recorded as failures.
    pub async fn call<F, T>(&self, f: F) -> AppResult<T>
    where
        F: std::future::Future<Output = AppResult<T>>,
    {
        let permit = self.acquire_permission()?;

        let result = f.await;
        let failed = matches!(&result, Err(e) if e.is_upstream_failure());
        permit.record(failed);

        result
    }

    /// Execute with retry and exponential back-off. Every attempt passes
    /// through the breaker, an open breaker ends the retry loop.
    pub async fn call_with_retry<F, Fut, T>(&self, mut f: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut retry_delay = self.config.retry_wait;
        let mut attempt = 1;

        loop {
            match self.call(f()).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_upstream_failure() && attempt < max_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} to {} failed: {}",
                        attempt, max_attempts, self.name, e
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn acquire_permission(&self) -> AppResult<CallPermit<'_>> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let elapsed = inner.state_changed_at.elapsed();
            let wait = self.config.wait_duration_in_open_state;
            if elapsed < wait {
                inner.not_permitted_calls += 1;
                let remaining = (wait - elapsed).as_secs_f64().ceil() as u64;
                return Err(AppError::CircuitBreakerOpen {
                    state: CircuitState::Open.as_str().to_string(),
                    retry_after_secs: remaining.max(1),
                });
            }
            inner.transition(CircuitState::HalfOpen);
            tracing::info!("Circuit breaker {} transitioned to HALF_OPEN", self.name);
        }

        if inner.state == CircuitState::HalfOpen {
            if inner.half_open_admitted >= self.config.permitted_calls_in_half_open_state {
                inner.not_permitted_calls += 1;
                return Err(AppError::CircuitBreakerOpen {
                    state: CircuitState::HalfOpen.as_str().to_string(),
                    retry_after_secs: 1,
                });
            }
            inner.half_open_admitted += 1;
        }

        inner.total_calls += 1;
        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            recorded: false,
        })
    }

    /// A trial call cancelled in HALF_OPEN counts as failed, which frees its
    /// slot. Cancelled calls in CLOSED are not recorded.
    fn release_cancelled(&self, generation: u64) {
        let half_open = {
            let inner = self.lock();
            inner.generation == generation && inner.state == CircuitState::HalfOpen
        };
        if half_open {
            tracing::warn!("Trial call through {} was cancelled", self.name);
            self.record(generation, true);
        }
    }

    fn record(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                while inner.window.len() > self.config.sliding_window_size {
                    inner.window.pop_front();
                }

                let minimum = self
                    .config
                    .minimum_number_of_calls
                    .min(self.config.sliding_window_size)
                    .max(1);
                let (total, failed_calls, rate) = failure_rate(inner.window.iter().copied());
                if total >= minimum && rate >= self.config.failure_rate_threshold {
                    inner.transition(CircuitState::Open);
                    tracing::warn!(
                        "Circuit breaker {} transitioned to OPEN ({} of {} calls failed)",
                        self.name, failed_calls, total
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_results.push(failed);
                if inner.half_open_results.len() >= self.config.permitted_calls_in_half_open_state {
                    let (_, _, rate) = failure_rate(inner.half_open_results.iter().copied());
                    if rate >= self.config.failure_rate_threshold {
                        inner.transition(CircuitState::Open);
                        tracing::warn!("Circuit breaker {} re-opened after trial calls", self.name);
                    } else {
                        inner.transition(CircuitState::Closed);
                        tracing::info!("Circuit breaker {} transitioned to CLOSED", self.name);
                    }
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn get_metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();

        let (buffered, failed, rate) = match inner.state {
            CircuitState::HalfOpen => failure_rate(inner.half_open_results.iter().copied()),
            _ => failure_rate(inner.window.iter().copied()),
        };
        let minimum = self
            .config
            .minimum_number_of_calls
            .min(self.config.sliding_window_size)
            .max(1);

        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: inner.state.as_str().to_string(),
            buffered_calls: buffered,
            failed_calls: failed,
            failure_rate: (buffered >= minimum).then_some(rate),
            not_permitted_calls: inner.not_permitted_calls,
            total_calls: inner.total_calls,
            state_changed_seconds_ago: inner.state_changed_at.elapsed().as_secs(),
        }
    }
}

/// Registry of named breakers sharing one config
pub struct CircuitBreakerManager {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerManager {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            default_config,
        }
    }

    pub async fn get_or_create(&self, service_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(service_name) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write().await;
        breakers
            .entry(service_name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    service_name.to_string(),
                    self.default_config.clone(),
                ))
            })
            .clone()
    }

    pub async fn get_all_metrics(&self) -> Vec<CircuitBreakerMetrics> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.read().await.values().cloned().collect();

        let mut metrics = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            metrics.push(breaker.get_metrics().await);
        }
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    }
}
