//! Автоматический выключатель (Circuit Breaker) для вызовов backend'а.
//!
//! После `failure_threshold` подряд идущих сетевых/серверных сбоев цепь размыкается,
//! и запросы сразу завершаются ошибкой [`ApiError::Unavailable`], пока не истечёт
//! таймаут. Затем разрешается один пробный запрос (HalfOpen).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::ApiError;

/// Состояния "Автоматического выключателя".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Нормальный режим, запросы разрешены.
    Closed,
    /// Запросы блокируются до истечения таймаута.
    Open,
    /// Разрешён пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Момент размыкания цепи.
    opened_at: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    /// Проверяет, можно ли выполнить следующий запрос.
    pub fn can_execute(&self) -> bool {
        let state = *self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = *self.opened_at.lock().unwrap_or_else(PoisonError::into_inner);
                let elapsed = opened_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.timeout_duration {
                    *self.state.write().unwrap_or_else(PoisonError::into_inner) =
                        CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        *state = CircuitState::Closed;
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let open = match *state {
            CircuitState::Closed if failures >= self.failure_threshold => {
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    failures, self.failure_threshold
                );
                true
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker test failed - returning to Open state");
                true
            }
            _ => false,
        };

        if open {
            *state = CircuitState::Open;
            *self.opened_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Выполняет операцию через выключатель. В счётчик попадают только
    /// транзиентные сбои: конфликт мест не должен размыкать цепь.
    pub async fn call<F, T>(&self, operation: F) -> Result<T, ApiError>
    where
        F: std::future::Future<Output = Result<T, ApiError>>,
    {
        if !self.can_execute() {
            warn!("Circuit breaker is OPEN - blocking backend request");
            return Err(ApiError::Unavailable);
        }

        match operation.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) if e.is_transient() => {
                self.record_failure();
                Err(e)
            }
            Err(e) => {
                self.record_success();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_recovers() {
        let cb = CircuitBreaker::new(2, 30);
        let fail = || async { Err::<(), _>(ApiError::Network("down".into())) };

        assert!(cb.call(fail()).await.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.call(fail()).await.is_err());
        assert_eq!(cb.state(), CircuitState::Open);

        let blocked = cb.call(async { Ok::<_, ApiError>(1) }).await;
        assert_eq!(blocked, Err(ApiError::Unavailable));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cb.call(async { Ok::<_, ApiError>(7) }).await, Ok(7));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_call_reopens() {
        let cb = CircuitBreaker::new(1, 10);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(10)).await;
        let trial = cb.call(async { Err::<(), _>(ApiError::from_status(503, "")) }).await;
        assert!(trial.is_err());
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[tokio::test]
    async fn business_errors_do_not_trip() {
        let cb = CircuitBreaker::new(1, 10);
        let res = cb.call(async { Err::<(), _>(ApiError::Conflict("A1".into())) }).await;
        assert!(matches!(res, Err(ApiError::Conflict(_))));
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
