//! Fixed-window rate limiting with degraded-mode handling.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::infrastructure::rate_limit::{RateLimitBackend, RateLimitError};

/// Length of a rate limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Policy knobs for [`RateLimitService`].
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Requests allowed per window; `0` disables limiting.
    pub requests_per_minute: u64,
    /// How long the backend is bypassed after a failure.
    pub failure_cooldown: Duration,
    /// Outcome while the backend is unavailable.
    pub fail_open: bool,
    /// Upper bound for one backend call.
    pub backend_timeout: Duration,
}

impl RateLimitPolicy {
    pub fn is_enabled(&self) -> bool {
        self.requests_per_minute > 0
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The client went over its budget for the current window.
    LimitExceeded { count: u64 },
    /// The backend is unavailable and the policy fails closed.
    BackendUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LimitExceeded { .. } => "rate_limit_exceeded",
            Self::BackendUnavailable => "rate_limit_backend_unavailable",
        }
    }
}

/// Outcome of [`RateLimitService::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// `count` is the window count, or `None` when the backend was not
    /// consulted (limiting disabled, or degraded and failing open).
    Allowed { count: Option<u64> },
    Denied(DenyReason),
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Backend health for the readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Shared degraded-mode state. `None` means healthy.
///
/// `generation` is bumped each time a cooldown starts. A backend call only
/// clears the state if it was issued under the current generation.
#[derive(Debug, Default)]
struct HealthState {
    degraded_until: Option<Instant>,
    generation: u64,
}

/// Fixed-window limiter on top of a pluggable [`RateLimitBackend`].
///
/// # Degraded mode
///
/// A backend error or timeout puts the limiter in degraded mode for
/// `failure_cooldown`. Until the deadline passes no backend call is made and
/// every request gets the fail-open/fail-closed outcome. The first request
/// after the deadline probes the backend again; a success clears the state.
///
/// Concurrent requests that hit the same failure only start one cooldown:
/// a failure seen while a cooldown is running does not move the deadline.
/// A slow call that was issued before a cooldown started cannot end it.
pub struct RateLimitService {
    backend: Arc<dyn RateLimitBackend>,
    policy: RateLimitPolicy,
    health: Mutex<HealthState>,
}

impl RateLimitService {
    pub fn new(backend: Arc<dyn RateLimitBackend>, policy: RateLimitPolicy) -> Self {
        Self {
            backend,
            policy,
            health: Mutex::new(HealthState::default()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Counts a request for `client_key` and decides whether it may proceed.
    pub async fn admit(&self, client_key: &str) -> RateLimitDecision {
        if !self.policy.is_enabled() {
            return RateLimitDecision::Allowed { count: None };
        }

        let Some(issued) = self.call_generation(Instant::now()) else {
            return self.degraded_decision();
        };

        let call = self.backend.increment(client_key, WINDOW);
        let result = match tokio::time::timeout(self.policy.backend_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RateLimitError::Timeout(self.policy.backend_timeout)),
        };

        match result {
            Ok(count) => {
                self.mark_healthy(issued);
                if count > self.policy.requests_per_minute {
                    RateLimitDecision::Denied(DenyReason::LimitExceeded { count })
                } else {
                    RateLimitDecision::Allowed { count: Some(count) }
                }
            }
            Err(e) => {
                self.mark_degraded(Instant::now(), &e);
                self.degraded_decision()
            }
        }
    }

    /// Health for the readiness probe.
    ///
    /// Reports not-ok while degraded without touching the backend; otherwise
    /// asks the backend.
    pub async fn health(&self) -> BackendHealth {
        if !self.policy.is_enabled() {
            return BackendHealth {
                ok: true,
                detail: Some("rate limit disabled".to_string()),
            };
        }

        if let Some(remaining) = self.degraded_remaining(Instant::now()) {
            return BackendHealth {
                ok: false,
                detail: Some(format!(
                    "{} backend degraded, retry in {}ms",
                    self.backend.name(),
                    remaining.as_millis()
                )),
            };
        }

        if self.backend.health_check().await {
            BackendHealth {
                ok: true,
                detail: Some(format!("{} backend", self.backend.name())),
            }
        } else {
            BackendHealth {
                ok: false,
                detail: Some(format!("{} backend unreachable", self.backend.name())),
            }
        }
    }

    /// Whether the limiter is currently bypassing its backend.
    pub fn is_degraded(&self) -> bool {
        self.degraded_remaining(Instant::now()).is_some()
    }

    fn degraded_decision(&self) -> RateLimitDecision {
        if self.policy.fail_open {
            RateLimitDecision::Allowed { count: None }
        } else {
            RateLimitDecision::Denied(DenyReason::BackendUnavailable)
        }
    }

    fn degraded_remaining(&self, now: Instant) -> Option<Duration> {
        let state = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .degraded_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Generation a backend call is issued under, or `None` while degraded.
    fn call_generation(&self, now: Instant) -> Option<u64> {
        let state = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        match state.degraded_until {
            Some(until) if until > now => None,
            _ => Some(state.generation),
        }
    }

    fn mark_degraded(&self, now: Instant, error: &RateLimitError) {
        let mut state = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if state.degraded_until.is_some_and(|until| until > now) {
            return;
        }
        state.degraded_until = Some(now + self.policy.failure_cooldown);
        state.generation = state.generation.wrapping_add(1);
        drop(state);

        warn!(
            backend = self.backend.name(),
            error = %error,
            fail_open = self.policy.fail_open,
            cooldown_seconds = self.policy.failure_cooldown.as_secs(),
            "Rate limit backend failed, entering degraded mode"
        );
    }

    fn mark_healthy(&self, issued: u64) {
        let mut state = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != issued {
            return;
        }
        if state.degraded_until.take().is_some() {
            drop(state);
            info!(backend = self.backend.name(), "Rate limit backend recovered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rate_limit::{MemoryBackend, MockRateLimitBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(requests_per_minute: u64, fail_open: bool) -> RateLimitPolicy {
        RateLimitPolicy {
            requests_per_minute,
            failure_cooldown: Duration::from_secs(5),
            fail_open,
            backend_timeout: Duration::from_millis(200),
        }
    }

    fn failing_backend(calls: Arc<AtomicUsize>) -> MockRateLimitBackend {
        let mut backend = MockRateLimitBackend::new();
        backend.expect_increment().returning(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RateLimitError::Connection("redis down".to_string()))
        });
        backend.expect_name().return_const("redis");
        backend
    }

    #[tokio::test]
    async fn test_disabled_never_touches_backend() {
        let mut backend = MockRateLimitBackend::new();
        backend.expect_increment().never();
        backend.expect_health_check().never();

        let limiter = RateLimitService::new(Arc::new(backend), policy(0, true));

        for _ in 0..10 {
            assert_eq!(limiter.admit("client-a").await, RateLimitDecision::Allowed { count: None });
        }
        assert!(limiter.health().await.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_per_minute_scenario() {
        let limiter = RateLimitService::new(Arc::new(MemoryBackend::new()), policy(5, true));

        for expected in 1..=5 {
            assert_eq!(
                limiter.admit("client-a").await,
                RateLimitDecision::Allowed { count: Some(expected) }
            );
        }
        assert_eq!(
            limiter.admit("client-a").await,
            RateLimitDecision::Denied(DenyReason::LimitExceeded { count: 6 })
        );

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(
            limiter.admit("client-a").await,
            RateLimitDecision::Allowed { count: Some(1) }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_open_admits_during_cooldown_without_backend_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let limiter = RateLimitService::new(Arc::new(failing_backend(calls.clone())), policy(1, true));

        for _ in 0..5 {
            assert!(limiter.admit("client-a").await.is_allowed());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(limiter.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_closed_denies_during_cooldown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let limiter = RateLimitService::new(Arc::new(failing_backend(calls.clone())), policy(1, false));

        for _ in 0..5 {
            assert_eq!(
                limiter.admit("client-a").await,
                RateLimitDecision::Denied(DenyReason::BackendUnavailable)
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_consulted_again_after_cooldown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let limiter = RateLimitService::new(Arc::new(failing_backend(calls.clone())), policy(1, true));

        limiter.admit("client-a").await;
        tokio::time::advance(Duration::from_secs(4)).await;
        limiter.admit("client-a").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.admit("client-a").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_clears_degraded_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut backend = MockRateLimitBackend::new();
        backend.expect_increment().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RateLimitError::Operation("READONLY".to_string()))
            } else {
                Ok(1)
            }
        });
        backend.expect_name().return_const("redis");
        let limiter = RateLimitService::new(Arc::new(backend), policy(3, false));

        assert!(!limiter.admit("client-a").await.is_allowed());
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(
            limiter.admit("client-a").await,
            RateLimitDecision::Allowed { count: Some(1) }
        );
        assert!(!limiter.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_into_degraded_mode() {
        struct SlowBackend;

        #[async_trait::async_trait]
        impl RateLimitBackend for SlowBackend {
            async fn increment(&self, _key: &str, _window: Duration) -> crate::infrastructure::rate_limit::RateLimitResult<u64> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(1)
            }
            async fn health_check(&self) -> bool {
                true
            }
            fn name(&self) -> &'static str {
                "slow"
            }
        }

        let limiter = RateLimitService::new(Arc::new(SlowBackend), policy(10, false));

        assert_eq!(
            limiter.admit("client-a").await,
            RateLimitDecision::Denied(DenyReason::BackendUnavailable)
        );
        assert!(limiter.is_degraded());
        assert!(!limiter.health().await.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_do_not_extend_cooldown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let limiter = RateLimitService::new(Arc::new(failing_backend(calls)), policy(1, true));
        let start = Instant::now();

        limiter.mark_degraded(start, &RateLimitError::Timeout(Duration::from_millis(200)));
        limiter.mark_degraded(
            start + Duration::from_secs(3),
            &RateLimitError::Timeout(Duration::from_millis(200)),
        );

        let remaining = limiter.degraded_remaining(start).unwrap();
        assert_eq!(remaining, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_success_does_not_end_new_cooldown() {
        struct SlowThenFailing {
            calls: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl RateLimitBackend for SlowThenFailing {
            async fn increment(&self, _key: &str, _window: Duration) -> crate::infrastructure::rate_limit::RateLimitResult<u64> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(1)
                } else {
                    Err(RateLimitError::Connection("redis down".to_string()))
                }
            }
            async fn health_check(&self) -> bool {
                true
            }
            fn name(&self) -> &'static str {
                "redis"
            }
        }

        let backend = Arc::new(SlowThenFailing { calls: AtomicUsize::new(0) });
        let limiter = RateLimitService::new(backend.clone(), policy(10, false));

        let slow = limiter.admit("client-a");
        let failing = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            limiter.admit("client-b").await
        };
        let (slow, failing) = tokio::join!(slow, failing);

        assert_eq!(slow, RateLimitDecision::Allowed { count: Some(1) });
        assert_eq!(failing, RateLimitDecision::Denied(DenyReason::BackendUnavailable));
        assert!(limiter.is_degraded());
        assert_eq!(
            limiter.admit("client-c").await,
            RateLimitDecision::Denied(DenyReason::BackendUnavailable)
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_health_reports_backend_state() {
        let mut backend = MockRateLimitBackend::new();
        backend.expect_health_check().times(1).returning(|| false);
        backend.expect_name().return_const("redis");

        let limiter = RateLimitService::new(Arc::new(backend), policy(5, true));
        let health = limiter.health().await;

        assert!(!health.ok);
        assert_eq!(health.detail.as_deref(), Some("redis backend unreachable"));
    }
}
