//! Quota handling: the Rate-Limit Gate and an optional request pacer.
//!
//! The gate is consulted before every page request. It asks GitHub how many
//! requests remain (or reuses the figure a GraphQL response just reported)
//! and sleeps in fixed intervals while the quota sits at or below the
//! threshold. After each sleep the quota is queried again, so a run resumes
//! as soon as the window resets.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

use crate::fetch::progress::{FetchProgress, ProgressCallback, emit};
use crate::github::{GitHubClient, GitHubError};

/// Default quota threshold: the run pauses while `remaining <= threshold`.
pub const DEFAULT_QUOTA_THRESHOLD: usize = 100;

/// Default sleep between quota checks while backing off.
pub const DEFAULT_BACKOFF_INTERVAL: Duration = Duration::from_secs(60);

/// Quota assumed when the `/rate_limit` query itself fails.
pub const ASSUMED_REMAINING_ON_ERROR: usize = 5000;

/// What the gate does when it cannot read the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitErrorPolicy {
    /// Log a warning and proceed as if the given quota remained.
    #[default]
    AssumeRemaining,
    /// Propagate the error and stop the run.
    Abort,
}

/// Which quota bucket the gate watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaResource {
    Core,
    Graphql,
}

/// Tuning for [`RateLimitGate`].
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub threshold: usize,
    pub interval: Duration,
    pub on_query_error: RateLimitErrorPolicy,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_QUOTA_THRESHOLD,
            interval: DEFAULT_BACKOFF_INTERVAL,
            on_query_error: RateLimitErrorPolicy::default(),
        }
    }
}

/// Blocks the fetch loop while the remaining quota is too low.
pub struct RateLimitGate {
    client: GitHubClient,
    resource: QuotaResource,
    policy: GatePolicy,
    /// Quota reported inline by the last response, consumed by the next check.
    observed: Option<usize>,
}

impl RateLimitGate {
    pub fn new(client: GitHubClient, resource: QuotaResource, policy: GatePolicy) -> Self {
        Self {
            client,
            resource,
            policy,
            observed: None,
        }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Record a quota figure carried by a response body.
    ///
    /// The next [`check`](Self::check) uses it instead of querying
    /// `/rate_limit`.
    pub fn observe(&mut self, remaining: Option<usize>) {
        if remaining.is_some() {
            self.observed = remaining;
        }
    }

    /// Current remaining quota.
    ///
    /// A 401 always propagates; any other failure follows
    /// [`GatePolicy::on_query_error`].
    pub async fn check(&mut self) -> Result<usize, GitHubError> {
        if let Some(remaining) = self.observed.take() {
            return Ok(remaining);
        }

        match self.client.rate_limit().await {
            Ok(limits) => Ok(match self.resource {
                QuotaResource::Core => limits.core().remaining,
                QuotaResource::Graphql => limits.graphql().remaining,
            }),
            Err(e) if e.is_auth_failure() => Err(e),
            Err(e) => match self.policy.on_query_error {
                RateLimitErrorPolicy::Abort => Err(e),
                RateLimitErrorPolicy::AssumeRemaining => {
                    tracing::warn!(
                        error = %e,
                        assumed = ASSUMED_REMAINING_ON_ERROR,
                        "Rate limit query failed; assuming full quota"
                    );
                    Ok(ASSUMED_REMAINING_ON_ERROR)
                }
            },
        }
    }

    /// Wait until the remaining quota exceeds the threshold.
    ///
    /// Returns the quota that let the run proceed.
    pub async fn wait_for_quota(
        &mut self,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<usize, GitHubError> {
        loop {
            let remaining = self.check().await?;
            emit(on_progress, FetchProgress::QuotaChecked { remaining });

            if remaining > self.policy.threshold {
                return Ok(remaining);
            }

            tracing::info!(
                remaining,
                threshold = self.policy.threshold,
                wait_secs = self.policy.interval.as_secs(),
                "Quota low, backing off"
            );
            emit(
                on_progress,
                FetchProgress::Backoff {
                    remaining,
                    threshold: self.policy.threshold,
                    wait: self.policy.interval,
                },
            );
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Proactive request pacing using the governor crate.
///
/// Independent of the gate: the gate reacts to the server's quota, the pacer
/// caps how fast requests leave this process.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Allow at most `requests_per_second` requests (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until the next request may be sent.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::ClientConfig;
    use crate::http::{HttpMethod, MockTransport};
    use serde_json::json;
    use std::sync::Mutex;

    const API: &str = "https://api.test";

    fn gate(transport: &MockTransport, resource: QuotaResource, policy: GatePolicy) -> RateLimitGate {
        let config = ClientConfig::new("u", "t").with_api_url(API);
        let client = GitHubClient::with_transport(config, Arc::new(transport.clone()));
        RateLimitGate::new(client, resource, policy)
    }

    fn push_remaining(transport: &MockTransport, core: usize, graphql: usize) {
        transport.push_json(
            HttpMethod::Get,
            format!("{API}/rate_limit"),
            200,
            json!({
                "rate": {"remaining": core},
                "resources": {
                    "core": {"remaining": core},
                    "graphql": {"remaining": graphql}
                }
            }),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn proceeds_immediately_above_threshold() {
        let transport = MockTransport::new();
        push_remaining(&transport, 4000, 4000);
        let mut gate = gate(&transport, QuotaResource::Core, GatePolicy::default());

        let before = tokio::time::Instant::now();
        assert_eq!(gate.wait_for_quota(None).await.unwrap(), 4000);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_then_requeries() {
        let transport = MockTransport::new();
        push_remaining(&transport, 50, 5000);
        push_remaining(&transport, 100, 5000);
        push_remaining(&transport, 4000, 5000);
        let mut gate = gate(&transport, QuotaResource::Core, GatePolicy::default());

        let backoffs = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&backoffs);
        let callback: ProgressCallback = Box::new(move |event| {
            if let FetchProgress::Backoff { remaining, .. } = event {
                capture.lock().unwrap().push(remaining);
            }
        });

        let before = tokio::time::Instant::now();
        let remaining = gate.wait_for_quota(Some(&callback)).await.unwrap();
        assert_eq!(remaining, 4000);
        // remaining == threshold still backs off
        assert_eq!(*backoffs.lock().unwrap(), vec![50, 100]);
        assert!(before.elapsed() >= Duration::from_secs(120));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn graphql_gate_reads_graphql_bucket() {
        let transport = MockTransport::new();
        push_remaining(&transport, 4000, 10);
        push_remaining(&transport, 4000, 3000);
        let mut gate = gate(&transport, QuotaResource::Graphql, GatePolicy::default());

        assert_eq!(gate.wait_for_quota(None).await.unwrap(), 3000);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn observed_quota_skips_the_query_once() {
        let transport = MockTransport::new();
        let mut gate = gate(&transport, QuotaResource::Graphql, GatePolicy::default());

        gate.observe(Some(1234));
        assert_eq!(gate.check().await.unwrap(), 1234);
        assert!(transport.requests().is_empty());

        push_remaining(&transport, 5000, 999);
        assert_eq!(gate.check().await.unwrap(), 999);
    }

    #[tokio::test]
    async fn query_failure_assumes_full_quota_by_default() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{API}/rate_limit"), 500, json!({}));
        let mut gate = gate(&transport, QuotaResource::Core, GatePolicy::default());

        assert_eq!(gate.check().await.unwrap(), ASSUMED_REMAINING_ON_ERROR);
    }

    #[tokio::test]
    async fn query_failure_aborts_when_configured() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{API}/rate_limit"), 500, json!({}));
        let policy = GatePolicy {
            on_query_error: RateLimitErrorPolicy::Abort,
            ..GatePolicy::default()
        };
        let mut gate = gate(&transport, QuotaResource::Core, policy);

        assert!(gate.check().await.is_err());
    }

    #[tokio::test]
    async fn unauthorized_quota_query_always_fails() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{API}/rate_limit"), 401, json!({}));
        let mut gate = gate(&transport, QuotaResource::Core, GatePolicy::default());

        assert!(gate.check().await.unwrap_err().is_auth_failure());
    }

    #[tokio::test]
    async fn pacer_allows_first_request_immediately() {
        let limiter = ApiRateLimiter::new(100);
        let start = std::time::Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn zero_rps_is_clamped() {
        let _ = ApiRateLimiter::new(0);
    }
}
