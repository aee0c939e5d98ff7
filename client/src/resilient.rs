use std::sync::Arc;

use celebi_dex::Record;
use celebi_protocol::{CanonicalKey, UpstreamError};

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::error::{Classified, FetchError, PermanentError};
use crate::retry::RetryPolicy;
use crate::upstream::Upstream;

/// Fetches records from an [`Upstream`] with retries and a circuit breaker.
///
/// One `ResilientClient` is shared by every key, so the breaker sees the
/// health of the upstream as a whole.
pub struct ResilientClient {
    upstream: Arc<dyn Upstream>,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientClient {
    pub fn new(upstream: Arc<dyn Upstream>, policy: RetryPolicy, breaker: BreakerConfig) -> Self {
        Self {
            upstream,
            policy,
            breaker: CircuitBreaker::new(breaker),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Fetch and convert the record for `key`.
    ///
    /// Transient failures are retried per the [`RetryPolicy`]; permanent
    /// ones return immediately. The breaker is consulted before every
    /// attempt.
    pub async fn fetch(&self, key: &CanonicalKey) -> Result<Record, FetchError> {
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let permit = self.breaker.acquire().inspect_err(|_| {
                tracing::debug!(key = %key, attempt, "Circuit open, not contacting upstream");
            })?;

            let err = match self.upstream.fetch_record(key).await {
                Ok(raw) => {
                    permit.success();
                    return Record::from_raw_for(key, raw).map_err(|e| {
                        tracing::warn!(
                            key = %key,
                            error = %e,
                            "Upstream returned an unusable record"
                        );
                        FetchError::Permanent(PermanentError::from(e))
                    });
                }
                Err(err) => err,
            };

            let reason = match Classified::from(&err) {
                Classified::Permanent(permanent) => {
                    // A definitive answer means upstream is healthy
                    permit.success();
                    tracing::debug!(key = %key, error = %err, "Permanent upstream failure");
                    return Err(permanent.into());
                }
                Classified::Transient(reason) => {
                    permit.failure();
                    reason
                }
            };

            let hint = match err {
                UpstreamError::RateLimited { retry_after } => retry_after,
                _ => None,
            };

            let Some(delay) = backoff.next_delay(hint) else {
                tracing::warn!(
                    key = %key,
                    attempts = attempt,
                    error = %err,
                    "Giving up on upstream fetch"
                );
                return Err(FetchError::Transient {
                    attempts: attempt,
                    reason,
                });
            };

            tracing::warn!(
                key = %key,
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Upstream fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use celebi_protocol::{RawAttributes, RawRecord};
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::breaker::BreakerState;

    /// Replays scripted responses, then keeps answering with `fallback`
    struct Scripted {
        script: Mutex<VecDeque<Result<RawRecord, UpstreamError>>>,
        fallback: Result<RawRecord, UpstreamError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(
            script: Vec<Result<RawRecord, UpstreamError>>,
            fallback: Result<RawRecord, UpstreamError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for Scripted {
        async fn fetch_record(&self, _key: &CanonicalKey) -> Result<RawRecord, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn ability(slug: &str) -> RawRecord {
        RawRecord {
            key: CanonicalKey::ability(slug),
            id: 9,
            display_name: Some("Static".to_string()),
            attributes: RawAttributes::Ability {
                effect: Some("May paralyze on contact.".to_string()),
                generation: Some("generation-iii".to_string()),
            },
            relations: Vec::new(),
        }
    }

    fn unavailable() -> Result<RawRecord, UpstreamError> {
        Err(UpstreamError::Unavailable("HTTP 503".to_string()))
    }

    fn client(upstream: Arc<Scripted>, max_attempts: u32, threshold: u32) -> ResilientClient {
        ResilientClient::new(
            upstream,
            RetryPolicy {
                max_attempts,
                jitter: 0.0,
                ..RetryPolicy::default()
            },
            BreakerConfig {
                failure_threshold: threshold,
                ..BreakerConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let upstream = Scripted::new(vec![unavailable(), unavailable()], Ok(ability("static")));
        let client = client(upstream.clone(), 5, 10);

        let start = Instant::now();
        let record = client.fetch(&CanonicalKey::ability("static")).await.unwrap();

        assert_eq!(record.name, "Static");
        assert_eq!(upstream.calls(), 3);
        // 0.5s + 1s of backoff
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_attempt_ceiling() {
        let upstream = Scripted::new(vec![], unavailable());
        let client = client(upstream.clone(), 4, 100);

        let err = client.fetch(&CanonicalKey::ability("static")).await.unwrap_err();

        assert!(matches!(err, FetchError::Transient { attempts: 4, .. }));
        assert_eq!(upstream.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let upstream = Scripted::new(vec![], Err(UpstreamError::NotFound));
        let client = client(upstream.clone(), 5, 1);

        let err = client.fetch(&CanonicalKey::ability("nope")).await.unwrap_err();

        assert_eq!(err, FetchError::Permanent(PermanentError::NotFound));
        assert_eq!(upstream.calls(), 1);
        assert_eq!(client.breaker().state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_record_is_permanent() {
        let upstream = Scripted::new(vec![], Ok(ability("levitate")));
        let client = client(upstream.clone(), 5, 10);

        let err = client.fetch(&CanonicalKey::ability("static")).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Permanent(PermanentError::Malformed(_))
        ));
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_is_honored() {
        let upstream = Scripted::new(
            vec![Err(UpstreamError::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
            })],
            Ok(ability("static")),
        );
        let client = client(upstream.clone(), 5, 10);

        let start = Instant::now();
        client.fetch(&CanonicalKey::ability("static")).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_fails_fast() {
        let upstream = Scripted::new(vec![], unavailable());
        let client = client(upstream.clone(), 10, 3);

        // Breaker opens on the third failed attempt and stops the retry loop
        let err = client.fetch(&CanonicalKey::ability("static")).await.unwrap_err();
        assert_eq!(err, FetchError::CircuitOpen);
        assert_eq!(upstream.calls(), 3);

        let err = client.fetch(&CanonicalKey::ability("levitate")).await.unwrap_err();
        assert_eq!(err, FetchError::CircuitOpen);
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_closes_breaker() {
        let upstream = Scripted::new(vec![unavailable()], Ok(ability("static")));
        let client = client(upstream.clone(), 1, 1);

        let err = client.fetch(&CanonicalKey::ability("static")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transient { attempts: 1, .. }));
        assert_eq!(client.breaker().state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;

        client.fetch(&CanonicalKey::ability("static")).await.unwrap();
        assert_eq!(client.breaker().state(), BreakerState::Closed);
        assert_eq!(upstream.calls(), 2);
    }
}
