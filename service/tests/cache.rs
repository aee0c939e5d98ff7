mod common;

use std::sync::Arc;
use std::time::Duration;

use celebi_client::{BreakerConfig, FetchError, ResilientClient, RetryPolicy, UpstreamError};
use celebi_dex::{Direction, RelationKind, RelationshipGraph};
use celebi_service::{CacheConfig, CacheLayer};
use common::{MockUpstream, records, species_key};
use tokio_util::sync::CancellationToken;

fn cache_with(
    upstream: &Arc<MockUpstream>,
    config: CacheConfig,
) -> (CacheLayer, Arc<RelationshipGraph>) {
    let client = Arc::new(ResilientClient::new(
        upstream.clone(),
        RetryPolicy::none(),
        BreakerConfig::default(),
    ));
    let graph = Arc::new(RelationshipGraph::new());
    (CacheLayer::new(config, client, Arc::clone(&graph)), graph)
}

fn upstream() -> Arc<MockUpstream> {
    Arc::new(MockUpstream::new(records()))
}

#[tokio::test(start_paused = true)]
async fn test_fresh_entry_served_without_upstream_call() {
    let upstream = upstream();
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("pikachu");

    let first = cache.get_or_fetch(&key).await.unwrap();
    let second = cache.get_or_fetch(&key).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(upstream.calls(&key), 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.fetches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_fetch() {
    let upstream = Arc::new(MockUpstream::new(records()).with_latency(Duration::from_millis(100)));
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("pikachu");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get_or_fetch(&key).await })
        })
        .collect();

    let results: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(upstream.calls(&key), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));

    let stats = cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.misses, 10);
    assert_eq!(stats.coalesced, 9);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_waiter_does_not_cancel_fetch() {
    let upstream = Arc::new(MockUpstream::new(records()).with_latency(Duration::from_secs(1)));
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("raichu");

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.get_or_fetch(&key)).await;
    assert!(abandoned.is_err());

    // Joins the fetch the first caller started
    let record = cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(record.name, "Raichu");
    assert_eq!(upstream.calls(&key), 1);
    assert_eq!(cache.stats().coalesced, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_completes_with_no_waiters() {
    let upstream = Arc::new(MockUpstream::new(records()).with_latency(Duration::from_secs(1)));
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("raichu");

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.get_or_fetch(&key)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(cache.get(&key).is_some());
    assert_eq!(upstream.calls(&key), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_not_cached() {
    let upstream = upstream();
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("pikachu");
    upstream.fail_next(&key, [UpstreamError::Unavailable("HTTP 503".to_string())]);

    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, FetchError::Transient { attempts: 1, .. }));
    assert!(cache.is_empty());

    cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(upstream.calls(&key), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_share_one_failure() {
    let upstream = Arc::new(MockUpstream::new(records()).with_latency(Duration::from_millis(100)));
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("pikachu");
    upstream.fail_next(&key, [UpstreamError::Unavailable("HTTP 503".to_string())]);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get_or_fetch(&key).await })
        })
        .collect();

    let errors: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap_err())
        .collect();

    assert_eq!(upstream.calls(&key), 1);
    assert!(matches!(errors[0], FetchError::Transient { attempts: 1, .. }));
    assert!(errors.iter().all(|e| *e == errors[0]));
    assert!(cache.is_empty());

    // The failed fetch left nothing behind, so this starts a new one
    cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(upstream.calls(&key), 2);
    assert_eq!(cache.stats().fetches, 2);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetch_does_not_poison_key() {
    let upstream = upstream();
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("raichu");
    upstream.panic_next(&key);

    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, FetchError::Transient { attempts: 0, .. }));

    let record = cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(record.name, "Raichu");
    assert_eq!(upstream.calls(&key), 2);
    assert_eq!(cache.stats().coalesced, 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_refetched() {
    let upstream = upstream();
    let config = CacheConfig {
        ttl: Duration::from_secs(10),
        ..CacheConfig::default()
    };
    let (cache, _) = cache_with(&upstream, config);
    let key = species_key("pikachu");

    cache.get_or_fetch(&key).await.unwrap();
    tokio::time::advance(Duration::from_secs(9)).await;
    cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(upstream.calls(&key), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get(&key).is_none());
    cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(upstream.calls(&key), 2);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired() {
    let upstream = upstream();
    let config = CacheConfig {
        ttl: Duration::from_secs(10),
        ..CacheConfig::default()
    };
    let (cache, _) = cache_with(&upstream, config);

    cache.get_or_fetch(&species_key("pichu")).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    cache.get_or_fetch(&species_key("pikachu")).await.unwrap();
    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&species_key("pikachu")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_until_cancelled() {
    let upstream = upstream();
    let config = CacheConfig {
        ttl: Duration::from_secs(10),
        sweep_interval: Duration::from_secs(60),
        ..CacheConfig::default()
    };
    let (cache, _) = cache_with(&upstream, config);
    let cancel = CancellationToken::new();
    let sweeper = cache.spawn_sweeper(cancel.clone());

    cache.get_or_fetch(&species_key("pikachu")).await.unwrap();
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(cache.len(), 0);

    cancel.cancel();
    sweeper.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_lru_eviction_follows_access_order() {
    let upstream = upstream();
    let config = CacheConfig {
        max_entries: 2,
        ..CacheConfig::default()
    };
    let (cache, _) = cache_with(&upstream, config);
    let (pichu, pikachu, raichu) = (
        species_key("pichu"),
        species_key("pikachu"),
        species_key("raichu"),
    );

    cache.get_or_fetch(&pichu).await.unwrap();
    cache.get_or_fetch(&pikachu).await.unwrap();
    // Touch pichu so pikachu becomes least recently used
    cache.get_or_fetch(&pichu).await.unwrap();
    cache.get_or_fetch(&raichu).await.unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.get(&pikachu).is_none());
    assert!(cache.get(&pichu).is_some());
    assert_eq!(cache.stats().evictions, 1);

    cache.get_or_fetch(&pikachu).await.unwrap();
    assert_eq!(upstream.calls(&pikachu), 2);
    assert_eq!(upstream.calls(&pichu), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate() {
    let upstream = upstream();
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("pikachu");

    cache.get_or_fetch(&key).await.unwrap();
    assert!(cache.invalidate(&key));
    assert!(!cache.invalidate(&key));

    cache.get_or_fetch(&key).await.unwrap();
    assert_eq!(upstream.calls(&key), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetched_edges_enter_graph() {
    let upstream = upstream();
    let (cache, graph) = cache_with(&upstream, CacheConfig::default());

    cache.get_or_fetch(&species_key("pikachu")).await.unwrap();

    let evolutions: Vec<_> = graph
        .traverse(&species_key("pikachu"), RelationKind::EvolvesTo, Direction::Outgoing)
        .collect();
    assert_eq!(evolutions, vec![species_key("pikachu"), species_key("raichu")]);

    // The gigantamax relation is quarantined on the record only
    assert!(!graph.contains(&species_key("pikachu-gmax")));
    let record = cache.get(&species_key("pikachu")).unwrap();
    assert_eq!(record.unrecognized().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_not_cached() {
    let upstream = upstream();
    let (cache, _) = cache_with(&upstream, CacheConfig::default());
    let key = species_key("mew");

    for _ in 0..2 {
        let err = cache.get_or_fetch(&key).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Permanent(celebi_client::PermanentError::NotFound)
        );
    }
    assert_eq!(upstream.calls(&key), 2);
}
