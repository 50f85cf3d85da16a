//! Integration tests for searchload against the in-process store

use futures_util::future::join_all;
use searchload::index::{merchant_index, probe_index};
use searchload::loader::{document_key, BatchPipeliner, Seeder, SessionLoader, SustainedLoader};
use searchload::probe::ProbeSettings;
use searchload::store::{Store, Write};
use searchload::{
    Config, EnsureOutcome, IdAllocator, IdRange, IndexManager, LatencyStats, MemoryStore,
    ProbeState, Prober, StopSignal,
};
use std::time::Duration;

fn small_config() -> Config {
    Config {
        total_docs: 250,
        batch_size: 100,
        total_sessions: 30,
        iterations: 5,
        report_every: 2,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_allocate_write_then_search() {
    let store = MemoryStore::new();
    let config = small_config();
    IndexManager::new(&store)
        .ensure(&merchant_index(&config.index_name, &config.key_prefix))
        .await
        .unwrap();

    let range = IdAllocator::new(&store, config.counter_key.as_str())
        .allocate(100)
        .await
        .unwrap();
    assert_eq!(range, IdRange::new(1, 100));

    let mut rng = rand::thread_rng();
    BatchPipeliner::new(&store)
        .write_range(range, |id| Write::Json {
            key: document_key(&config.key_prefix, id),
            value: searchload::records::merchant(id, &mut rng),
        })
        .await
        .unwrap();

    assert_eq!(store.len(), 100);
    let total = store
        .search_total(&config.index_name, "@id:[50 50]", 0, 1)
        .await
        .unwrap();
    assert!(total >= 1);
}

#[tokio::test]
async fn test_concurrent_allocations_never_overlap() {
    let store = MemoryStore::new();
    let allocator = IdAllocator::new(&store, "merchant:id");

    let ranges: Vec<IdRange> = join_all((0..16).map(|_| allocator.allocate(25)))
        .await
        .into_iter()
        .collect::<searchload::Result<_>>()
        .unwrap();

    for (i, a) in ranges.iter().enumerate() {
        assert_eq!(a.len(), 25);
        for b in &ranges[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }
    assert_eq!(store.counter("merchant:id"), 16 * 25);
}

#[tokio::test]
async fn test_ensure_index_twice_creates_once() {
    let store = MemoryStore::new();
    let manager = IndexManager::new(&store);
    let descriptor = merchant_index("idx:merchant", "merchant:");

    assert_eq!(manager.ensure(&descriptor).await.unwrap(), EnsureOutcome::Created);
    assert_eq!(manager.ensure(&descriptor).await.unwrap(), EnsureOutcome::Existed);
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn test_seed_then_index() {
    let store = MemoryStore::new();
    let config = small_config();

    let mut seeder = Seeder::new(&store, &config);
    seeder.run(&StopSignal::new()).await.unwrap();

    assert_eq!(seeder.report().sent, 250);
    assert_eq!(seeder.report().batches, 3);
    assert_eq!(store.len(), 250);
    assert!(store.created_index(&config.index_name).is_some());

    let total = store
        .search_total(&config.index_name, "@id:[1 250]", 0, 1)
        .await
        .unwrap();
    assert_eq!(total, 250);
}

#[tokio::test(start_paused = true)]
async fn test_sustained_load_shares_counter_with_probe() {
    let store = MemoryStore::new();
    let config = Config {
        target_rps: 100.0,
        batch_size: 10,
        duration_s: 1,
        ..small_config()
    };

    let mut loader = SustainedLoader::new(&store, &config);
    loader.run(&StopSignal::new()).await.unwrap();
    let last_id = loader.report().last_id.unwrap();

    IndexManager::new(&store)
        .ensure(&probe_index(&config.index_name, &config.key_prefix))
        .await
        .unwrap();
    let prober = Prober::new(&store, ProbeSettings::from(&config));
    let state = prober.probe_once(&StopSignal::new()).await.unwrap();
    assert!(state.id() > last_id);
    assert!(matches!(state, ProbeState::Visible { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_probe_zero_timeout_reports_failures() {
    let store = MemoryStore::new();
    let config = Config {
        timeout_ms: 0,
        ..small_config()
    };
    store
        .create_index_now(&probe_index(&config.index_name, &config.key_prefix))
        .unwrap();

    let prober = Prober::new(&store, ProbeSettings::from(&config));
    let mut stats = LatencyStats::new(config.sample_window).unwrap();
    prober
        .run(config.iterations, config.report_every, &mut stats, &StopSignal::new())
        .await
        .unwrap();

    let summary = stats.summary();
    assert_eq!(summary.samples, 0);
    assert_eq!(summary.failures, 5);
    assert_eq!(summary.to_string(), "n=0 fail=5");
}

#[tokio::test(start_paused = true)]
async fn test_probe_measures_index_lag() {
    let store = MemoryStore::with_index_lag(Some(Duration::from_millis(40)));
    let config = Config {
        sleep_ms: 10,
        ..small_config()
    };
    store
        .create_index_now(&probe_index(&config.index_name, &config.key_prefix))
        .unwrap();

    let prober = Prober::new(&store, ProbeSettings::from(&config));
    let mut stats = LatencyStats::new(config.sample_window).unwrap();
    prober
        .run(config.iterations, config.report_every, &mut stats, &StopSignal::new())
        .await
        .unwrap();

    assert_eq!(stats.samples(), 5);
    assert_eq!(stats.median(), Some(40.0));
    assert_eq!(stats.quantile(0.99), Some(40));
}

#[tokio::test]
async fn test_sessions_carry_ttl() {
    let store = MemoryStore::new();
    let config = small_config();

    let mut loader = SessionLoader::new(&store, &config);
    loader.run(&StopSignal::new()).await.unwrap();

    assert_eq!(loader.report().sent, 30);
    let key = format!("{}sess-{:08}", config.session_prefix, 1);
    let fields = store.hash(&key).unwrap();
    assert_eq!(fields["sid"], "sess-00000001");
    let ttl = store.ttl(&key).unwrap();
    assert!(config.ttl_range().contains(&ttl));
}

#[tokio::test]
async fn test_seed_fails_when_index_cannot_be_created() {
    let store = MemoryStore::new();
    store.fail_create_index(true);
    let config = small_config();

    let mut seeder = Seeder::new(&store, &config);
    let err = seeder.run(&StopSignal::new()).await.unwrap_err();

    assert!(matches!(err, searchload::Error::IndexCreate { .. }));
    assert_eq!(seeder.report().sent, 250);
    assert!(store.created_index(&config.index_name).is_none());
}
