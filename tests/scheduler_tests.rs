// Update Scheduler Integration Tests

use async_trait::async_trait;
use columbus::ColumbusError;
use columbus::db::{ColumbusDatabase, DatabaseConfig, DomainStore};
use columbus::dns::{DnsClient, RecordResolver};
use columbus::scheduler::{
    JobKind, SamplerSettings, SchedulerSettings, UpdateJob, UpdateQueue, UpdateScheduler,
    WorkerPool, samplers,
};
use hickory_proto::rr::RecordType;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

async fn open() -> ColumbusDatabase {
    let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "columbusscheduler{}_{}.db",
        std::process::id(),
        counter
    ));
    let _ = std::fs::remove_file(&path);
    ColumbusDatabase::new(&DatabaseConfig::sqlite(path)).await.unwrap()
}

/// Every name has one A record
struct StaticClient;

#[async_trait]
impl DnsClient for StaticClient {
    async fn query(&self, name: &str, record_type: RecordType) -> columbus::Result<Vec<String>> {
        if record_type == RecordType::A && name.starts_with("www.") {
            Ok(vec!["192.0.2.1".to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}

fn resolver(store: &Arc<dyn DomainStore>) -> Arc<RecordResolver> {
    Arc::new(RecordResolver::new(Arc::clone(store), Arc::new(StaticClient)))
}

#[tokio::test]
async fn test_insert_new_job_creates_and_resolves() {
    let db = open().await;
    let store = db.store();

    let queue = Arc::new(UpdateQueue::new(10));
    let pool = WorkerPool::new(queue, Arc::clone(&store), resolver(&store));

    pool.execute(UpdateJob::insert_new("www.example.com")).await;

    let records = store.records_of("www.example.com", -1).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "192.0.2.1");

    db.close().await;
}

#[tokio::test]
async fn test_invalid_job_is_dropped() {
    let db = open().await;
    let store = db.store();

    let queue = Arc::new(UpdateQueue::new(10));
    let pool = WorkerPool::new(queue, Arc::clone(&store), resolver(&store));

    // Logged and skipped, never panics
    pool.execute(UpdateJob::insert_new("co.uk")).await;
    pool.execute(UpdateJob::refresh("unknown.example.com")).await;

    assert!(store.full_hostnames_of("example.com", -1).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_direct_insert_validates_synchronously() {
    let db = open().await;
    let store = db.store();
    let root = CancellationToken::new();

    let scheduler = UpdateScheduler::start(
        Arc::clone(&store),
        resolver(&store),
        SchedulerSettings::default(),
        &root,
    );

    assert!(matches!(
        scheduler.insert("com"),
        Err(ColumbusError::InvalidDomain { .. }) | Err(ColumbusError::TldOnly { .. })
    ));
    assert!(matches!(
        scheduler.insert("bad name.example.com"),
        Err(ColumbusError::InvalidDomain { .. })
    ));

    scheduler.insert("WWW.Example.org").unwrap();
    scheduler.drain().await;

    let hostnames = store.full_hostnames_of("example.org", -1).await.unwrap();
    assert_eq!(hostnames, vec!["www.example.org".to_string()]);

    db.close().await;
}

#[tokio::test]
async fn test_full_queue_reported() {
    let queue = UpdateQueue::new(2);
    let sender = queue.sender();

    sender.try_enqueue(UpdateJob::insert_new("a.example.com")).unwrap();
    sender.try_enqueue(UpdateJob::insert_new("b.example.com")).unwrap();
    assert!(matches!(
        sender.try_enqueue(UpdateJob::insert_new("c.example.com")),
        Err(ColumbusError::QueueFull)
    ));
    assert_eq!(sender.depth(), 2);
}

#[tokio::test]
async fn test_stale_sampler_enqueues_refresh() {
    let db = open().await;
    let store = db.store();

    store.insert_domain("one.example.com").await.unwrap();
    store.insert_domain("two.example.com").await.unwrap();

    let queue = UpdateQueue::new(100);
    let cancel = CancellationToken::new();
    let settings = SamplerSettings {
        idle_interval: Duration::from_secs(3600),
        ..SamplerSettings::default()
    };

    let sampler = tokio::spawn(samplers::run_stale_sampler(
        Arc::clone(&store),
        queue.sender(),
        settings,
        cancel.clone(),
    ));

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let job = tokio::time::timeout(Duration::from_secs(5), queue.dequeue())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.kind, JobKind::Refresh);
        if !seen.contains(&job.domain) {
            seen.push(job.domain);
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["one.example.com", "two.example.com"]);

    cancel.cancel();
    sampler.await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_popular_sampler_expands_toplist() {
    let db = open().await;
    let store = db.store();

    store.insert_domain("www.example.net").await.unwrap();
    store.insert_domain("mail.example.net").await.unwrap();
    store.toplist_insert("example.net").await.unwrap();

    let queue = UpdateQueue::new(100);
    let cancel = CancellationToken::new();

    let sampler = tokio::spawn(samplers::run_popular_sampler(
        Arc::clone(&store),
        queue.sender(),
        SamplerSettings::default(),
        cancel.clone(),
    ));

    let mut seen = Vec::new();
    for _ in 0..2 {
        let job = tokio::time::timeout(Duration::from_secs(5), queue.dequeue())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.kind, JobKind::Refresh);
        seen.push(job.domain);
    }
    seen.sort();
    assert_eq!(seen, vec!["mail.example.net", "www.example.net"]);

    cancel.cancel();
    sampler.await.unwrap();
    db.close().await;
}
