//! Async Dispatch Tests
//!
//! Dispatches scheduled on the blocking pool:
//! - concurrent dispatches to different backends stay isolated
//! - each scheduled job sees exactly the context it was given
//! - worker panics surface as errors

use std::sync::Arc;

use backplane::backend::{
    ActionDispatcher, ActionInput, ActionOutput, BackendModuleDescriptor, BackendRegistry,
    DispatchError, InsertInput, QueryInput,
};
use backplane::config::EvaluatorConfig;
use backplane::core::{BackendMetaData, ExecutionContext, Instance, Record, Session, TableMetaData};
use backplane::memory::{MemoryBackendModule, MemoryRecordStore, MEMORY_BACKEND_TYPE};
use backplane::runtime::AsyncDispatcher;

// =============================================================================
// Helper Functions
// =============================================================================

struct Fixture {
    runner: AsyncDispatcher,
    ctx: ExecutionContext,
    primary: Arc<MemoryRecordStore>,
    archive: Arc<MemoryRecordStore>,
}

fn fixture() -> Fixture {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let primary = Arc::new(MemoryRecordStore::new());
    let archive = Arc::new(MemoryRecordStore::new());

    let registry = BackendRegistry::new();
    registry.register(MemoryBackendModule::descriptor(
        primary.clone(),
        EvaluatorConfig::default(),
    ));
    let archive_store = archive.clone();
    registry.register(BackendModuleDescriptor::new("archive", move || {
        Box::new(MemoryBackendModule::new(
            archive_store.clone(),
            EvaluatorConfig::default(),
        ))
    }));

    let instance = Instance::new()
        .with_backend(BackendMetaData::new("main", MEMORY_BACKEND_TYPE))
        .with_backend(BackendMetaData::new("cold", "archive"))
        .with_table(TableMetaData::new("person", "main"))
        .with_table(TableMetaData::new("old_person", "cold"));

    let dispatcher = Arc::new(ActionDispatcher::new(Arc::new(registry)));
    Fixture {
        runner: AsyncDispatcher::try_current(dispatcher).unwrap(),
        ctx: ExecutionContext::anonymous(Arc::new(instance)),
        primary,
        archive,
    }
}

fn insert(table: &str, n: usize) -> ActionInput {
    let records = (0..n)
        .map(|i| Record::new().with("name", format!("{}-{}", table, i)))
        .collect();
    InsertInput::new(table, records).into()
}

// =============================================================================
// Isolation Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_dispatches_to_different_backends_are_isolated() {
    let f = fixture();

    let mut pending = Vec::new();
    for _ in 0..8 {
        pending.push(f.runner.dispatch_async(f.ctx.clone(), insert("person", 3)));
        pending.push(f.runner.dispatch_async(f.ctx.clone(), insert("old_person", 2)));
    }
    for future in pending {
        future.await.unwrap();
    }

    assert_eq!(f.primary.len("person"), 24);
    assert_eq!(f.primary.len("old_person"), 0);
    assert_eq!(f.archive.len("old_person"), 16);
    assert_eq!(f.archive.len("person"), 0);

    // generated keys are unique under concurrency
    let mut ids: Vec<i64> = f
        .primary
        .records("person")
        .iter()
        .filter_map(|r| r.value("id").as_i64())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_results_follow_their_backend() {
    let f = fixture();
    f.runner
        .dispatch_async(f.ctx.clone(), insert("person", 1))
        .await
        .unwrap();

    let (hot, cold) = tokio::join!(
        f.runner
            .dispatch_async(f.ctx.clone(), QueryInput::new("person").into()),
        f.runner
            .dispatch_async(f.ctx.clone(), QueryInput::new("old_person").into()),
    );
    match (hot.unwrap(), cold.unwrap()) {
        (ActionOutput::Query(hot), ActionOutput::Query(cold)) => {
            assert_eq!(hot.records.len(), 1);
            assert!(cold.records.is_empty());
        }
        other => panic!("unexpected outputs: {other:?}"),
    }
}

// =============================================================================
// Context Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_each_job_sees_its_own_session() {
    let f = fixture();
    let users = ["ana", "ben", "cy", "dee"];

    let jobs: Vec<_> = users
        .iter()
        .map(|user| {
            let ctx = f.ctx.with_session(Session::for_user(*user));
            f.runner
                .run_async(ctx, |ctx| ctx.session().user_id.clone().unwrap_or_default())
        })
        .collect();

    let mut seen = Vec::new();
    for job in jobs {
        seen.push(job.await.unwrap());
    }
    assert_eq!(seen, users);
}

#[tokio::test]
async fn test_worker_panic_surfaces_as_error() {
    let f = fixture();
    let err = f
        .runner
        .run_async(f.ctx.clone(), |_| -> () { panic!("worker exploded") })
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::WorkerPanicked("worker exploded".into()));
}

#[tokio::test]
async fn test_dropped_future_still_runs() {
    let f = fixture();
    drop(f.runner.dispatch_async(f.ctx.clone(), insert("person", 2)));

    // The dropped dispatch keeps running; wait for its commit
    for _ in 0..100 {
        if f.primary.len("person") == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(f.primary.len("person"), 2);
}
