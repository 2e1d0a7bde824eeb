//! Concurrent access tests.
//!
//! Many tasks share one executor and one registry. Each task must only ever
//! observe its own tenant's rows, whether its context is passed explicitly
//! or bound as the ambient task-local.

use std::sync::Arc;

use orbis_persistence::query::{Query, Row};
use orbis_persistence::tenant::ambient;

use crate::common::*;

const TENANTS: [&str; 4] = ["tenant-a", "tenant-b", "tenant-c", "tenant-d"];
const TASKS: usize = 64;
const ROUNDS: usize = 25;

fn all_owned_by(rows: &[Row], tenant: &str) -> bool {
    tenants_of(rows).iter().all(|t| t == tenant)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_explicit_contexts_never_leak() {
    let executor = Arc::new(create_memory_executor());
    seed_invoices(executor.as_ref(), &TENANTS, 20).await;

    let mut handles = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        let executor = Arc::clone(&executor);
        let tenant = TENANTS[i % TENANTS.len()];
        handles.push(tokio::spawn(async move {
            let ctx = create_tenant(tenant);
            for _ in 0..ROUNDS {
                let rows = executor.find(&ctx, Query::<Invoice>::all()).await.unwrap();
                assert_eq!(rows.len(), 20);
                assert!(all_owned_by(&rows, tenant));
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ambient_contexts_never_leak() {
    let executor = Arc::new(create_memory_executor());
    seed_invoices(executor.as_ref(), &TENANTS, 10).await;

    let mut handles = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        let executor = Arc::clone(&executor);
        let tenant = TENANTS[i % TENANTS.len()];
        handles.push(tokio::spawn(ambient::scope(
            create_tenant(tenant),
            async move {
                for _ in 0..ROUNDS {
                    // Yield between reads so tasks migrate across workers
                    tokio::task::yield_now().await;
                    let rows = executor.find_ambient(Query::<Invoice>::all()).await.unwrap();
                    assert_eq!(rows.len(), 10);
                    assert!(all_owned_by(&rows, tenant));
                }
            },
        )));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_task_does_not_inherit_ambient_context() {
    let executor = Arc::new(create_memory_executor());
    seed_invoices(executor.as_ref(), &["tenant-a"], 5).await;

    let inner = Arc::clone(&executor);
    let count = ambient::scope(create_tenant("tenant-a"), async move {
        tokio::spawn(async move { inner.count_ambient(Query::<Invoice>::all()).await })
            .await
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_stay_partitioned() {
    let executor = Arc::new(create_memory_executor());

    let mut handles = Vec::new();
    for (t, tenant) in TENANTS.iter().enumerate() {
        let executor = Arc::clone(&executor);
        let tenant = *tenant;
        handles.push(tokio::spawn(async move {
            let ctx = create_tenant(tenant);
            for n in 0..50 {
                let id = t as i64 * 1_000 + n;
                executor
                    .insert::<Invoice>(&ctx, invoice_row(id, "N", 1.0))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for tenant in TENANTS {
        let rows = executor
            .find(&create_tenant(tenant), Query::<Invoice>::all())
            .await
            .unwrap();
        assert_eq!(rows.len(), 50);
        assert!(all_owned_by(&rows, tenant));
    }
}
