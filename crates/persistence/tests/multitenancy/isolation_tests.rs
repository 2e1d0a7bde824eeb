//! Tests for tenant data isolation.

use orbis_persistence::query::{Predicate, Query, Row, Scope};
use orbis_persistence::tenant::TenantId;

use crate::common::*;

// ============================================================================
// Invoice Partition
// ============================================================================

#[tokio::test]
async fn test_invoice_partition_between_two_tenants() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 25).await;

    let a = executor
        .find(&create_tenant("tenant-a"), Query::<Invoice>::all())
        .await
        .unwrap();
    let b = executor
        .find(&create_tenant("tenant-b"), Query::<Invoice>::all())
        .await
        .unwrap();

    assert_eq!(a.len(), 25);
    assert_eq!(b.len(), 25);
    assert!(tenants_of(&a).iter().all(|t| t == "tenant-a"));
    assert!(tenants_of(&b).iter().all(|t| t == "tenant-b"));

    // Strict partition: no id is visible to both, and together they cover the table
    let ids = |rows: &[Row]| -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.get("id").and_then(|v| v.as_i64()))
            .collect()
    };
    let ids_a = ids(&a);
    let ids_b = ids(&b);
    assert!(ids_a.iter().all(|id| !ids_b.contains(id)));
    assert_eq!(ids_a.len() + ids_b.len(), executor.engine().row_count("invoices"));
}

#[tokio::test]
async fn test_caller_predicate_is_conjoined_not_widened() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 10).await;
    let ctx = create_tenant("tenant-a");

    // A caller predicate that, on its own, would match rows of both tenants
    let wide = Predicate::eq("tenant_id", "tenant-b").or(Predicate::ge("total", 0));
    let rows = executor
        .find(&ctx, Query::<Invoice>::filter(wide))
        .await
        .unwrap();

    assert_eq!(rows.len(), 10);
    assert!(tenants_of(&rows).iter().all(|t| t == "tenant-a"));
}

#[tokio::test]
async fn test_caller_cannot_select_other_tenant_by_id() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 3).await;

    // Ids 10_000.. belong to tenant-b
    let rows = executor
        .find(
            &create_tenant("tenant-a"),
            Query::<Invoice>::filter(Predicate::eq("id", 10_000)),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_paging_stays_within_tenant() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 12).await;
    let ctx = create_tenant("tenant-b");

    let page = executor
        .find(&ctx, Query::<Invoice>::all().order_by("id").offset(10).limit(5))
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert!(tenants_of(&page).iter().all(|t| t == "tenant-b"));
}

#[tokio::test]
async fn test_count_matches_find() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b", "tenant-c"], 7).await;

    for tenant in ["tenant-a", "tenant-b", "tenant-c"] {
        let ctx = create_tenant(tenant);
        let query = Query::<Invoice>::filter(Predicate::lt("total", 103.0));
        let found = executor.find(&ctx, query.clone()).await.unwrap();
        let counted = executor.count(&ctx, query).await.unwrap();
        assert_eq!(found.len() as u64, counted);
        assert_eq!(counted, 3);
    }
}

// ============================================================================
// Custom and Unfiltered Entities
// ============================================================================

#[tokio::test]
async fn test_custom_filter_shows_own_and_shared_rows() {
    let executor = create_memory_executor();
    let a = create_tenant("tenant-a");
    let b = create_tenant("tenant-b");

    executor
        .insert::<Customer>(
            &a,
            Row::new()
                .with("id", 1)
                .with("owner_tenant", "tenant-a")
                .with("name", "Private A")
                .with("shared", false),
        )
        .await
        .unwrap();
    executor
        .insert::<Customer>(
            &b,
            Row::new()
                .with("id", 2)
                .with("owner_tenant", "tenant-b")
                .with("name", "Shared by B")
                .with("shared", true),
        )
        .await
        .unwrap();

    let seen_by_a = executor.find(&a, Query::<Customer>::all()).await.unwrap();
    let seen_by_b = executor.find(&b, Query::<Customer>::all()).await.unwrap();

    assert_eq!(seen_by_a.len(), 2);
    assert_eq!(seen_by_b.len(), 1);
    assert_eq!(
        seen_by_b[0].get("name").and_then(|v| v.as_str()),
        Some("Shared by B")
    );
}

#[tokio::test]
async fn test_unfiltered_entity_is_visible_to_everyone() {
    let executor = create_memory_executor();
    let a = create_tenant("tenant-a");
    for (code, name) in [("NZ", "New Zealand"), ("PT", "Portugal")] {
        executor
            .insert::<Country>(&a, Row::new().with("code", code).with("name", name))
            .await
            .unwrap();
    }

    let for_b = executor
        .count(&create_tenant("tenant-b"), Query::<Country>::all())
        .await
        .unwrap();
    assert_eq!(for_b, 2);

    let scoped = executor
        .registry()
        .scope(&create_tenant("tenant-b"), Query::<Country>::all());
    assert_eq!(scoped.scope(), &Scope::Unfiltered);
}

#[tokio::test]
async fn test_factory_evaluated_per_query() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 2).await;

    // The same executor and registry serve alternating tenants
    for round in 0..10 {
        let tenant = if round % 2 == 0 { "tenant-a" } else { "tenant-b" };
        let ctx = create_tenant(tenant);
        let scoped = executor.registry().scope(&ctx, Query::<Invoice>::all());
        assert_eq!(scoped.scope(), &Scope::Tenant(TenantId::new(tenant)));

        let rows = executor.find(&ctx, Query::<Invoice>::all()).await.unwrap();
        assert!(tenants_of(&rows).iter().all(|t| t == tenant));
    }
}
