//! Tests for fail-closed behavior and explicit system access.

use orbis_persistence::error::{StorageError, TenantError, ValidationError};
use orbis_persistence::query::{FailClosedReason, Predicate, Query, Row, Scope, SystemAccess};
use orbis_persistence::tenant::{TenantContext, ambient};

use crate::common::*;

// ============================================================================
// Missing Tenant
// ============================================================================

#[tokio::test]
async fn test_anonymous_context_sees_no_rows() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 5).await;
    let anonymous = TenantContext::anonymous();

    let rows = executor
        .find(&anonymous, Query::<Invoice>::all())
        .await
        .unwrap();
    assert!(rows.is_empty());

    let count = executor
        .count(&anonymous, Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_anonymous_context_sees_no_custom_rows() {
    let executor = create_memory_executor();
    executor
        .insert::<Customer>(
            &create_tenant("tenant-a"),
            Row::new()
                .with("id", 1)
                .with("owner_tenant", "tenant-a")
                .with("name", "Shared")
                .with("shared", true),
        )
        .await
        .unwrap();

    // Even shared rows stay hidden without a tenant
    let scoped = executor
        .registry()
        .scope(&TenantContext::anonymous(), Query::<Customer>::all());
    assert_eq!(scoped.scope(), &Scope::FailClosed(FailClosedReason::NoTenant));

    let rows = executor
        .find(&TenantContext::anonymous(), Query::<Customer>::all())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_anonymous_update_and_delete_touch_nothing() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a"], 4).await;
    let anonymous = TenantContext::anonymous();

    let updated = executor
        .update(&anonymous, Query::<Invoice>::all(), Row::new().with("paid", true))
        .await
        .unwrap();
    let deleted = executor
        .delete(&anonymous, Query::<Invoice>::all())
        .await
        .unwrap();

    assert_eq!(updated, 0);
    assert_eq!(deleted, 0);
    assert_eq!(executor.engine().row_count("invoices"), 4);
}

#[tokio::test]
async fn test_unscoped_task_is_anonymous() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a"], 3).await;

    assert!(!ambient::is_scoped());
    let rows = executor.find_ambient(Query::<Invoice>::all()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_caller_true_predicate_cannot_reopen() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a"], 3).await;

    let rows = executor
        .find(
            &TenantContext::anonymous(),
            Query::<Invoice>::filter(Predicate::True.or(Predicate::is_null("tenant_id"))),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

// ============================================================================
// Unregistered Entities
// ============================================================================

#[tokio::test]
async fn test_unregistered_entity_reads_fail_closed() {
    let executor = create_memory_executor();
    let ctx = create_tenant("tenant-a");

    let scoped = executor.registry().scope(&ctx, Query::<AuditLog>::all());
    assert_eq!(
        scoped.scope(),
        &Scope::FailClosed(FailClosedReason::Unregistered)
    );

    let rows = executor.find(&ctx, Query::<AuditLog>::all()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_unregistered_entity_insert_is_rejected() {
    let executor = create_memory_executor();
    let result = executor
        .insert::<AuditLog>(
            &create_tenant("tenant-a"),
            Row::new().with("id", 1).with("message", "hello"),
        )
        .await;

    assert!(matches!(result, Err(StorageError::Registry(_))));
    assert_eq!(executor.engine().row_count("audit_log"), 0);
}

#[tokio::test]
async fn test_system_access_does_not_cover_unregistered_entities() {
    let executor = create_memory_executor();
    let access = SystemAccess::grant("nightly audit export").unwrap();

    let scoped = executor
        .registry()
        .scope_system(&access, Query::<AuditLog>::all());
    assert!(scoped.is_fail_closed());
}

// ============================================================================
// System Access
// ============================================================================

#[tokio::test]
async fn test_system_access_sees_all_tenants() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b", "tenant-c"], 4).await;
    let access = SystemAccess::grant("billing reconciliation").unwrap();

    let rows = executor
        .find_system(&access, Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(rows.len(), 12);

    let mut tenants = tenants_of(&rows);
    tenants.sort();
    tenants.dedup();
    assert_eq!(tenants, vec!["tenant-a", "tenant-b", "tenant-c"]);
}

#[tokio::test]
async fn test_system_access_keeps_caller_predicate() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 5).await;
    let access = SystemAccess::grant("report").unwrap();

    let count = executor
        .count_system(&access, Query::<Invoice>::filter(Predicate::ge("total", 103.0)))
        .await
        .unwrap();
    assert_eq!(count, 4);
}

#[test]
fn test_system_access_requires_reason() {
    assert!(matches!(
        SystemAccess::grant("   "),
        Err(ValidationError::MissingRequiredField { .. })
    ));
    assert_eq!(SystemAccess::grant("export").unwrap().reason(), "export");
}

#[tokio::test]
async fn test_missing_tenant_insert_is_rejected() {
    let executor = create_memory_executor();
    let result = executor
        .insert::<Invoice>(&TenantContext::anonymous(), invoice_row(1, "X-1", 10.0))
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Tenant(TenantError::MissingTenant { .. }))
    ));
    assert_eq!(executor.engine().row_count("invoices"), 0);
}
