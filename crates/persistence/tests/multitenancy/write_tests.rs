//! Tests for tenant-safe inserts and updates.

use orbis_persistence::error::{RegistryError, StorageError, TenantError};
use orbis_persistence::filter::FilterRegistry;
use orbis_persistence::query::{Predicate, Query, Row, Value};
use orbis_persistence::tenant::TenantId;

use crate::common::*;

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_stamps_tenant_column() {
    let executor = create_memory_executor();
    let stored = executor
        .insert::<Invoice>(&create_tenant("tenant-a"), invoice_row(1, "A-1", 50.0))
        .await
        .unwrap();

    assert_eq!(stored.get("tenant_id"), Some(&Value::Text("tenant-a".into())));
}

#[tokio::test]
async fn test_insert_accepts_matching_tenant() {
    let executor = create_memory_executor();
    let row = invoice_row(1, "A-1", 50.0).with("tenant_id", "tenant-a");

    let stored = executor
        .insert::<Invoice>(&create_tenant("tenant-a"), row)
        .await
        .unwrap();
    assert_eq!(
        stored.get("tenant_id").and_then(|v| v.as_str()),
        Some("tenant-a")
    );
}

#[tokio::test]
async fn test_insert_rejects_foreign_tenant() {
    let executor = create_memory_executor();
    let row = invoice_row(1, "B-1", 50.0).with("tenant_id", "tenant-b");

    let result = executor
        .insert::<Invoice>(&create_tenant("tenant-a"), row)
        .await;

    match result {
        Err(StorageError::Tenant(TenantError::TenantMismatch {
            context_tenant,
            row_tenant,
            ..
        })) => {
            assert_eq!(context_tenant, TenantId::new("tenant-a"));
            assert_eq!(row_tenant, "tenant-b");
        }
        other => panic!("expected tenant mismatch, got {:?}", other),
    }
    assert_eq!(executor.engine().row_count("invoices"), 0);
}

#[tokio::test]
async fn test_insert_normalizes_case_variant_tenant_key() {
    let executor = create_memory_executor();
    let ctx = create_tenant("tenant-a");

    let result = executor
        .insert::<Invoice>(&ctx, invoice_row(1, "B-1", 5.0).with("Tenant_Id", "tenant-b"))
        .await;
    assert!(matches!(
        result,
        Err(StorageError::Tenant(TenantError::TenantMismatch { .. }))
    ));

    let stored = executor
        .insert::<Invoice>(&ctx, invoice_row(2, "A-2", 5.0).with("TENANT_ID", "tenant-a"))
        .await
        .unwrap();
    assert!(!stored.contains("TENANT_ID"));
    assert_eq!(
        stored.get("tenant_id").and_then(|v| v.as_str()),
        Some("tenant-a")
    );
    assert_eq!(executor.engine().row_count("invoices"), 1);
}

#[tokio::test]
async fn test_custom_insert_rejects_ambiguous_owner_spelling() {
    let executor = create_memory_executor();
    let result = executor
        .insert::<Customer>(
            &create_tenant("tenant-a"),
            Row::new()
                .with("id", 3)
                .with("owner_tenant", "tenant-a")
                .with("OWNER_TENANT", "tenant-b")
                .with("name", "Ambiguous")
                .with("shared", false),
        )
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Tenant(TenantError::RowOutsideScope { .. }))
    ));
    assert_eq!(executor.engine().row_count("customers"), 0);
}

#[tokio::test]
async fn test_custom_insert_must_be_visible_to_writer() {
    let executor = create_memory_executor();
    let ctx = create_tenant("tenant-a");

    let result = executor
        .insert::<Customer>(
            &ctx,
            Row::new()
                .with("id", 7)
                .with("owner_tenant", "tenant-b")
                .with("name", "Not mine")
                .with("shared", false),
        )
        .await;
    assert!(matches!(
        result,
        Err(StorageError::Tenant(TenantError::RowOutsideScope { .. }))
    ));

    // A shared row owned by someone else is visible to the writer, so it is accepted
    executor
        .insert::<Customer>(
            &ctx,
            Row::new()
                .with("id", 8)
                .with("owner_tenant", "tenant-b")
                .with("name", "Shared")
                .with("shared", true),
        )
        .await
        .unwrap();
    assert_eq!(executor.engine().row_count("customers"), 1);
}

#[tokio::test]
async fn test_unfiltered_insert_is_unchanged() {
    let executor = create_memory_executor();
    let stored = executor
        .insert::<Country>(
            &create_tenant("tenant-a"),
            Row::new().with("code", "JP").with("name", "Japan"),
        )
        .await
        .unwrap();

    assert_eq!(stored.len(), 2);
    assert!(!stored.contains("tenant_id"));
}

// ============================================================================
// Update and Delete
// ============================================================================

#[tokio::test]
async fn test_update_cannot_reassign_tenant() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a"], 2).await;

    let result = executor
        .update(
            &create_tenant("tenant-a"),
            Query::<Invoice>::all(),
            Row::new().with("tenant_id", "tenant-b"),
        )
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Tenant(TenantError::TenantColumnImmutable { .. }))
    ));
    let rows = executor
        .find(&create_tenant("tenant-a"), Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_update_cannot_reassign_tenant_through_case_variant() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a"], 2).await;
    let a = create_tenant("tenant-a");

    for column in ["TENANT_ID", "Tenant_Id"] {
        let result = executor
            .update(
                &a,
                Query::<Invoice>::filter(Predicate::eq("id", 0)),
                Row::new().with(column, "tenant-b"),
            )
            .await;
        assert!(
            matches!(
                result,
                Err(StorageError::Tenant(TenantError::TenantColumnImmutable { .. }))
            ),
            "assignment to {} was accepted",
            column
        );
    }

    let for_b = executor
        .count(&create_tenant("tenant-b"), Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(for_b, 0);
}

#[tokio::test]
async fn test_update_cannot_hand_custom_row_to_another_tenant() {
    let executor = create_memory_executor();
    let a = create_tenant("tenant-a");
    executor
        .insert::<Customer>(
            &a,
            Row::new()
                .with("id", 1)
                .with("owner_tenant", "tenant-a")
                .with("name", "Private")
                .with("shared", false),
        )
        .await
        .unwrap();

    let attempts = [
        Row::new().with("owner_tenant", "tenant-b"),
        Row::new().with("OWNER_TENANT", "tenant-b"),
        Row::new().with("name", "Renamed").with("shared", true),
    ];
    for assignments in attempts {
        let result = executor
            .update(&a, Query::<Customer>::all(), assignments)
            .await;
        assert!(matches!(
            result,
            Err(StorageError::Tenant(TenantError::TenantColumnImmutable { .. }))
        ));
    }

    // Columns outside the filter stay writable
    let renamed = executor
        .update(&a, Query::<Customer>::all(), Row::new().with("name", "Renamed"))
        .await
        .unwrap();
    assert_eq!(renamed, 1);

    let for_b = executor
        .find(&create_tenant("tenant-b"), Query::<Customer>::all())
        .await
        .unwrap();
    assert!(for_b.is_empty());
}

#[tokio::test]
async fn test_update_only_touches_own_rows() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 3).await;

    let updated = executor
        .update(
            &create_tenant("tenant-b"),
            Query::<Invoice>::all(),
            Row::new().with("paid", true),
        )
        .await
        .unwrap();
    assert_eq!(updated, 3);

    let paid_for_a = executor
        .count(
            &create_tenant("tenant-a"),
            Query::<Invoice>::filter(Predicate::eq("paid", true)),
        )
        .await
        .unwrap();
    assert_eq!(paid_for_a, 0);
}

#[tokio::test]
async fn test_delete_only_removes_own_rows() {
    let executor = create_memory_executor();
    seed_invoices(&executor, &["tenant-a", "tenant-b"], 3).await;

    let deleted = executor
        .delete(&create_tenant("tenant-a"), Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(executor.engine().row_count("invoices"), 3);

    let remaining = executor
        .find(&create_tenant("tenant-b"), Query::<Invoice>::all())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 3);
}

// ============================================================================
// Registry Configuration
// ============================================================================

#[test]
fn test_duplicate_registration_is_a_startup_error() {
    let result = FilterRegistry::builder()
        .tenant_scoped::<Invoice>()
        .unfiltered::<Invoice>("mistake")
        .build();

    assert!(matches!(
        result,
        Err(RegistryError::DuplicateRegistration { .. })
    ));
}

#[test]
fn test_registry_lists_registered_entities() {
    let registry = create_registry();
    assert_eq!(registry.len(), 3);
    let names: Vec<&str> = registry.entity_types().iter().map(|e| e.name()).collect();
    assert!(names.contains(&"Invoice"));
    assert!(!names.contains(&"AuditLog"));
}
