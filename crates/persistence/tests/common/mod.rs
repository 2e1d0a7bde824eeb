//! Shared fixtures for integration tests.
//!
//! Defines a small invoicing domain: tenant-scoped invoices, customers
//! filtered by a custom predicate, a shared country table and an audit log
//! that is deliberately left unregistered.

#![allow(dead_code)]

use std::sync::Arc;

use orbis_persistence::backends::memory::InMemoryEngine;
use orbis_persistence::core::QueryEngine;
use orbis_persistence::filter::{Entity, FilterRegistry};
use orbis_persistence::query::{Predicate, Row, TenantScopedExecutor};
use orbis_persistence::schema::{ColumnDef, CreateTable, IndexDef, Migration};
use orbis_persistence::tenant::{TenantContext, TenantId};

pub struct Invoice;

impl Entity for Invoice {
    const NAME: &'static str = "Invoice";
    const TABLE: &'static str = "invoices";
}

/// Visible to the owning tenant, and to every tenant when `shared = 1`.
pub struct Customer;

impl Entity for Customer {
    const NAME: &'static str = "Customer";
    const TABLE: &'static str = "customers";
}

pub struct Country;

impl Entity for Country {
    const NAME: &'static str = "Country";
    const TABLE: &'static str = "countries";
}

pub struct AuditLog;

impl Entity for AuditLog {
    const NAME: &'static str = "AuditLog";
    const TABLE: &'static str = "audit_log";
}

pub fn create_tenant(id: &str) -> TenantContext {
    TenantContext::new(TenantId::new(id)).with_correlation_id(format!("test-{}", id))
}

pub fn create_registry() -> Arc<FilterRegistry> {
    let registry = FilterRegistry::builder()
        .tenant_scoped::<Invoice>()
        .custom::<Customer>(|ctx: &TenantContext| match ctx.tenant_id() {
            Some(tenant) => Predicate::eq("owner_tenant", tenant).or(Predicate::eq("shared", 1)),
            None => Predicate::False,
        })
        .unfiltered::<Country>("ISO 3166 reference data shared by all tenants")
        .build()
        .expect("registry configuration");
    Arc::new(registry)
}

pub fn create_memory_executor() -> TenantScopedExecutor<InMemoryEngine> {
    let engine = InMemoryEngine::new();
    for table in ["invoices", "customers", "countries", "audit_log"] {
        engine.create_table(table);
    }
    TenantScopedExecutor::new(create_registry(), Arc::new(engine))
}

/// The invoicing schema, authored in SQL Server types.
pub fn invoicing_migration() -> Migration {
    Migration::new("0001_invoicing")
        .with_operation(
            CreateTable::new("invoices")
                .column(ColumnDef::new("id", "int"))
                .column(ColumnDef::new("tenant_id", "nvarchar(64)"))
                .column(ColumnDef::new("number", "nvarchar(32)"))
                .column(ColumnDef::new("total", "decimal(10,2)"))
                .column(ColumnDef::new("paid", "bit").with_default("0"))
                .column(ColumnDef::new("notes", "nvarchar(max)").nullable())
                .primary_key(vec!["id"])
                .index(IndexDef::new("ix_invoices_tenant", vec!["tenant_id"])),
        )
        .with_operation(
            CreateTable::new("customers")
                .column(ColumnDef::new("id", "int"))
                .column(ColumnDef::new("owner_tenant", "nvarchar(64)"))
                .column(ColumnDef::new("name", "nvarchar(120)"))
                .column(ColumnDef::new("shared", "bit").with_default("0"))
                .primary_key(vec!["id"]),
        )
        .with_operation(
            CreateTable::new("countries")
                .column(ColumnDef::new("code", "nchar(2)"))
                .column(ColumnDef::new("name", "nvarchar(80)"))
                .primary_key(vec!["code"]),
        )
        .with_operation(
            CreateTable::new("audit_log")
                .column(ColumnDef::new("id", "int"))
                .column(ColumnDef::new("tenant_id", "nvarchar(64)"))
                .column(ColumnDef::new("message", "nvarchar(max)"))
                .primary_key(vec!["id"]),
        )
}

pub fn invoice_row(id: i64, number: &str, total: f64) -> Row {
    Row::new()
        .with("id", id)
        .with("number", number)
        .with("total", total)
        .with("paid", false)
}

/// Inserts `per_tenant` invoices for each tenant. Ids are unique across tenants.
pub async fn seed_invoices<Q: QueryEngine + ?Sized>(
    executor: &TenantScopedExecutor<Q>,
    tenants: &[&str],
    per_tenant: i64,
) {
    for (t, tenant) in tenants.iter().enumerate() {
        let ctx = create_tenant(tenant);
        for n in 0..per_tenant {
            let id = t as i64 * 10_000 + n;
            let row = invoice_row(id, &format!("{}-{:04}", tenant, n), 100.0 + n as f64);
            executor
                .insert::<Invoice>(&ctx, row)
                .await
                .expect("seed invoice");
        }
    }
}

/// Returns the tenant column of each row.
pub fn tenants_of(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| {
            r.get("tenant_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
