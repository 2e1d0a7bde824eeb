//! Multitenancy tests for the tenant-scoped executor.
//!
//! This module contains tests for tenant isolation, fail-closed behavior,
//! explicit system access, tenant-safe writes and concurrent access.

pub mod concurrency_tests;
pub mod fail_closed_tests;
pub mod isolation_tests;
pub mod write_tests;
