//! Storage engine abstractions.
//!
//! - [`QueryEngine`] executes scoped reads and writes.
//! - [`MigrationEngine`] applies [`Migration`](crate::schema::Migration)s.
//!
//! Implementations live in [`backends`](crate::backends).

mod engine;

pub use engine::{MigrationEngine, QueryEngine};
