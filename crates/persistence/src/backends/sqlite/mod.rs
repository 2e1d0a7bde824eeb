//! SQLite engine.
//!
//! Runs scoped queries as parameterized SQL over an r2d2 pool of rusqlite
//! connections, and applies migrations by translating them to SQLite types
//! first. Supports in-memory databases (one shared connection) and files.
//!
//! ```no_run
//! use orbis_persistence::backends::sqlite::SqliteEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SqliteEngine::in_memory()?;
//! let engine = SqliteEngine::open("./data/orbis.db")?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod migrations;
mod values;

pub use engine::{SqliteEngine, SqliteEngineConfig};
