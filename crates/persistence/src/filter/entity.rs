//! Entity type identity.

use std::fmt;

/// A persisted entity type.
///
/// ```
/// use orbis_persistence::filter::Entity;
///
/// struct Invoice;
///
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoice";
///     const TABLE: &'static str = "invoices";
/// }
/// ```
pub trait Entity: Send + Sync + 'static {
    /// Unique entity type name, used as the registry key.
    const NAME: &'static str;

    /// Backing table name.
    const TABLE: &'static str;
}

/// Runtime identity of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType {
    name: &'static str,
    table: &'static str,
}

impl EntityType {
    /// Creates an entity type from its name and table.
    pub const fn new(name: &'static str, table: &'static str) -> Self {
        Self { name, table }
    }

    /// Returns the entity type for `E`.
    pub const fn of<E: Entity>() -> Self {
        Self::new(E::NAME, E::TABLE)
    }

    /// The entity type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The backing table name.
    pub fn table(&self) -> &'static str {
        self.table
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
