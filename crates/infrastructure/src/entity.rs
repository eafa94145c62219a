//! Entity metadata.
//!
//! Every persisted record type binds itself to exactly one backing table
//! through a const [`EntityMeta`] descriptor. The descriptor is validated
//! when a repository is constructed, so a misconfigured binding fails fast
//! instead of per call.

use sqlx::postgres::PgRow;

use stratum_common::FilterValue;

use crate::{Error, Result};

/// Soft-delete column pair declared by soft-deletable entities.
#[derive(Debug, Clone, Copy)]
pub struct SoftDeleteColumns {
    /// Boolean column marking the row inactive.
    pub flag: &'static str,
    /// Timestamp column stamped when the row is marked inactive.
    pub deleted_at: &'static str,
}

/// Static descriptor binding an entity type to its table.
#[derive(Debug, Clone, Copy)]
pub struct EntityMeta {
    /// Backing table name.
    pub table: &'static str,
    /// Every column the entity hydrates from. Also the RETURNING list.
    pub columns: &'static [&'static str],
    /// Identity column, when the entity has one.
    pub id_column: Option<&'static str>,
    /// Creation-timestamp column, when present. Preferred ordering key.
    pub created_at_column: Option<&'static str>,
    /// Soft-delete columns, for entities kept in place on delete.
    pub soft_delete: Option<SoftDeleteColumns>,
}

impl EntityMeta {
    /// Check the descriptor for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::Configuration(
                "entity declares an empty table name".to_string(),
            ));
        }
        if self.columns.is_empty() {
            return Err(Error::Configuration(format!(
                "entity for table '{}' declares no columns",
                self.table
            )));
        }
        for declared in [self.id_column, self.created_at_column]
            .into_iter()
            .flatten()
        {
            if !self.has_column(declared) {
                return Err(Error::Configuration(format!(
                    "column '{}' is not declared on table '{}'",
                    declared, self.table
                )));
            }
        }
        if let Some(soft) = &self.soft_delete {
            for declared in [soft.flag, soft.deleted_at] {
                if !self.has_column(declared) {
                    return Err(Error::Configuration(format!(
                        "soft-delete column '{}' is not declared on table '{}'",
                        declared, self.table
                    )));
                }
            }
        }
        Ok(())
    }

    /// Whether `column` is declared on this entity.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Comma-joined column list for SELECT / RETURNING clauses.
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }

    /// Ordering column policy: creation timestamp, else identity, else none.
    pub fn default_order_column(&self) -> Option<&'static str> {
        self.created_at_column.or(self.id_column)
    }
}

/// A persisted record type.
///
/// Implementors hydrate from rows via `sqlx::FromRow` and expose their
/// identity value so repositories can refresh and mutate by primary key.
pub trait Entity: for<'r> sqlx::FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    /// The table binding for this type.
    const META: EntityMeta;

    /// The identity value of this instance, when the type declares one.
    fn id_value(&self) -> Option<FilterValue>;
}
