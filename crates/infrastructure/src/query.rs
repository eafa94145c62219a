//! SELECT statement building.
//!
//! [`SelectQuery`] accumulates WHERE stages over an entity's table and
//! renders numbered-parameter SQL. Filter stages are composable; terminal
//! execution lives on the repository, which also renders the count variant
//! for pagination.
//!
//! Column names only ever come from the entity's static [`EntityMeta`] or are
//! checked against it, so caller strings never reach the SQL text directly.

use chrono::{DateTime, Utc};

use stratum_common::{FieldMap, FilterValue};

use crate::entity::EntityMeta;
use crate::{Error, Result};

/// A partially-built SELECT over one entity table.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    meta: EntityMeta,
    conditions: Vec<String>,
    params: Vec<FilterValue>,
    order_by: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl SelectQuery {
    /// Start a SELECT over the entity's table.
    pub fn new(meta: EntityMeta) -> Self {
        Self {
            meta,
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    fn next_param(&mut self, value: FilterValue) -> usize {
        self.params.push(value);
        self.params.len()
    }

    /// Add equality constraints from a (already cleaned) filter map.
    ///
    /// Null values render `IS NULL`; everything else binds a parameter.
    /// An undeclared column is a configuration error.
    pub fn filter(mut self, filters: &FieldMap) -> Result<Self> {
        for (field, value) in filters.iter() {
            if !self.meta.has_column(field) {
                return Err(Error::Configuration(format!(
                    "filter column '{}' is not declared on table '{}'",
                    field, self.meta.table
                )));
            }
            if value.is_null() {
                self.conditions.push(format!("{} IS NULL", field));
            } else {
                let n = self.next_param(value.clone());
                self.conditions.push(format!("{} = ${}", field, n));
            }
        }
        Ok(self)
    }

    /// Add an OR-combined case-insensitive substring condition across
    /// `fields`. Fields not declared on the entity are skipped; a stage with
    /// no usable field or an empty search term leaves the query untouched.
    pub fn search(mut self, search: Option<&str>, fields: &[&str]) -> Self {
        let term = match search {
            Some(term) if !term.is_empty() => term,
            _ => return self,
        };

        let usable: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| self.meta.has_column(field))
            .collect();
        if usable.is_empty() {
            return self;
        }

        // One bound pattern shared by every arm.
        let n = self.next_param(FilterValue::Text(format!("%{}%", term)));
        let arms: Vec<String> = usable
            .iter()
            .map(|field| format!("{} ILIKE ${}", field, n))
            .collect();
        self.conditions.push(format!("({})", arms.join(" OR ")));
        self
    }

    /// Add a BETWEEN condition on `field`. Applied only when both bounds are
    /// present and the field is declared.
    pub fn date_range(
        mut self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        field: &str,
    ) -> Self {
        let (Some(from), Some(to)) = (from_date, to_date) else {
            return self;
        };
        if !self.meta.has_column(field) {
            return self;
        }

        let low = self.next_param(FilterValue::Timestamp(from));
        let high = self.next_param(FilterValue::Timestamp(to));
        self.conditions
            .push(format!("{} BETWEEN ${} AND ${}", field, low, high));
        self
    }

    /// Order descending by `column` when declared, else by the identity
    /// column, else leave the order store-defined.
    pub fn order_desc_or_fallback(mut self, column: &str) -> Self {
        let target = if self.meta.has_column(column) {
            Some(column.to_string())
        } else {
            self.meta.id_column.map(str::to_string)
        };
        self.order_by = target.map(|col| format!("{} DESC", col));
        self
    }

    /// Apply the default ordering policy: creation timestamp descending,
    /// falling back to identity descending.
    pub fn order_default(mut self) -> Self {
        self.order_by = self
            .meta
            .default_order_column()
            .map(|col| format!("{} DESC", col));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the SELECT statement.
    pub fn sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.meta.column_list(),
            self.meta.table
        );
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Render the COUNT variant over the same conditions.
    pub fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.meta.table);
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }

    /// Bound parameters in `$1..$n` order.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }
}
