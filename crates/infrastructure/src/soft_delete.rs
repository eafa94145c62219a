//! Soft-delete repository variant.
//!
//! Wraps the base [`Repository`] and forces the active predicate
//! (`is_deleted = false`) into every filter map, leaving an explicit
//! caller-supplied value alone. Delete never removes a row; it flips the flag
//! and stamps the deletion time.

use async_trait::async_trait;
use tracing::{info, instrument};

use stratum_common::{clean_filters, datetime, FieldMap, PaginatedResult, PaginationParams};

use crate::entity::{Entity, SoftDeleteColumns};
use crate::repository::{EntityRepository, Repository};
use crate::session::Session;
use crate::{Error, Result};

/// Repository whose delete marks rows inactive in place.
///
/// Update and delete on this variant default to immediate durability
/// (`DEFAULT_COMMIT = true`): a soft delete is an audit-relevant state change
/// and is expected to stick.
#[derive(Debug)]
pub struct SoftDeleteRepository<T: Entity> {
    inner: Repository<T>,
}

impl<T: Entity> SoftDeleteRepository<T> {
    fn soft_columns() -> Result<SoftDeleteColumns> {
        T::META.soft_delete.ok_or_else(|| {
            Error::Configuration(format!(
                "table '{}' declares no soft-delete columns",
                T::META.table
            ))
        })
    }

    /// Force `is_deleted = false` unless the caller already constrained it.
    fn with_active_default(mut filters: FieldMap, columns: &SoftDeleteColumns) -> FieldMap {
        filters.set_default(columns.flag, false);
        filters
    }

    /// The wrapped base repository, for composing raw query stages.
    pub fn base(&self) -> &Repository<T> {
        &self.inner
    }
}

#[async_trait]
impl<T: Entity> EntityRepository for SoftDeleteRepository<T> {
    type Entity = T;

    const DEFAULT_COMMIT: bool = true;

    fn bind(session: Session) -> Result<Self> {
        let inner = Repository::bind(session)?;
        Self::soft_columns()?;
        Ok(Self { inner })
    }

    fn session(&self) -> &Session {
        self.inner.session()
    }

    async fn create(&self, data: FieldMap, commit: bool) -> Result<T> {
        self.inner.create(data, commit).await
    }

    async fn get_single(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let columns = Self::soft_columns()?;
        self.inner
            .get_single(allow_null_filters, Self::with_active_default(filters, &columns))
            .await
    }

    async fn get_list(&self, allow_null_filters: bool, filters: FieldMap) -> Result<Vec<T>> {
        let columns = Self::soft_columns()?;
        self.inner
            .get_list(allow_null_filters, Self::with_active_default(filters, &columns))
            .await
    }

    async fn get_last_entry(&self, order_field: &str, filters: FieldMap) -> Result<Option<T>> {
        let columns = Self::soft_columns()?;
        self.inner
            .get_last_entry(order_field, Self::with_active_default(filters, &columns))
            .await
    }

    async fn get_paginated_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
        pagination: &PaginationParams,
    ) -> Result<PaginatedResult<T>> {
        let columns = Self::soft_columns()?;
        self.inner
            .get_paginated_list(
                allow_null_filters,
                Self::with_active_default(filters, &columns),
                pagination,
            )
            .await
    }

    async fn update(
        &self,
        data: FieldMap,
        allow_null_filters: bool,
        commit: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let columns = Self::soft_columns()?;
        self.inner
            .update(
                data,
                allow_null_filters,
                commit,
                Self::with_active_default(filters, &columns),
            )
            .await
    }

    /// Mark the first matching active record deleted: flag true, deletion
    /// time stamped. The row stays in place.
    #[instrument(skip(self, filters), fields(table = T::META.table))]
    async fn delete(
        &self,
        commit: bool,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let columns = Self::soft_columns()?;
        let filters = clean_filters(
            &Self::with_active_default(filters, &columns),
            allow_null_filters,
        );

        let query = self.inner.select().filter(&filters)?;
        let Some(instance) = self.inner.fetch_first(query).await? else {
            return Ok(None);
        };

        let change = FieldMap::new()
            .with(columns.flag, true)
            .with(columns.deleted_at, datetime::now_utc());
        let marked = self.inner.apply_update(instance, &change, commit).await?;

        info!(table = T::META.table, "soft deleted");
        Ok(Some(marked))
    }
}
