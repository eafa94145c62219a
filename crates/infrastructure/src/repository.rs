//! Generic repository over one entity type.
//!
//! [`Repository`] implements CRUD, search/date-range stages and pagination
//! for any [`Entity`]. The operation set is also expressed as the
//! [`EntityRepository`] trait so a unit of work can hand out any repository
//! flavor bound to its session.

use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::{info, instrument};

use stratum_common::{clean_filters, FieldMap, FilterValue, PaginatedResult, PaginationParams};

use crate::entity::{Entity, EntityMeta};
use crate::query::SelectQuery;
use crate::session::Session;
use crate::{Error, Result};

/// The repository operation set shared by the hard-delete and soft-delete
/// variants. `DEFAULT_COMMIT` is the durability default the service layer
/// applies to update/delete when the caller does not choose one.
#[async_trait]
pub trait EntityRepository: Sized + Send + Sync {
    type Entity: Entity;

    /// Default `commit` for update/delete on this variant.
    const DEFAULT_COMMIT: bool;

    /// Bind a repository to a live session. Fails fast when the entity's
    /// table binding does not validate.
    fn bind(session: Session) -> Result<Self>;

    /// The session this repository operates on.
    fn session(&self) -> &Session;

    /// Create a record from the change set. `commit` makes it durable
    /// immediately and refreshes server-generated defaults; otherwise the
    /// insert stays pending inside the open transaction.
    async fn create(&self, data: FieldMap, commit: bool) -> Result<Self::Entity>;

    /// At most one record matching the cleaned filters. `None` when nothing
    /// matches.
    async fn get_single(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<Self::Entity>>;

    /// All matching records, newest first.
    async fn get_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Vec<Self::Entity>>;

    /// The most recent record by `order_field`. Filters are used as given,
    /// without cleaning; callers pre-clean where that matters.
    async fn get_last_entry(
        &self,
        order_field: &str,
        filters: FieldMap,
    ) -> Result<Option<Self::Entity>>;

    /// One bounded page of matching records plus page metadata.
    async fn get_paginated_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
        pagination: &PaginationParams,
    ) -> Result<PaginatedResult<Self::Entity>>;

    /// Update the first record matching the cleaned filters with the change
    /// set. `None` when nothing matches; the update is then a no-op, not an
    /// error.
    async fn update(
        &self,
        data: FieldMap,
        allow_null_filters: bool,
        commit: bool,
        filters: FieldMap,
    ) -> Result<Option<Self::Entity>>;

    /// Delete the first record matching the cleaned filters, returning the
    /// detached instance. With `commit` false the lookup still happens but
    /// nothing is removed; see the variant docs for what "delete" means.
    async fn delete(
        &self,
        commit: bool,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<Self::Entity>>;
}

/// Generic CRUD repository with hard deletes.
#[derive(Debug)]
pub struct Repository<T: Entity> {
    session: Session,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// Start a query over the entity's table for composing filter stages.
    pub fn select(&self) -> SelectQuery {
        SelectQuery::new(T::META)
    }

    /// Add an OR-combined case-insensitive substring condition across
    /// `fields` to a partially-built query.
    pub fn apply_search_filter(
        &self,
        query: SelectQuery,
        search: Option<&str>,
        fields: &[&str],
    ) -> SelectQuery {
        query.search(search, fields)
    }

    /// Add a BETWEEN condition on `field` to a partially-built query.
    pub fn apply_date_filter(
        &self,
        query: SelectQuery,
        from_date: Option<chrono::DateTime<chrono::Utc>>,
        to_date: Option<chrono::DateTime<chrono::Utc>>,
        field: &str,
    ) -> SelectQuery {
        query.date_range(from_date, to_date, field)
    }

    /// Execute a composed query, returning all rows.
    pub async fn fetch(&self, query: SelectQuery) -> Result<Vec<T>> {
        self.session.fetch_all(&query.sql(), query.params()).await
    }

    /// Execute a composed query, returning the first row.
    pub async fn fetch_first(&self, query: SelectQuery) -> Result<Option<T>> {
        let query = query.limit(1);
        self.session
            .fetch_optional(&query.sql(), query.params())
            .await
    }

    /// The identity filter for an instance, or why it cannot be addressed.
    fn identity_of(instance: &T) -> Result<(&'static str, FilterValue)> {
        let column = T::META.id_column.ok_or_else(|| {
            Error::Configuration(format!(
                "table '{}' declares no identity column",
                T::META.table
            ))
        })?;
        let value = instance.id_value().ok_or_else(|| {
            Error::Configuration(format!(
                "instance of table '{}' carries no identity value",
                T::META.table
            ))
        })?;
        Ok((column, value))
    }

    /// Re-read an instance by identity, picking up store-side defaults.
    async fn refresh(&self, instance: T) -> Result<T> {
        let Ok((column, value)) = Self::identity_of(&instance) else {
            return Ok(instance);
        };
        let query = self
            .select()
            .filter(&FieldMap::new().with(column, value))?
            .limit(1);
        let fresh = self
            .session
            .fetch_optional(&query.sql(), query.params())
            .await?;
        Ok(fresh.unwrap_or(instance))
    }

    /// First row matching already-cleaned filters.
    async fn first_matching(&self, filters: &FieldMap) -> Result<Option<T>> {
        let query = self.select().filter(filters)?.limit(1);
        self.session
            .fetch_optional(&query.sql(), query.params())
            .await
    }

    fn check_change_set(data: &FieldMap) -> Result<()> {
        for (field, _) in data.iter() {
            if !T::META.has_column(field) {
                return Err(Error::Configuration(format!(
                    "column '{}' is not declared on table '{}'",
                    field,
                    T::META.table
                )));
            }
        }
        Ok(())
    }

    fn insert_statement(data: &FieldMap) -> (String, Vec<FilterValue>) {
        let meta = T::META;
        if data.is_empty() {
            return (
                format!(
                    "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                    meta.table,
                    meta.column_list()
                ),
                Vec::new(),
            );
        }

        let mut columns = Vec::with_capacity(data.len());
        let mut placeholders = Vec::with_capacity(data.len());
        let mut params = Vec::new();
        for (field, value) in data.iter() {
            columns.push(field.to_string());
            if value.is_null() {
                placeholders.push("NULL".to_string());
            } else {
                params.push(value.clone());
                placeholders.push(format!("${}", params.len()));
            }
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            meta.table,
            columns.join(", "),
            placeholders.join(", "),
            meta.column_list()
        );
        (sql, params)
    }

    fn update_statement(
        data: &FieldMap,
        id_column: &str,
        id_value: FilterValue,
    ) -> (String, Vec<FilterValue>) {
        let meta = T::META;
        let mut assignments = Vec::with_capacity(data.len());
        let mut params = Vec::new();
        for (field, value) in data.iter() {
            if value.is_null() {
                assignments.push(format!("{} = NULL", field));
            } else {
                params.push(value.clone());
                assignments.push(format!("{} = ${}", field, params.len()));
            }
        }
        params.push(id_value);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            meta.table,
            assignments.join(", "),
            id_column,
            params.len(),
            meta.column_list()
        );
        (sql, params)
    }

    /// Apply a change set to an already-selected instance by identity.
    /// Shared with the soft-delete variant, which funnels its flag mutation
    /// through here.
    pub(crate) async fn apply_update(
        &self,
        instance: T,
        data: &FieldMap,
        commit: bool,
    ) -> Result<T> {
        if data.is_empty() {
            if commit {
                self.session.commit().await?;
            }
            return Ok(instance);
        }

        Self::check_change_set(data)?;
        let (id_column, id_value) = Self::identity_of(&instance)?;
        let (sql, params) = Self::update_statement(data, id_column, id_value);
        let updated: T = self.session.fetch_one(&sql, &params).await?;

        if commit {
            self.session.commit().await?;
            return self.refresh(updated).await;
        }
        Ok(updated)
    }
}

#[async_trait]
impl<T: Entity> EntityRepository for Repository<T> {
    type Entity = T;

    const DEFAULT_COMMIT: bool = false;

    fn bind(session: Session) -> Result<Self> {
        T::META.validate()?;
        Ok(Self {
            session,
            _entity: PhantomData,
        })
    }

    fn session(&self) -> &Session {
        &self.session
    }

    #[instrument(skip(self, data), fields(table = T::META.table))]
    async fn create(&self, data: FieldMap, commit: bool) -> Result<T> {
        Self::check_change_set(&data)?;
        let (sql, params) = Self::insert_statement(&data);
        let mut instance: T = self.session.fetch_one(&sql, &params).await?;

        if commit {
            self.session.commit().await?;
            instance = self.refresh(instance).await?;
        }
        info!(table = T::META.table, "created");
        Ok(instance)
    }

    async fn get_single(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let filters = clean_filters(&filters, allow_null_filters);
        self.first_matching(&filters).await
    }

    async fn get_list(&self, allow_null_filters: bool, filters: FieldMap) -> Result<Vec<T>> {
        let filters = clean_filters(&filters, allow_null_filters);
        let query = self.select().filter(&filters)?.order_default();
        self.fetch(query).await
    }

    async fn get_last_entry(&self, order_field: &str, filters: FieldMap) -> Result<Option<T>> {
        let query = self
            .select()
            .filter(&filters)?
            .order_desc_or_fallback(order_field);
        self.fetch_first(query).await
    }

    async fn get_paginated_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
        pagination: &PaginationParams,
    ) -> Result<PaginatedResult<T>> {
        let filters = clean_filters(&filters, allow_null_filters);
        let query = self.select().filter(&filters)?.order_default();

        let total = self
            .session
            .fetch_scalar(&query.count_sql(), query.params())
            .await?;

        let window = query.limit(pagination.limit()).offset(pagination.offset());
        let items = self.fetch(window).await?;
        Ok(PaginatedResult::from_params(items, pagination, total as u64))
    }

    #[instrument(skip(self, data, filters), fields(table = T::META.table))]
    async fn update(
        &self,
        data: FieldMap,
        allow_null_filters: bool,
        commit: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let filters = clean_filters(&filters, allow_null_filters);
        let Some(instance) = self.first_matching(&filters).await? else {
            return Ok(None);
        };

        let updated = self.apply_update(instance, &data, commit).await?;
        info!(table = T::META.table, "updated");
        Ok(Some(updated))
    }

    #[instrument(skip(self, filters), fields(table = T::META.table))]
    async fn delete(
        &self,
        commit: bool,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<T>> {
        let filters = clean_filters(&filters, allow_null_filters);
        let Some(instance) = self.first_matching(&filters).await? else {
            return Ok(None);
        };

        // With commit=false the row is looked up but never removed; the
        // caller owns committing a deletion it staged elsewhere. Kept as the
        // documented contract.
        if commit {
            let (id_column, id_value) = Self::identity_of(&instance)?;
            let sql = format!("DELETE FROM {} WHERE {} = $1", T::META.table, id_column);
            self.session.execute(&sql, &[id_value]).await?;
            self.session.commit().await?;
        }
        info!(table = T::META.table, "deleted");
        Ok(Some(instance))
    }
}
