//! Generic per-entity-type service.
//!
//! Thin orchestration over one repository type: payloads are translated into
//! change sets and handed to a repository freshly bound to the owning unit of
//! work. Nothing here catches store failures; they surface to the unit-of-work
//! boundary untouched.

use std::marker::PhantomData;

use stratum_common::{FieldMap, PaginatedResult, PaginationParams};
use stratum_infrastructure::{EntityRepository, Result, UnitOfWork};

use crate::payload::{CreatePayload, UpdatePayload};

/// CRUD orchestration for one entity type through one repository flavor.
///
/// The repository accessor is computed per call from the unit of work and
/// never cached, so a service always operates against the scope's current
/// session.
pub struct Service<R, C, U>
where
    R: EntityRepository,
    C: CreatePayload,
    U: UpdatePayload,
{
    uow: UnitOfWork,
    _types: PhantomData<fn() -> (R, C, U)>,
}

impl<R, C, U> Service<R, C, U>
where
    R: EntityRepository,
    C: CreatePayload,
    U: UpdatePayload,
{
    pub fn new(uow: UnitOfWork) -> Self {
        Self {
            uow,
            _types: PhantomData,
        }
    }

    /// A repository bound to the unit of work's active session.
    pub fn repository(&self) -> Result<R> {
        self.uow.get_repository::<R>()
    }

    /// Create a record from the payload. The write stays inside the open
    /// transaction; the unit of work owns durability.
    pub async fn create(&self, data: &C) -> Result<R::Entity> {
        self.repository()?.create(data.dump(), false).await
    }

    pub async fn get_single(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<R::Entity>> {
        self.repository()?
            .get_single(allow_null_filters, filters)
            .await
    }

    pub async fn get_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Vec<R::Entity>> {
        self.repository()?.get_list(allow_null_filters, filters).await
    }

    pub async fn get_paginated_list(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
        pagination: &PaginationParams,
    ) -> Result<PaginatedResult<R::Entity>> {
        self.repository()?
            .get_paginated_list(allow_null_filters, filters, pagination)
            .await
    }

    /// Update the first matching record with the payload's explicitly-set
    /// fields. Durability follows the repository flavor's default.
    pub async fn update(
        &self,
        data: &U,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<R::Entity>> {
        self.repository()?
            .update(data.dump_set(), allow_null_filters, R::DEFAULT_COMMIT, filters)
            .await
    }

    /// Delete the first matching record. Durability follows the repository
    /// flavor's default.
    pub async fn delete(
        &self,
        allow_null_filters: bool,
        filters: FieldMap,
    ) -> Result<Option<R::Entity>> {
        self.repository()?
            .delete(R::DEFAULT_COMMIT, allow_null_filters, filters)
            .await
    }
}
