//! Storage layer for Stratum.
//!
//! Provides the generic data-access contract over PostgreSQL:
//! - Connection pool and configuration ([`database`])
//! - Transactional sessions ([`session`])
//! - Entity table bindings ([`entity`])
//! - Composable SELECT building ([`query`])
//! - Generic CRUD repositories, hard- and soft-delete ([`repository`],
//!   [`soft_delete`])
//! - Unit of work coordinating commit-or-rollback ([`uow`])
//!
//! Not-found is a soft condition throughout: lookups return `Option`, never
//! an error. Store failures propagate unmodified; the unit of work is the
//! sole layer guaranteeing cleanup.

pub mod database;
pub mod entity;
pub mod query;
pub mod repository;
pub mod session;
pub mod soft_delete;
pub mod uow;

// Re-export commonly used types
pub use database::{DatabaseConfig, DatabasePool};
pub use entity::{Entity, EntityMeta, SoftDeleteColumns};
pub use query::SelectQuery;
pub use repository::{EntityRepository, Repository};
pub use session::{Session, SessionFactory};
pub use soft_delete::SoftDeleteRepository;
pub use uow::UnitOfWork;

pub type Result<T> = std::result::Result<T, Error>;

/// Storage-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures surfaced by the store; propagated unmodified.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid entity binding or an undeclared column in a filter or change
    /// set. Raised at construction where possible; fatal, not retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A session-bound operation was attempted outside an active scope.
    #[error("Unit of work has no active session")]
    InactiveUnitOfWork,
}

impl Error {
    /// Whether retrying the operation could help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
