//! Unit of work.
//!
//! A [`UnitOfWork`] owns one [`Session`] for the duration of a scope and
//! guarantees commit-or-rollback on the way out. Repositories handed out by
//! [`get_repository`](UnitOfWork::get_repository) are bound to the scope's
//! session, so they observe one another's uncommitted writes.

use std::future::Future;
use tracing::{debug, warn};

use crate::repository::EntityRepository;
use crate::session::{Session, SessionFactory};
use crate::{Error, Result};

/// Transactional scope over one session.
///
/// Two states: inactive (no session) and active (session held). Cloning an
/// active unit of work yields a handle onto the same session, which is how
/// [`scope`](UnitOfWork::scope) lends the scope to a closure while keeping
/// control of the exit path.
#[derive(Clone, Debug)]
pub struct UnitOfWork {
    factory: SessionFactory,
    session: Option<Session>,
}

impl UnitOfWork {
    /// An inactive unit of work over the given factory.
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            session: None,
        }
    }

    /// Enter the scope: acquire a fresh session. The transaction itself
    /// begins lazily on the first store operation.
    pub fn begin(&mut self) {
        debug!("Entering unit-of-work scope");
        self.session = Some(self.factory.session());
    }

    /// Whether a session is currently held.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The active session.
    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::InactiveUnitOfWork)
    }

    /// A new repository of the requested type bound to the active session.
    ///
    /// Instances are never cached; every call constructs a fresh repository
    /// sharing the scope's transactional state.
    pub fn get_repository<R: EntityRepository>(&self) -> Result<R> {
        R::bind(self.session()?.clone())
    }

    /// Commit the scope's pending work.
    pub async fn commit(&self) -> Result<()> {
        self.session()?.commit().await
    }

    /// Roll back the scope's pending work.
    pub async fn rollback(&self) -> Result<()> {
        self.session()?.rollback().await
    }

    /// Leave the scope: roll back anything still open and release the
    /// session. Safe to call when already inactive.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        debug!("Unit-of-work scope closed");
    }

    /// Run `work` inside an active scope: commit on success, roll back on
    /// failure, release the session on every exit path. A failure during the
    /// commit itself is rolled back before closing and surfaced unmodified.
    pub async fn scope<F, Fut, R, E>(factory: SessionFactory, work: F) -> std::result::Result<R, E>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: From<Error>,
    {
        let mut uow = UnitOfWork::new(factory);
        uow.begin();

        let outcome = work(uow.clone()).await;
        match outcome {
            Ok(value) => match uow.commit().await {
                Ok(()) => {
                    uow.close().await;
                    Ok(value)
                }
                Err(commit_err) => {
                    if let Err(e) = uow.rollback().await {
                        warn!(error = %e, "Rollback after failed commit also failed");
                    }
                    uow.close().await;
                    Err(E::from(commit_err))
                }
            },
            Err(err) => {
                if let Err(e) = uow.rollback().await {
                    warn!(error = %e, "Failed to roll back unit of work");
                }
                uow.close().await;
                Err(err)
            }
        }
    }
}
