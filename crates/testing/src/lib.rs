//! Testing utilities for Stratum.
//!
//! Fixture entities and payloads for the data-access layer, plus a Postgres
//! test database helper for the `#[ignore]`d integration suites.

pub mod database;
pub mod fixtures;

pub use database::{TestDatabase, FIXTURE_SCHEMA};
pub use fixtures::{
    article_fields, create_article_payload, task_run_fields, Article, CreateArticle, TaskRun,
    UpdateArticle,
};
