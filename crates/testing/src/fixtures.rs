//! Fixture entities and payloads.
//!
//! Two table shapes cover the layer's behavior: `articles` carries the full
//! column set (uuid identity, creation timestamp, soft-delete pair) and
//! `task_runs` is the degenerate shape (integer identity, no timestamps), so
//! ordering fallback and hard deletes get exercised too.

use chrono::{DateTime, Utc};
use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use sqlx::FromRow;
use uuid::Uuid;

use stratum_application::{CreatePayload, UpdatePayload};
use stratum_common::{FieldMap, FilterValue};
use stratum_infrastructure::{Entity, EntityMeta, SoftDeleteColumns};

/// Soft-deletable fixture entity with the full conventional column set.
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub name: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Article {
    const META: EntityMeta = EntityMeta {
        table: "articles",
        columns: &[
            "id",
            "name",
            "body",
            "created_at",
            "updated_at",
            "is_deleted",
            "deleted_at",
        ],
        id_column: Some("id"),
        created_at_column: Some("created_at"),
        soft_delete: Some(SoftDeleteColumns {
            flag: "is_deleted",
            deleted_at: "deleted_at",
        }),
    };

    fn id_value(&self) -> Option<FilterValue> {
        Some(self.id.into())
    }
}

/// Hard-deleted fixture entity without a creation timestamp.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRun {
    pub id: i64,
    pub label: String,
    pub attempts: i64,
}

impl Entity for TaskRun {
    const META: EntityMeta = EntityMeta {
        table: "task_runs",
        columns: &["id", "label", "attempts"],
        id_column: Some("id"),
        created_at_column: None,
        soft_delete: None,
    };

    fn id_value(&self) -> Option<FilterValue> {
        Some(self.id.into())
    }
}

/// Creation payload for articles. Dumps every field.
#[derive(Debug, Clone)]
pub struct CreateArticle {
    pub name: String,
    pub body: Option<String>,
}

impl CreatePayload for CreateArticle {
    fn dump(&self) -> FieldMap {
        FieldMap::new()
            .with("name", self.name.clone())
            .with("body", self.body.clone())
    }
}

/// Update payload for articles. `None` means "not set"; only set fields are
/// dumped.
#[derive(Debug, Clone, Default)]
pub struct UpdateArticle {
    pub name: Option<String>,
    pub body: Option<String>,
}

impl UpdatePayload for UpdateArticle {
    fn dump_set(&self) -> FieldMap {
        let mut data = FieldMap::new();
        if let Some(name) = &self.name {
            data.insert("name", name.clone());
        }
        if let Some(body) = &self.body {
            data.insert("body", body.clone());
        }
        data
    }
}

/// A creation payload with generated content.
pub fn create_article_payload() -> CreateArticle {
    CreateArticle {
        name: Word().fake(),
        body: Some(Sentence(3..8).fake()),
    }
}

/// A change set for inserting an article row with the given name.
pub fn article_fields(name: &str) -> FieldMap {
    FieldMap::new()
        .with("name", name)
        .with("body", FilterValue::Null)
}

/// A change set for inserting a task run.
pub fn task_run_fields(label: &str, attempts: i64) -> FieldMap {
    FieldMap::new()
        .with("label", label)
        .with("attempts", attempts)
}
