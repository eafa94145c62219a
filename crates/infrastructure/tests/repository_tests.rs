//! Integration tests for the repository layer.
//!
//! These require PostgreSQL and are `#[ignore]`d for plain `cargo test`.
//! Point `TEST_DATABASE_URL` at a scratch database and run:
//! `cargo test --test repository_tests -- --ignored`

use uuid::Uuid;

use stratum_common::{fields, FieldMap, FilterValue, PaginationParams};
use stratum_infrastructure::{
    EntityRepository, Error, Repository, SoftDeleteRepository, UnitOfWork,
};
use stratum_testing::{article_fields, task_run_fields, Article, TaskRun, TestDatabase};

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

async fn db() -> TestDatabase {
    stratum_common::telemetry::init_test_tracing();
    TestDatabase::from_env().await.expect("test database")
}

#[tokio::test]
#[ignore]
async fn pool_reports_healthy_until_closed() {
    let db = db().await;
    assert!(db.database().health_check().await);
    db.database().close().await;
    assert!(!db.database().health_check().await);
}

#[tokio::test]
#[ignore]
async fn transactions_begin_lazily_and_end_on_commit() {
    let db = db().await;
    let session = db.session_factory().session();
    assert!(!session.in_transaction().await);

    let repo = Repository::<TaskRun>::bind(session.clone()).unwrap();
    repo.create(task_run_fields(&unique("lazy"), 0), false)
        .await
        .unwrap();
    assert!(session.in_transaction().await);

    session.commit().await.unwrap();
    assert!(!session.in_transaction().await);
}

#[tokio::test]
#[ignore]
async fn create_then_get_single_round_trip() {
    let db = db().await;
    let session = db.session_factory().session();
    let repo = Repository::<TaskRun>::bind(session).unwrap();

    let label = unique("round-trip");
    let created = repo.create(task_run_fields(&label, 2), true).await.unwrap();

    let found = repo
        .get_single(false, fields! { "label" => label.clone() })
        .await
        .unwrap()
        .expect("created row should be found");
    assert_eq!(found.id, created.id);
    assert_eq!(found.attempts, 2);
}

#[tokio::test]
#[ignore]
async fn create_without_commit_is_visible_in_same_scope_and_rolls_back() {
    let db = db().await;
    let factory = db.session_factory();
    let name = unique("flush");

    let session = factory.session();
    let repo = SoftDeleteRepository::<Article>::bind(session.clone()).unwrap();
    repo.create(article_fields(&name), false).await.unwrap();

    // Flush semantics: the uncommitted write is visible to a later read in
    // the same transaction.
    let pending = repo
        .get_single(false, fields! { "name" => name.clone() })
        .await
        .unwrap();
    assert!(pending.is_some());

    session.rollback().await.unwrap();

    let other = SoftDeleteRepository::<Article>::bind(factory.session()).unwrap();
    let after = other
        .get_single(false, fields! { "name" => name })
        .await
        .unwrap();
    assert!(after.is_none());
}

#[tokio::test]
#[ignore]
async fn get_list_orders_by_creation_timestamp_descending() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let body = unique("ordering");
    for i in 0..3 {
        let data = FieldMap::new()
            .with("name", format!("item-{}", i))
            .with("body", body.clone());
        repo.create(data, true).await.unwrap();
    }

    let listed = repo
        .get_list(false, fields! { "body" => body })
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    for pair in listed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
    assert_eq!(listed[0].name, "item-2");
}

#[tokio::test]
#[ignore]
async fn get_list_falls_back_to_identity_ordering() {
    let db = db().await;
    let repo = Repository::<TaskRun>::bind(db.session_factory().session()).unwrap();

    let label = unique("fallback");
    for _ in 0..3 {
        repo.create(task_run_fields(&label, 0), true).await.unwrap();
    }

    let listed = repo.get_list(false, fields! { "label" => label }).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed[0].id > listed[1].id);
    assert!(listed[1].id > listed[2].id);
}

#[tokio::test]
#[ignore]
async fn null_filter_handling_follows_the_policy() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let name = unique("nulls");
    repo.create(article_fields(&name), true).await.unwrap();

    // Dropped null: the unset optional does not constrain the query.
    let found = repo
        .get_single(
            false,
            fields! { "name" => name.clone(), "body" => FilterValue::Null },
        )
        .await
        .unwrap();
    assert!(found.is_some());

    // Preserved null: body IS NULL matches the fixture row.
    let found = repo
        .get_single(
            true,
            fields! { "name" => name.clone(), "body" => FilterValue::Null },
        )
        .await
        .unwrap();
    assert!(found.is_some());

    // Preserved null on a non-null column excludes the row.
    let found = repo
        .get_single(
            true,
            fields! { "name" => name, "created_at" => FilterValue::Null },
        )
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
#[ignore]
async fn get_last_entry_returns_the_newest_match() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let body = unique("last-entry");
    for i in 0..3 {
        let data = FieldMap::new()
            .with("name", format!("entry-{}", i))
            .with("body", body.clone());
        repo.create(data, true).await.unwrap();
    }

    let last = repo
        .get_last_entry("created_at", fields! { "body" => body.clone() })
        .await
        .unwrap()
        .expect("matches exist");
    assert_eq!(last.name, "entry-2");

    // Unknown ordering field falls back to identity ordering.
    let by_id = repo
        .get_last_entry("no_such_column", fields! { "body" => body })
        .await
        .unwrap()
        .expect("matches exist");
    assert_eq!(by_id.name, "entry-2");
}

#[tokio::test]
#[ignore]
async fn get_last_entry_does_not_clean_filters() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let name = unique("asymmetry");
    let data = FieldMap::new()
        .with("name", name.clone())
        .with("body", "present");
    repo.create(data, true).await.unwrap();

    // The null survives uncleaned and renders IS NULL, so the row with a
    // body does not match. Sibling methods would have dropped the entry.
    let missed = repo
        .get_last_entry(
            "created_at",
            fields! { "name" => name, "body" => FilterValue::Null },
        )
        .await
        .unwrap();
    assert!(missed.is_none());
}

#[tokio::test]
#[ignore]
async fn paginated_list_slices_and_counts() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let body = unique("pagination");
    for i in 0..5 {
        let data = FieldMap::new()
            .with("name", format!("page-{}", i))
            .with("body", body.clone());
        repo.create(data, true).await.unwrap();
    }

    let page = repo
        .get_paginated_list(
            false,
            fields! { "body" => body },
            &PaginationParams::new(2, 2),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next);
    assert!(page.has_prev);
    // Newest first; page 2 holds the middle slice.
    assert_eq!(page.items[0].name, "page-2");
}

#[tokio::test]
#[ignore]
async fn update_miss_returns_none_and_mutates_nothing() {
    let db = db().await;
    let repo = Repository::<TaskRun>::bind(db.session_factory().session()).unwrap();

    let label = unique("update-miss");
    repo.create(task_run_fields(&label, 1), true).await.unwrap();

    let missed = repo
        .update(
            fields! { "attempts" => 99 },
            false,
            true,
            fields! { "label" => "no-such-label" },
        )
        .await
        .unwrap();
    assert!(missed.is_none());

    let untouched = repo
        .get_single(false, fields! { "label" => label })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.attempts, 1);
}

#[tokio::test]
#[ignore]
async fn update_overwrites_and_commits() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let name = unique("update");
    repo.create(article_fields(&name), true).await.unwrap();

    let updated = repo
        .update(
            fields! { "body" => "rewritten" },
            false,
            true,
            fields! { "name" => name.clone() },
        )
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(updated.body.as_deref(), Some("rewritten"));

    let reread = SoftDeleteRepository::<Article>::bind(db.session_factory().session())
        .unwrap()
        .get_single(false, fields! { "name" => name })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reread.body.as_deref(), Some("rewritten"));
}

#[tokio::test]
#[ignore]
async fn soft_delete_marks_in_place_and_is_idempotent() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let name = unique("soft-delete");
    repo.create(article_fields(&name), true).await.unwrap();

    let deleted = repo
        .delete(true, false, fields! { "name" => name.clone() })
        .await
        .unwrap()
        .expect("row exists");
    assert!(deleted.is_deleted);
    assert!(deleted.deleted_at.is_some());

    // Default filters exclude already-deleted rows: the second call misses.
    let second = repo
        .delete(true, false, fields! { "name" => name.clone() })
        .await
        .unwrap();
    assert!(second.is_none());

    // An explicit is_deleted filter is respected, not overridden.
    let tombstone = repo
        .get_single(false, fields! { "name" => name, "is_deleted" => true })
        .await
        .unwrap();
    assert!(tombstone.is_some());
}

#[tokio::test]
#[ignore]
async fn hard_delete_without_commit_removes_nothing() {
    let db = db().await;
    let repo = Repository::<TaskRun>::bind(db.session_factory().session()).unwrap();

    let label = unique("delete-quirk");
    repo.create(task_run_fields(&label, 0), true).await.unwrap();

    // Documented quirk: the lookup succeeds and the instance is returned,
    // but with commit=false nothing is removed.
    let looked_up = repo
        .delete(false, false, fields! { "label" => label.clone() })
        .await
        .unwrap();
    assert!(looked_up.is_some());

    let still_there = Repository::<TaskRun>::bind(db.session_factory().session())
        .unwrap()
        .get_single(false, fields! { "label" => label })
        .await
        .unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
#[ignore]
async fn hard_delete_with_commit_removes_the_row() {
    let db = db().await;
    let repo = Repository::<TaskRun>::bind(db.session_factory().session()).unwrap();

    let label = unique("hard-delete");
    repo.create(task_run_fields(&label, 0), true).await.unwrap();

    let removed = repo
        .delete(true, false, fields! { "label" => label.clone() })
        .await
        .unwrap();
    assert!(removed.is_some());

    let gone = Repository::<TaskRun>::bind(db.session_factory().session())
        .unwrap()
        .get_single(false, fields! { "label" => label })
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
#[ignore]
async fn search_and_date_stages_compose_onto_queries() {
    let db = db().await;
    let repo = SoftDeleteRepository::<Article>::bind(db.session_factory().session()).unwrap();

    let marker = unique("stages");
    let data = FieldMap::new()
        .with("name", format!("needle-{}", marker))
        .with("body", "haystack");
    let created = repo.create(data, true).await.unwrap();

    let base = repo.base();
    let query = base
        .select()
        .filter(&fields! { "is_deleted" => false })
        .unwrap();
    let query = base.apply_search_filter(query, Some(marker.as_str()), &["name", "body"]);
    let window = chrono::Duration::minutes(5);
    let query = base.apply_date_filter(
        query,
        Some(created.created_at - window),
        Some(created.created_at + window),
        "created_at",
    );

    let matched = base.fetch(query).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, created.id);
}

#[tokio::test]
#[ignore]
async fn unit_of_work_commits_on_success() {
    let db = db().await;
    let factory = db.session_factory();
    let label = unique("uow-commit");

    let created = UnitOfWork::scope(factory.clone(), |uow| {
        let label = label.clone();
        async move {
            let repo = uow.get_repository::<Repository<TaskRun>>()?;
            repo.create(task_run_fields(&label, 0), false).await
        }
    })
    .await
    .unwrap();

    let found = Repository::<TaskRun>::bind(factory.session())
        .unwrap()
        .get_single(false, fields! { "id" => created.id })
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
#[ignore]
async fn unit_of_work_rolls_back_on_failure() {
    let db = db().await;
    let factory = db.session_factory();
    let label = unique("uow-rollback");

    let outcome: Result<(), Error> = UnitOfWork::scope(factory.clone(), |uow| {
        let label = label.clone();
        async move {
            let repo = uow.get_repository::<Repository<TaskRun>>()?;
            repo.create(task_run_fields(&label, 0), false).await?;
            Err(Error::Configuration("forced failure".to_string()))
        }
    })
    .await;
    assert!(outcome.is_err());

    let after = Repository::<TaskRun>::bind(factory.session())
        .unwrap()
        .get_single(false, fields! { "label" => label })
        .await
        .unwrap();
    assert!(after.is_none());
}

#[tokio::test]
#[ignore]
async fn repositories_in_one_scope_share_transactional_state() {
    let db = db().await;
    let factory = db.session_factory();
    let label = unique("shared-state");

    UnitOfWork::scope(factory, |uow| {
        let label = label.clone();
        async move {
            let writer = uow.get_repository::<Repository<TaskRun>>()?;
            writer.create(task_run_fields(&label, 0), false).await?;

            // A second handle of the same type sees the pending write.
            let reader = uow.get_repository::<Repository<TaskRun>>()?;
            let pending = reader
                .get_single(false, fields! { "label" => label })
                .await?;
            assert!(pending.is_some());
            Ok::<_, Error>(())
        }
    })
    .await
    .unwrap();
}
