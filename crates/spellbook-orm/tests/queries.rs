//! Query sets and model-level helpers against a recording driver.

mod common;
use common::*;

use spellbook_core::{
    values, Aggregate, Condition, Feature, SqlValue, UpdateOnDuplicate, Value, WriteOptions,
};
use spellbook_orm::{OrmError, QueryResult};

// ===================================================================
// SELECT resolution
// ===================================================================

#[tokio::test]
async fn all_instantiates_rows_and_casts_columns() {
    let driver = RecordingDriver::sqlite();
    driver.push_rows(vec![
        row(&[
            ("id", SqlValue::Int(1)),
            ("title", text("A")),
            ("extra", text(r#"{"versions":[2]}"#)),
            ("gmt_modified", text("2021-01-01 00:00:00.000")),
        ]),
        row(&[("id", SqlValue::Int(2)), ("title", text("B"))]),
    ]);

    let posts = post()
        .objects()
        .find(Condition::like("title", "%"))
        .order("-id")
        .all(&driver)
        .await
        .unwrap();
    assert_eq!(
        driver.statements(),
        ["SELECT * FROM \"articles\" WHERE \"title\" LIKE ? AND \"deleted_at\" IS NULL ORDER BY \"id\" DESC"]
    );
    assert_eq!(posts.len(), 2);
    assert_eq!(
        posts[0].attribute("extra").unwrap(),
        &Value::Json(serde_json::json!({ "versions": [2] }))
    );
    assert!(posts[0].attribute("updatedAt").unwrap().as_timestamp().is_some());
    assert!(matches!(
        posts[1].attribute("extra"),
        Err(OrmError::UnsetAttribute { .. })
    ));
}

#[tokio::test]
async fn resolving_twice_runs_twice() {
    let driver = RecordingDriver::sqlite();
    let base = post().objects().find(Condition::eq("title", "A"));
    driver.push_rows(vec![row(&[("id", SqlValue::Int(1))])]);
    assert_eq!(base.all(&driver).await.unwrap().len(), 1);
    assert_eq!(base.all(&driver).await.unwrap().len(), 0);
    assert_eq!(driver.statements().len(), 2);
    assert_eq!(driver.statements()[0], driver.statements()[1]);
}

#[tokio::test]
async fn first_and_last_order_by_primary_key() {
    let driver = RecordingDriver::mysql();
    let objects = user().objects();
    objects.first(&driver).await.unwrap();
    objects.last(&driver).await.unwrap();
    objects.order("email").last(&driver).await.unwrap();
    assert_eq!(
        driver.statements(),
        [
            "SELECT * FROM `users` ORDER BY `id` ASC LIMIT 1",
            "SELECT * FROM `users` ORDER BY `id` DESC LIMIT 1",
            "SELECT * FROM `users` ORDER BY `email` DESC LIMIT 1",
        ]
    );
}

#[tokio::test]
async fn get_requires_exactly_one_row() {
    let driver = RecordingDriver::sqlite();
    let query = user().objects().find(Condition::eq("email", "a@b.c"));

    assert!(matches!(query.get(&driver).await, Err(OrmError::NotFound)));

    driver.push_rows(vec![row(&[("id", SqlValue::Int(1))]), row(&[("id", SqlValue::Int(2))])]);
    assert!(matches!(
        query.get(&driver).await,
        Err(OrmError::MultipleObjectsReturned)
    ));

    driver.push_rows(vec![row(&[("id", SqlValue::Int(1))])]);
    let user = query.get(&driver).await.unwrap();
    assert_eq!(user.attribute("id").unwrap(), &Value::Int(1));
}

#[tokio::test]
async fn count_and_aggregates() {
    let driver = RecordingDriver::postgres();
    driver.push_rows(vec![row(&[("count", SqlValue::Int(3))])]);
    driver.push_rows(vec![row(&[("average", SqlValue::Text("12.5".into()))])]);
    driver.push_rows(vec![row(&[("count", SqlValue::Int(0))])]);

    let query = post().objects().all().order("title").limit(10);
    assert_eq!(query.count(&driver).await.unwrap(), 3);
    assert_eq!(
        query.aggregate(&driver, Aggregate::avg("wordCount")).await.unwrap(),
        Some(12.5)
    );
    assert!(!query.exists(&driver).await.unwrap());
    assert_eq!(
        driver.statements()[0],
        "SELECT COUNT(*) AS \"count\" FROM \"articles\" WHERE \"deleted_at\" IS NULL"
    );
}

#[tokio::test]
async fn find_by_pk_uses_declared_key() {
    let driver = RecordingDriver::sqlite();
    book().objects().find_by_pk(&driver, 9_787_550_616_950_i64).await.unwrap();
    assert_eq!(
        driver.statements(),
        ["SELECT * FROM \"books\" WHERE \"isbn\" = ? ORDER BY \"isbn\" ASC LIMIT 1"]
    );
    assert_eq!(driver.params(0), [SqlValue::Int(9_787_550_616_950)]);
}

#[tokio::test]
async fn identifiers_are_quoted_by_the_driver() {
    let driver = RecordingDriver::sqlite().escaping(|name| format!("[{name}]"));
    user()
        .objects()
        .find(Condition::eq("email", "a@b.c"))
        .order("-id")
        .all(&driver)
        .await
        .unwrap();
    assert_eq!(
        driver.statements(),
        ["SELECT * FROM [users] WHERE [email] = ? ORDER BY [id] DESC"]
    );
}

// ===================================================================
// Bulk create
// ===================================================================

#[tokio::test]
async fn bulk_create_of_nothing_skips_the_driver() {
    let driver = RecordingDriver::sqlite();
    let objects = post().objects();
    assert!(objects
        .bulk_create(&driver, None, &WriteOptions::new())
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        objects
            .bulk_create(&driver, Some(Vec::new()), &WriteOptions::new())
            .await
            .unwrap()
            .map(|created| created.len()),
        Some(0)
    );
    assert!(driver.statements().is_empty());
    assert_eq!(driver.acquired(), 0);
}

#[tokio::test]
async fn bulk_create_assigns_keys_per_dialect() {
    let rows = || Some(vec![values! { "title" => "A" }, values! { "title" => "B" }]);
    let options = WriteOptions::new();

    let sqlite = RecordingDriver::sqlite();
    sqlite.push_result(QueryResult {
        affected_rows: 2,
        last_insert_id: Some(11),
        ..QueryResult::default()
    });
    let created = post()
        .objects()
        .bulk_create(&sqlite, rows(), &options)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<_> = created.iter().map(|p| p.attribute("id").unwrap().clone()).collect();
    assert_eq!(ids, [Value::Int(10), Value::Int(11)]);
    assert!(created.iter().all(|p| !p.is_new_record() && p.changes().is_empty()));
    assert!(sqlite.statements()[0].contains("VALUES (?, ?, ?, ?), (?, ?, ?, ?)"));

    let mysql = RecordingDriver::mysql();
    mysql.push_result(QueryResult {
        affected_rows: 2,
        last_insert_id: Some(11),
        ..QueryResult::default()
    });
    let created = post()
        .objects()
        .bulk_create(&mysql, rows(), &options)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created[1].attribute("id").unwrap(), &Value::Int(12));
}

#[tokio::test]
async fn bulk_create_with_update_on_duplicate() {
    let driver = RecordingDriver::postgres();
    let options = WriteOptions::new()
        .update_on_duplicate(UpdateOnDuplicate::Only(vec!["name".to_string()]))
        .unique_keys(["isbn"]);
    book()
        .objects()
        .bulk_create(
            &driver,
            Some(vec![
                values! { "isbn" => 1, "name" => "Book of Tea", "price" => 1.0 },
                values! { "isbn" => 2, "name" => "Book of Wine", "price" => 2.0 },
            ]),
            &options,
        )
        .await
        .unwrap();
    assert_eq!(
        driver.statements(),
        [
            "INSERT INTO \"books\" (\"isbn\", \"name\", \"price\") VALUES ($1, $2, $3), ($4, $5, $6) \
             ON CONFLICT (\"isbn\") DO UPDATE SET \"name\" = excluded.\"name\" RETURNING \"isbn\""
        ]
    );
}

#[tokio::test]
async fn failed_bulk_create_returns_the_error() {
    let driver = RecordingDriver::sqlite();
    driver.fail_next("UNIQUE constraint failed: books.isbn");
    let err = book()
        .objects()
        .bulk_create(
            &driver,
            Some(vec![values! { "isbn" => 1 }, values! { "isbn" => 1 }]),
            &WriteOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE constraint failed"));
}

// ===================================================================
// Model-level mutations
// ===================================================================

#[tokio::test]
async fn model_update_and_remove() {
    let driver = RecordingDriver::mysql();
    driver.push_result(QueryResult {
        affected_rows: 2,
        ..QueryResult::default()
    });
    let objects = post().objects();
    let affected = objects
        .update(
            Some(Condition::eq("title", "A")),
            values! { "title" => "B" },
            &WriteOptions::new().silent(),
        )
        .unwrap()
        .execute(&driver)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    objects
        .remove(Some(Condition::eq("title", "B")), true)
        .order("id")
        .limit(1)
        .execute(&driver)
        .await
        .unwrap();
    assert_eq!(
        driver.statements(),
        [
            "UPDATE `articles` SET `title` = ? WHERE `title` = ? AND `deleted_at` IS NULL",
            "DELETE FROM `articles` WHERE `title` = ? ORDER BY `id` ASC LIMIT 1",
        ]
    );
}

#[tokio::test]
async fn model_upsert_per_dialect() {
    let driver = RecordingDriver::mysql();
    driver.push_result(QueryResult {
        affected_rows: 2,
        ..QueryResult::default()
    });
    let affected = user()
        .objects()
        .upsert(
            &driver,
            values! { "email" => "a@b.c", "nickname" => "x" },
            &WriteOptions::new(),
        )
        .await
        .unwrap();
    assert!(affected > 0);
    assert_eq!(
        driver.statements(),
        [
            "INSERT INTO `users` (`email`, `nickname`) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE `id` = LAST_INSERT_ID(`id`), `email` = VALUES(`email`), \
             `nickname` = VALUES(`nickname`)"
        ]
    );

    let err = user()
        .objects()
        .upsert(
            &driver,
            values! { "email" => "a@b.c" },
            &WriteOptions::new().unique_keys(["email"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::Capability {
            feature: Feature::ConflictTarget,
            ..
        }
    ));
    assert_eq!(driver.statements().len(), 1);
}

#[tokio::test]
async fn model_upsert_applies_defaults() {
    let driver = RecordingDriver::sqlite();
    post()
        .objects()
        .upsert(&driver, values! { "title" => "A" }, &WriteOptions::new())
        .await
        .unwrap();
    assert!(driver.statements()[0].contains("\"word_count\""));
    assert!(driver.params(0).contains(&SqlValue::Int(0)));
}
