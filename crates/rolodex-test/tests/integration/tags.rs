//! Tests for the `/api/tags` endpoints.

use salvo::http::StatusCode;
use serde_json::{Value, json};

use super::helpers::*;

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn add_tag_capitalizes_and_returns_created() {
    let h = Harness::new().await;

    let res = h
        .send(TestRequest::post("/api/tags").json_body(&json!({ "name": "  friends " })))
        .await
        .assert_status(StatusCode::CREATED);

    let body: Value = res.json();
    assert_eq!(body["name"], "Friends");
    assert!(body["id"].as_i64().is_some());
    assert!(body["updatedAt"].is_null());
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn duplicate_tag_name_is_rejected() {
    let h = Harness::new().await;
    h.db.seed_tag(h.user_id, "Work").await.expect("seed tag");

    let res = h
        .send(TestRequest::post("/api/tags").json_body(&json!({ "name": "work" })))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = res.json();
    assert_eq!(body["message"], "Tag name already exists");
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn same_tag_name_is_allowed_for_different_users() {
    let h = Harness::new().await;
    let bob = h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");
    h.db.seed_tag(bob, "Work").await.expect("seed tag");

    h.send(TestRequest::post("/api/tags").json_body(&json!({ "name": "Work" })))
        .await
        .assert_status(StatusCode::CREATED);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn tag_count_is_capped() {
    let h = Harness::new().await;
    for i in 0..50 {
        h.db.seed_tag(h.user_id, &format!("Tag {i}"))
            .await
            .expect("seed tag");
    }

    let res = h
        .send(TestRequest::post("/api/tags").json_body(&json!({ "name": "One more" })))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["message"], "You have reached the maximum number of tags.");

    let list: Vec<Value> = h.send(TestRequest::get("/api/tags")).await.json();
    assert_eq!(list.len(), 50);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn list_only_shows_own_tags_by_name() {
    let h = Harness::new().await;
    let bob = h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");
    h.db.seed_tag(h.user_id, "Zoo").await.expect("seed tag");
    h.db.seed_tag(h.user_id, "Art").await.expect("seed tag");
    h.db.seed_tag(bob, "Hidden").await.expect("seed tag");

    let list: Vec<Value> = h
        .send(TestRequest::get("/api/tags"))
        .await
        .assert_status(StatusCode::OK)
        .json();

    let names: Vec<&str> = list.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, vec!["Art", "Zoo"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn foreign_tag_is_not_found() {
    let h = Harness::new().await;
    let bob = h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");
    let tag_id = h.db.seed_tag(bob, "Private").await.expect("seed tag");

    h.send(TestRequest::get(&format!("/api/tags/{tag_id}")))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.send(TestRequest::delete(&format!("/api/tags/{tag_id}")))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn edit_tag_renames_and_checks_ids() {
    let h = Harness::new().await;
    let tag_id = h.db.seed_tag(h.user_id, "Old").await.expect("seed tag");
    let path = format!("/api/tags/{tag_id}");

    h.send(TestRequest::put(&path).json_body(&json!({ "id": tag_id + 1, "name": "New" })))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    h.send(TestRequest::put(&path).json_body(&json!({ "id": tag_id, "name": "new" })))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let body: Value = h.send(TestRequest::get(&path)).await.json();
    assert_eq!(body["name"], "New");
    assert!(!body["updatedAt"].is_null());
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn deleting_a_tag_keeps_its_contacts() {
    let h = Harness::new().await;
    let tag_id = h.db.seed_tag(h.user_id, "Family").await.expect("seed tag");
    let keep_id = h.db.seed_tag(h.user_id, "Keep").await.expect("seed tag");
    let first = h.db.seed_contact(h.user_id, "Ann", None).await.expect("seed");
    let second = h.db.seed_contact(h.user_id, "Ben", None).await.expect("seed");
    h.db.tag_contact(first, &[tag_id, keep_id]).await.expect("tag");
    h.db.tag_contact(second, &[tag_id]).await.expect("tag");

    h.send(TestRequest::delete(&format!("/api/tags/{tag_id}")))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(
        h.db.contact_tag_ids(first).await.expect("query"),
        Some(vec![keep_id])
    );
    assert_eq!(h.db.contact_tag_ids(second).await.expect("query"), Some(vec![]));
    assert_eq!(h.db.count_contacts(h.user_id).await.expect("count"), 2);
}
