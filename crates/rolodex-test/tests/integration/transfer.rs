//! Tests for contact export and import.

use salvo::http::StatusCode;
use serde_json::{Value, json};

use super::helpers::*;

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn export_is_a_json_attachment_without_ids_or_tags() {
    let h = Harness::new().await;
    let tag_id = h.db.seed_tag(h.user_id, "Work").await.expect("seed tag");
    let id = h
        .db
        .seed_contact(h.user_id, "Ann", Some("ann@example.com"))
        .await
        .expect("seed");
    h.db.tag_contact(id, &[tag_id]).await.expect("tag");

    let res = h
        .send(TestRequest::get(&format!("/api/contacts/{id}/export")))
        .await
        .assert_status(StatusCode::OK)
        .assert_header_contains("content-disposition", "contact-export.json")
        .assert_header_contains("content-type", "application/json");

    let exported: Vec<Value> = res.json();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0]["firstName"], "Ann");
    assert_eq!(exported[0]["email"], "ann@example.com");
    assert!(exported[0].get("id").is_none());
    assert!(exported[0].get("tags").is_none());
    assert!(exported[0]["deliveryAddress"].is_null());
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn bulk_export_defaults_to_every_contact() {
    let h = Harness::new().await;
    let ids = h.db.seed_contacts(h.user_id, 3).await.expect("seed");

    let all: Vec<Value> = h
        .send(TestRequest::get("/api/contacts/export"))
        .await
        .assert_status(StatusCode::OK)
        .assert_header_contains("content-disposition", "contacts-export.json")
        .json();
    assert_eq!(all.len(), 3);

    let some: Vec<Value> = h
        .send(TestRequest::get(&format!(
            "/api/contacts/export?ids={},{}",
            ids[0], ids[2]
        )))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(some.len(), 2);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn exporting_a_foreign_contact_is_not_found() {
    let h = Harness::new().await;
    let bob = h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");
    let id = h.db.seed_contact(bob, "Secret", None).await.expect("seed");

    h.send(TestRequest::get(&format!("/api/contacts/{id}/export")))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn export_then_import_creates_a_distinct_copy() {
    let h = Harness::new().await;
    let created: Value = h
        .send(TestRequest::post("/api/contacts").json_body(&json!({
            "firstName": "Ann",
            "lastName": "Lee",
            "notes": "met at work",
            "isFavorite": true,
            "billingAddress": { "city": "Bergen" },
        })))
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    let id = created["id"].as_i64().expect("id");

    let export = h
        .send(TestRequest::get(&format!("/api/contacts/{id}/export")))
        .await
        .assert_status(StatusCode::OK);

    let imported: Vec<Value> = h
        .send(TestRequest::post("/api/contacts/import").multipart_file(
            "file",
            "contact-export.json",
            &export.body,
        ))
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(imported.len(), 1);
    let copy = &imported[0];
    assert_ne!(copy["id"], created["id"]);
    for field in ["firstName", "lastName", "notes", "isFavorite", "createdAt"] {
        assert_eq!(copy[field], created[field], "{field}");
    }
    assert_eq!(copy["billingAddress"]["city"], "Bergen");
    assert_eq!(h.db.count_contacts(h.user_id).await.expect("count"), 2);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn import_is_all_or_nothing() {
    let h = Harness::new().await;
    let file = json!([
        { "firstName": "Valid" },
        { "firstName": "" },
    ]);

    h.send(TestRequest::post("/api/contacts/import").multipart_file(
        "file",
        "contacts.json",
        file.to_string().as_bytes(),
    ))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(h.db.count_contacts(h.user_id).await.expect("count"), 0);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn import_respects_the_contact_limit() {
    let h = Harness::new().await;
    h.db.seed_contacts(h.user_id, 499).await.expect("seed");
    let file = json!([{ "firstName": "One" }, { "firstName": "Two" }]);

    h.send(TestRequest::post("/api/contacts/import").multipart_file(
        "file",
        "contacts.json",
        file.to_string().as_bytes(),
    ))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(h.db.count_contacts(h.user_id).await.expect("count"), 499);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn import_without_a_file_is_rejected() {
    let h = Harness::new().await;

    let res = h
        .send(TestRequest::post("/api/contacts/import"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["message"], "No file was uploaded.");

    h.send(TestRequest::post("/api/contacts/import").multipart_file(
        "file",
        "contacts.json",
        b"not json",
    ))
    .await
    .assert_status(StatusCode::BAD_REQUEST);
}
