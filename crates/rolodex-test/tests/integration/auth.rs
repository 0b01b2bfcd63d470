//! Tests for registration, sessions, emailed links and the account endpoints.

use salvo::http::StatusCode;
use serde_json::{Value, json};

use super::helpers::*;

/// Reads an unencoded query parameter from an emailed link.
fn link_param<'a>(link: &'a str, name: &str) -> &'a str {
    let query = link.split_once('?').map_or("", |(_, q)| q);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .unwrap_or_else(|| panic!("link has no {name}: {link}"))
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn register_confirm_and_login() {
    let db = TestDb::new().await.expect("Failed to create test database");
    let app = create_db_test_service(&db.url()).await;

    let res = TestRequest::post("/api/auth/register")
        .json_body(&json!({
            "firstName": "Carol",
            "lastName": "Jones",
            "userName": "carol",
            "email": "carol@example.com",
            "password": TEST_PASSWORD,
        }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["message"], "Registration successful");

    // Unconfirmed accounts cannot log in.
    let res = TestRequest::post("/api/auth/login")
        .json_body(&json!({ "userName": "carol", "password": TEST_PASSWORD }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(res.session_cookie().is_none());

    let mail = app
        .mailer
        .last_to("carol@example.com")
        .expect("confirmation mail");
    assert!(mail.link.starts_with(&format!("{TEST_ORIGIN}/api/auth/confirm-email?")));

    TestRequest::get(&link_path(&mail.link))
        .send(&app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header_contains("location", &format!("{TEST_FRONTEND}/email-confirmation?"))
        .assert_header_contains("location", "title=Email+Confirmed");

    // The link is single use.
    TestRequest::get(&link_path(&mail.link))
        .send(&app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header_contains("location", "title=Email+Confirmation+Failed");

    let cookie = login(&app.service, "carol").await;
    let me: Value = TestRequest::get("/api/auth/user")
        .session(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(me["userName"], "carol");
    assert_eq!(me["email"], "carol@example.com");
    assert_eq!(me["firstName"], "Carol");
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn register_reports_every_bad_field() {
    let db = TestDb::new().await.expect("Failed to create test database");
    db.seed_user("taken", "taken@example.com").await.expect("seed");
    let app = create_db_test_service(&db.url()).await;

    let res = TestRequest::post("/api/auth/register")
        .json_body(&json!({
            "firstName": "",
            "lastName": "X",
            "userName": "taken",
            "email": "TAKEN@example.com",
            "password": "123",
        }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = res.json();
    assert_eq!(body["message"], "Registration failed");
    for field in ["firstName", "userName", "email", "password"] {
        assert!(body["errors"][field].is_array(), "{field}: {body}");
    }
    assert!(app.mailer.sent().is_empty());
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn wrong_password_is_rejected() {
    let db = TestDb::new().await.expect("Failed to create test database");
    db.seed_user("alice", "alice@example.com").await.expect("seed");
    let app = create_db_test_service(&db.url()).await;

    let res = TestRequest::post("/api/auth/login")
        .json_body(&json!({ "userName": "alice", "password": "not-it" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(res.session_cookie().is_none());

    TestRequest::post("/api/auth/login")
        .json_body(&json!({ "userName": "nobody", "password": TEST_PASSWORD }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn logout_ends_the_session() {
    let h = Harness::new().await;

    h.send(TestRequest::post("/api/auth/logout"))
        .await
        .assert_status(StatusCode::OK);

    h.send(TestRequest::get("/api/contacts"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn expired_sessions_are_removed_on_login() {
    let h = Harness::new().await;
    h.db.expire_sessions(h.user_id).await.expect("expire sessions");

    h.send(TestRequest::get("/api/auth/user"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let cookie = login(&h.app.service, "alice").await;
    assert_eq!(h.db.count_sessions(h.user_id).await.expect("count"), 1);

    TestRequest::get("/api/auth/user")
        .session(&cookie)
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn unknown_session_cookie_is_unauthorized() {
    let h = Harness::new().await;

    TestRequest::get("/api/contacts")
        .session("rolodex_session=forged")
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn password_reset_flow() {
    let h = Harness::new().await;
    let new_password = "battery-staple";

    TestRequest::post("/api/auth/forgot-password")
        .json_body(&json!({ "email": "nobody@example.com" }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    TestRequest::post("/api/auth/forgot-password")
        .json_body(&json!({ "email": "Alice@Example.com" }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);

    let mail = h.app.mailer.last_to("alice@example.com").expect("reset mail");
    let user_id = link_param(&mail.link, "userId");
    let code = link_param(&mail.link, "code");

    TestRequest::get(&link_path(&mail.link))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header_contains("location", &format!("{TEST_FRONTEND}/reset-password?"))
        .assert_header_contains("location", &format!("code={code}"));

    TestRequest::post("/api/auth/reset-password")
        .json_body(&json!({ "userId": user_id, "password": new_password, "code": code }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);

    // Existing sessions end with the reset.
    h.send(TestRequest::get("/api/auth/user"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // The code cannot be replayed.
    TestRequest::post("/api/auth/reset-password")
        .json_body(&json!({ "userId": user_id, "password": "third-password", "code": code }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = TestRequest::post("/api/auth/login")
        .json_body(&json!({ "userName": "alice", "password": new_password }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);
    assert!(res.session_cookie().is_some());

    // The redeemed code is swept when the next one is issued.
    TestRequest::post("/api/auth/forgot-password")
        .json_body(&json!({ "email": "alice@example.com" }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(h.db.count_tokens(h.user_id).await.expect("count"), 1);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn email_change_flow() {
    let h = Harness::new().await;
    h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");

    h.send(
        TestRequest::post("/api/auth/change-email")
            .json_body(&json!({ "newEmail": "bob@example.com" })),
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    h.send(
        TestRequest::post("/api/auth/change-email")
            .json_body(&json!({ "newEmail": "alice@new.example.com" })),
    )
    .await
    .assert_status(StatusCode::OK);

    let mail = h
        .app
        .mailer
        .last_to("alice@new.example.com")
        .expect("change mail");

    TestRequest::get(&link_path(&mail.link))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header_contains("location", &format!("{TEST_FRONTEND}/email-confirmation?"));

    let me: Value = h
        .send(TestRequest::get("/api/auth/user"))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(me["email"], "alice@new.example.com");
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn profile_update_and_password_change() {
    let h = Harness::new().await;

    h.send(TestRequest::put("/api/auth/user").json_body(&json!({
        "firstName": "Alicia",
        "userName": "alicia",
    })))
    .await
    .assert_status(StatusCode::OK);

    let me: Value = h.send(TestRequest::get("/api/auth/user")).await.json();
    assert_eq!(me["firstName"], "Alicia");
    assert_eq!(me["lastName"], "User");
    assert_eq!(me["userName"], "alicia");

    h.send(TestRequest::put("/api/auth/change-password").json_body(&json!({
        "currentPassword": "wrong-one",
        "newPassword": "battery-staple",
    })))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    h.send(TestRequest::put("/api/auth/change-password").json_body(&json!({
        "currentPassword": TEST_PASSWORD,
        "newPassword": "battery-staple",
    })))
    .await
    .assert_status(StatusCode::OK);

    // The session that changed the password stays valid.
    h.send(TestRequest::get("/api/auth/user"))
        .await
        .assert_status(StatusCode::OK);

    TestRequest::post("/api/auth/login")
        .json_body(&json!({ "userName": "alicia", "password": "battery-staple" }))
        .send(&h.app.service)
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn delete_account_removes_everything() {
    let h = Harness::new().await;
    h.db.seed_contacts(h.user_id, 2).await.expect("seed");
    h.db.seed_tag(h.user_id, "Work").await.expect("seed tag");

    h.send(
        TestRequest::post("/api/auth/delete-account").json_body(&json!({ "password": "nope" })),
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);
    assert!(h.db.user_exists(h.user_id).await.expect("query"));

    h.send(
        TestRequest::post("/api/auth/delete-account")
            .json_body(&json!({ "password": TEST_PASSWORD })),
    )
    .await
    .assert_status(StatusCode::OK);

    assert!(!h.db.user_exists(h.user_id).await.expect("query"));
    assert_eq!(h.db.count_contacts(h.user_id).await.expect("count"), 0);
    h.send(TestRequest::get("/api/contacts"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
