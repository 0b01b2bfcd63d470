//! Tests for `GET /api/contacts` filtering, sorting and paging.

use salvo::http::StatusCode;
use serde_json::Value;

use super::helpers::*;

async fn list(h: &Harness, query: &str) -> Value {
    h.send(TestRequest::get(&format!("/api/contacts{query}")))
        .await
        .assert_status(StatusCode::OK)
        .json()
}

fn first_names(page: &Value) -> Vec<String> {
    page["data"]
        .as_array()
        .map(|data| {
            data.iter()
                .filter_map(|c| c["firstName"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn unfiltered_listing_returns_own_contacts_with_defaults() {
    let h = Harness::new().await;
    let bob = h.db.seed_user("bob", "bob@example.com").await.expect("seed bob");
    h.db.seed_contacts(h.user_id, 3).await.expect("seed");
    h.db.seed_contact(bob, "Hidden", None).await.expect("seed");

    let page = list(&h, "").await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["startingIndex"], 0);
    assert_eq!(page["limit"], 10);
    assert_eq!(
        first_names(&page),
        vec!["Contact 000", "Contact 001", "Contact 002"]
    );
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn paging_reports_total_of_the_whole_set() {
    let h = Harness::new().await;
    h.db.seed_contacts(h.user_id, 12).await.expect("seed");

    let page = list(&h, "?startingIndex=10&limit=5").await;
    assert_eq!(page["total"], 12);
    assert_eq!(page["startingIndex"], 10);
    assert_eq!(page["limit"], 5);
    assert_eq!(first_names(&page), vec!["Contact 010", "Contact 011"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn search_matches_any_field_ignoring_case() {
    let h = Harness::new().await;
    h.db.seed_contact(h.user_id, "John", Some("a@SMITH.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Alice", None).await.expect("seed");

    let page = list(&h, "?search=smith").await;
    assert_eq!(page["total"], 1);
    assert_eq!(first_names(&page), vec!["John"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn search_treats_wildcards_literally() {
    let h = Harness::new().await;
    h.db.seed_contact(h.user_id, "Percent", Some("100%@example.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Plain", Some("plain@example.com"))
        .await
        .expect("seed");

    let page = list(&h, "?search=%25").await;
    assert_eq!(first_names(&page), vec!["Percent"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn filters_are_combined_and_unknown_keys_ignored() {
    let h = Harness::new().await;
    h.db.seed_contact(h.user_id, "Ann", Some("ann@work.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Anna", Some("anna@home.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Bob", Some("bob@work.com"))
        .await
        .expect("seed");

    let page = list(
        &h,
        "?filters%5BfirstName%5D=an&filters%5Bemail%5D=work&filters%5Bshoe%5D=42",
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(first_names(&page), vec!["Ann"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn favorite_filter_compares_the_flag() {
    let h = Harness::new().await;
    let ids = h.db.seed_contacts(h.user_id, 3).await.expect("seed");
    h.send(TestRequest::put(&format!("/api/contacts/{}/favorite", ids[1])))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let page = list(&h, "?filters%5BisFavorite%5D=true").await;
    assert_eq!(first_names(&page), vec!["Contact 001"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn tag_filter_restricts_to_tagged_contacts() {
    let h = Harness::new().await;
    let tag_id = h.db.seed_tag(h.user_id, "Work").await.expect("seed tag");
    let ids = h.db.seed_contacts(h.user_id, 3).await.expect("seed");
    h.db.tag_contact(ids[2], &[tag_id]).await.expect("tag");

    let page = list(&h, &format!("?tagId={tag_id}")).await;
    assert_eq!(page["total"], 1);
    assert_eq!(first_names(&page), vec!["Contact 002"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn sorting_by_email_descending() {
    let h = Harness::new().await;
    h.db.seed_contact(h.user_id, "Zed", Some("a@example.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Amy", Some("c@example.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Max", Some("b@example.com"))
        .await
        .expect("seed");

    let page = list(&h, "?sortField=Email&sortDescending=true").await;
    assert_eq!(first_names(&page), vec!["Amy", "Max", "Zed"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn unknown_sort_field_falls_back_to_first_name() {
    let h = Harness::new().await;
    h.db.seed_contact(h.user_id, "Zed", Some("a@example.com"))
        .await
        .expect("seed");
    h.db.seed_contact(h.user_id, "Amy", Some("c@example.com"))
        .await
        .expect("seed");

    let page = list(&h, "?sortField=Notes").await;
    assert_eq!(first_names(&page), vec!["Amy", "Zed"]);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn malformed_numbers_are_bad_requests() {
    let h = Harness::new().await;

    for query in ["?limit=ten", "?startingIndex=-1", "?tagId=x", "?sortDescending=maybe"] {
        h.send(TestRequest::get(&format!("/api/contacts{query}")))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
