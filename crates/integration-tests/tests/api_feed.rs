//! `/api/feed` over HTTP.

use axum::http::StatusCode;
use domains::Role;
use integration_tests::{Multipart, TestApp, PNG};
use serde_json::json;
use uuid::Uuid;

async fn create_post(app: &TestApp, token: &str, title: &str) -> String {
    let form = Multipart::new()
        .text("title", title)
        .text("description", "Bring canned goods")
        .file("image", "flyer.png", "image/png", PNG);
    let (status, body) = app.multipart("POST", "/api/feed/post", Some(token), &form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn posting_requires_a_token() {
    let app = TestApp::new();
    let form = Multipart::new().text("title", "t").text("description", "d");

    let (status, body) = app.multipart("POST", "/api/feed/post", None, &form).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn created_post_appears_in_the_feed() {
    let app = TestApp::new();
    let org = app.register(Role::Organization, "helpers", "org@example.org").await;
    let id = create_post(&app, &org.token, "Food drive").await;

    let (status, body) = app.get("/api/feed").await;
    assert_eq!(status, StatusCode::OK);
    let feed = body["data"].as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], id);
    assert_eq!(feed[0]["createdBy"]["name"], "helpers");
    assert!(feed[0]["image"].as_str().unwrap().starts_with("/media/"));

    let (status, body) = app.get(&format!("/api/feed/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Food drive");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = TestApp::new();
    let user = app.register(Role::User, "u", "u@example.org").await;

    let (status, body) = app
        .json("POST", "/api/feed/post", Some(&user.token), json!({ "title": "only a title" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing fields.");
}

#[tokio::test]
async fn only_the_creator_may_edit_or_delete() {
    let app = TestApp::new();
    let owner = app.register(Role::User, "owner", "owner@example.org").await;
    let other = app.register(Role::User, "other", "other@example.org").await;
    let id = create_post(&app, &owner.token, "Mine").await;

    let (status, body) = app
        .json("PUT", &format!("/api/feed/{id}/edit"), Some(&other.token), json!({ "title": "Theirs" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not authorized to update this post.");

    let (status, _) = app.authed("DELETE", &format!("/api/feed/{id}/delete"), &other.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json("PUT", &format!("/api/feed/{id}/edit"), Some(&owner.token), json!({ "title": "Still mine" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Still mine");

    let (status, _) = app.authed("DELETE", &format!("/api/feed/{id}/delete"), &owner.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/feed/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn like_toggles_for_the_caller() {
    let app = TestApp::new();
    let owner = app.register(Role::User, "owner", "owner@example.org").await;
    let fan = app.register(Role::User, "fan", "fan@example.org").await;
    let id = create_post(&app, &owner.token, "Likeable").await;
    let uri = format!("/api/feed/posts/like/{id}");

    // a body naming someone else is ignored
    let (status, body) = app
        .json("POST", &uri, Some(&fan.token), json!({ "userId": owner.user.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["likes"], json!([fan.user.id]));

    let (_, body) = app.authed("POST", &uri, &fan.token).await;
    assert_eq!(body["likes"], json!([]));

    let (status, _) = app.authed("POST", &format!("/api/feed/posts/like/{}", Uuid::now_v7()), &fan.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.get(&format!("/api/feed/{}", Uuid::now_v7())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found.");
}
