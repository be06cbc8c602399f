mod common;

use serde_json::{json, Value};

use common::{admin_user, sample_user, sign_in, test_app, MockApi};
use cozylms_client::models::{BlogMedia, NewBlogPost};
use cozylms_client::ClientError;

fn post_json(id: &str, created_at: Value) -> Value {
    json!({
        "_id": id,
        "title": format!("Post {}", id),
        "author": "Admin",
        "content": "A word for today",
        "createdAt": created_at
    })
}

fn media(name: &str) -> BlogMedia {
    BlogMedia {
        file_name: name.to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }
}

#[tokio::test]
async fn test_list_decodes_bare_array() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);

    // The list route answers with a bare array, no envelope.
    mock.stub(
        "GET",
        "/blog",
        json!([post_json("p1", json!("2026-03-01T10:00:00Z"))]),
    );

    let posts = app.blog.list().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p1");
}

#[tokio::test]
async fn test_list_accepts_wrapped_shapes() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);

    mock.stub(
        "GET",
        "/blog",
        json!({ "success": true, "blogs": [post_json("p1", json!(null))] }),
    );
    assert_eq!(app.blog.list().await.unwrap().len(), 1);

    mock.stub(
        "GET",
        "/blog",
        json!({ "data": [post_json("p2", json!(1767268800000u64))] }),
    );
    assert_eq!(app.blog.list().await.unwrap()[0].id, "p2");
}

#[tokio::test]
async fn test_list_sorts_newest_first() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);

    mock.stub(
        "GET",
        "/blog",
        json!([
            post_json("old", json!("2026-01-01T00:00:00Z")),
            post_json("new", json!("2026-06-01T00:00:00Z")),
            post_json("undated", json!(null))
        ]),
    );

    let posts = app.blog.list().await.unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old", "undated"]);
}

#[tokio::test]
async fn test_search_percent_encodes_the_query() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);

    mock.stub(
        "GET",
        "/blog/search/hello%20world",
        json!([post_json("p1", json!(null))]),
    );

    let posts = app.blog.search("hello world").await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(mock.calls_to("GET", "/blog/search/hello%20world"), 1);
}

#[tokio::test]
async fn test_blank_search_returns_the_full_list() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);

    mock.stub("GET", "/blog", json!([post_json("p1", json!(null))]));

    let posts = app.blog.search("   ").await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(mock.calls_to("GET", "/blog"), 1);
    assert!(mock
        .requests()
        .iter()
        .all(|r| !r.path.starts_with("/blog/search")));
}

#[tokio::test]
async fn test_create_requires_admin() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    let post = NewBlogPost {
        title: "Morning Psalm".to_string(),
        content: "Psalm 23".to_string(),
        media: Vec::new(),
    };
    let err = app.blog.create(&post).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert_eq!(mock.calls_to("POST", "/blog/create"), 0);
}

#[tokio::test]
async fn test_create_sends_multipart_with_media() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, admin_user("a1")).await;

    mock.stub("POST", "/blog/create", json!({ "success": true }));

    let post = NewBlogPost {
        title: "Morning Psalm".to_string(),
        content: "Psalm 23".to_string(),
        media: vec![media("sunrise.png"), media("valley.png")],
    };
    app.blog.create(&post).await.unwrap();

    let request = mock
        .requests()
        .into_iter()
        .find(|r| r.path == "/blog/create")
        .unwrap();
    let content_type = request.content_type.expect("content type should be set");
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_media_cap_is_enforced_locally() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, admin_user("a1")).await;

    let post = NewBlogPost {
        title: "Morning Psalm".to_string(),
        content: "Psalm 23".to_string(),
        media: vec![media("a.png"), media("b.png"), media("c.png"), media("d.png")],
    };
    let err = app.blog.create(&post).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(mock.calls_to("POST", "/blog/create"), 0);
}

#[tokio::test]
async fn test_update_and_delete_hit_the_expected_routes() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, admin_user("a1")).await;

    mock.stub("POST", "/blog/update/p1", json!({ "success": true }));
    let post = NewBlogPost {
        title: "Evening Psalm".to_string(),
        content: "Psalm 121".to_string(),
        media: Vec::new(),
    };
    app.blog.update("p1", &post).await.unwrap();
    assert_eq!(mock.calls_to("POST", "/blog/update/p1"), 1);

    mock.stub("DELETE", "/blog/delete/p1", json!({ "success": true }));
    app.blog.delete("p1").await.unwrap();
    assert_eq!(mock.calls_to("DELETE", "/blog/delete/p1"), 1);
}
