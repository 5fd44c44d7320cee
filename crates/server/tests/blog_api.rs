//! Integration tests for the blog: posts, drafts, the featured slot and
//! category memberships.
//!
//! Each test runs against its own in-process server; see `common::TestApp`.

mod common;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, client_as};

/// Spawn an app plus a client authenticated as a fresh editor.
async fn spawn_with_editor() -> (TestApp, Client) {
    let app = TestApp::spawn().await;
    let editor_id = app
        .create_staff("blog-editor", "blog-editor@example.com", "editor")
        .await;
    let editor = client_as(editor_id);
    (app, editor)
}

async fn create_post(app: &TestApp, editor: &Client, body: Value) -> Value {
    let response = editor
        .post(app.url("/api/blog/posts"))
        .json(&body)
        .send()
        .await
        .expect("Failed to create post");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse post")
}

// ============================================================================
// Post CRUD Tests
// ============================================================================

#[tokio::test]
async fn test_post_crud_and_slug_derivation() {
    let (app, editor) = spawn_with_editor().await;

    let post = create_post(
        &app,
        &editor,
        json!({
            "title": "A Guide to Reading Labels!",
            "content": "Start with the ingredient list.",
            "published": true,
        }),
    )
    .await;
    assert_eq!(post["slug"], "a-guide-to-reading-labels");
    assert_eq!(post["author"]["username"], "blog-editor");
    assert_eq!(post["published"], true);
    assert!(post["published_at"].is_string());
    assert_eq!(post["featured"], false);
    assert_eq!(post["categories"], json!([]));

    // Retrieval by slug is public.
    let response = Client::new()
        .get(app.url("/api/blog/posts/slug/a-guide-to-reading-labels"))
        .send()
        .await
        .expect("Failed to get post by slug");
    assert_eq!(response.status(), StatusCode::OK);
    let by_slug: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(by_slug["id"], post["id"]);

    let id = post["id"].as_i64().expect("post id");
    let response = editor
        .put(app.url(&format!("/api/blog/posts/{id}")))
        .json(&json!({ "excerpt": "A short primer." }))
        .send()
        .await
        .expect("Failed to update post");
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(updated["excerpt"], "A short primer.");
    assert_eq!(updated["title"], "A Guide to Reading Labels!");

    let response = editor
        .delete(app.url(&format!("/api/blog/posts/{id}")))
        .send()
        .await
        .expect("Failed to delete post");
    assert_eq!(response.status(), StatusCode::OK);

    let response = Client::new()
        .get(app.url(&format!("/api/blog/posts/{id}")))
        .send()
        .await
        .expect("Failed to get post");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn test_duplicate_slug_rejected() {
    let (app, editor) = spawn_with_editor().await;
    create_post(&app, &editor, json!({ "title": "Harvest Notes" })).await;

    let response = editor
        .post(app.url("/api/blog/posts"))
        .json(&json!({ "title": "Different Title", "slug": "harvest-notes" }))
        .send()
        .await
        .expect("Failed to send create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "slug already exists");
}

#[tokio::test]
async fn test_blog_writes_require_editor_role() {
    let app = TestApp::spawn().await;
    let payload = json!({ "title": "Unauthorized Post" });

    let response = Client::new()
        .post(app.url("/api/blog/posts"))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send create");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let member_id = app
        .create_staff("plain-member", "plain-member@example.com", "user")
        .await;
    let response = client_as(member_id)
        .post(app.url("/api/blog/posts"))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send create");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Draft Visibility Tests
// ============================================================================

#[tokio::test]
async fn test_draft_visibility_rules() {
    let (app, editor) = spawn_with_editor().await;
    let draft = create_post(&app, &editor, json!({ "title": "Draft Planner" })).await;
    create_post(
        &app,
        &editor,
        json!({ "title": "Published Guide", "published": true }),
    )
    .await;

    // Anonymous listings only see published posts.
    let response = Client::new()
        .get(app.url("/api/blog/posts"))
        .send()
        .await
        .expect("Failed to list posts");
    let page: Value = response.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["title"], "Published Guide");

    // Asking for drafts without the role gets published posts anyway.
    let response = Client::new()
        .get(app.url("/api/blog/posts?published=false"))
        .send()
        .await
        .expect("Failed to list posts");
    let page: Value = response.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["published"], true);

    // Editors see everything by default and can filter down to drafts.
    let response = editor
        .get(app.url("/api/blog/posts"))
        .send()
        .await
        .expect("Failed to list posts");
    let page: Value = response.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 2);

    let response = editor
        .get(app.url("/api/blog/posts?published=false"))
        .send()
        .await
        .expect("Failed to list posts");
    let page: Value = response.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["title"], "Draft Planner");

    // Direct retrieval serves drafts to anyone with the link.
    let draft_id = draft["id"].as_i64().expect("post id");
    let response = Client::new()
        .get(app.url(&format!("/api/blog/posts/{draft_id}")))
        .send()
        .await
        .expect("Failed to get draft");
    assert_eq!(response.status(), StatusCode::OK);
    let response = Client::new()
        .get(app.url("/api/blog/posts/slug/draft-planner"))
        .send()
        .await
        .expect("Failed to get draft by slug");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_republish_keeps_original_timestamp() {
    let (app, editor) = spawn_with_editor().await;
    let post = create_post(
        &app,
        &editor,
        json!({ "title": "Seasonal Planner", "published": true }),
    )
    .await;
    let id = post["id"].as_i64().expect("post id");
    let first_published_at = post["published_at"].clone();
    assert!(first_published_at.is_string());

    // Unpublishing keeps the historical timestamp.
    let response = editor
        .put(app.url(&format!("/api/blog/posts/{id}")))
        .json(&json!({ "published": false }))
        .send()
        .await
        .expect("Failed to unpublish");
    let unpublished: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(unpublished["published"], false);
    assert_eq!(unpublished["published_at"], first_published_at);

    // Republishing does not move it either.
    let response = editor
        .put(app.url(&format!("/api/blog/posts/{id}")))
        .json(&json!({ "published": true }))
        .send()
        .await
        .expect("Failed to republish");
    let republished: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(republished["published_at"], first_published_at);
}

// ============================================================================
// Featured Slot Tests
// ============================================================================

#[tokio::test]
async fn test_featured_slot_is_exclusive() {
    let (app, editor) = spawn_with_editor().await;

    let response = Client::new()
        .get(app.url("/api/blog/posts/featured"))
        .send()
        .await
        .expect("Failed to get featured post");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "Featured post not found");

    let first = create_post(
        &app,
        &editor,
        json!({ "title": "First Star", "published": true }),
    )
    .await;
    let second = create_post(
        &app,
        &editor,
        json!({ "title": "Second Star", "published": true }),
    )
    .await;
    let first_id = first["id"].as_i64().expect("post id");
    let second_id = second["id"].as_i64().expect("post id");

    let feature = |id: i64| {
        let url = app.url(&format!("/api/blog/posts/{id}/featured"));
        let editor = editor.clone();
        async move {
            let response = editor
                .put(url)
                .send()
                .await
                .expect("Failed to set featured");
            assert_eq!(response.status(), StatusCode::OK);
            response
                .json::<Value>()
                .await
                .expect("Failed to parse post")
        }
    };

    let featured = feature(first_id).await;
    assert_eq!(featured["featured"], true);

    // Featuring another post displaces the first.
    feature(second_id).await;
    let response = Client::new()
        .get(app.url("/api/blog/posts/featured"))
        .send()
        .await
        .expect("Failed to get featured post");
    assert_eq!(response.status(), StatusCode::OK);
    let current: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(current["id"], second_id);

    let response = Client::new()
        .get(app.url(&format!("/api/blog/posts/{first_id}")))
        .send()
        .await
        .expect("Failed to get post");
    let displaced: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(displaced["featured"], false);

    // A missing target leaves the current holder in place.
    let response = editor
        .put(app.url("/api/blog/posts/424242/featured"))
        .send()
        .await
        .expect("Failed to send feature request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = Client::new()
        .get(app.url("/api/blog/posts/featured"))
        .send()
        .await
        .expect("Failed to get featured post");
    let current: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(current["id"], second_id);
}

// ============================================================================
// Category Membership Tests
// ============================================================================

#[tokio::test]
async fn test_post_category_membership() {
    let (app, editor) = spawn_with_editor().await;

    let create_response = editor
        .post(app.url("/api/categories"))
        .json(&json!({ "name": "Wellness" }))
        .send()
        .await
        .expect("Failed to create category");
    let wellness: Value = create_response.json().await.expect("Failed to parse body");
    let create_response = editor
        .post(app.url("/api/categories"))
        .json(&json!({ "name": "Pantry" }))
        .send()
        .await
        .expect("Failed to create category");
    let pantry: Value = create_response.json().await.expect("Failed to parse body");
    let pantry_id = pantry["id"].as_i64().expect("category id");

    // Memberships can be set at creation time.
    let post = create_post(
        &app,
        &editor,
        json!({
            "title": "Pantry Staples",
            "published": true,
            "category_ids": [wellness["id"]],
        }),
    )
    .await;
    let post_id = post["id"].as_i64().expect("post id");
    assert_eq!(post["categories"][0]["name"], "Wellness");

    let response = editor
        .post(app.url(&format!("/api/blog/posts/{post_id}/categories")))
        .json(&json!({ "category_id": pantry_id }))
        .send()
        .await
        .expect("Failed to add membership");
    assert_eq!(response.status(), StatusCode::OK);
    let tagged: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(tagged["categories"].as_array().map(Vec::len), Some(2));

    // The listing filter follows memberships.
    let response = Client::new()
        .get(app.url(&format!("/api/blog/posts?category_id={pantry_id}")))
        .send()
        .await
        .expect("Failed to list posts");
    let page: Value = response.json().await.expect("Failed to parse page");
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["id"], post_id);

    let response = editor
        .delete(app.url(&format!(
            "/api/blog/posts/{post_id}/categories/{pantry_id}"
        )))
        .send()
        .await
        .expect("Failed to remove membership");
    assert_eq!(response.status(), StatusCode::OK);
    let untagged: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(untagged["categories"].as_array().map(Vec::len), Some(1));

    // Removing a pair that isn't a membership is a 404, not a no-op.
    let response = editor
        .delete(app.url(&format!(
            "/api/blog/posts/{post_id}/categories/{pantry_id}"
        )))
        .send()
        .await
        .expect("Failed to send remove");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "Membership not found");

    // A present category_ids in an update replaces the whole set.
    let response = editor
        .put(app.url(&format!("/api/blog/posts/{post_id}")))
        .json(&json!({ "category_ids": [] }))
        .send()
        .await
        .expect("Failed to update post");
    assert_eq!(response.status(), StatusCode::OK);
    let cleared: Value = response.json().await.expect("Failed to parse post");
    assert_eq!(cleared["categories"], json!([]));

    // The shared taxonomy is reachable under the blog prefix too.
    let response = Client::new()
        .get(app.url("/api/blog/categories"))
        .send()
        .await
        .expect("Failed to list blog categories");
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(categories.as_array().map(Vec::len), Some(2));
}

// ============================================================================
// Related & Listing Tests
// ============================================================================

#[tokio::test]
async fn test_related_posts_share_categories() {
    let (app, editor) = spawn_with_editor().await;

    let create_response = editor
        .post(app.url("/api/categories"))
        .json(&json!({ "name": "Pantry" }))
        .send()
        .await
        .expect("Failed to create category");
    let pantry: Value = create_response.json().await.expect("Failed to parse body");

    let first = create_post(
        &app,
        &editor,
        json!({ "title": "First", "published": true, "category_ids": [pantry["id"]] }),
    )
    .await;
    let second = create_post(
        &app,
        &editor,
        json!({ "title": "Second", "published": true, "category_ids": [pantry["id"]] }),
    )
    .await;
    let loner = create_post(
        &app,
        &editor,
        json!({ "title": "Loner", "published": true }),
    )
    .await;
    let first_id = first["id"].as_i64().expect("post id");
    let second_id = second["id"].as_i64().expect("post id");
    let loner_id = loner["id"].as_i64().expect("post id");

    let related = |id: i64| {
        let url = app.url(&format!("/api/blog/posts/{id}/related"));
        async move {
            let response = Client::new()
                .get(url)
                .send()
                .await
                .expect("Failed to get related posts");
            assert_eq!(response.status(), StatusCode::OK);
            response
                .json::<Value>()
                .await
                .expect("Failed to parse body")
        }
    };

    // Shared-category ranking: only the other pantry post qualifies.
    let items = related(first_id).await;
    let items = items.as_array().expect("related array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], second_id);

    // No shared categories: fall back to recent published posts.
    let items = related(loner_id).await;
    let ids: Vec<i64> = items
        .as_array()
        .expect("related array")
        .iter()
        .map(|item| item["id"].as_i64().expect("post id"))
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first_id));
    assert!(ids.contains(&second_id));
    assert!(!ids.contains(&loner_id));
}

#[tokio::test]
async fn test_blog_list_search_and_sort() {
    let (app, editor) = spawn_with_editor().await;
    create_post(
        &app,
        &editor,
        json!({ "title": "Alpha Harvest Notes", "published": true }),
    )
    .await;
    create_post(
        &app,
        &editor,
        json!({ "title": "Beta Pantry Guide", "published": true }),
    )
    .await;

    let list = |query: &'static str| {
        let url = app.url(&format!("/api/blog/posts{query}"));
        async move {
            let response = Client::new()
                .get(url)
                .send()
                .await
                .expect("Failed to list posts");
            assert_eq!(response.status(), StatusCode::OK);
            response
                .json::<Value>()
                .await
                .expect("Failed to parse page")
        }
    };

    let page = list("").await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["limit"], 10);
    // Newest first by default.
    assert_eq!(page["posts"][0]["title"], "Beta Pantry Guide");

    let page = list("?sort=oldest").await;
    assert_eq!(page["posts"][0]["title"], "Alpha Harvest Notes");

    let page = list("?search=pantry").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["title"], "Beta Pantry Guide");

    let page = list("?limit=1&page=2").await;
    assert_eq!(page["posts"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["total"], 2);

    let response = Client::new()
        .get(app.url("/api/blog/posts?limit=0"))
        .send()
        .await
        .expect("Failed to list posts");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
