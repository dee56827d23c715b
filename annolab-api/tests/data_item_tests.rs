//! Datasets, uploads and data items over HTTP

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use std::path::Path;
use helpers::{multipart_body, spawn_app, MULTIPART_BOUNDARY};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_upload_stores_files_and_serves_them() {
    let app = spawn_app().await;
    let user = app.signup("val@example.com", "val").await;
    let project_id = app.default_project_id(&user).await;
    let (dataset_id, ids) = app
        .dataset_with_items(&user, &project_id, &[("Cat.PNG", b"meow"), ("dog.png", b"woof")])
        .await;
    assert_eq!(ids.len(), 2);

    let base = format!(
        "/workspaces/{}/projects/{}",
        user.default_workspace_id, project_id
    );
    let (status, body) = app
        .get(&format!("{}/items/{}", base, ids[0]), &user.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "NEW");
    assert_eq!(body["data"]["originalName"], "Cat.PNG");
    assert_eq!(body["data"]["size"], 4);
    assert_eq!(body["data"]["datasetId"], dataset_id);

    let key = body["data"]["path"].as_str().unwrap().to_string();
    assert!(key.starts_with(&format!("uploads/{}/{}/", project_id, dataset_id)));
    assert!(key.ends_with(".png"));
    assert_eq!(
        body["data"]["fileUrl"],
        format!("http://files.test/files/{}", key)
    );
    assert!(app.files.path().join(&key).exists());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/files/{}", key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"meow");
}

#[tokio::test]
async fn test_dataset_listing_and_paging() {
    let app = spawn_app().await;
    let user = app.signup("wes@example.com", "wes").await;
    let project_id = app.default_project_id(&user).await;
    let (dataset_id, _) = app
        .dataset_with_items(
            &user,
            &project_id,
            &[("1.png", b"1"), ("2.png", b"2"), ("3.png", b"3")],
        )
        .await;
    let base = format!(
        "/workspaces/{}/projects/{}/datasets",
        user.default_workspace_id, project_id
    );

    let (status, body) = app.get(&base, &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "batch");

    let (_, body) = app.get(&format!("{}/stats", base), &user.token).await;
    assert_eq!(body["data"], json!({ "totalDatasets": 1, "totalItems": 3 }));

    let (status, body) = app
        .get(&format!("{}/{}/items?page=2&limit=2", base, dataset_id), &user.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["originalName"], "3.png");

    let (_, body) = app.get(&format!("{}/items", base), &user.token).await;
    assert_eq!(body["data"]["total"], 3);

    let (status, _) = app
        .get(&format!("{}/missing/items", base), &user.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dataset_rename_and_delete_removes_files() {
    let app = spawn_app().await;
    let user = app.signup("xia@example.com", "xia").await;
    let worker = app.signup("yan@example.com", "yan").await;
    app.add_member(&user.default_workspace_id, &worker, "WORKER").await;
    let project_id = app.default_project_id(&user).await;
    let (dataset_id, ids) = app
        .dataset_with_items(&user, &project_id, &[("a.png", b"a")])
        .await;
    let key: String = sqlx::query_scalar("SELECT path FROM data_items WHERE id = ?")
        .bind(&ids[0])
        .fetch_one(&app.db)
        .await
        .unwrap();
    let uri = format!(
        "/workspaces/{}/projects/{}/datasets/{}",
        user.default_workspace_id, project_id, dataset_id
    );

    let (status, _) = app.put(&uri, &worker.token, json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.put(&uri, &user.token, json!({ "name": "renamed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "renamed");

    let (status, _) = app.delete(&uri, &worker.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, &user.token, None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.files.path().join(&key).exists());
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_items")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_status_rename_and_navigation() {
    let app = spawn_app().await;
    let owner = app.signup("zed@example.com", "zed").await;
    let viewer = app.signup("amy@example.com", "amy").await;
    let worker = app.signup("bo@example.com", "bo").await;
    app.add_member(&owner.default_workspace_id, &viewer, "VIEWER").await;
    app.add_member(&owner.default_workspace_id, &worker, "WORKER").await;
    let project_id = app.default_project_id(&owner).await;
    let (_, ids) = app
        .dataset_with_items(&owner, &project_id, &[("a.png", b"a"), ("b.png", b"b"), ("c.png", b"c")])
        .await;
    let base = format!(
        "/workspaces/{}/projects/{}/items",
        owner.default_workspace_id, project_id
    );

    let status_uri = format!("{}/{}/status", base, ids[1]);
    let (status, _) = app
        .patch(&status_uri, &viewer.token, json!({ "status": "IN_PROGRESS" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .patch(&status_uri, &worker.token, json!({ "status": "IN_PROGRESS" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "IN_PROGRESS");

    let item_uri = format!("{}/{}", base, ids[1]);
    let (status, _) = app.put(&item_uri, &worker.token, json!({ "name": "n" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .put(&item_uri, &owner.token, json!({ "name": "middle" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "middle");

    let (status, body) = app
        .get(&format!("{}/navigation", item_uri), &viewer.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({ "currentIndex": 1, "total": 3, "prevItemId": ids[0], "nextItemId": ids[2] })
    );

    let (_, body) = app
        .get(&format!("{}/{}/navigation", base, ids[0]), &viewer.token)
        .await;
    assert!(body["data"]["prevItemId"].is_null());
}

#[tokio::test]
async fn test_delete_many_is_all_or_nothing() {
    let app = spawn_app().await;
    let owner = app.signup("cy@example.com", "cy").await;
    let other = app.signup("di@example.com", "di").await;
    let project_id = app.default_project_id(&owner).await;
    let other_project = app.default_project_id(&other).await;
    let (_, ids) = app
        .dataset_with_items(&owner, &project_id, &[("a.png", b"a"), ("b.png", b"b")])
        .await;
    let (_, foreign) = app
        .dataset_with_items(&other, &other_project, &[("z.png", b"z")])
        .await;
    let keys: Vec<String> = sqlx::query_scalar("SELECT path FROM data_items WHERE id IN (?, ?)")
        .bind(&ids[0])
        .bind(&ids[1])
        .fetch_all(&app.db)
        .await
        .unwrap();
    assert_eq!(keys.len(), 2);
    let uri = format!(
        "/workspaces/{}/projects/{}/items",
        owner.default_workspace_id, project_id
    );

    let (status, _) = app
        .delete(&uri, &owner.token, Some(json!({ "itemIds": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .delete(&uri, &owner.token, Some(json!({ "itemIds": ["nope"] })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .delete(
            &uri,
            &owner.token,
            Some(json!({ "itemIds": [ids[0], foreign[0]] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_items")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 3);

    let (status, body) = app
        .delete(
            &uri,
            &owner.token,
            Some(json!({ "itemIds": [ids[0], ids[1], ids[0]] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedCount"], 2);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_items")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 1);
    for key in &keys {
        assert!(!app.files.path().join(key).exists());
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .map(|entry| entry.unwrap().path())
        .map(|path| if path.is_dir() { count_files(&path) } else { 1 })
        .sum()
}

#[tokio::test]
async fn test_failed_upload_leaves_no_stored_files() {
    let app = spawn_app().await;
    let user = app.signup("ed@example.com", "ed").await;
    let project_id = app.default_project_id(&user).await;
    let base = format!(
        "/workspaces/{}/projects/{}/datasets",
        user.default_workspace_id, project_id
    );
    let (status, body) = app.post(&base, &user.token, json!({ "name": "broken" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let dataset_id = body["data"]["id"].as_str().unwrap().to_string();

    // Files reach the store, then the row insert fails
    sqlx::query(
        "CREATE TRIGGER reject_items BEFORE INSERT ON data_items
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(&app.db)
    .await
    .unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{}/{}/items", base, dataset_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", user.token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(multipart_body(&[("a.png", b"a"), ("b.png", b"b")])))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(count_files(app.files.path()), 0);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_items")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
