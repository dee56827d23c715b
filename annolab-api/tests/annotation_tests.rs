//! Annotation listing and synchronization over HTTP

mod helpers;

use axum::http::StatusCode;
use helpers::{spawn_app, TestApp, TestUser};
use serde_json::{json, Value};

struct Fixture {
    app: TestApp,
    owner: TestUser,
    base: String,
    labels_uri: String,
    item_id: String,
    label_id: String,
}

async fn fixture() -> Fixture {
    let app = spawn_app().await;
    let owner = app.signup("eli@example.com", "eli").await;
    let project_id = app.default_project_id(&owner).await;
    let (_, items) = app
        .dataset_with_items(&owner, &project_id, &[("a.png", b"a")])
        .await;
    let base = format!(
        "/workspaces/{}/projects/{}",
        owner.default_workspace_id, project_id
    );
    let (status, body) = app
        .post(
            &format!("{}/class-labels", base),
            &owner.token,
            json!({ "name": "person", "color": "#123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let label_id = body["data"]["id"].as_str().unwrap().to_string();
    let labels_uri = format!("{}/items/{}/labels", base, items[0]);

    Fixture {
        app,
        owner,
        base,
        labels_uri,
        item_id: items[0].clone(),
        label_id,
    }
}

fn entries(body: &Value) -> &Vec<Value> {
    body["data"].as_array().unwrap()
}

#[tokio::test]
async fn test_sync_inserts_then_updates() {
    let f = fixture().await;
    let sync_uri = format!("{}/sync", f.labels_uri);

    let (status, body) = f
        .app
        .post(
            &sync_uri,
            &f.owner.token,
            json!([
                { "id": "shape-1", "clientId": "c1", "type": "BBOX", "bbox": [1, 2, 3, 4],
                  "zIndex": 2, "classLabelId": f.label_id },
                { "clientId": "c2", "type": "POLYGON", "polygon": [[0, 0], [5, 0], [5, 5]],
                  "classLabelId": f.label_id }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let list = entries(&body);
    assert_eq!(list.len(), 2);
    // Ordered by z-index: the polygon defaulted to 0
    assert_eq!(list[0]["clientId"], "c2");
    assert_eq!(list[0]["zIndex"], 0);
    assert_eq!(list[1]["id"], "shape-1");
    assert_eq!(list[1]["labelType"], "BBOX");
    assert_eq!(list[1]["bbox"], json!([1.0, 2.0, 3.0, 4.0]));
    assert_eq!(list[1]["dataItem"]["id"], f.item_id);
    assert_eq!(list[1]["isDeleted"], false);
    let generated_id = list[0]["id"].as_str().unwrap().to_string();
    assert!(!generated_id.is_empty());

    let (status, body) = f
        .app
        .post(
            &sync_uri,
            &f.owner.token,
            json!([
                { "id": "shape-1", "clientId": "c1", "type": "BBOX", "bbox": [10, 20, 30, 40],
                  "zIndex": 2, "classLabelId": f.label_id, "isDeleted": true }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = entries(&body);
    assert_eq!(list.len(), 2);
    let updated = list.iter().find(|a| a["id"] == "shape-1").unwrap();
    assert_eq!(updated["bbox"], json!([10.0, 20.0, 30.0, 40.0]));
    assert_eq!(updated["isDeleted"], true);

    let deleted_at: Option<String> =
        sqlx::query_scalar("SELECT deleted_at FROM annotations WHERE id = 'shape-1'")
            .fetch_one(&f.app.db)
            .await
            .unwrap();
    assert!(deleted_at.is_some());

    let (status, body) = f.app.get(&f.labels_uri, &f.owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries(&body).len(), 2);
}

#[tokio::test]
async fn test_sync_rolls_back_on_foreign_label() {
    let f = fixture().await;
    let other = f.app.signup("fox@example.com", "fox").await;
    let other_project = f.app.default_project_id(&other).await;
    let (status, body) = f
        .app
        .post(
            &format!(
                "/workspaces/{}/projects/{}/class-labels",
                other.default_workspace_id, other_project
            ),
            &other.token,
            json!({ "name": "tree", "color": "#00aa00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let foreign_label = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = f
        .app
        .post(
            &format!("{}/sync", f.labels_uri),
            &f.owner.token,
            json!([
                { "id": "ok-shape", "clientId": "c1", "type": "MASK", "mask": [1, 2, 3],
                  "zIndex": 1, "classLabelId": f.label_id },
                { "id": "bad-shape", "clientId": "c2", "type": "MASK", "mask": [4, 5, 6],
                  "zIndex": 1, "classLabelId": foreign_label }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM annotations")
        .fetch_one(&f.app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_sync_rolls_back_when_id_belongs_to_another_item() {
    let f = fixture().await;
    let project_id = f.app.default_project_id(&f.owner).await;
    let (_, others) = f
        .app
        .dataset_with_items(&f.owner, &project_id, &[("b.png", b"b")])
        .await;

    let (status, _) = f
        .app
        .post(
            &format!("{}/sync", f.labels_uri),
            &f.owner.token,
            json!([{ "id": "taken", "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 1, 1],
                     "zIndex": 3, "classLabelId": f.label_id }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let other_uri = format!("{}/items/{}/labels/sync", f.base, others[0]);
    let (status, _) = f
        .app
        .post(
            &other_uri,
            &f.owner.token,
            json!([
                { "id": "fresh", "clientId": "c2", "type": "BBOX", "bbox": [2, 2, 3, 3],
                  "zIndex": 0, "classLabelId": f.label_id },
                { "id": "taken", "clientId": "c3", "type": "BBOX", "bbox": [9, 9, 9, 9],
                  "zIndex": 0, "classLabelId": f.label_id }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let fresh: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM annotations WHERE id = 'fresh'")
        .fetch_one(&f.app.db)
        .await
        .unwrap();
    assert_eq!(fresh, 0);

    let (_, body) = f.app.get(&f.labels_uri, &f.owner.token).await;
    let list = entries(&body);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["clientId"], "c1");
    assert_eq!(list[0]["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
}

#[tokio::test]
async fn test_sync_update_keeps_omitted_fields() {
    let f = fixture().await;
    let sync_uri = format!("{}/sync", f.labels_uri);

    let (status, _) = f
        .app
        .post(
            &sync_uri,
            &f.owner.token,
            json!([{ "id": "s1", "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 1, 1],
                     "zIndex": 5, "classLabelId": f.label_id }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // No zIndex: the stored 5 stays
    let (status, body) = f
        .app
        .post(
            &sync_uri,
            &f.owner.token,
            json!([{ "id": "s1", "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 2, 2],
                     "classLabelId": f.label_id, "isDeleted": true }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = entries(&body);
    assert_eq!(list[0]["zIndex"], 5);
    assert_eq!(list[0]["isDeleted"], true);

    // No isDeleted: the annotation stays deleted
    let (status, body) = f
        .app
        .post(
            &sync_uri,
            &f.owner.token,
            json!([{ "id": "s1", "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 3, 3],
                     "zIndex": 7, "classLabelId": f.label_id }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = entries(&body);
    assert_eq!(list[0]["zIndex"], 7);
    assert_eq!(list[0]["isDeleted"], true);
    assert_eq!(list[0]["bbox"], json!([0.0, 0.0, 3.0, 3.0]));
}

#[tokio::test]
async fn test_viewer_can_read_but_not_sync() {
    let f = fixture().await;
    let viewer = f.app.signup("gil@example.com", "gil").await;
    f.app
        .add_member(&f.owner.default_workspace_id, &viewer, "VIEWER")
        .await;

    let (status, body) = f.app.get(&f.labels_uri, &viewer.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(entries(&body).is_empty());

    let (status, _) = f
        .app
        .post(
            &format!("{}/sync", f.labels_uri),
            &viewer.token,
            json!([{ "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 1, 1],
                     "zIndex": 0, "classLabelId": f.label_id }]),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sync_requires_item_in_project() {
    let f = fixture().await;
    let uri = format!("{}/items/missing/labels/sync", f.base);
    let (status, _) = f.app.post(&uri, &f.owner.token, json!([])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_label_soft_deletes_its_annotations() {
    let f = fixture().await;
    let (status, _) = f
        .app
        .post(
            &format!("{}/sync", f.labels_uri),
            &f.owner.token,
            json!([{ "id": "s1", "clientId": "c1", "type": "BBOX", "bbox": [0, 0, 1, 1],
                     "zIndex": 0, "classLabelId": f.label_id }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = f
        .app
        .delete(
            &format!("{}/class-labels/{}", f.base, f.label_id),
            &f.owner.token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = f.app.get(&f.labels_uri, &f.owner.token).await;
    let list = entries(&body);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["isDeleted"], true);
    assert!(list[0]["classLabelId"].is_null());
}
