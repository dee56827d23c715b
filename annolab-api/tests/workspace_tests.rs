//! Workspaces, members and invitations over HTTP

mod helpers;

use axum::http::StatusCode;
use helpers::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_create_and_list_workspaces() {
    let app = spawn_app().await;
    let user = app.signup("ann@example.com", "ann").await;

    let (status, _) = app
        .post("/workspaces", &user.token, json!({ "name": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/workspaces",
            &user.token,
            json!({ "name": "Team Space", "description": "shared" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["plan"], "FREE");
    let workspace_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get("/workspaces", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|w| w["role"] == "OWNER"));

    let (status, body) = app
        .get(&format!("/workspaces/{}", workspace_id), &user.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Team Space");
}

#[tokio::test]
async fn test_workspace_hidden_from_non_members() {
    let app = spawn_app().await;
    let owner = app.signup("ben@example.com", "ben").await;
    let outsider = app.signup("cat@example.com", "cat").await;

    let uri = format!("/workspaces/{}", owner.default_workspace_id);
    let (status, _) = app.get(&uri, &outsider.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.put(&uri, &outsider.token, json!({ "name": "Taken" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/workspaces/set-default-workspace",
            &outsider.token,
            json!({ "workspaceId": owner.default_workspace_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/workspaces/set-default-workspace",
            &outsider.token,
            json!({ "workspaceId": "missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_requires_manager_role() {
    let app = spawn_app().await;
    let owner = app.signup("dan@example.com", "dan").await;
    let worker = app.signup("eve@example.com", "eve").await;
    let manager = app.signup("fay@example.com", "fay").await;
    app.add_member(&owner.default_workspace_id, &worker, "WORKER").await;
    app.add_member(&owner.default_workspace_id, &manager, "MANAGER").await;

    let uri = format!("/workspaces/{}", owner.default_workspace_id);
    let (status, _) = app.put(&uri, &worker.token, json!({ "name": "Renamed" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&uri, &manager.token, json!({ "description": "managed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Default Workspace");
    assert_eq!(body["data"]["description"], "managed");

    let (status, _) = app.delete(&uri, &manager.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_default_workspace_falls_back_and_is_repaired_on_delete() {
    let app = spawn_app().await;
    let user = app.signup("gus@example.com", "gus").await;

    let (_, body) = app
        .post("/workspaces", &user.token, json!({ "name": "Second" }))
        .await;
    let second = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            "/workspaces/set-default-workspace",
            &user.token,
            json!({ "workspaceId": second }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(&format!("/workspaces/{}", second), &user.token, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored: Option<String> =
        sqlx::query_scalar("SELECT default_workspace_id FROM users WHERE id = ?")
            .bind(&user.id)
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(stored.as_deref(), Some(user.default_workspace_id.as_str()));

    sqlx::query("UPDATE users SET default_workspace_id = NULL WHERE id = ?")
        .bind(&user.id)
        .execute(&app.db)
        .await
        .unwrap();
    let (status, body) = app.get("/workspaces/default-workspace", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user.default_workspace_id);

    let (status, _) = app
        .delete(&format!("/workspaces/{}", user.default_workspace_id), &user.token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/workspaces/default-workspace", &user.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_roles() {
    let app = spawn_app().await;
    let owner = app.signup("hal@example.com", "hal").await;
    let manager = app.signup("ida@example.com", "ida").await;
    let worker = app.signup("joe@example.com", "joe").await;
    let ws = owner.default_workspace_id.clone();
    let manager_member = app.add_member(&ws, &manager, "MANAGER").await;
    let worker_member = app.add_member(&ws, &worker, "WORKER").await;

    let (status, body) = app.get(&format!("/workspaces/{}/members", ws), &worker.token).await;
    assert_eq!(status, StatusCode::OK);
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 3);
    assert!(members.iter().any(|m| m["email"] == "joe@example.com"));
    let owner_member = members
        .iter()
        .find(|m| m["role"] == "OWNER")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let worker_uri = format!("/workspaces/{}/members/{}", ws, worker_member);
    let (status, _) = app
        .patch(&worker_uri, &manager.token, json!({ "role": "REVIEWER" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(&worker_uri, &owner.token, json!({ "role": "OWNER" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch(&worker_uri, &owner.token, json!({ "role": "REVIEWER" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "REVIEWER");

    let owner_uri = format!("/workspaces/{}/members/{}", ws, owner_member);
    let (status, _) = app
        .patch(&owner_uri, &owner.token, json!({ "role": "VIEWER" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&owner_uri, &manager.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager_uri = format!("/workspaces/{}/members/{}", ws, manager_member);
    let (status, _) = app.delete(&manager_uri, &worker.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&worker_uri, &manager.token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/workspaces/{}/members", ws), &worker.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invitation_flow() {
    let app = spawn_app().await;
    let owner = app.signup("kim@example.com", "kim").await;
    let invitee = app.signup("lou@example.com", "lou").await;
    let ws = owner.default_workspace_id.clone();
    let invitations_uri = format!("/workspaces/{}/invitations", ws);

    let (status, _) = app
        .post(
            &invitations_uri,
            &owner.token,
            json!({ "email": "lou@example.com", "role": "OWNER" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sent_before = app.mailer.sent().len();
    let (status, body) = app
        .post(&invitations_uri, &owner.token, json!({ "email": "LOU@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "WORKER");
    assert_eq!(body["data"]["invitedUserId"], invitee.id);
    let invitation_id = body["data"]["id"].as_i64().unwrap();

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), sent_before + 1);
    assert!(sent.last().unwrap().subject.contains("Default Workspace"));

    let (status, _) = app.get(&invitations_uri, &invitee.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.get(&invitations_uri, &owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/invitations", &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["workspaceName"], "Default Workspace");

    let accept_uri = format!("/invitations/{}/accept", invitation_id);
    let (status, _) = app.post(&accept_uri, &owner.token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.post(&accept_uri, &invitee.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted"], true);

    let (status, body) = app.get(&format!("/workspaces/{}", ws), &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], ws);

    let (status, _) = app.post(&accept_uri, &invitee.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/invitations", &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .post(&invitations_uri, &owner.token, json!({ "email": "lou@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
