//! Account management: identities, roles and deletion rules.

use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use formdetoit_integration_tests::{TEST_PASSWORD, TestContext, json_body, new_client};

#[tokio::test]
async fn test_create_account_signs_in() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;

    let response = ctx
        .post_json(
            "/api/admin/users",
            &json!({
                "email": "seo@formdetoit.fr",
                "full_name": "Référencement",
                "password": TEST_PASSWORD,
                "roles": ["SEO", "unknown"]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = json_body(response).await;
    assert_eq!(user["roles"], json!(["seo"]));

    let id: Uuid = user["id"].as_str().expect("id").parse().expect("uuid");
    assert!(ctx.identity.contains(id));

    let other = new_client();
    let login = ctx.login(&other, "seo@formdetoit.fr", TEST_PASSWORD).await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_account_needs_a_valid_role() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;

    let response = ctx
        .post_json(
            "/api/admin/users",
            &json!({
                "email": "x@formdetoit.fr",
                "full_name": "X",
                "password": TEST_PASSWORD,
                "roles": ["owner"]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let (ctx, admin) = TestContext::signed_in(&["super_admin"]).await;

    let response = ctx
        .post_json(
            "/api/admin/users",
            &json!({
                "email": admin.email,
                "full_name": "Doublon",
                "password": TEST_PASSWORD,
                "roles": ["editor"]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_users_api_requires_manage_users() {
    let (ctx, _) = TestContext::signed_in(&["admin"]).await;
    let response = ctx.get("/api/admin/users").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cannot_delete_own_account() {
    let (ctx, admin) = TestContext::signed_in(&["super_admin"]).await;
    let response = ctx.delete(&format!("/api/admin/users/{}", admin.id)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_last_super_admin_keeps_role() {
    let (ctx, admin) = TestContext::signed_in(&["super_admin"]).await;
    let response = ctx
        .put_json(
            &format!("/api/admin/users/{}/roles", admin.id),
            &json!({ "roles": ["admin"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    ctx.create_user("associe@formdetoit.fr", &["super_admin"]).await;
    let response = ctx
        .put_json(
            &format!("/api/admin/users/{}/roles", admin.id),
            &json!({ "roles": ["admin"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_permanent_delete_removes_identity() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;
    let editor = ctx.create_user("redaction@formdetoit.fr", &["editor"]).await;
    let id = editor.id.as_uuid();
    assert!(ctx.identity.contains(id));

    let response = ctx
        .delete(&format!("/api/admin/users/{id}?permanent=true"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!ctx.identity.contains(id));

    let response = ctx.get(&format!("/api/admin/users/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_restore_accounts() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;
    let a = ctx.create_user("a@formdetoit.fr", &["editor"]).await;
    let b = ctx.create_user("b@formdetoit.fr", &["seo"]).await;

    let response = ctx
        .post_json(
            "/api/admin/users/bulk-delete",
            &json!({ "ids": [a.id, b.id] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stats = json_body(ctx.get("/api/admin/users/stats").await).await;
    assert_eq!(stats["deleted"], 2);

    let response = ctx
        .post_json("/api/admin/users/bulk-restore", &json!({ "ids": [a.id, b.id] }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(ctx.get("/api/admin/users/stats").await).await;
    assert_eq!(stats["deleted"], 0);
}

#[tokio::test]
async fn test_restore_unknown_account_is_rejected() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;
    let response = ctx
        .post_json(&format!("/api/admin/users/{}/restore", Uuid::new_v4()), &json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
