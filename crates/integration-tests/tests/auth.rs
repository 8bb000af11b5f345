//! Sign-in, session and permission gating.

use reqwest::StatusCode;
use serde_json::json;

use formdetoit_integration_tests::{TEST_PASSWORD, TestContext, json_body, new_client, team_member};

#[tokio::test]
async fn test_login_page_renders() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/auth/login").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.create_user("rh@formdetoit.fr", &["recruiter"]).await;

    let response = ctx.login(&ctx.client, "rh@formdetoit.fr", "pas-le-bon").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.text().await.expect("body");
    assert!(body.contains("Email ou mot de passe incorrect."));
    assert!(body.contains("value=\"rh@formdetoit.fr\""));
}

#[tokio::test]
async fn test_login_opens_back_office() {
    let ctx = TestContext::new().await;
    ctx.create_user("rh@formdetoit.fr", &["recruiter"]).await;

    let response = ctx.login(&ctx.client, "rh@formdetoit.fr", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/admin");

    let dashboard = ctx.get("/admin").await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = dashboard.text().await.expect("body");
    assert!(body.contains("href=\"/admin/job-openings\""));
    assert!(!body.contains("href=\"/admin/users\""));
}

#[tokio::test]
async fn test_anonymous_requests_are_turned_away() {
    let ctx = TestContext::new().await;

    let page = ctx.get("/admin").await;
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
    assert_eq!(page.headers()["location"], "/auth/login");

    let api = ctx.get("/api/admin/team-members").await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(api).await["error"], "authentication required");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;
    assert_eq!(ctx.get("/admin").await.status(), StatusCode::OK);

    let response = ctx
        .client
        .post(ctx.url("/auth/logout"))
        .send()
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert_eq!(ctx.get("/admin").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_missing_permission_is_forbidden() {
    let ctx = TestContext::new().await;
    ctx.create_user("rh@formdetoit.fr", &["recruiter"]).await;
    ctx.login(&ctx.client, "rh@formdetoit.fr", TEST_PASSWORD).await;

    let response = ctx
        .post_json("/api/admin/team-members", &team_member("Paul Martin"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let allowed = ctx
        .post_json("/api/admin/job-openings", &json!({ "title": "Couvreur zingueur" }))
        .await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_role_change_applies_to_open_session() {
    let (ctx, admin) = TestContext::signed_in(&["super_admin"]).await;
    let editor = ctx.create_user("redaction@formdetoit.fr", &["editor"]).await;

    let other = new_client();
    ctx.login(&other, "redaction@formdetoit.fr", TEST_PASSWORD).await;
    let before = other
        .get(ctx.url("/api/admin/job-openings"))
        .send()
        .await
        .expect("list");
    assert_eq!(before.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .put_json(
            &format!("/api/admin/users/{}/roles", editor.id),
            &json!({ "roles": ["editor", "recruiter"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let after = other
        .get(ctx.url("/api/admin/job-openings"))
        .send()
        .await
        .expect("list");
    assert_eq!(after.status(), StatusCode::OK);
    assert_ne!(admin.id, editor.id);
}

#[tokio::test]
async fn test_trashed_account_loses_session() {
    let (ctx, _) = TestContext::signed_in(&["super_admin"]).await;
    let editor = ctx.create_user("redaction@formdetoit.fr", &["editor"]).await;

    let other = new_client();
    ctx.login(&other, "redaction@formdetoit.fr", TEST_PASSWORD).await;
    assert_eq!(
        other
            .get(ctx.url("/admin"))
            .send()
            .await
            .expect("dashboard")
            .status(),
        StatusCode::OK
    );

    let response = ctx.delete(&format!("/api/admin/users/{}", editor.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let after = other.get(ctx.url("/admin")).send().await.expect("dashboard");
    assert_eq!(after.status(), StatusCode::SEE_OTHER);

    let relogin = ctx.login(&other, "redaction@formdetoit.fr", TEST_PASSWORD).await;
    assert_eq!(relogin.status(), StatusCode::UNAUTHORIZED);
}
