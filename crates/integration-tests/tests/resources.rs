//! Generic resource lifecycle over the admin JSON API.

use reqwest::StatusCode;
use serde_json::{Value, json};

use formdetoit_integration_tests::{TestContext, id_of, json_body, team_member};

#[tokio::test]
async fn test_create_list_and_update() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;

    let created = ctx
        .create(
            "team-members",
            &json!({ "full_name": "Lucie Bernard", "job_title": "Cheffe de chantier", "sort_order": 2 }),
        )
        .await;
    ctx.create("team-members", &json!({ "full_name": "Marc Petit", "job_title": "Couvreur", "sort_order": 1 }))
        .await;
    assert_eq!(created["is_visible"], true);
    assert!(created["deleted_at"].is_null());

    let list = json_body(ctx.get("/api/admin/team-members").await).await;
    let names: Vec<&str> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["full_name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Marc Petit", "Lucie Bernard"]);

    let id = id_of(&created);
    let response = ctx
        .put_json(
            &format!("/api/admin/team-members/{id}"),
            &json!({ "job_title": "Conductrice de travaux" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["job_title"], "Conductrice de travaux");
    assert_eq!(updated["full_name"], "Lucie Bernard");

    let shown = json_body(ctx.get(&format!("/api/admin/team-members/{id}")).await).await;
    assert_eq!(shown["job_title"], "Conductrice de travaux");
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;

    let blank = ctx
        .post_json("/api/admin/team-members", &json!({ "full_name": "  ", "job_title": "Couvreur" }))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(blank).await["error"].is_string());

    let unknown_field = ctx
        .post_json(
            "/api/admin/team-members",
            &json!({ "full_name": "Lucie", "job_title": "Couvreur", "salary": 1 }),
        )
        .await;
    assert_eq!(unknown_field.status(), StatusCode::BAD_REQUEST);

    let bad_id = ctx.get("/api/admin/team-members/not-a-uuid").await;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    let missing = uuid::Uuid::new_v4();

    let response = ctx.get(&format!("/api/admin/team-members/{missing}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .put_json(&format!("/api/admin/team-members/{missing}"), &json!({ "bio": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_only_accepts_declared_flags() {
    let (ctx, _) = TestContext::signed_in(&["recruiter"]).await;
    let job = ctx
        .create("job-openings", &json!({ "title": "Charpentier", "contract_type": "cdd" }))
        .await;
    let id = id_of(&job);

    let response = ctx
        .put_json(
            &format!("/api/admin/job-openings/{id}/toggle"),
            &json!({ "field": "is_highlighted", "value": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["is_highlighted"], true);

    let response = ctx
        .put_json(
            &format!("/api/admin/job-openings/{id}/toggle"),
            &json!({ "field": "title", "value": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_soft_delete_restore_and_purge() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    let member = ctx.create("team-members", &team_member("Paul Martin")).await;
    let id = id_of(&member);

    let response = ctx.delete(&format!("/api/admin/team-members/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "success": true }));

    let live = json_body(ctx.get("/api/admin/team-members").await).await;
    assert_eq!(live, json!([]));
    let all = json_body(ctx.get("/api/admin/team-members?showDeleted=true").await).await;
    assert!(all[0]["deleted_at"].is_string());

    // Trashed records cannot be edited
    let response = ctx
        .put_json(&format!("/api/admin/team-members/{id}"), &json!({ "bio": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .post_json(&format!("/api/admin/team-members/{id}/restore"), &json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let live = json_body(ctx.get("/api/admin/team-members").await).await;
    assert_eq!(live.as_array().map(Vec::len), Some(1));

    let response = ctx
        .delete(&format!("/api/admin/team-members/{id}?permanent=true"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let all = json_body(ctx.get("/api/admin/team-members?showDeleted=true").await).await;
    assert_eq!(all, json!([]));

    let response = ctx
        .delete(&format!("/api/admin/team-members/{id}?permanent=true"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_split_by_state() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    let shown = ctx.create("certifications", &json!({ "name": "Qualibat", "is_published": true })).await;
    ctx.create("certifications", &json!({ "name": "RGE", "is_published": false })).await;
    let trashed = ctx.create("certifications", &json!({ "name": "Ancienne", "is_published": true })).await;
    ctx.delete(&format!("/api/admin/certifications/{}", id_of(&trashed))).await;

    let stats = json_body(ctx.get("/api/admin/certifications/stats").await).await;
    assert_eq!(stats, json!({ "total": 3, "active": 1, "deleted": 1 }));
    assert_eq!(shown["name"], "Qualibat");
}

#[tokio::test]
async fn test_unique_slug_conflicts() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    ctx.create("pages", &json!({ "title": "Questions fréquentes", "slug": "faq" })).await;

    let response = ctx
        .post_json("/api/admin/pages", &json!({ "title": "FAQ bis", "slug": "faq" }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let reserved = ctx
        .post_json("/api/admin/pages", &json!({ "title": "Admin", "slug": "admin" }))
        .await;
    assert_eq!(reserved.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_delete_reports_partial_failure() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    let a = id_of(&ctx.create("team-members", &team_member("A")).await);
    let b = id_of(&ctx.create("team-members", &team_member("B")).await);

    let response = ctx
        .post_json("/api/admin/team-members/bulk-delete", &json!({ "ids": [a, b] }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "success": true, "processed": 2 }));

    let missing = uuid::Uuid::new_v4().to_string();
    let response = ctx
        .post_json(
            "/api/admin/team-members/bulk-delete",
            &json!({ "ids": [a, missing], "permanent": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let body: Value = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["failed"][0]["id"], missing);

    let empty = ctx
        .post_json("/api/admin/team-members/bulk-delete", &json!({ "ids": [] }))
        .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resource_page_lists_trash() {
    let (ctx, _) = TestContext::signed_in(&["editor"]).await;
    let member = ctx.create("team-members", &team_member("Paul Martin")).await;
    ctx.delete(&format!("/api/admin/team-members/{}", id_of(&member))).await;

    let live = ctx.get("/admin/team-members").await.text().await.expect("body");
    assert!(!live.contains("Paul Martin"));

    let trash = ctx
        .get("/admin/team-members?trash=true")
        .await
        .text()
        .await
        .expect("body");
    assert!(trash.contains("Paul Martin"));
    assert!(trash.contains("data-action=\"restore\""));
}

#[tokio::test]
async fn test_restore_of_unknown_id_is_rejected() {
    let (ctx, _) = TestContext::signed_in(&["recruiter"]).await;
    let response = ctx
        .post_json(
            &format!("/api/admin/job-openings/{}/restore", uuid::Uuid::new_v4()),
            &json!({}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
