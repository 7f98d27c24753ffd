//! HTTP-level integration tests for uploads, screens and plan generation.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{body_json, body_text, get_auth, token_for, TestApp, PNG_BYTES};
use screenplan_core::error::CoreError;
use screenplan_core::plan::{render_plan, PlanGenerator, PlanRequest};
use screenplan_core::plan_status::PlanStatus;
use screenplan_db::repositories::ScreenRepo;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

const GIF_BYTES: &[u8] = b"GIF89a\x01\0\x01\0\x80\0\0\0\0\0\xff\xff\xff";
const TEXT_BYTES: &[u8] = b"hello, not an image";

// ---------------------------------------------------------------------------
// Upload staging
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stage_skips_non_images(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Uploads").await;

    let response = app
        .upload(
            &format!("/api/v1/projects/{project}/uploads"),
            &[
                ("home.png", "image/png", PNG_BYTES),
                ("notes.txt", "text/plain", TEXT_BYTES),
                ("fake.png", "image/png", TEXT_BYTES),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let staged = json["staged"].as_array().unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0]["file_name"], "home.png");
    assert_eq!(staged[0]["content_type"], "image/png");
    assert_eq!(json["rejected"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stage_rejects_batch_without_images(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Uploads").await;

    let response = app
        .upload(
            &format!("/api/v1/projects/{project}/uploads"),
            &[("notes.txt", "text/plain", TEXT_BYTES)],
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Please upload image files only"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_preview_and_remove_staged_image(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Uploads").await;
    let base = format!("/api/v1/projects/{project}/uploads");

    let response = app
        .upload(
            &base,
            &[
                ("a.png", "image/png", PNG_BYTES),
                ("b.gif", "image/gif", GIF_BYTES),
            ],
        )
        .await;
    let json = body_json(response).await;
    let staged = json["staged"].as_array().unwrap();
    let first_id = staged[0]["id"].as_str().unwrap().to_string();
    let preview_url = staged[1]["preview_url"].as_str().unwrap().to_string();

    let response = app.get(&preview_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/gif");

    let response = app.delete(&format!("{base}/{first_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.delete(&format!("{base}/{first_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get(&base).await;
    let json = body_json(response).await;
    let remaining = json["data"].as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["file_name"], "b.gif");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_commit_creates_screens_and_stores_images(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Uploads").await;

    app.upload(
        &format!("/api/v1/projects/{project}/uploads"),
        &[
            ("home.png", "image/png", PNG_BYTES),
            ("cart.png", "image/png", PNG_BYTES),
        ],
    )
    .await;
    let response = app
        .post(&format!("/api/v1/projects/{project}/uploads/commit"))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let created = json["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert!(json["failed"].as_array().unwrap().is_empty());
    for screen in created {
        assert_eq!(screen["project_id"], project);
        assert_eq!(screen["plan_status"], "NOT_GENERATED");
        assert!(screen["documentation"].is_null());
        assert!(screen.get("storage_key").is_none());
        let url = screen["image_path"].as_str().unwrap();
        let key = url
            .strip_prefix("http://localhost:3000/files/")
            .expect("public url");
        assert!(key.starts_with(&format!("{project}/")));
        assert!(app.storage_path().join(key).exists());
    }

    // Staging is empty after a commit.
    let response = app
        .post(&format!("/api/v1/projects/{project}/uploads/commit"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get(&format!("/api/v1/projects/{project}/screens")).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stored_images_are_served_under_files(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Uploads").await;
    let screen = app.add_screens(project, &["home.png"]).await[0];

    let json = body_json(app.get(&format!("/api/v1/screens/{screen}")).await).await;
    let path = json["image_path"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://localhost:3000")
        .to_string();

    let response = common::get(app.app(), &path).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_uploads_of_foreign_project_are_404(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Mine").await;
    let stranger = token_for(Uuid::new_v4());

    let response = common::post_multipart(
        app.app(),
        &format!("/api/v1/projects/{project}/uploads"),
        &stranger,
        &[("home.png", "image/png", PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Documentation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_documentation_and_details(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Docs").await;
    let screen = app.add_screens(project, &["home.png"]).await[0];

    let response = app
        .put_json(
            &format!("/api/v1/screens/{screen}/documentation"),
            json!({ "documentation": "Landing page with hero" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["documentation"],
        "Landing page with hero"
    );

    let response = app
        .put_json(
            &format!("/api/v1/screens/{screen}"),
            json!({ "screen_name": " Home ", "documentation": "Hero and CTA" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["screen_name"], "Home");
    assert_eq!(json["documentation"], "Hero and CTA");

    let response = app
        .put_json(
            &format!("/api/v1/screens/{screen}"),
            json!({ "screen_name": "", "documentation": "Hero" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Screen name is required");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_documentation_requires_every_screen(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Docs").await;
    let screens = app.add_screens(project, &["a.png", "b.png"]).await;
    let uri = format!("/api/v1/projects/{project}/screens/documentation");

    let response = app
        .put_json(
            &uri,
            json!({ "documentation": { screens[0].to_string(): "First screen" } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Please add documentation for all screens"
    );

    // Nothing was written.
    let json = body_json(app.get(&format!("/api/v1/screens/{}", screens[0])).await).await;
    assert!(json["documentation"].is_null());

    let response = app
        .put_json(
            &uri,
            json!({ "documentation": {
                screens[0].to_string(): "First screen",
                screens[1].to_string(): "Second screen",
            } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut docs: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["documentation"].as_str().unwrap().to_string())
        .collect();
    docs.sort();
    assert_eq!(docs, ["First screen", "Second screen"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_documentation_rejects_foreign_screen(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Docs").await;
    let other = app.create_project("Other").await;
    let mine = app.add_screens(project, &["a.png"]).await[0];
    let theirs = app.add_screens(other, &["b.png"]).await[0];

    let response = app
        .put_json(
            &format!("/api/v1/projects/{project}/screens/documentation"),
            json!({ "documentation": {
                mine.to_string(): "Mine",
                theirs.to_string(): "Not in this project",
            } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_documentation_is_stored_trimmed(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Docs").await;
    let screens = app.add_screens(project, &["a.png", "b.png"]).await;

    let response = app
        .put_json(
            &format!("/api/v1/screens/{}/documentation", screens[0]),
            json!({ "documentation": "  Login form\n\n" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["documentation"], "Login form");

    let response = app
        .put_json(
            &format!("/api/v1/projects/{project}/screens/documentation"),
            json!({ "documentation": { screens[1].to_string(): "\tDashboard " } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(app.get(&format!("/api/v1/screens/{}", screens[1])).await).await;
    assert_eq!(json["documentation"], "Dashboard");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_batch_leaves_every_screen_unchanged(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let project = app.create_project("Docs").await;
    let screens = app.add_screens(project, &["a.png", "b.png"]).await;

    // Make any write to the second screen fail inside the database.
    sqlx::query(&format!(
        "CREATE FUNCTION reject_second_screen() RETURNS trigger AS $$
         BEGIN
             IF NEW.id = {} THEN
                 RAISE EXCEPTION 'write rejected';
             END IF;
             RETURN NEW;
         END
         $$ LANGUAGE plpgsql",
        screens[1]
    ))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER trg_reject_second_screen BEFORE UPDATE ON screens
         FOR EACH ROW EXECUTE FUNCTION reject_second_screen()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let response = app
        .put_json(
            &format!("/api/v1/projects/{project}/screens/documentation"),
            json!({ "documentation": {
                screens[0].to_string(): "Login",
                screens[1].to_string(): "Home",
            } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    for screen in &screens {
        let json = body_json(app.get(&format!("/api/v1/screens/{screen}")).await).await;
        assert!(json["documentation"].is_null(), "screen {screen} was written");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_with_deleted_screen_writes_nothing(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let project = app.create_project("Docs").await;
    let screens = app.add_screens(project, &["a.png", "b.png"]).await;
    app.delete(&format!("/api/v1/screens/{}", screens[1])).await;

    let batch = vec![
        (screens[0], "Login".to_string()),
        (screens[1], "Home".to_string()),
    ];
    let missing = ScreenRepo::update_documentation_batch(&pool, project, &batch)
        .await
        .unwrap();
    assert_eq!(missing, Some(screens[1]));

    let json = body_json(app.get(&format!("/api/v1/screens/{}", screens[0])).await).await;
    assert!(json["documentation"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_suggest_name_from_documentation(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Docs").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    let uri = format!("/api/v1/screens/{screen}/suggest-name");

    let response = app.post(&uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.put_json(
        &format!("/api/v1/screens/{screen}/documentation"),
        json!({ "documentation": "Checkout page\nwith cart summary" }),
    )
    .await;
    let response = app.post(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["screen_name"],
        "Checkout page"
    );
}

// ---------------------------------------------------------------------------
// Plan generation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_plan_generation_requires_documentation(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Documentation is required before generating a plan"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_plan_generation_completes_with_markdown(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    app.put_json(
        &format!("/api/v1/screens/{screen}"),
        json!({ "screen_name": "Login", "documentation": "Email and password form" }),
    )
    .await;

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["plan_status"], "IN_PROGRESS");

    let json = app.wait_for_status(screen, "COMPLETED").await;
    let plan = json["implementation_plan"].as_str().unwrap();
    assert!(plan.starts_with("# Login Implementation Plan"));

    let response = app.get(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert!(body_text(response)
        .await
        .contains("This screen represents Email and password form..."));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_plan_generation_blocked_while_in_progress(pool: PgPool) {
    let app = TestApp::with_plan_delay(pool, Duration::from_secs(60));
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    app.put_json(
        &format!("/api/v1/screens/{screen}/documentation"),
        json!({ "documentation": "Profile settings" }),
    )
    .await;

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.state.plan_runner.in_flight(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_plan_can_be_regenerated(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    app.put_json(
        &format!("/api/v1/screens/{screen}/documentation"),
        json!({ "documentation": "Search results" }),
    )
    .await;

    app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    app.wait_for_status(screen, "COMPLETED").await;

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    app.wait_for_status(screen, "COMPLETED").await;
}

/// Fails its first call, then renders the regular template.
#[derive(Default)]
struct FailsOnceGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl PlanGenerator for FailsOnceGenerator {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, CoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(CoreError::Internal("generator unavailable".into()));
        }
        Ok(render_plan(request))
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_generation_rolls_back_and_can_retry(pool: PgPool) {
    let app = TestApp::with_generator(pool, Arc::new(FailsOnceGenerator::default()));
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    app.put_json(
        &format!("/api/v1/screens/{screen}/documentation"),
        json!({ "documentation": "Order history" }),
    )
    .await;
    let uri = format!("/api/v1/screens/{screen}/plan");

    let response = app.post(&uri).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = app.wait_for_status(screen, "NOT_GENERATED").await;
    assert!(json["implementation_plan"].is_null());

    let response = app.post(&uri).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = app.wait_for_status(screen, "COMPLETED").await;
    assert!(json["implementation_plan"]
        .as_str()
        .unwrap()
        .contains("Order history"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_generations_are_reset(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    app.put_json(
        &format!("/api/v1/screens/{screen}/documentation"),
        json!({ "documentation": "Invoice detail" }),
    )
    .await;

    // Left IN_PROGRESS by a process that never finished the generation.
    let started = ScreenRepo::start_generation(&pool, screen).await.unwrap();
    assert!(started.is_some());

    assert_eq!(ScreenRepo::reset_stale_generations(&pool).await.unwrap(), 1);
    assert_eq!(ScreenRepo::reset_stale_generations(&pool).await.unwrap(), 0);

    let json = body_json(app.get(&format!("/api/v1/screens/{screen}")).await).await;
    let status: PlanStatus = json["plan_status"].as_str().unwrap().parse().unwrap();
    assert_eq!(status, PlanStatus::NotGenerated);

    let response = app.post(&format!("/api/v1/screens/{screen}/plan")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    app.wait_for_status(screen, "COMPLETED").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_requires_plan_text_in_database(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];

    let result = sqlx::query("UPDATE screens SET plan_status_id = 3 WHERE id = $1")
        .bind(screen)
        .execute(&pool)
        .await;

    let err = result.expect_err("COMPLETED without a plan must be rejected");
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("ck_screens_completed_has_plan"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_screen_removes_image(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Plans").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    let json = body_json(app.get(&format!("/api/v1/screens/{screen}")).await).await;
    let key = json["image_path"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://localhost:3000/files/")
        .to_string();
    assert!(app.storage_path().join(&key).exists());

    let response = app.delete(&format!("/api/v1/screens/{screen}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!app.storage_path().join(&key).exists());

    let response = app.get(&format!("/api/v1/screens/{screen}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_other_owners_screens_are_invisible(pool: PgPool) {
    let app = TestApp::new(pool);
    let project = app.create_project("Private").await;
    let screen = app.add_screens(project, &["a.png"]).await[0];
    let stranger = token_for(Uuid::new_v4());

    let response = get_auth(app.app(), &format!("/api/v1/screens/{screen}"), &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = common::send_empty(
        app.app(),
        axum::http::Method::POST,
        &format!("/api/v1/screens/{screen}/plan"),
        &stranger,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
