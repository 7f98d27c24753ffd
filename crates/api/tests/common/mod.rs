#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use screenplan_api::auth::jwt::{Claims, JwtConfig};
use screenplan_api::config::ServerConfig;
use screenplan_api::engine::plan_runner::PlanRunner;
use screenplan_api::router::build_app_router;
use screenplan_api::staging::UploadStaging;
use screenplan_api::state::AppState;
use screenplan_api::storage::LocalImageStorage;
use screenplan_core::plan::{PlanGenerator, SimulatedPlanGenerator};

pub const TEST_JWT_SECRET: &str = "screenplan-test-signing-secret-0123456789";

/// Smallest byte sequence recognised as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0";

/// Build a test `ServerConfig` with safe defaults, storing images below
/// `storage_root`.
pub fn test_config(storage_root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            audience: None,
        },
        storage_root: storage_root.to_path_buf(),
        public_base_url: "http://localhost:3000/files".to_string(),
        max_upload_bytes: 1024 * 1024,
        max_request_bytes: 8 * 1024 * 1024,
        plan_generation_delay_ms: 0,
        upload_staging_ttl_secs: 3600,
    }
}

/// A running application plus everything a test needs to talk to it.
///
/// Upload staging lives in memory, so tests clone [`TestApp::router`] for
/// every request instead of rebuilding the app.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub owner_id: Uuid,
    pub token: String,
    storage_dir: TempDir,
}

impl TestApp {
    /// Application whose simulated generator answers immediately.
    pub fn new(pool: PgPool) -> Self {
        Self::with_plan_delay(pool, Duration::ZERO)
    }

    pub fn with_plan_delay(pool: PgPool, delay: Duration) -> Self {
        Self::with_generator(pool, Arc::new(SimulatedPlanGenerator::new(delay)))
    }

    /// Application whose background plans come from `generator`.
    pub fn with_generator(pool: PgPool, generator: Arc<dyn PlanGenerator>) -> Self {
        let storage_dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(storage_dir.path());

        let state = AppState {
            pool: pool.clone(),
            config: Arc::new(config.clone()),
            storage: Arc::new(LocalImageStorage::new(
                storage_dir.path(),
                &config.public_base_url,
            )),
            staging: Arc::new(UploadStaging::new()),
            plan_runner: Arc::new(PlanRunner::new(pool, generator)),
        };
        let router = build_app_router(state.clone(), &config);
        let owner_id = Uuid::new_v4();

        Self {
            router,
            state,
            owner_id,
            token: token_for(owner_id),
            storage_dir,
        }
    }

    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn storage_path(&self) -> &std::path::Path {
        self.storage_dir.path()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        get_auth(self.app(), uri, &self.token).await
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> Response<Body> {
        send_json(self.app(), Method::POST, uri, &self.token, json).await
    }

    pub async fn put_json(&self, uri: &str, json: serde_json::Value) -> Response<Body> {
        send_json(self.app(), Method::PUT, uri, &self.token, json).await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        send_empty(self.app(), Method::POST, uri, &self.token).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        send_empty(self.app(), Method::DELETE, uri, &self.token).await
    }

    pub async fn upload(&self, uri: &str, files: &[(&str, &str, &[u8])]) -> Response<Body> {
        post_multipart(self.app(), uri, &self.token, files).await
    }

    /// Create a project and return its id.
    pub async fn create_project(&self, name: &str) -> i64 {
        let response = self
            .post_json("/api/v1/projects", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await["id"].as_i64().unwrap()
    }

    /// Stage and commit one PNG per name, returning the created screen ids.
    pub async fn add_screens(&self, project_id: i64, names: &[&str]) -> Vec<i64> {
        let files: Vec<_> = names.iter().map(|n| (*n, "image/png", PNG_BYTES)).collect();
        let response = self
            .upload(&format!("/api/v1/projects/{project_id}/uploads"), &files)
            .await;
        assert_eq!(response.status(), 201);

        let response = self
            .post(&format!("/api/v1/projects/{project_id}/uploads/commit"))
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await["created"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_i64().unwrap())
            .collect()
    }

    /// Poll a screen until its plan status equals `status`.
    pub async fn wait_for_status(&self, screen_id: i64, status: &str) -> serde_json::Value {
        for _ in 0..100 {
            let json = body_json(self.get(&format!("/api/v1/screens/{screen_id}")).await).await;
            if json["plan_status"] == status {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("screen {screen_id} never reached {status}");
    }
}

/// Sign an access token for `owner_id` with the test secret.
pub fn token_for(owner_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: owner_id,
        exp: now + 3600,
        iat: Some(now),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("token")
}

/// Build the application router for tests that only need one request.
pub fn build_test_app(pool: PgPool) -> Router {
    TestApp::new(pool).app()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body into a string.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::get(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    json: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn send_empty(app: Router, method: Method, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST a `multipart/form-data` body with one `files` field per entry of
/// `(file_name, content_type, bytes)`.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    token: &str,
    files: &[(&str, &str, &[u8])],
) -> Response<Body> {
    let boundary = "screenplan-test-boundary";
    let mut body = Vec::new();
    for (file_name, content_type, bytes) in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    app.oneshot(
        Request::post(uri)
            .header("authorization", format!("Bearer {token}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}
