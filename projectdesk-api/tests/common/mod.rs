//! Shared infrastructure for the integration tests
//!
//! Every test builds a [`TestContext`] against the database named by
//! `DATABASE_URL`. When the variable is unset the context is `None` and the
//! test returns early, so `cargo test` stays green on machines without
//! PostgreSQL.
//!
//! Users get uuid-suffixed names, which keeps concurrently running tests
//! from colliding on the unique username and email constraints.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use projectdesk_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig},
};
use projectdesk_shared::{
    auth::{jwt, password::hash_password},
    db::migrations::{ensure_database_exists, run_migrations},
    models::user::{CreateUser, User, UserRole},
};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-key-32-bytes-min";

pub const PASSWORD: &str = "testpassword";

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
}

/// A user with a ready-to-use token pair
pub struct TestUser {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

impl TestUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl TestContext {
    /// Connects, migrates and builds the router; `None` without `DATABASE_URL`
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
                access_ttl_minutes: 60,
                refresh_ttl_days: 1,
            },
            superuser: None,
            run_migrations: true,
            json_logs: false,
        };

        ensure_database_exists(&config.database.url)
            .await
            .expect("Failed to create test database");

        let db = PgPool::connect(&config.database.url)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&db).await.expect("Failed to run migrations");

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Some(Self { db, app, config })
    }

    /// Inserts a user directly and signs a token pair for it
    pub async fn create_user(&self, prefix: &str, is_superuser: bool) -> TestUser {
        let username = unique_name(prefix);

        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("{}@example.com", username),
                username,
                password_hash: hash_password(PASSWORD).expect("hash"),
                role: if is_superuser {
                    UserRole::Admin
                } else {
                    UserRole::Executor
                },
                is_superuser,
            },
        )
        .await
        .expect("Failed to create user");

        let tokens = jwt::issue_token_pair(
            user.id,
            JWT_SECRET,
            self.config.jwt.access_ttl(),
            self.config.jwt.refresh_ttl(),
        )
        .expect("Failed to sign tokens");

        TestUser {
            user,
            access: tokens.access,
            refresh: tokens.refresh,
        }
    }

    /// Sends a request through the router and decodes the JSON body
    ///
    /// Empty bodies decode to `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("Non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a project owned by `creator` and returns its id
    pub async fn create_project(&self, creator: &TestUser, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/projects/",
                &creator.access,
                serde_json::json!({ "name": name, "description": "Test Description" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("project id")
    }

    /// Adds `member` to the project staff with `role`, acting as `creator`
    pub async fn add_staff(&self, creator: &TestUser, project_id: i64, member: &TestUser, role: &str) {
        let (status, body) = self
            .patch(
                &format!("/api/projects/{}/", project_id),
                &creator.access,
                serde_json::json!({ "staff": [{ "user_id": member.id(), "role": role }] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    /// Creates a task in the project and returns its id
    pub async fn create_task(&self, actor: &TestUser, project_id: i64, assigned_to: &[i64]) -> i64 {
        let (status, body) = self
            .post(
                "/api/task/",
                &actor.access,
                serde_json::json!({
                    "title": "Test Task",
                    "description": "Task Description",
                    "project": project_id,
                    "assigned_to": assigned_to,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("task id")
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Ids of the objects in a JSON array response
pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}
