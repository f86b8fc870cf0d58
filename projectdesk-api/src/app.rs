/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use projectdesk_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use projectdesk_shared::auth::middleware::authenticate;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                  GET            public
/// /api/auth/register/                      POST           public
/// /api/auth/login/                         POST           public
/// /api/auth/token/refresh/                 POST           public
/// /api/auth/logout/                        POST           bearer
/// /api/projects/                           GET POST       bearer
/// /api/projects/:id/                       GET PATCH DEL  bearer
/// /api/projects/time/:id/                  GET            bearer
/// /api/task/                               GET POST       bearer
/// /api/task/:task_id/                      GET PATCH DEL  bearer
/// /api/task/time/:task_id/                 GET            bearer
/// /api/task/:task_id/comments/             GET POST       bearer
/// /api/task/:task_id/comments/:id/         GET DEL        bearer
/// ```
///
/// Trailing slashes are part of the paths.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/register/", post(routes::auth::register))
        .route("/api/auth/login/", post(routes::auth::login))
        .route("/api/auth/token/refresh/", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/api/auth/logout/", post(routes::auth::logout))
        .route(
            "/api/projects/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/api/projects/:id/",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/api/projects/time/:id/", get(routes::projects::project_timing))
        .route(
            "/api/task/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/task/:task_id/",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/task/time/:task_id/", get(routes::tasks::task_timing))
        .route(
            "/api/task/:task_id/comments/",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/api/task/:task_id/comments/:id/",
            get(routes::comments::get_comment).delete(routes::comments::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Authenticates the bearer token and stores the principal in extensions
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, JwtConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use projectdesk_shared::auth::jwt::{create_token, Claims, TokenType};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn test_state() -> AppState {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgres://nobody@127.0.0.1:1/none".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: SECRET.to_string(),
                access_ttl_minutes: 60,
                refresh_ttl_days: 1,
            },
            superuser: None,
            run_migrations: false,
            json_logs: false,
        };

        // Never connects: the paths below are rejected before any query
        let pool = PgPool::connect_lazy(&config.database.url).unwrap();
        AppState::new(pool, config)
    }

    async fn status_of(req: Request<Body>) -> StatusCode {
        build_router(test_state()).oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_protected_routes_require_bearer_token() {
        for (method, uri) in [
            ("GET", "/api/projects/"),
            ("POST", "/api/projects/"),
            ("GET", "/api/projects/1/"),
            ("GET", "/api/projects/time/1/"),
            ("GET", "/api/task/"),
            ("DELETE", "/api/task/1/"),
            ("GET", "/api/task/time/1/"),
            ("GET", "/api/task/1/comments/"),
            ("DELETE", "/api/task/1/comments/2/"),
            ("POST", "/api/auth/logout/"),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let req = Request::builder()
            .uri("/api/projects/")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_not_accepted_as_bearer() {
        let refresh = create_token(&Claims::new(1, TokenType::Refresh), SECRET).unwrap();
        let req = Request::builder()
            .uri("/api/task/")
            .header(header::AUTHORIZATION, format!("Bearer {}", refresh))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_rejected() {
        let token = create_token(
            &Claims::new(1, TokenType::Access),
            "some-other-secret-key-of-enough-length",
        )
        .unwrap();
        let req = Request::builder()
            .uri("/api/projects/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_with_malformed_body_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let req = Request::builder()
            .uri("/api/unknown/")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::NOT_FOUND);
    }
}
