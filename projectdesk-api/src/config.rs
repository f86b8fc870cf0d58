/// Configuration management for the API server
///
/// Configuration is read from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_MINUTES`: access token lifetime (default: 60)
/// - `JWT_REFRESH_TTL_DAYS`: refresh token lifetime (default: 1)
/// - `SUPERUSER_USERNAME`, `SUPERUSER_EMAIL`, `SUPERUSER_PASSWORD`: when all
///   three are set, that superuser is created at startup if missing
/// - `RUN_MIGRATIONS`: apply pending migrations at startup (default: true)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for plain text
///
/// # Example
///
/// ```no_run
/// use projectdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    /// Superuser ensured at startup
    pub superuser: Option<SuperuserConfig>,

    pub run_migrations: bool,

    pub json_logs: bool,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    pub access_ttl_minutes: i64,

    pub refresh_ttl_days: i64,
}

impl JwtConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_ttl_days)
    }
}

/// Bootstrap superuser credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperuserConfig {
    pub username: String,

    pub email: String,

    #[serde(skip_serializing)]
    pub password: String,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_host = var_or("API_HOST", "0.0.0.0");
        let api_port = var_or("API_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes = var_or("JWT_ACCESS_TTL_MINUTES", "60")
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("JWT_ACCESS_TTL_MINUTES is invalid: {}", e))?;

        let refresh_ttl_days = var_or("JWT_REFRESH_TTL_DAYS", "1")
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("JWT_REFRESH_TTL_DAYS is invalid: {}", e))?;

        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            anyhow::bail!("JWT token lifetimes must be positive");
        }

        let superuser = match (
            lookup("SUPERUSER_USERNAME"),
            lookup("SUPERUSER_EMAIL"),
            lookup("SUPERUSER_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SuperuserConfig {
                username,
                email,
                password,
            }),
            _ => None,
        };

        let run_migrations = parse_bool(&var_or("RUN_MIGRATIONS", "true"))
            .ok_or_else(|| anyhow::anyhow!("RUN_MIGRATIONS must be true or false"))?;

        let json_logs = var_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json");

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            superuser,
            run_migrations,
            json_logs,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
