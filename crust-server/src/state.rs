//! Application state for crust-server

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool (process-wide singleton)
    pub pool: PgPool,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Out-of-band admin recovery key
    pub admin_recovery_key: Option<String>,
    /// Batch edit window
    pub batch_edit_window: chrono::Duration,
    /// CORS origins
    pub allowed_origins: Vec<String>,
    /// Rate limiter for auth routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new AppState: connect the pool and run embedded migrations
    pub async fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            admin_recovery_key: config.admin_recovery_key.clone(),
            batch_edit_window: chrono::Duration::minutes(config.batch_edit_window_minutes),
            allowed_origins: config.allowed_origins.clone(),
            rate_limiter: RateLimiter::new(),
        })
    }
}
