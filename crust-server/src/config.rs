//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// JWT signing secret (at least 32 chars)
    pub jwt_secret: String,
    /// HTTP port
    pub http_port: u16,
    /// Comma-separated CORS origins; empty = same-origin only
    pub allowed_origins: Vec<String>,
    /// Out-of-band key for `POST /auth/recover-admin-account`
    pub admin_recovery_key: Option<String>,
    /// Minutes during which a batch stays editable by its creator
    pub batch_edit_window_minutes: i64,
    /// Environment: development | staging | production
    pub environment: String,
}

const JWT_SECRET_MIN_LEN: usize = 32;
const DEFAULT_EDIT_WINDOW_MINUTES: i64 = 20;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or invalid required variables are fatal: the process must not
    /// come up half-configured in production.
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;
        if jwt_secret.len() < JWT_SECRET_MIN_LEN {
            return Err(format!("JWT_SECRET must be at least {JWT_SECRET_MIN_LEN} chars").into());
        }

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            allowed_origins,
            admin_recovery_key: std::env::var("ADMIN_RECOVERY_KEY").ok().filter(|k| !k.is_empty()),
            batch_edit_window_minutes: std::env::var("BATCH_EDIT_WINDOW_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EDIT_WINDOW_MINUTES),
            environment,
        })
    }

    #[allow(dead_code)]
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
