/// Database configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL connection string (default:
    /// `postgres://localhost:5432/retrace`).
    pub database_url: String,
    /// Maximum pool connections (default: `5`).
    pub max_connections: u32,
}

impl DbConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                            |
    /// |----------------------------|------------------------------------|
    /// | `DATABASE_URL`             | `postgres://localhost:5432/retrace`|
    /// | `DATABASE_MAX_CONNECTIONS` | `5`                                |
    pub fn from_env() -> Self {
        // Pick up a local .env if present; harmless otherwise.
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/retrace".into());

        let max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("DATABASE_MAX_CONNECTIONS must be a valid u32");

        Self {
            database_url,
            max_connections,
        }
    }
}
