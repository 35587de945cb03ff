use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Upstream registry
    pub registry_base_url: String,
    pub registry_user_agent: String,
    pub registry_retries: u32,
    pub registry_retry_base_ms: u64,

    // Sync tuning
    pub sync_page_size: u32,
    pub sync_max_pages: u32,
    pub sync_concurrency: usize,
    pub sync_lookback_days: i64,
    pub sync_roles_batch: i64,

    // AI summaries (disabled when the key is empty)
    pub ai_api_key: String,
    pub ai_api_base_url: String,
    pub ai_model: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub session_secret: String,
    pub admin_password: String,
}

impl Config {
    /// Load configuration for the sync binary.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            registry_base_url: env_or("REGISTRY_BASE_URL", "https://data.brreg.no"),
            registry_user_agent: env_or("REGISTRY_USER_AGENT", "Nordlead/0.1.0"),
            registry_retries: parsed_env("REGISTRY_RETRIES", 3),
            registry_retry_base_ms: parsed_env("REGISTRY_RETRY_BASE_MS", 1000),
            sync_page_size: parsed_env("SYNC_PAGE_SIZE", 100),
            sync_max_pages: parsed_env("SYNC_MAX_PAGES", 1000),
            sync_concurrency: parsed_env("SYNC_CONCURRENCY", 8),
            sync_lookback_days: parsed_env("SYNC_LOOKBACK_DAYS", 1),
            sync_roles_batch: parsed_env("SYNC_ROLES_BATCH", 1000),
            ai_api_key: env_or("AI_API_KEY", ""),
            ai_api_base_url: env_or("AI_API_BASE_URL", "https://api.openai.com/v1"),
            ai_model: env_or("AI_MODEL", "gpt-4o-mini"),
            web_host: env_or("WEB_HOST", "0.0.0.0"),
            web_port: parsed_env("WEB_PORT", 3000),
            session_secret: env_or("SESSION_SECRET", ""),
            admin_password: String::new(),
        }
    }

    /// Load configuration for the web server. Same surface as `from_env`
    /// plus the admin credentials the API requires.
    pub fn web_from_env() -> Self {
        Self {
            admin_password: required_env("ADMIN_PASSWORD"),
            ..Self::from_env()
        }
    }

    /// Session signing secret. Prefers SESSION_SECRET; falls back to the
    /// admin password for dev setups.
    pub fn session_secret(&self) -> &str {
        if self.session_secret.is_empty() {
            &self.admin_password
        } else {
            &self.session_secret
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
