use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Base URL of the external service catalog. Empty means the built-in
    /// static catalog.
    pub catalog_url: String,
    /// Deployment policy: new bookings start `confirmed` instead of `pending`.
    pub auto_confirm: bool,
    /// Deployment policy: emit an in-app notification when a booking is created.
    pub notify_on_create: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "washbook.db".to_string()),
            catalog_url: env::var("CATALOG_URL").unwrap_or_default(),
            auto_confirm: env_flag("AUTO_CONFIRM"),
            notify_on_create: env_flag("NOTIFY_ON_CREATE"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
