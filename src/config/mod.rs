use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub identity: Option<IdentityConfig>,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Identity provider endpoint and keys. When any of these is missing the
/// access gate is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub anon_key: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub secure_cookies: bool,
}

impl IdentityConfig {
    /// Builds the identity section from the provider URL and keys, deriving
    /// the session cookie name from the project reference in the host.
    pub fn new(
        url: &str,
        anon_key: &str,
        jwt_secret: &str,
        cookie_name: Option<String>,
    ) -> Option<Self> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() || anon_key.trim().is_empty() || jwt_secret.trim().is_empty() {
            return None;
        }

        let cookie_name = match cookie_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => default_cookie_name(url)?,
        };

        Some(Self {
            url: url.to_string(),
            anon_key: anon_key.trim().to_string(),
            jwt_secret: jwt_secret.trim().to_string(),
            cookie_name,
        })
    }
}

/// `sb-<first host label>-auth-token`, e.g. `sb-abcd-auth-token` for
/// `https://abcd.example.co`.
fn default_cookie_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let project_ref = host.split('.').next().filter(|label| !label.is_empty())?;
    Some(format!("sb-{}-auth-token", project_ref))
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("TEAM_HOURS_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Identity provider
        if let (Ok(url), Ok(anon_key), Ok(secret)) = (
            env::var("SUPABASE_URL"),
            env::var("SUPABASE_ANON_KEY"),
            env::var("SUPABASE_JWT_SECRET"),
        ) {
            let cookie_name = env::var("SUPABASE_COOKIE_NAME").ok();
            self.identity = IdentityConfig::new(&url, &anon_key, &secret, cookie_name);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            identity: None,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                secure_cookies: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            identity: None,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                secure_cookies: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            identity: None,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                secure_cookies: true,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
