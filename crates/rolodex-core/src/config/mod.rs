use anyhow::Result;
use config::{Config, ConfigBuilder, Environment, Map, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub frontend: FrontendConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub serve_origin: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the public origin used when building links that point back at
    /// this server (confirmation, reset and change-email links).
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(origin) = &self.serve_origin {
            origin.trim_end_matches('/').to_owned()
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// The browser client. Its origin is the only one allowed by CORS and it
/// receives the redirects issued by the emailed links.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    pub url: String,
}

impl FrontendConfig {
    /// ## Summary
    /// Returns the frontend URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_hours: u32,
    pub token_ttl_minutes: u32,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub require_confirmed_email: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Returns a config builder populated with every default value.
    ///
    /// ## Errors
    /// Returns an error if a default cannot be registered.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("database.max_connections", 4)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("frontend.url", "http://localhost:3000")?
            .set_default("auth.session_ttl_hours", 24)?
            .set_default("auth.token_ttl_minutes", 15)?
            .set_default("auth.cookie_name", "rolodex_session")?
            .set_default("auth.cookie_secure", false)?
            .set_default("auth.require_confirmed_email", true)?
            .set_default("mail.from_address", "no-reply@rolodex.local")?
            .set_default("mail.from_name", "Rolodex")?
            .set_default("logging.level", "debug")?)
    }

    /// ## Summary
    /// Builds settings from the defaults plus explicit `(key, value)` pairs,
    /// without reading files or the environment.
    ///
    /// ## Errors
    /// Returns an error if a value is malformed or a required key is missing.
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Result<Self> {
        let mut builder = Self::defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        Ok(builder.build()?.try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Loads configuration from `config.toml` and `ROLODEX_*` environment
    /// variables into a `Settings`. Environment variables take precedence.
    ///
    /// Nested keys use a double underscore, e.g. `ROLODEX_DATABASE__URL`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::defaults()?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env
            .add_source(Self::environment(None))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// `ROLODEX_` variables with `__` between nesting levels. `source`
    /// replaces the process environment when given.
    fn environment(source: Option<Map<String, String>>) -> Environment {
        Environment::with_prefix("ROLODEX")
            .prefix_separator("_")
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
            .source(source)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    Settings::load()
}
