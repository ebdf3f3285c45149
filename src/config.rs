use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Optional staff account created at startup when no matching
    // account exists yet.
    pub bootstrap_staff_email: Option<String>,
    pub bootstrap_staff_password: Option<Secret<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(8080),

            bootstrap_staff_email: config.get("bootstrap_staff_email").ok(),
            bootstrap_staff_password: config
                .get::<String>("bootstrap_staff_password")
                .ok()
                .map(Secret::new),
        })
    }
}
