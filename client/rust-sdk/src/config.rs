use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub cache_dir: PathBuf,
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let api_base_url = settings
            .get_string("api.base_url")
            .or_else(|_| env::var("API_BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:4000/api".to_string());

        let cache_dir = settings
            .get_string("cache.dir")
            .or_else(|_| env::var("CACHE_DIR"))
            .unwrap_or_else(|_| ".cozylms".to_string());

        Ok(ClientConfig {
            api_base_url,
            cache_dir: PathBuf::from(cache_dir),
        })
    }

    /// Programmatic construction for embedding and tests.
    pub fn new(api_base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        ClientConfig {
            api_base_url: api_base_url.into(),
            cache_dir: cache_dir.into(),
        }
    }
}
