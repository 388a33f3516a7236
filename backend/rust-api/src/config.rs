use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub listen_addr: String,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// When set, bearer tokens are verified by this identity authority
    /// instead of locally.
    pub identity_verify_url: Option<String>,
    pub bcrypt_cost: u32,
    /// `user:password` expected on the `/metrics` endpoint.
    pub metrics_auth: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "gadi".to_string());

        let listen_addr = settings
            .get_string("server.listen_addr")
            .or_else(|_| env::var("PORT").map(|port| format!("0.0.0.0:{}", port)))
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            Err(_) => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            }
        };

        let token_ttl_secs = settings
            .get_int("auth.token_ttl_secs")
            .ok()
            .or_else(|| env::var("TOKEN_TTL_SECS").ok()?.parse().ok())
            .unwrap_or(86_400);

        let identity_verify_url = settings
            .get_string("auth.identity_verify_url")
            .or_else(|_| env::var("IDENTITY_VERIFY_URL"))
            .ok()
            .filter(|url| !url.is_empty());

        let bcrypt_cost = settings
            .get_int("auth.bcrypt_cost")
            .ok()
            .and_then(|cost| u32::try_from(cost).ok())
            .unwrap_or(10);

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| "admin:changeme".to_string());

        Ok(Config {
            mongo_uri,
            mongo_database,
            listen_addr,
            jwt_secret,
            token_ttl_secs,
            identity_verify_url,
            bcrypt_cost,
            metrics_auth,
        })
    }
}
