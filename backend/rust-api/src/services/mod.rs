use std::sync::Arc;

use crate::config::Config;
use crate::middlewares::auth::{IdentityVerifier, JwtService, RemoteVerifier};
use crate::store::{DocumentStore, MeteredStore, MongoStore};

pub mod badge_rules;
pub mod catalog_service;
pub mod quiz_service;
pub mod user_service;

use badge_rules::BadgeRuleSet;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Present when this service issues its own tokens.
    pub issuer: Option<Arc<JwtService>>,
    pub badge_rules: Arc<BadgeRuleSet>,
}

impl AppState {
    /// Wires the credential gate from configuration: a remote authority when
    /// `identity_verify_url` is set, local HS256 tokens otherwise.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MeteredStore::new(store));

        let (verifier, issuer): (Arc<dyn IdentityVerifier>, Option<Arc<JwtService>>) =
            match &config.identity_verify_url {
                Some(url) => {
                    tracing::info!("Verifying credentials against {}", url);
                    (Arc::new(RemoteVerifier::new(url.clone())), None)
                }
                None => {
                    let jwt = Arc::new(JwtService::new(&config.jwt_secret, config.token_ttl_secs));
                    (jwt.clone(), Some(jwt))
                }
            };

        Self {
            config,
            store,
            verifier,
            issuer,
            badge_rules: Arc::new(BadgeRuleSet::standard()),
        }
    }

    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
        let mongo = MongoStore::new(client, &config.mongo_database);

        tokio::time::timeout(std::time::Duration::from_secs(10), mongo.ping())
            .await
            .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 10s"))??;
        tracing::info!("MongoDB connected");

        Ok(Self::new(config, Arc::new(mongo)))
    }
}
