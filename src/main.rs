mod classifier;
mod commands;
mod config;
mod constants;
mod escalation;
mod executor;
mod gateway;
mod handler;
mod models;
mod moderation;
mod rest;
mod state;
mod store;
#[cfg(test)]
mod testing;

use classifier::{provider, AiClassifier};
use config::Config;
use constants::emojis;
use dotenv::dotenv;
use rest::{DiscordApi, RestClient};
use state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warden_bot=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("❌ Failed to load configuration: {:?}", e);
            return;
        }
    };

    let rest = match RestClient::new(&config.token) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("❌ Failed to build HTTP client: {:?}", e);
            return;
        }
    };

    if let Err(e) = rest.validate_token().await {
        error!("❌ Token validation failed: {:?}", e);
        return;
    }

    let ai = match config.ai_key.as_deref() {
        Some(key) => match provider::from_settings(&config.settings.ai, key) {
            Ok(p) => Some(AiClassifier::new(p, &config.settings.rules)),
            Err(e) => {
                error!("❌ Failed to build AI provider: {:?}", e);
                return;
            }
        },
        None => {
            warn!("AI_KEY not set, AI-backed filters are disabled");
            None
        }
    };

    let api: Arc<dyn DiscordApi> = rest.clone();
    let state = match AppState::build(config.settings, api, ai, &config.data_dir).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("❌ Failed to initialise moderation state: {:?}", e);
            return;
        }
    };

    info!(
        "{} warden-bot starting ({} cases on record, data dir: {})",
        emojis::SHIELD,
        state.cases.len().await,
        config.data_dir.display()
    );

    gateway::run(config.token, rest, state).await;
}
