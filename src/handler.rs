use crate::commands::{self, cases};
use crate::models::{callback_type, interaction_type, Interaction, Message};
use crate::moderation;
use crate::state::AppState;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub async fn handle_message(msg: Message, state: Arc<AppState>) {
    moderation::handle_message(msg, state).await;
}

pub async fn handle_interaction(interaction: Interaction, state: Arc<AppState>) {
    match interaction.kind {
        interaction_type::PING => {
            let pong = json!({ "type": callback_type::PONG });
            if let Err(e) = commands::reply(&state, &interaction, pong).await {
                error!("Failed to answer interaction ping: {:?}", e);
            }
        }
        interaction_type::APPLICATION_COMMAND => {
            let name = interaction
                .data
                .as_ref()
                .and_then(|d| d.name.as_deref())
                .unwrap_or("")
                .to_string();

            let result = match name.as_str() {
                "cases" => cases::handle(&state, &interaction).await,
                _ => {
                    warn!("Unknown command: {}", name);
                    return;
                }
            };

            if let Err(e) = result {
                error!("Error executing command \"{}\": {:?}", name, e);
                let body = commands::ephemeral_content("There was an error executing this command.");
                if let Err(e) = commands::reply(&state, &interaction, body).await {
                    error!("Failed to report command error: {:?}", e);
                }
            }
        }
        other => debug!("Ignoring interaction type {}", other),
    }
}
