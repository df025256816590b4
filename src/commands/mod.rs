pub mod cases;

use crate::models::{callback_type, CommandOption, Interaction, EPHEMERAL};
use crate::state::AppState;
use serde_json::{json, Value};

/// Every application command the bot registers on `READY`.
pub fn definitions() -> Value {
    json!([cases::definition()])
}

pub fn ephemeral_content(content: &str) -> Value {
    json!({
        "type": callback_type::CHANNEL_MESSAGE,
        "data": { "content": content, "flags": EPHEMERAL, "allowed_mentions": { "parse": [] } }
    })
}

pub fn ephemeral_embed(embed: Value) -> Value {
    json!({
        "type": callback_type::CHANNEL_MESSAGE,
        "data": { "embeds": [embed], "flags": EPHEMERAL, "allowed_mentions": { "parse": [] } }
    })
}

pub async fn reply(state: &AppState, interaction: &Interaction, body: Value) -> anyhow::Result<()> {
    state.api.interaction_callback(&interaction.id, &interaction.token, body).await
}

pub(crate) fn find_option<'a>(options: &'a [CommandOption], name: &str) -> Option<&'a CommandOption> {
    options.iter().find(|o| o.name == name)
}
