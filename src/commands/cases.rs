use super::{ephemeral_content, ephemeral_embed, find_option, reply};
use crate::constants::{colors, emojis, EMBED_FIELD_LIMIT, EMBED_MAX_FIELDS};
use crate::executor::clip;
use crate::models::{option_type, Interaction, User};
use crate::state::AppState;
use crate::store::Case;
use serde_json::{json, Value};
use tracing::info;

pub fn definition() -> Value {
    let user = json!({
        "type": option_type::USER,
        "name": "user",
        "description": "The user to check cases for",
        "required": true
    });
    json!({
        "name": "cases",
        "description": "View or remove moderation cases for a user",
        "dm_permission": false,
        "options": [
            {
                "type": option_type::SUB_COMMAND,
                "name": "list",
                "description": "List a user's cases",
                "options": [user]
            },
            {
                "type": option_type::SUB_COMMAND,
                "name": "remove",
                "description": "Remove one of a user's cases",
                "options": [
                    user,
                    {
                        "type": option_type::INTEGER,
                        "name": "case_id",
                        "description": "Case number as shown by /cases list",
                        "required": true,
                        "min_value": 1
                    }
                ]
            }
        ]
    })
}

pub async fn handle(state: &AppState, interaction: &Interaction) -> anyhow::Result<()> {
    if !state.is_staff(interaction.member.as_ref()) {
        return reply(state, interaction, ephemeral_content("You do not have permission to use this command.")).await;
    }

    let data = interaction
        .data
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("cases interaction {} has no data", interaction.id))?;
    let sub = data
        .options
        .first()
        .filter(|o| o.kind == option_type::SUB_COMMAND)
        .ok_or_else(|| anyhow::anyhow!("cases interaction {} has no subcommand", interaction.id))?;

    let user_id = find_option(&sub.options, "user")
        .and_then(|o| o.value.as_ref())
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("cases {} is missing the user option", sub.name))?;
    let target = data.resolved.as_ref().and_then(|r| r.users.get(user_id));
    let label = target.map(User::tag).unwrap_or_else(|| user_id.to_string());

    if let Some(invoker) = interaction.invoker() {
        info!(
            "/cases {} for {} by {} in {}",
            sub.name,
            label,
            invoker.tag(),
            interaction.guild_id.as_deref().unwrap_or("DM")
        );
    }

    match sub.name.as_str() {
        "list" => {
            let cases = state.cases.for_user(user_id).await;
            if cases.is_empty() {
                return reply(state, interaction, ephemeral_content(&format!("No cases found for user {}", label))).await;
            }
            reply(state, interaction, ephemeral_embed(cases_embed(&label, target, &cases))).await
        }
        "remove" => {
            let case_id = find_option(&sub.options, "case_id")
                .and_then(|o| o.value.as_ref())
                .and_then(Value::as_u64)
                .ok_or_else(|| anyhow::anyhow!("cases remove is missing case_id"))?;

            let content = match state.cases.remove(user_id, case_id as usize).await {
                Ok(removed) => {
                    info!("Removed case #{} ({}) for {}", case_id, removed.kind, label);
                    format!("{} Removed case #{} ({}) for {}.", emojis::SUCCESS, case_id, removed.action_taken, label)
                }
                Err(e) => format!("{} Could not remove: {}.", emojis::ERROR, e),
            };
            reply(state, interaction, ephemeral_content(&content)).await
        }
        other => anyhow::bail!("unknown cases subcommand {:?}", other),
    }
}

/// Cases grouped by type in first-seen order, one field per type.
pub fn cases_embed(label: &str, target: Option<&User>, cases: &[(usize, Case)]) -> Value {
    let mut groups: Vec<(&str, Vec<&(usize, Case)>)> = Vec::new();
    for entry in cases {
        match groups.iter().position(|(kind, _)| *kind == entry.1.kind) {
            Some(i) => groups[i].1.push(entry),
            None => groups.push((entry.1.kind.as_str(), vec![entry])),
        }
    }

    let fields: Vec<Value> = groups
        .iter()
        .take(EMBED_MAX_FIELDS)
        .map(|(kind, list)| {
            let summary = list
                .iter()
                .map(|(id, case)| {
                    let mut line = format!("• Case #{} | {}\n{}", id, format_date(case.timestamp), case.action_taken);
                    if let Some(reason) = &case.ai_reason {
                        line.push_str(&format!("\nReason: {}", reason));
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            json!({
                "name": format!("{} Violations ({})", capitalize(kind), list.len()),
                "value": clip(&summary, EMBED_FIELD_LIMIT),
                "inline": false
            })
        })
        .collect();

    let mut embed = json!({
        "title": format!("{} Cases for {}", emojis::FOLDER, label),
        "color": colors::RED,
        "fields": fields,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });
    if let Some(user) = target {
        embed["thumbnail"] = json!({ "url": user.avatar_url() });
    }
    embed
}

fn format_date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
