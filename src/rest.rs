use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{json, Value};
use tracing::{info, error, debug};

const BASE: &str = "https://discord.com/api/v10";

/// The Discord operations moderation needs. `RestClient` is the real
/// implementation; tests drive handlers through a recording fake.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Sends plain content and returns the new message id.
    async fn send_message(&self, channel_id: &str, content: &str) -> anyhow::Result<String>;
    async fn send_embed(&self, channel_id: &str, embed: Value) -> anyhow::Result<()>;
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()>;
    async fn bulk_delete_messages(&self, channel_id: &str, messages: Vec<String>) -> anyhow::Result<()>;
    /// `until` is an RFC 3339 timestamp; `None` lifts the timeout.
    async fn timeout_member(&self, guild_id: &str, user_id: &str, until: Option<&str>, reason: &str) -> anyhow::Result<()>;
    async fn kick_user(&self, guild_id: &str, user_id: &str, reason: &str) -> anyhow::Result<()>;
    async fn get_channel_name(&self, channel_id: &str) -> anyhow::Result<String>;
    async fn get_message_content(&self, channel_id: &str, message_id: &str) -> anyhow::Result<String>;
    async fn interaction_callback(&self, interaction_id: &str, interaction_token: &str, body: Value) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct RestClient {
    client: Client,
}

impl RestClient {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let auth_val = format!("Bot {}", token.trim());
        let mut auth_header = header::HeaderValue::from_str(&auth_val)
            .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN contains characters not allowed in a header"))?;
        auth_header.set_sensitive(true);

        headers.insert(header::AUTHORIZATION, auth_header);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent("DiscordBot (https://github.com/warden-bot, 0.1)")
            .build()?;

        Ok(Self { client })
    }

    pub async fn get_gateway_url(&self) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{}/gateway/bot", BASE))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("get_gateway_url failed {}: {}", status, text);
            anyhow::bail!("Discord Gateway API error {}: {}", status, text);
        }

        let body: Value = resp.json().await?;
        let url = body["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing 'url' in GET /gateway/bot response: {:?}", body))?
            .to_string();

        Ok(url)
    }

    pub async fn validate_token(&self) -> anyhow::Result<crate::models::User> {
        let resp = self
            .client
            .get(format!("{}/users/@me", BASE))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("Token validation failed {}: {}", status, text);
            anyhow::bail!("Invalid Discord Token ({}): {}", status, text);
        }

        let body: crate::models::User = resp.json().await?;
        info!("✅ Token validated — logged in as {}", body.tag());
        Ok(body)
    }

    /// Replaces the application's global commands with `commands`.
    pub async fn register_commands(&self, application_id: &str, commands: Value) -> anyhow::Result<()> {
        let url = format!("{}/applications/{}/commands", BASE, application_id);
        let resp = self.client.put(&url).json(&commands).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("register_commands failed {}: {}", status, text);
            anyhow::bail!("Discord API error {}: {}", status, text);
        }

        info!("Registered application commands for {}", application_id);
        Ok(())
    }
}

#[async_trait]
impl DiscordApi for RestClient {
    async fn send_message(&self, channel_id: &str, content: &str) -> anyhow::Result<String> {
        let body = json!({
            "content": content,
            "allowed_mentions": { "parse": ["users"] }
        });
        let url = format!("{}/channels/{}/messages", BASE, channel_id);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!("send_message failed {}: {}", status, text);
            anyhow::bail!("Discord API error {}: {}", status, text);
        }

        let body_json: Value = resp.json().await?;
        body_json["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing 'id' in created message: {}", body_json))
    }

    async fn send_embed(&self, channel_id: &str, embed: Value) -> anyhow::Result<()> {
        let body = json!({ "embeds": [embed], "allowed_mentions": { "parse": [] } });
        let url = format!("{}/channels/{}/messages", BASE, channel_id);
        debug!("POST {} (with embed)", url);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("send_embed failed {}: {}", status, text);
            anyhow::bail!("Discord API error {}: {}", status, text);
        }

        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/channels/{}/messages/{}", BASE, channel_id, message_id);
        let resp = self.client.delete(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("delete_message failed {}: {}", status, text);
            anyhow::bail!("API error: {} - {}", status, text);
        }

        Ok(())
    }

    async fn bulk_delete_messages(&self, channel_id: &str, messages: Vec<String>) -> anyhow::Result<()> {
        let url = format!("{}/channels/{}/messages/bulk-delete", BASE, channel_id);
        let body = json!({ "messages": messages });
        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("bulk_delete_messages failed {}: {}", status, text);
            anyhow::bail!("API error: {}", status);
        }

        Ok(())
    }

    async fn timeout_member(&self, guild_id: &str, user_id: &str, until: Option<&str>, reason: &str) -> anyhow::Result<()> {
        let url = format!("{}/guilds/{}/members/{}", BASE, guild_id, user_id);
        let body = json!({ "communication_disabled_until": until });
        let resp = self.client.patch(&url).header("X-Audit-Log-Reason", reason).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("timeout_member failed {}: {}", status, text);
            anyhow::bail!("API error: {} - {}", status, text);
        }

        Ok(())
    }

    async fn kick_user(&self, guild_id: &str, user_id: &str, reason: &str) -> anyhow::Result<()> {
        let url = format!("{}/guilds/{}/members/{}", BASE, guild_id, user_id);
        let resp = self.client.delete(&url)
            .header("X-Audit-Log-Reason", reason)
            .send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("kick_user failed {}: {}", status, text);
            anyhow::bail!("API error: {} - {}", status, text);
        }

        info!("SUCCESS: Kicked user {} from guild {}", user_id, guild_id);
        Ok(())
    }

    async fn get_channel_name(&self, channel_id: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{}/channels/{}", BASE, channel_id))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("get_channel failed {}: {}", status, text);
            anyhow::bail!("API error: {}", status);
        }

        let body: Value = resp.json().await?;
        Ok(body["name"].as_str().unwrap_or(channel_id).to_string())
    }

    async fn get_message_content(&self, channel_id: &str, message_id: &str) -> anyhow::Result<String> {
        let url = format!("{}/channels/{}/messages/{}", BASE, channel_id, message_id);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("get_message failed {}: {}", status, text);
            anyhow::bail!("API error: {}", status);
        }

        let body: Value = resp.json().await?;
        Ok(body["content"].as_str().unwrap_or_default().to_string())
    }

    async fn interaction_callback(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        body: Value,
    ) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(format!("{}/interactions/{}/{}/callback", BASE, interaction_id, interaction_token))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("interaction_callback failed {}: {}", status, text);
            anyhow::bail!("Discord API error {}: {}", status, text);
        }

        Ok(())
    }
}
