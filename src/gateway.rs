use crate::models::{self, intent, op};
use crate::rest::RestClient;
use crate::state::AppState;
use crate::{commands, handler};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

const INTENTS: u32 = intent::GUILDS | intent::GUILD_MESSAGES | intent::MESSAGE_CONTENT;

pub async fn run(token: String, rest: Arc<RestClient>, state: Arc<AppState>) {
    loop {
        if let Err(e) = connect_and_run(&token, Arc::clone(&rest), Arc::clone(&state)).await {
            error!("Gateway error: {:?}. Reconnecting in 5s…", e);
            sleep(Duration::from_secs(5)).await;
        }
    }
}

async fn connect_and_run(token: &str, rest: Arc<RestClient>, state: Arc<AppState>) -> anyhow::Result<()> {
    let mut gw_url = rest.get_gateway_url().await?;

    if !gw_url.ends_with('/') {
        gw_url.push('/');
    }
    let ws_url = format!("{}?v=10&encoding=json", gw_url);
    info!("Connecting to Discord Gateway: {}...", ws_url);

    let mut request = ws_url.into_client_request()?;
    request.headers_mut().insert(
        "User-Agent",
        "DiscordBot (https://github.com/warden-bot, 0.1)".parse()?,
    );

    let (ws_stream, _) = connect_async(request).await?;
    info!("✅ WebSocket handshake complete");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let hello_msg = ws_stream
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("Stream closed before HELLO"))??;

    let hello_payload: models::Payload = serde_json::from_str(hello_msg.to_text()?)?;
    let heartbeat_interval = hello_payload
        .d
        .and_then(|d| d.get("heartbeat_interval").and_then(|v| v.as_u64()))
        .ok_or_else(|| anyhow::anyhow!("Missing heartbeat_interval"))?;

    info!("HELLO received — heartbeat interval: {}ms", heartbeat_interval);

    let mut interval_timer = tokio::time::interval(Duration::from_millis(heartbeat_interval));
    let (hb_tx, mut hb_rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
    let last_seq = Arc::new(std::sync::atomic::AtomicU64::new(0));

    let seq = Arc::clone(&last_seq);
    let heartbeat = tokio::spawn(async move {
        loop {
            interval_timer.tick().await;
            let s = seq.load(std::sync::atomic::Ordering::Relaxed);
            let d = if s == 0 { serde_json::Value::Null } else { json!(s) };
            let hb = json!({ "op": op::HEARTBEAT, "d": d });
            if hb_tx.send(Message::Text(hb.to_string().into())).is_err() {
                break;
            }
        }
    });

    let identify = json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": { "os": std::env::consts::OS, "browser": "warden-bot", "device": "warden-bot" }
        }
    });
    ws_sink.send(Message::Text(identify.to_string().into())).await?;
    info!("IDENTIFY sent (intents={})", INTENTS);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            Some(hb_msg) = hb_rx.recv() => {
                if let Err(e) = ws_sink.send(hb_msg).await {
                    break Err(e.into());
                }
            }
            next = ws_stream.next() => {
                let msg = match next {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => break Err(e.into()),
                    None => break Err(anyhow::anyhow!("Gateway stream closed")),
                };
                if msg.is_close() {
                    break Err(anyhow::anyhow!("Gateway closed the connection: {:?}", msg));
                }
                if !msg.is_text() {
                    continue;
                }

                let payload: models::Payload = match serde_json::from_str(msg.to_text()?) {
                    Ok(p) => p,
                    Err(e) => { error!("Parse error: {:?}", e); continue; }
                };
                if let Some(s) = payload.s {
                    last_seq.store(s, std::sync::atomic::Ordering::Relaxed);
                }

                match payload.op {
                    op::DISPATCH => {}
                    op::HEARTBEAT_ACK => { debug!("Heartbeat ACK"); continue; }
                    op::RECONNECT => break Err(anyhow::anyhow!("Gateway requested reconnect")),
                    op::INVALID_SESSION => break Err(anyhow::anyhow!("Invalid session")),
                    other => { debug!("Ignoring gateway op {}", other); continue; }
                }

                let Some(t) = payload.t.as_deref() else { continue };
                let d = payload.d.unwrap_or(json!({}));

                match t {
                    "READY" => {
                        let ready: models::ReadyData = serde_json::from_value(d)?;
                        info!(
                            "✅ READY — logged in as {} (session: {}, gateway v{})",
                            ready.user.tag(), ready.session_id, ready.version
                        );
                        let rest = Arc::clone(&rest);
                        tokio::spawn(async move {
                            if let Err(e) = rest.register_commands(&ready.application.id, commands::definitions()).await {
                                error!("Failed to register commands: {:?}", e);
                            }
                        });
                    }
                    "MESSAGE_CREATE" => {
                        match serde_json::from_value::<models::Message>(d) {
                            Ok(msg_data) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(async move { handler::handle_message(msg_data, state).await; });
                            }
                            Err(e) => warn!("Unreadable MESSAGE_CREATE: {:?}", e),
                        }
                    }
                    "INTERACTION_CREATE" => {
                        match serde_json::from_value::<models::Interaction>(d) {
                            Ok(int_data) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(async move { handler::handle_interaction(int_data, state).await; });
                            }
                            Err(e) => warn!("Unreadable INTERACTION_CREATE: {:?}", e),
                        }
                    }
                    _ => { debug!("Dispatching ignored event: {}", t); }
                }
            }
        }
    };

    heartbeat.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_cover_guild_message_content() {
        assert_eq!(INTENTS, 1 | (1 << 9) | (1 << 15));
    }
}
