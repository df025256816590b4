use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Process settings: secrets from the environment, moderation rules from
/// the JSON config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub ai_key: Option<String>,
    pub data_dir: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = env::var("DISCORD_TOKEN")
            .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN not set in .env"))?
            .trim()
            .to_string();

        let ai_key = env::var("AI_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string()));

        let settings = Settings::load(Path::new(&config_path))?;
        info!("Loaded moderation settings from {}", config_path);

        Ok(Self { token, ai_key, data_dir, settings })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub staff_role_id: String,
    pub staff_channel_id: String,
    #[serde(default)]
    pub rules: Vec<String>,
    /// Flat timeout used by the spam filter, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_duration: u64,
    #[serde(default = "default_warning_delete_ms")]
    pub warning_delete_after: u64,
    #[serde(default)]
    pub spam: SpamSettings,
    #[serde(default)]
    pub violation: ViolationSettings,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub bot_detection: BotDetectionSettings,
    #[serde(default)]
    pub escalation: EscalationSettings,
    #[serde(default)]
    pub filters: FilterToggles,
}

fn default_timeout_ms() -> u64 { 60_000 }
fn default_warning_delete_ms() -> u64 { 5_000 }

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let slur_ladder_given = value.pointer("/escalation/slur/timeouts").is_some();
        let mut settings: Settings = serde_json::from_value(value)?;
        // The slur ladder follows timeoutDuration unless set explicitly.
        if !slur_ladder_given {
            settings.escalation.slur.timeouts = vec![settings.timeout_duration];
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.staff_role_id.trim().is_empty() {
            anyhow::bail!("staffRoleId must not be empty");
        }
        if self.spam.threshold == 0 {
            anyhow::bail!("spam.threshold must be at least 1");
        }
        if self.spam.time_window == 0 {
            anyhow::bail!("spam.timeWindow must be positive");
        }
        if !(0.0..=1.0).contains(&self.spam.similarity_threshold) {
            anyhow::bail!("spam.similarityThreshold must be within [0, 1]");
        }
        if self.bot_detection.history_size == 0 {
            anyhow::bail!("botDetection.historySize must be at least 1");
        }
        for (name, esc) in [
            ("slur", &self.escalation.slur),
            ("violation", &self.escalation.violation),
            ("bot", &self.escalation.bot),
        ] {
            if esc.ban_threshold == 0 {
                anyhow::bail!("escalation.{}.banThreshold must be at least 1", name);
            }
            if esc.punishment == PunishmentKind::Timeout && esc.timeouts.is_empty() {
                anyhow::bail!("escalation.{}.timeouts must not be empty", name);
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_duration)
    }

    pub fn warning_lifetime(&self) -> Duration {
        Duration::from_millis(self.warning_delete_after)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpamSettings {
    pub threshold: usize,
    /// Milliseconds.
    pub time_window: u64,
    /// Maximum unique/total ratio still considered spam.
    pub similarity_threshold: f64,
    pub exceptions: Vec<String>,
}

impl Default for SpamSettings {
    fn default() -> Self {
        Self { threshold: 5, time_window: 10_000, similarity_threshold: 0.5, exceptions: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ViolationSettings {
    pub racial_slurs: Vec<String>,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    /// Any OpenAI-compatible `chat/completions` endpoint (Groq by default).
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub model: String,
    /// Overrides the provider's default base URL.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::Gemini,
            model: "gemini-1.5-flash-latest".to_string(),
            base_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotDetectionSettings {
    pub history_size: usize,
}

impl Default for BotDetectionSettings {
    fn default() -> Self {
        Self { history_size: 4 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentKind {
    Timeout,
    Kick,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationConfig {
    /// Violations answered with a warning before punishment starts.
    #[serde(default)]
    pub warn_threshold: u32,
    pub ban_threshold: u32,
    #[serde(default = "default_punishment")]
    pub punishment: PunishmentKind,
    /// Timeout ladder in milliseconds, indexed by prior punishments.
    #[serde(default)]
    pub timeouts: Vec<u64>,
    #[serde(default)]
    pub reset_after_punishment: bool,
}

fn default_punishment() -> PunishmentKind { PunishmentKind::Timeout }

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EscalationSettings {
    pub slur: EscalationConfig,
    pub violation: EscalationConfig,
    pub bot: EscalationConfig,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            slur: EscalationConfig {
                warn_threshold: 2,
                ban_threshold: 10,
                punishment: PunishmentKind::Timeout,
                timeouts: vec![default_timeout_ms()],
                reset_after_punishment: true,
            },
            violation: EscalationConfig {
                warn_threshold: 0,
                ban_threshold: 6,
                punishment: PunishmentKind::Timeout,
                timeouts: vec![2 * 60_000, 5 * 60_000, 10 * 60_000, 30 * 60_000],
                reset_after_punishment: false,
            },
            bot: EscalationConfig {
                warn_threshold: 0,
                ban_threshold: 3,
                punishment: PunishmentKind::Kick,
                timeouts: Vec::new(),
                reset_after_punishment: false,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterToggles {
    pub spam: bool,
    pub slurs: bool,
    pub violations: bool,
    pub suspect: bool,
    pub bots: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        Self { spam: true, slurs: true, violations: true, suspect: false, bots: false }
    }
}
