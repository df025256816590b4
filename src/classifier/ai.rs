use super::provider::CompletionProvider;
use super::{Severity, Verdict};
use tracing::{info, warn};

/// Prompts a completion provider and maps its reply onto a [`Verdict`].
///
/// Provider errors and replies outside the expected vocabulary resolve to
/// [`Verdict::Safe`].
pub struct AiClassifier {
    provider: Box<dyn CompletionProvider>,
    rules: String,
}

impl AiClassifier {
    pub fn new(provider: Box<dyn CompletionProvider>, rules: &[String]) -> Self {
        Self { provider, rules: rules.join(", ") }
    }

    /// Rule check for a single message, with the replied-to message as context.
    pub async fn classify_message(&self, content: &str, context: Option<&str>) -> Verdict {
        let prompt = violation_prompt(&self.rules, content, context);
        self.ask("violation", &prompt, parse_violation_reply).await
    }

    /// Softer check used for staff alerts; never leads to punishment.
    pub async fn classify_suspect(&self, content: &str) -> Verdict {
        let prompt = suspect_prompt(&self.rules, content);
        self.ask("suspect", &prompt, parse_suspect_reply).await
    }

    /// Looks at a user's most recent messages for automated behaviour.
    pub async fn classify_history(&self, history: &[String]) -> Verdict {
        if history.is_empty() {
            return Verdict::Safe;
        }
        let prompt = bot_prompt(history);
        self.ask("bot", &prompt, parse_bot_reply).await
    }

    async fn ask(&self, kind: &str, prompt: &str, parse: fn(&str) -> Option<Verdict>) -> Verdict {
        let reply = match self.provider.complete(prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!("AI {} check failed, treating as safe: {:?}", kind, e);
                return Verdict::Safe;
            }
        };

        match parse(&reply) {
            Some(v) => v,
            None => {
                info!("AI {} reply not understood, treating as safe: {:?}", kind, reply);
                Verdict::Safe
            }
        }
    }
}

fn violation_prompt(rules: &str, content: &str, context: Option<&str>) -> String {
    let context = context.map(|c| format!("Context (replied to message): \"{}\"", c)).unwrap_or_default();
    format!(
        "Analyze the following message to see if it violates the following rules. Classify the violation type.\n\n\
         Rules: \"{rules}\"\n\n\
         Message: \"{content}\"\n\n\
         Context message: \"{context}\"\n\n\
         Respond with exactly one of the following:\n\
         - \"HEAVY_VIOLATION\" (for severe violations like racial slurs, rape, suicidal content, discrimination, offensive statements/jokes)\n\
         - \"HARMFUL\" (for other harmful content like advertisement, personal information)\n\
         - \"SAFE\" (if no rules are violated)"
    )
}

fn suspect_prompt(rules: &str, content: &str) -> String {
    format!(
        "Decide if this message violates any rules.\n\n\
         Must analyze carefully before deciding.\n\n\
         Rules: {rules}\n\n\
         Message: \"{content}\"\n\
         Response format:\n\
         - Safe format\n\
         \"Safe - no violation detected.\"\n\
         - Violation format\n\
         \"Violation - [reason]\""
    )
}

fn bot_prompt(history: &[String]) -> String {
    let numbered = history
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}: \"{}\"", i + 1, m))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Analyze the following sequence of messages from a single user. Do they appear to be automated spam, \
         bot-like behavior (e.g., repetitive, nonsensical patterns), or just normal human communication \
         (even if it seems like \"brainrot\" or off-topic)?\n\
         Messages:\n{numbered}\n\n\
         Respond with one of the following:\n\
         - \"BOT_SPAM\" (if it looks like automated spam or bot behavior)\n\
         - \"HUMAN_LIKE\" (if it looks like normal human communication, even if nonsensical or low quality)"
    )
}

fn clean(reply: &str) -> &str {
    reply.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// `HEAVY_VIOLATION`, `HARMFUL`, `SAFE`, or `VIOLATION: <severity> <reason>`.
pub fn parse_violation_reply(reply: &str) -> Option<Verdict> {
    let text = clean(reply);
    let upper = text.to_uppercase();

    match upper.as_str() {
        "SAFE" => return Some(Verdict::Safe),
        "HEAVY_VIOLATION" => return Some(Verdict::violation(Severity::Heavy, None)),
        "HARMFUL" => return Some(Verdict::violation(Severity::Harmful, None)),
        _ => {}
    }

    let rest = strip_prefix_ignore_case(text, "VIOLATION:")?.trim();
    let (word, reason) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let severity = match word.to_uppercase().as_str() {
        "HEAVY" | "HEAVY_VIOLATION" | "SEVERE" => Severity::Heavy,
        "HARMFUL" | "LIGHT" | "MINOR" => Severity::Harmful,
        _ => return None,
    };
    let reason = reason.trim();
    Some(Verdict::violation(severity, (!reason.is_empty()).then(|| reason.to_string())))
}

/// `Violation - <reason>` or `Safe - ...`.
pub fn parse_suspect_reply(reply: &str) -> Option<Verdict> {
    let text = clean(reply);
    let lower = text.to_lowercase();

    if lower.starts_with("safe") {
        return Some(Verdict::Safe);
    }
    if lower.len() > 5 && lower.starts_with("violation") {
        let reason = strip_prefix_ignore_case(text, "violation")?
            .trim_start_matches(|c: char| c == '-' || c == ':' || c.is_whitespace())
            .trim();
        let reason = (!reason.is_empty()).then(|| reason.to_string());
        return Some(Verdict::violation(Severity::Harmful, reason));
    }
    None
}

/// `BOT_SPAM` or `HUMAN_LIKE`.
pub fn parse_bot_reply(reply: &str) -> Option<Verdict> {
    match clean(reply).to_uppercase().as_str() {
        "BOT_SPAM" => Some(Verdict::Spam),
        "HUMAN_LIKE" => Some(Verdict::Safe),
        _ => None,
    }
}
