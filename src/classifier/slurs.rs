use super::normalize::normalize;
use super::Verdict;
use regex::{Regex, RegexBuilder};

/// Banned-term matcher over normalized message text.
#[derive(Debug, Clone)]
pub struct SlurFilter {
    pattern: Option<Regex>,
}

impl SlurFilter {
    /// Compiles the configured terms into one alternation. Terms are regex
    /// fragments; an empty list produces a filter that never matches.
    pub fn new(terms: &[String]) -> anyhow::Result<Self> {
        let terms: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        if terms.is_empty() {
            return Ok(Self { pattern: None });
        }

        let joined = terms.iter().map(|t| format!("(?:{})", t)).collect::<Vec<_>>().join("|");
        let pattern = RegexBuilder::new(&joined)
            .case_insensitive(true)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid banned-term pattern: {}", e))?;

        Ok(Self { pattern: Some(pattern) })
    }

    pub fn classify(&self, text: &str) -> Verdict {
        if self.is_match(text) {
            Verdict::Slur
        } else {
            Verdict::Safe
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(&normalize(text)),
            None => false,
        }
    }
}
