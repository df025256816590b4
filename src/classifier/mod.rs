pub mod ai;
pub mod normalize;
pub mod provider;
pub mod slurs;
pub mod spam;

pub use ai::AiClassifier;
pub use slurs::SlurFilter;
pub use spam::SpamRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Delete only.
    Harmful,
    /// Delete and escalate.
    Heavy,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Harmful => "harmful",
            Severity::Heavy => "heavy",
        }
    }
}

/// Coarse outcome of any classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Spam,
    Slur,
    Violation { severity: Severity, reason: Option<String> },
}

impl Verdict {
    pub fn violation(severity: Severity, reason: Option<String>) -> Self {
        Verdict::Violation { severity, reason }
    }
}
