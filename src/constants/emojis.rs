pub const SUCCESS:    &str = "✅";
pub const ERROR:      &str = "❌";
pub const WARNING:    &str = "⚠️";
pub const SIREN:      &str = "🚨";
pub const SHIELD:     &str = "🛡️";
pub const FOLDER:     &str = "📁";
