//! Text output formatting with colors.

use chrono::{DateTime, Duration, Local, Utc};
use vtx_core::{AuthError, ChatResponse, ModelAuthConfig};
use vtx_providers::AdapterKind;

use super::json::{CheckOutput, ErrorOutput, VerifyOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Replies slower than this are shown in yellow.
const SLOW_REPLY_MS: u64 = 5_000;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Models
    // ========================================================================

    /// Header for `vtx models`.
    pub fn format_models_header(&self) -> String {
        self.bold(&format!(
            "{:<18} {:<14} {:<17} {:<16} {}",
            "Alias", "Auth", "Shape", "Region", "Model"
        ))
    }

    /// Formats a single catalog line.
    pub fn format_model_line(&self, config: &ModelAuthConfig, kind: Option<AdapterKind>) -> String {
        let line = format!(
            "{:<18} {:<14} {:<17} {:<16} {}",
            config.alias,
            config.auth_method.as_str(),
            config.api_shape.as_str(),
            config.region,
            config.model_id,
        );
        match kind {
            Some(_) => line,
            None => format!("{line} {}", self.red("(unsupported)")),
        }
    }

    // ========================================================================
    // Check
    // ========================================================================

    /// Formats the result of `vtx check`.
    pub fn format_check(&self, output: &CheckOutput) -> String {
        let mut lines = Vec::new();
        lines.push(format!("{} ({})", self.bold(&output.alias), output.auth_method));

        let deps = if output.dependencies {
            self.green("✓ available")
        } else {
            self.red("✗ missing")
        };
        lines.push(format!("Deps:    {deps}"));

        if output.authenticated {
            let mut status = self.green("✓ authenticated");
            if let Some(expires_at) = output.expires_at {
                status = format!("{status} {}", self.dim(&self.format_expiry(expires_at, Utc::now())));
            }
            lines.push(format!("Auth:    {status}"));
        } else {
            lines.push(format!("Auth:    {}", self.red("✗ failed")));
        }

        if let Some(error) = &output.error {
            lines.push(self.format_error_output(error));
        }
        lines.join("\n")
    }

    /// Formats a token expiry relative to `now`.
    pub fn format_expiry(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
        if expires_at <= now {
            return "(expired)".to_string();
        }

        let diff = expires_at - now;
        if diff < Duration::hours(1) {
            let mins = diff.num_minutes();
            format!("(expires in {} minute{})", mins, if mins == 1 { "" } else { "s" })
        } else if diff < Duration::hours(24) {
            let hours = diff.num_hours();
            let mins = diff.num_minutes() % 60;
            if mins > 0 {
                format!("(expires in {hours}h {mins}m)")
            } else {
                format!("(expires in {} hour{})", hours, if hours == 1 { "" } else { "s" })
            }
        } else {
            let local = expires_at.with_timezone(&Local);
            format!("(expires {})", local.format("%a at %l:%M %p").to_string().trim())
        }
    }

    // ========================================================================
    // Verify
    // ========================================================================

    /// Header for `vtx verify`.
    pub fn format_verify_header(&self) -> String {
        self.bold(&format!("{:<18} {:<6} {:>8}  {}", "Alias", "Result", "Latency", "Detail"))
    }

    /// Formats one verification result.
    pub fn format_verify_line(&self, result: &VerifyOutput) -> String {
        let latency = format!("{:>6}ms", result.latency_ms);
        let latency = if result.latency_ms > SLOW_REPLY_MS {
            self.yellow(&latency)
        } else {
            latency
        };

        if result.ok {
            let reply = result.reply.as_deref().unwrap_or_default();
            format!(
                "{:<18} {} {}  {}",
                result.alias,
                self.green(&format!("{:<6}", "pass")),
                latency,
                self.dim(&truncate(reply, 40)),
            )
        } else {
            let detail = result.error.as_ref().map_or_else(String::new, |e| match &e.code {
                Some(code) => format!("{code}: {}", truncate(&e.message, 60)),
                None => truncate(&e.message, 60),
            });
            format!(
                "{:<18} {} {}  {}",
                result.alias,
                self.red(&format!("{:<6}", "FAIL")),
                latency,
                detail,
            )
        }
    }

    // ========================================================================
    // Chat
    // ========================================================================

    /// Footer printed after a reply in verbose mode.
    pub fn format_response_footer(&self, response: &ChatResponse) -> String {
        let mut parts = Vec::new();
        if let Some(model) = &response.model {
            parts.push(format!("model {model}"));
        }
        if let Some(reason) = &response.stop_reason {
            parts.push(format!("stop {reason}"));
        }
        if let Some(usage) = &response.usage {
            parts.push(format!(
                "{} in / {} out",
                format_number(usage.input_tokens),
                format_number(usage.output_tokens)
            ));
        }
        self.dim(&format!("[{}]", parts.join(", ")))
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Formats an error with its remediation steps.
    pub fn format_error(&self, error: &AuthError) -> String {
        self.format_error_output(&ErrorOutput::from(error))
    }

    fn format_error_output(&self, error: &ErrorOutput) -> String {
        let mut lines = Vec::new();
        let label = match &error.code {
            Some(code) => format!("Error [{code}]"),
            None => "Error".to_string(),
        };
        lines.push(format!("{}: {}", self.red(&label), error.message));
        for (i, step) in error.remediation.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, self.cyan(step)));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

fn format_number(n: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let f = n as f64;
    if n >= 1_000_000 {
        format!("{:.1}M", f / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", f / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Shortens `text` to one line of at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == text.len() {
        return line.to_string();
    }
    let mut short: String = line.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(500), "500");
        assert_eq!(format_number(1500), "1.5K");
        assert_eq!(format_number(1_500_000), "1.5M");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("ok", 10), "ok");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("first\nsecond", 20), "first…");
    }

    #[test]
    fn test_colors_toggle() {
        let plain = TextFormatter::new(false);
        assert_eq!(plain.red("x"), "x");

        let colored = TextFormatter::new(true);
        assert_eq!(colored.red("x"), format!("{RED}x{RESET}"));
    }
}
