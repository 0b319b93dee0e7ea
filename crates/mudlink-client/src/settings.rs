//! Engine tuning knobs. The library never reads config files; the CLI maps
//! its TOML config onto this struct.

use std::time::Duration;

/// Default scrollback ceiling (2 MiB).
pub const DEFAULT_SCROLLBACK_BYTES: usize = 2 * 1024 * 1024;

/// Default login template. `{name}` and `{secret}` are substituted.
pub const DEFAULT_LOGIN_FORMAT: &str = "connect {name} {secret}";

/// Settings shared by every session of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// RingBuffer ceiling in bytes (0 = unbounded).
    pub scrollback_bytes: usize,
    /// Keep-alive interval (zero disables the timer).
    pub keepalive_interval: Duration,
    /// Per-strategy connect timeout.
    pub connect_timeout: Duration,
    /// Delay before the alternate strategy is tried after a primary timeout.
    pub fallback_delay: Duration,
    pub login_format: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scrollback_bytes: DEFAULT_SCROLLBACK_BYTES,
            keepalive_interval: Duration::from_secs(240),
            connect_timeout: Duration::from_secs(10),
            fallback_delay: Duration::from_millis(1500),
            login_format: DEFAULT_LOGIN_FORMAT.to_string(),
        }
    }
}

impl EngineSettings {
    /// Render the auto-login command.
    pub fn login_command(&self, name: &str, secret: &str) -> String {
        let mut out = String::with_capacity(self.login_format.len() + name.len() + secret.len());
        let mut rest = self.login_format.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{name}") {
                out.push_str(name);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{secret}") {
                out.push_str(secret);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
