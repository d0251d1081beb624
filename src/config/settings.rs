use serde::Deserialize;
use std::time::Duration;

/// Lowest idle timeout the relay accepts, in milliseconds.
pub const MIN_IDLE_TIMEOUT_MS: u64 = 1000;

/// Runtime configuration for the relay.
///
/// Read once at startup; there is no runtime reconfiguration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub idle_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    pub log_level: String,
}

impl Settings {
    /// Idle timeout with the floor applied.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.max(MIN_IDLE_TIMEOUT_MS))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Partial settings loaded from the config file and environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// Kept raw: anything that does not start with a non-zero integer falls
    /// back to the default instead of failing the load.
    pub idle_timeout_ms: Option<String>,
    pub sweep_interval_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl PartialSettings {
    /// Fill the gaps from `default` and apply the idle-timeout floor.
    pub fn merge(self, default: Settings) -> Settings {
        Settings {
            bind_address: self.bind_address.unwrap_or(default.bind_address),
            port: self.port.unwrap_or(default.port),
            idle_timeout_ms: idle_timeout_ms(
                self.idle_timeout_ms.as_deref(),
                default.idle_timeout_ms,
            ),
            sweep_interval_ms: self
                .sweep_interval_ms
                .unwrap_or(default.sweep_interval_ms)
                .max(1),
            log_level: self.log_level.unwrap_or(default.log_level),
        }
    }
}

/// Resolve a raw `idle_timeout_ms` value.
///
/// Only the leading integer counts (`"1500ms"` is 1500). Missing, unparsable
/// or zero values give `default`; negatives end up at the floor.
pub fn idle_timeout_ms(raw: Option<&str>, default: u64) -> u64 {
    let ms = match raw.and_then(leading_int) {
        None | Some(0) => default,
        Some(ms) => u64::try_from(ms).unwrap_or(0),
    };
    ms.max(MIN_IDLE_TIMEOUT_MS)
}

fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 40001,
            idle_timeout_ms: 30_000,
            sweep_interval_ms: 15_000,
            log_level: "info".to_string(),
        }
    }
}
