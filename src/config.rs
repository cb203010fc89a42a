use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::metrics::collector::DEFAULT_CAPACITY;

/// Port the dashboard listens on unless told otherwise.
pub const DEFAULT_DASHBOARD_PORT: u16 = 3333;

/// Largest request body the capture middleware will buffer (bytes).
pub const MAX_CAPTURED_BODY: usize = 1024 * 1024;

/// Settings for a `Monitor` instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum number of events retained (floored at 100).
    pub capacity: usize,
    /// Address the dashboard server binds to.
    pub dashboard_addr: SocketAddr,
    /// Directory served as the dashboard frontend, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            dashboard_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_DASHBOARD_PORT)),
            static_dir: None,
        }
    }
}

/// What the capture middleware records, and for which requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Requests whose path starts with any of these are not recorded.
    pub exclude_paths: Vec<String>,
    /// Attach the request payload to each event.
    pub include_body: bool,
    /// Attach the request headers to each event.
    pub include_headers: bool,
}

impl CaptureOptions {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            exclude_paths: vec!["/health".into(), "/favicon.ico".into()],
            include_body: false,
            include_headers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_is_a_prefix_match() {
        let options = CaptureOptions::default();
        assert!(options.is_excluded("/health"));
        assert!(options.is_excluded("/healthz"));
        assert!(options.is_excluded("/favicon.ico"));
        assert!(!options.is_excluded("/api/health"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"capacity": 50}"#).unwrap();
        assert_eq!(config.capacity, 50);
        assert_eq!(config.dashboard_addr.port(), DEFAULT_DASHBOARD_PORT);

        let options: CaptureOptions =
            serde_json::from_str(r#"{"include_body": true}"#).unwrap();
        assert!(options.include_body);
        assert_eq!(options.exclude_paths.len(), 2);
    }
}
