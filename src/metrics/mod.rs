pub mod collector;
pub mod percentiles;
pub mod stream;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use collector::{EndpointMetric, MetricsCollector, Summary};
pub use percentiles::PercentileSet;

/// One completed HTTP request, as observed by the capture middleware.
/// This is the "write" side — the middleware builds these and pushes them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    /// HTTP verb, e.g. "GET"
    pub method: String,
    /// Request path without the query string
    pub path: String,
    pub status_code: u16,
    /// Milliseconds from request start until the response was produced
    pub response_time: u64,
    /// Milliseconds since the Unix epoch, taken at request start
    pub timestamp: i64,
    /// true iff 200 <= status_code < 400
    pub success: bool,

    // Diagnostics only — never used in aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl MetricEvent {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        response_time: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status_code,
            response_time,
            timestamp,
            success: is_success(status_code),
            ip: None,
            user_agent: None,
            request_body: None,
            headers: None,
        }
    }

    pub fn with_client(
        mut self,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        self.ip = Some(ip.into());
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_request_body(mut self, body: serde_json::Value) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// 2xx and 3xx count as success; everything else is a failure.
pub fn is_success(status_code: u16) -> bool {
    (200..400).contains(&status_code)
}

/// Integer division rounded half-up, 0 when the divisor is 0.
pub(crate) fn rounded_div(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = (numerator as u128, denominator as u128);
    ((2 * n + d) / (2 * d)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_boundaries() {
        assert!(!is_success(199));
        assert!(is_success(200));
        assert!(is_success(304));
        assert!(is_success(399));
        assert!(!is_success(400));
        assert!(!is_success(500));
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(rounded_div(0, 0), 0);
        assert_eq!(rounded_div(5, 2), 3);
        assert_eq!(rounded_div(4, 3), 1);
        assert_eq!(rounded_div(5, 3), 2);
        assert_eq!(rounded_div(200, 3), 67);
    }

    #[test]
    fn event_serializes_camel_case_without_empty_extras() {
        let event = MetricEvent::new("GET", "/a", 404, 12, 1_000);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["responseTime"], 12);
        assert_eq!(json["success"], false);
        assert!(json.get("ip").is_none());
        assert!(json.get("headers").is_none());
    }
}
