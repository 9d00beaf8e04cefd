//! Connectivity probing
//!
//! A probe issues exactly one GET to the configured test endpoint, bounded
//! by a fixed timeout that ignores `defaultTimeout`, and turns the outcome
//! into a [`ConnectionStatus`]. Probing never retries and never touches the
//! persisted settings.

use crate::client::headers::build_headers;
use crate::client::url::{direct_target_url, proxy_target_url};
use crate::client::{error_chain, reason_phrase};
use crate::config::ApplicationSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Abort bound for one probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Reported when the proxy itself cannot be reached.
pub const PROXY_UNREACHABLE_MESSAGE: &str =
    "Proxy connection failed - check if the backend proxy server is running";

/// Reported when a direct-mode request fails before any response.
pub const CROSS_ORIGIN_MESSAGE: &str = "CORS Error: Cannot connect to external API from localhost. Enable proxy mode to bypass this restriction.";

/// Lifecycle state of the backend connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Derived connection status; never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub status: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    /// Round trip of a successful probe, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConnectionStatus {
    /// Initial status before any probe.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Status published when a probe starts.
    pub fn connecting() -> Self {
        Self {
            status: ConnectionState::Connecting,
            last_checked: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn connected(response_time_ms: u64) -> Self {
        Self {
            status: ConnectionState::Connected,
            last_checked: Some(Utc::now()),
            response_time: Some(response_time_ms),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionState::Error,
            last_checked: Some(Utc::now()),
            response_time: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionState::Connected
    }
}

/// Something that can check whether the configured backend is reachable
///
/// The settings store depends on this trait rather than on HTTP directly,
/// so its trigger policy can be exercised without a network.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    /// Probe once under `settings` and report the outcome.
    async fn probe(&self, settings: &ApplicationSettings) -> ConnectionStatus;
}

/// [`ConnectionProbe`] that performs a real HTTP GET
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: Client,
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe {
    /// Probe with the standard 10 second bound.
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Replace the abort bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// URL the probe requests under `settings`.
pub fn probe_url(settings: &ApplicationSettings) -> String {
    if settings.use_proxy {
        proxy_target_url(&settings.proxy_url, &settings.test_endpoint)
    } else {
        direct_target_url(&settings.api_root_url, &settings.test_endpoint)
    }
}

/// `Connection timeout (10s)` for whole seconds, milliseconds otherwise.
pub fn timeout_message(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 && timeout.as_secs() > 0 {
        format!("Connection timeout ({}s)", timeout.as_secs())
    } else {
        format!("Connection timeout ({}ms)", timeout.as_millis())
    }
}

fn classify_failure(err: &reqwest::Error, use_proxy: bool, timeout: Duration) -> String {
    if err.is_timeout() {
        timeout_message(timeout)
    } else if err.is_connect() || (err.is_request() && !err.is_builder()) {
        if use_proxy {
            PROXY_UNREACHABLE_MESSAGE.to_string()
        } else {
            CROSS_ORIGIN_MESSAGE.to_string()
        }
    } else {
        error_chain(err)
    }
}

#[async_trait]
impl ConnectionProbe for HttpProbe {
    async fn probe(&self, settings: &ApplicationSettings) -> ConnectionStatus {
        let url = probe_url(settings);
        let headers = match build_headers(settings) {
            Ok(headers) => headers,
            Err(err) => return ConnectionStatus::error(err.to_string()),
        };

        let started = Instant::now();
        let outcome = self
            .http
            .get(&url)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await;

        let status = match outcome {
            Ok(response) if response.status().is_success() => {
                ConnectionStatus::connected(started.elapsed().as_millis() as u64)
            }
            Ok(response) => {
                let status = response.status();
                ConnectionStatus::error(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    reason_phrase(status)
                ))
            }
            Err(err) => ConnectionStatus::error(classify_failure(
                &err,
                settings.use_proxy,
                self.timeout,
            )),
        };

        tracing::debug!(
            url = %url,
            status = %status.status,
            response_time_ms = ?status.response_time,
            error = ?status.error_message,
            "Connectivity probe finished"
        );
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url_direct_mode() {
        let settings = ApplicationSettings {
            api_root_url: "https://api.example.com/".to_string(),
            test_endpoint: "api/v1/services".to_string(),
            ..Default::default()
        };
        assert_eq!(probe_url(&settings), "https://api.example.com/api/v1/services");
    }

    #[test]
    fn test_probe_url_proxy_mode() {
        let settings = ApplicationSettings {
            use_proxy: true,
            proxy_url: "http://localhost:8000/".to_string(),
            test_endpoint: "/api/v1/services".to_string(),
            ..Default::default()
        };
        assert_eq!(
            probe_url(&settings),
            "http://localhost:8000/api/v1/proxy/infraon/api/v1/services"
        );
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(timeout_message(PROBE_TIMEOUT), "Connection timeout (10s)");
        assert_eq!(
            timeout_message(Duration::from_millis(250)),
            "Connection timeout (250ms)"
        );
    }

    #[test]
    fn test_status_constructors() {
        let status = ConnectionStatus::disconnected();
        assert_eq!(status.status, ConnectionState::Disconnected);
        assert!(status.last_checked.is_none());

        let status = ConnectionStatus::connected(42);
        assert!(status.is_connected());
        assert_eq!(status.response_time, Some(42));
        assert!(status.error_message.is_none());

        let status = ConnectionStatus::error("HTTP 401: Unauthorized");
        assert_eq!(status.status, ConnectionState::Error);
        assert!(status.response_time.is_none());
        assert!(status.last_checked.is_some());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let value = serde_json::to_value(ConnectionStatus::connected(7)).unwrap();
        assert_eq!(value["status"], "connected");
        assert_eq!(value["responseTime"], 7);
        assert!(value.get("errorMessage").is_none());
    }

    #[test]
    fn test_default_probe_timeout() {
        assert_eq!(HttpProbe::new().timeout(), Duration::from_secs(10));
        assert_eq!(
            HttpProbe::new()
                .with_timeout(Duration::from_millis(5))
                .timeout(),
            Duration::from_millis(5)
        );
    }
}
