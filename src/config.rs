//! Configuration management for Man-O-Man
//!
//! This module holds the connection and behaviour settings shared by the
//! HTTP client, the connectivity prober and the settings store, together
//! with the partial-update type used to change them.
//!
//! Persisted and imported settings are always merged over the defaults, so
//! a blob written by an older or newer version still yields a complete
//! [`ApplicationSettings`].

use crate::error::ManomanError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Placeholder backend origin; also the local-development fallback.
pub const DEFAULT_API_ROOT_URL: &str = "http://localhost:8000";

/// Upper bound accepted for `maxRetries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Strategy used to build the authorization header
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AuthorizationType {
    /// `Authorization: Bearer <key>`
    #[default]
    #[serde(rename = "bearer")]
    Bearer,
    /// `Authorization: infraonDNS <key>`
    #[serde(rename = "infraonDNS")]
    InfraonDns,
    /// `Authorization: <customAuthPrefix> <key>`
    #[serde(rename = "custom")]
    Custom,
}

impl AuthorizationType {
    /// Wire name, as sent in `X-Infraon-Auth-Type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::InfraonDns => "infraonDNS",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for AuthorizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default body format for the request tester
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    #[default]
    Json,
    Form,
    Raw,
}

/// Workspace layout preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceMode {
    #[default]
    Single,
    Tabs,
}

/// Process-wide connection and behaviour settings
///
/// Field names serialize in camelCase to match the persisted blob. Every
/// field falls back to its default when absent, which makes deserialization
/// the merge-over-defaults operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSettings {
    /// Direct-mode backend origin
    pub api_root_url: String,
    /// Credential material; empty means no auth header
    pub authorization_key: String,
    /// Header construction strategy
    pub authorization_type: AuthorizationType,
    /// Prefix for [`AuthorizationType::Custom`]; empty means `Bearer`
    pub custom_auth_prefix: String,
    /// Path probed by the connectivity check
    pub test_endpoint: String,
    /// Optional CSRF token; empty means no CSRF header
    pub csrf_token: String,

    /// Route target-API calls through the same-origin proxy
    pub use_proxy: bool,
    /// Origin of the forwarding proxy
    pub proxy_url: String,

    /// Per-request timeout in milliseconds
    pub default_timeout: u64,
    /// Retry failed requests on the generic JSON path
    pub auto_retry_enabled: bool,
    /// Retries after the first attempt, only when `auto_retry_enabled`
    pub max_retries: u32,

    pub default_request_format: RequestFormat,
    pub show_response_headers: bool,
    pub enable_syntax_highlighting: bool,

    pub ai_assistance_enabled: bool,
    pub auto_generate_test_data: bool,
    pub ai_suggestions_enabled: bool,

    /// Log every request and response through `tracing`
    pub enable_request_logging: bool,
    pub preserve_history: bool,
    pub workspace_mode: WorkspaceMode,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            api_root_url: DEFAULT_API_ROOT_URL.to_string(),
            authorization_key: String::new(),
            authorization_type: AuthorizationType::Bearer,
            custom_auth_prefix: String::new(),
            test_endpoint: "/api/v1/services".to_string(),
            csrf_token: String::new(),
            use_proxy: false,
            proxy_url: DEFAULT_API_ROOT_URL.to_string(),
            default_timeout: 30_000,
            auto_retry_enabled: true,
            max_retries: 3,
            default_request_format: RequestFormat::Json,
            show_response_headers: true,
            enable_syntax_highlighting: true,
            ai_assistance_enabled: true,
            auto_generate_test_data: true,
            ai_suggestions_enabled: true,
            enable_request_logging: false,
            preserve_history: true,
            workspace_mode: WorkspaceMode::Single,
        }
    }
}

impl ApplicationSettings {
    /// Merge a JSON object over the defaults
    ///
    /// Absent and `null` fields take their default value; unknown fields are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Parse` if the value is not an object or a
    /// present field has the wrong type.
    pub fn merge_over_defaults(value: JsonValue) -> Result<Self, ManomanError> {
        let JsonValue::Object(mut fields) = value else {
            return Err(ManomanError::Parse(
                "settings must be a JSON object".to_string(),
            ));
        };
        fields.retain(|_, v| !v.is_null());
        serde_json::from_value(JsonValue::Object(fields))
            .map_err(|e| ManomanError::Parse(format!("invalid settings: {}", e)))
    }

    /// Parse a pasted settings export
    ///
    /// `apiRootUrl` is required and must be a non-empty string; everything
    /// else merges over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Parse` for malformed JSON or a missing
    /// `apiRootUrl`.
    pub fn from_import_json(text: &str) -> Result<Self, ManomanError> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| ManomanError::Parse(format!("malformed settings JSON: {}", e)))?;

        let has_root = value
            .get("apiRootUrl")
            .and_then(JsonValue::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_root {
            return Err(ManomanError::Parse(
                "Missing required field: apiRootUrl".to_string(),
            ));
        }

        Self::merge_over_defaults(value)
    }

    /// Whether `api_root_url` is something other than the placeholder.
    pub fn has_custom_api_root(&self) -> bool {
        !self.api_root_url.is_empty() && self.api_root_url != DEFAULT_API_ROOT_URL
    }

    /// Number of attempts the retry loop makes.
    pub fn attempt_count(&self) -> u32 {
        if self.auto_retry_enabled {
            self.max_retries.min(MAX_RETRIES_LIMIT) + 1
        } else {
            1
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &patch.$field {
                    self.$field = v.clone();
                })*
            };
        }
        take!(
            api_root_url,
            authorization_key,
            authorization_type,
            custom_auth_prefix,
            test_endpoint,
            csrf_token,
            use_proxy,
            proxy_url,
            default_timeout,
            auto_retry_enabled,
            max_retries,
            default_request_format,
            show_response_headers,
            enable_syntax_highlighting,
            ai_assistance_enabled,
            auto_generate_test_data,
            ai_suggestions_enabled,
            enable_request_logging,
            preserve_history,
            workspace_mode,
        );
    }

    /// Validate the settings
    ///
    /// Ensures all values are within acceptable ranges and that the URLs
    /// the client will build on are absolute.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` describing the first failing check.
    pub fn validate(&self) -> Result<(), ManomanError> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ManomanError::Config(format!(
                "maxRetries must be between 0 and {}",
                MAX_RETRIES_LIMIT
            )));
        }

        if self.default_timeout == 0 {
            return Err(ManomanError::Config(
                "defaultTimeout must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.api_root_url).map_err(|e| {
            ManomanError::Config(format!("Invalid apiRootUrl '{}': {}", self.api_root_url, e))
        })?;

        if self.use_proxy {
            url::Url::parse(&self.proxy_url).map_err(|e| {
                ManomanError::Config(format!("Invalid proxyUrl '{}': {}", self.proxy_url, e))
            })?;
        }

        if self.test_endpoint.is_empty() {
            return Err(ManomanError::Config(
                "testEndpoint cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Partial update for [`ApplicationSettings`]
///
/// Every `Some` field overwrites the current value. Unknown keys are
/// rejected so a typo in `settings set` does not silently no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_root_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_type: Option<AuthorizationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_auth_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_retry_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_request_format: Option<RequestFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_response_headers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_syntax_highlighting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_assistance_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_generate_test_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_request_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_mode: Option<WorkspaceMode>,
}

impl SettingsPatch {
    /// Whether the patch changes anything the connectivity probe depends on.
    pub fn touches_connection(&self) -> bool {
        self.api_root_url.is_some()
            || self.authorization_key.is_some()
            || self.authorization_type.is_some()
            || self.test_endpoint.is_some()
            || self.use_proxy.is_some()
            || self.proxy_url.is_some()
    }

    /// Build a single-field patch from a camelCase key and a raw value
    ///
    /// The value is read as JSON when it parses (`true`, `5`, `"x"`) and as
    /// a plain string otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` for an unknown key or a value of the
    /// wrong type.
    pub fn from_key_value(key: &str, raw: &str) -> Result<Self, ManomanError> {
        let as_string = JsonValue::String(raw.to_string());
        let parsed = serde_json::from_str::<JsonValue>(raw).unwrap_or_else(|_| as_string.clone());

        Self::single_field(key, parsed.clone())
            .or_else(|e| if parsed == as_string { Err(e) } else { Self::single_field(key, as_string) })
            .map_err(|e| ManomanError::Config(format!("Cannot set '{}': {}", key, e)))
    }

    fn single_field(key: &str, value: JsonValue) -> Result<Self, serde_json::Error> {
        let mut object = serde_json::Map::new();
        object.insert(key.to_string(), value);
        serde_json::from_value(JsonValue::Object(object))
    }
}
