//! HTTP client for the Man-O-Man backend and the API under test
//!
//! [`ApiClient`] reads the latest committed settings on every call, so a
//! change made through the settings store applies to the next request
//! without rebuilding the client.
//!
//! # Example
//!
//! ```rust,no_run
//! use manoman::client::{ApiClient, ClientEnvironment};
//! use manoman::config::ApplicationSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ApplicationSettings {
//!         api_root_url: "https://api.example.com".to_string(),
//!         authorization_key: "token".to_string(),
//!         ..Default::default()
//!     };
//!     let client = ApiClient::with_fixed_settings(settings, ClientEnvironment::from_env())?;
//!
//!     for service in client.get_services().await? {
//!         println!("{} ({} endpoints)", service.service_name, service.endpoint_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod headers;
pub mod retry;
pub mod types;
pub mod url;

pub use headers::{authorization_value, build_headers, merge_headers};
pub use retry::RetryPolicy;
pub use types::{ServiceCatalog, ServiceSummary, UploadResponse, UploadStatus};
pub use url::{resolve_base_url, target_url, ClientEnvironment};

use crate::config::ApplicationSettings;
use crate::error::{ClientResult, ManomanError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const SERVICES_PATH: &str = "/api/v1/manoman/services";
const UPLOAD_PATH: &str = "/api/v1/manoman/upload";

/// Method, per-call headers and JSON body of one logical request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Merged over the computed headers; these win on conflict
    pub headers: HeaderMap,
    pub body: Option<JsonValue>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    /// Options with the given method, no extra headers and no body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post(body: JsonValue) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn put(body: JsonValue) -> Self {
        Self::new(Method::PUT).with_body(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a per-call header
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` if the name or value is not a valid
    /// HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> ClientResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ManomanError::Config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ManomanError::Config(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Settings-driven HTTP client
///
/// Provides:
/// - the generic JSON request path with retry and backoff
/// - target-API calls, rewritten through the proxy in proxy mode
/// - multipart upload of API specifications
/// - service catalog and upload status lookups
pub struct ApiClient {
    http: Client,
    settings: watch::Receiver<ApplicationSettings>,
    env: ClientEnvironment,
    retry_base_delay: Duration,
}

impl ApiClient {
    /// Creates a client that follows the settings published on `settings`.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` if the HTTP client cannot be created.
    pub fn new(
        settings: watch::Receiver<ApplicationSettings>,
        env: ClientEnvironment,
    ) -> ClientResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ManomanError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            settings,
            env,
            retry_base_delay: retry::DEFAULT_BASE_DELAY,
        })
    }

    /// Creates a client bound to a fixed settings snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` if the HTTP client cannot be created.
    pub fn with_fixed_settings(
        settings: ApplicationSettings,
        env: ClientEnvironment,
    ) -> ClientResult<Self> {
        let (_tx, rx) = watch::channel(settings);
        Self::new(rx, env)
    }

    /// Override the first backoff wait (doubling still applies).
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Snapshot of the settings the next request will use.
    pub fn settings(&self) -> ApplicationSettings {
        self.settings.borrow().clone()
    }

    /// Effective base URL under the current settings.
    pub fn base_url(&self) -> String {
        resolve_base_url(&self.settings.borrow(), &self.env)
    }

    /// Perform a JSON request against the resolved base URL with retry
    ///
    /// Non-2xx statuses count as failures and are retried like transport
    /// errors. On exhaustion the last attempt's error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Network`, `ManomanError::Http`,
    /// `ManomanError::Timeout` or `ManomanError::Parse` from the last
    /// attempt.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let settings = self.settings();
        let url = format!("{}{}", resolve_base_url(&settings, &self.env), path);
        let headers = merge_headers(build_headers(&settings)?, &options.headers);
        let policy = RetryPolicy::from_settings(&settings).with_base_delay(self.retry_base_delay);

        log_request(&settings, &options.method, &url, &headers);

        let (settings_ref, options_ref, url_ref, headers_ref) =
            (&settings, &options, url.as_str(), &headers);
        let attempts = policy.attempts;

        let result = policy
            .run(move |attempt| async move {
                let result = self
                    .send_once(
                        settings_ref,
                        &options_ref.method,
                        url_ref,
                        headers_ref,
                        options_ref.body.as_ref(),
                        attempt,
                    )
                    .await;
                if let Err(err) = &result {
                    if settings_ref.enable_request_logging {
                        warn!(
                            attempt = attempt + 1,
                            attempts,
                            url = %url_ref,
                            error = %err,
                            "API attempt failed"
                        );
                    }
                }
                result
            })
            .await;

        if let Err(err) = &result {
            error!(
                path = %path,
                attempts,
                error = %err,
                "API request failed"
            );
        }
        result
    }

    /// GET a JSON document through the retrying path.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(path, RequestOptions::get()).await
    }

    /// Call the API under test
    ///
    /// In proxy mode the path is rewritten onto the proxy's forwarding
    /// route; in direct mode it is appended to `apiRootUrl`. Single attempt.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Network`, `ManomanError::Http`,
    /// `ManomanError::Timeout` or `ManomanError::Parse`.
    pub async fn target_request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let settings = self.settings();
        let url = target_url(&settings, path);
        let headers = merge_headers(build_headers(&settings)?, &options.headers);

        log_request(&settings, &options.method, &url, &headers);

        self.send_once(
            &settings,
            &options.method,
            &url,
            &headers,
            options.body.as_ref(),
            0,
        )
        .await
        .map_err(|err| {
            error!(path = %path, error = %err, "Target API request failed");
            err
        })
    }

    /// GET the configured test endpoint on the API under test and return
    /// its body.
    pub async fn test_target_connectivity(&self) -> ClientResult<JsonValue> {
        let test_endpoint = self.settings.borrow().test_endpoint.clone();
        self.target_request(&test_endpoint, RequestOptions::get())
            .await
    }

    /// List classified services.
    pub async fn get_services(&self) -> ClientResult<Vec<ServiceSummary>> {
        let catalog: ServiceCatalog = self.get_json(SERVICES_PATH).await?;
        Ok(catalog.services)
    }

    /// Look up one service; any failure is reported as absent.
    pub async fn get_service(&self, service_name: &str) -> Option<ServiceSummary> {
        match self
            .get_json(&format!("{}/{}", SERVICES_PATH, service_name))
            .await
        {
            Ok(service) => Some(service),
            Err(err) => {
                error!(service = %service_name, error = %err, "Failed to fetch service");
                None
            }
        }
    }

    /// Poll the processing status of an upload.
    pub async fn get_upload_status(&self, upload_id: &str) -> ClientResult<UploadStatus> {
        self.get_json(&format!("{}/{}/status", UPLOAD_PATH, upload_id))
            .await
    }

    /// Upload an API specification file
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Io` if the file cannot be read, otherwise the
    /// errors of [`ApiClient::upload_bytes`].
    pub async fn upload_api_spec(&self, file: &Path) -> ClientResult<UploadResponse> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "spec.json".to_string());
        self.upload_bytes(&file_name, bytes).await
    }

    /// Upload raw bytes as the multipart `file` field
    ///
    /// Single attempt; the caller's `Content-Type` is dropped so the
    /// multipart boundary is set by the encoder.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Upload` on a non-2xx status, or a transport
    /// error.
    pub async fn upload_bytes(&self, file_name: &str, bytes: Vec<u8>) -> ClientResult<UploadResponse> {
        let settings = self.settings();
        let url = format!("{}{}", resolve_base_url(&settings, &self.env), UPLOAD_PATH);
        let mut headers = build_headers(&settings)?;
        headers.remove(CONTENT_TYPE);
        let timeout = Duration::from_millis(settings.default_timeout);

        log_request(&settings, &Method::POST, &url, &headers);

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self
            .http
            .post(&url)
            .headers(headers)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), file = %file_name, "Upload rejected");
            return Err(ManomanError::Upload {
                status: status.as_u16(),
                status_text: reason_phrase(status),
            });
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| body_error(e, timeout))?;
        info!(upload_id = %result.upload_id, file = %file_name, "Uploaded API specification");
        Ok(result)
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        settings: &ApplicationSettings,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&JsonValue>,
        attempt: u32,
    ) -> ClientResult<T> {
        let timeout = Duration::from_millis(settings.default_timeout);
        let mut request = self
            .http
            .request(method.clone(), url)
            .headers(headers.clone())
            .timeout(timeout);
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if settings.enable_request_logging {
            info!(
                status = status.as_u16(),
                url = %url,
                attempt = attempt + 1,
                headers = ?header_names(response.headers()),
                "API response"
            );
        }

        if !status.is_success() {
            return Err(http_error(status));
        }

        response.json::<T>().await.map_err(|e| body_error(e, timeout))
    }
}

/// Error for a response whose status is not 2xx.
pub(crate) fn http_error(status: StatusCode) -> ManomanError {
    ManomanError::Http {
        status: status.as_u16(),
        status_text: reason_phrase(status),
    }
}

pub(crate) fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Map a send failure to `Timeout` or `Network`, keeping the cause chain.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ManomanError {
    if err.is_timeout() {
        ManomanError::Timeout(timeout.as_millis() as u64)
    } else {
        ManomanError::Network(error_chain(&err))
    }
}

fn body_error(err: reqwest::Error, timeout: Duration) -> ManomanError {
    if err.is_timeout() {
        ManomanError::Timeout(timeout.as_millis() as u64)
    } else if err.is_decode() {
        ManomanError::Parse(format!("Invalid JSON response: {}", error_chain(&err)))
    } else {
        ManomanError::Network(error_chain(&err))
    }
}

/// `err: cause: cause` as a single line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn header_names(headers: &HeaderMap) -> Vec<&str> {
    headers.keys().map(HeaderName::as_str).collect()
}

fn log_request(settings: &ApplicationSettings, method: &Method, url: &str, headers: &HeaderMap) {
    if settings.enable_request_logging {
        info!(
            method = %method,
            url = %url,
            headers = ?header_names(headers),
            "API request"
        );
    }
}
