//! Base URL resolution
//!
//! The effective backend origin is a pure function of the current settings
//! and the [`ClientEnvironment`]. Priority, highest first:
//!
//! 1. proxy mode: `proxyUrl`
//! 2. an explicit `apiRootUrl` that is not the placeholder
//! 3. the `MANOMAN_API_BASE_URL` override
//! 4. the known deployment host, on a fixed port
//! 5. the local-development default

use crate::config::{ApplicationSettings, DEFAULT_API_ROOT_URL};

/// Hostname of the hosted deployment that serves the API on the same host.
pub const KNOWN_DEPLOYMENT_HOST: &str = "ssh.skenzer.com";

/// Port the API listens on in the hosted deployment.
pub const DEPLOYMENT_API_PORT: u16 = 8000;

/// Route on the proxy backend that forwards to the target API.
pub const PROXY_ROUTE: &str = "/api/v1/proxy/infraon";

/// Environment inputs to base-URL resolution
///
/// Stands in for the build-time variable and the host the dashboard was
/// served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnvironment {
    /// Build-time override of the computed base URL
    pub api_base_override: Option<String>,
    /// Host the caller is running under (`host[:port]`)
    pub page_host: Option<String>,
    /// Scheme of the page, without `:` or `//`
    pub page_protocol: String,
}

impl Default for ClientEnvironment {
    fn default() -> Self {
        Self {
            api_base_override: None,
            page_host: None,
            page_protocol: "http".to_string(),
        }
    }
}

impl ClientEnvironment {
    /// Read the environment from process variables
    ///
    /// # Environment Variables
    ///
    /// * `MANOMAN_API_BASE_URL` - base URL override
    /// * `MANOMAN_PAGE_HOST` - host the caller is served from
    /// * `MANOMAN_PAGE_PROTOCOL` - scheme of that host (default: http)
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            api_base_override: non_empty("MANOMAN_API_BASE_URL"),
            page_host: non_empty("MANOMAN_PAGE_HOST"),
            page_protocol: non_empty("MANOMAN_PAGE_PROTOCOL")
                .map(|p| p.trim_end_matches(':').to_string())
                .unwrap_or_else(|| "http".to_string()),
        }
    }

    /// Steps 3 to 5 of the resolution chain, ignoring settings.
    pub fn fallback_base_url(&self) -> String {
        if let Some(base) = self.api_base_override.as_deref().filter(|b| !b.is_empty()) {
            return base.to_string();
        }

        if self
            .page_host
            .as_deref()
            .is_some_and(|host| host.contains(KNOWN_DEPLOYMENT_HOST))
        {
            return format!(
                "{}://{}:{}",
                self.page_protocol, KNOWN_DEPLOYMENT_HOST, DEPLOYMENT_API_PORT
            );
        }

        DEFAULT_API_ROOT_URL.to_string()
    }
}

/// Compute the effective base URL for the generic request path.
pub fn resolve_base_url(settings: &ApplicationSettings, env: &ClientEnvironment) -> String {
    if settings.use_proxy {
        return strip_trailing_slash(&settings.proxy_url).to_string();
    }

    if settings.has_custom_api_root() {
        return strip_trailing_slash(&settings.api_root_url).to_string();
    }

    env.fallback_base_url()
}

/// URL of a target-API path routed through the proxy.
pub fn proxy_target_url(proxy_url: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}{}/{}", strip_trailing_slash(proxy_url), PROXY_ROUTE, path)
}

/// URL of a target-API path called directly.
pub fn direct_target_url(api_root_url: &str, path: &str) -> String {
    let base = strip_trailing_slash(api_root_url);
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// URL of a target-API path under the current proxy/direct mode.
pub fn target_url(settings: &ApplicationSettings, path: &str) -> String {
    if settings.use_proxy {
        proxy_target_url(&settings.proxy_url, path)
    } else {
        direct_target_url(&settings.api_root_url, path)
    }
}

/// Remove one trailing `/`, if present.
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}
