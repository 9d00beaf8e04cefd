//! Request header construction
//!
//! Direct mode sends native `Authorization` / `X-CSRFToken` headers. Proxy
//! mode instead describes the target to the proxy through `X-Infraon-*`
//! forwarding headers and lets the proxy authenticate.

use crate::config::{ApplicationSettings, AuthorizationType};
use crate::error::{ClientResult, ManomanError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

const APPLICATION_JSON: &str = "application/json";

pub const X_INFRAON_BASE_URL: HeaderName = HeaderName::from_static("x-infraon-base-url");
pub const X_INFRAON_AUTH_TYPE: HeaderName = HeaderName::from_static("x-infraon-auth-type");
pub const X_INFRAON_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-infraon-auth-token");
pub const X_INFRAON_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-infraon-csrf-token");
pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrftoken");

/// `Authorization` value for direct mode, or `None` without a key.
pub fn authorization_value(settings: &ApplicationSettings) -> Option<String> {
    if settings.authorization_key.is_empty() {
        return None;
    }

    let prefix = match settings.authorization_type {
        AuthorizationType::Bearer => "Bearer",
        AuthorizationType::InfraonDns => "infraonDNS",
        AuthorizationType::Custom if settings.custom_auth_prefix.is_empty() => "Bearer",
        AuthorizationType::Custom => settings.custom_auth_prefix.as_str(),
    };
    Some(format!("{} {}", prefix, settings.authorization_key))
}

/// Build the headers every request carries under the current settings
///
/// # Errors
///
/// Returns `ManomanError::Config` if a configured value cannot be sent as
/// a header (for example a key containing a newline).
pub fn build_headers(settings: &ApplicationSettings) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

    if settings.use_proxy {
        headers.insert(X_INFRAON_BASE_URL, header_value(&settings.api_root_url)?);
        headers.insert(
            X_INFRAON_AUTH_TYPE,
            HeaderValue::from_static(settings.authorization_type.as_str()),
        );
        if !settings.authorization_key.is_empty() {
            headers.insert(X_INFRAON_AUTH_TOKEN, header_value(&settings.authorization_key)?);
        }
        if !settings.csrf_token.is_empty() {
            headers.insert(X_INFRAON_CSRF_TOKEN, header_value(&settings.csrf_token)?);
        }
    } else {
        if let Some(auth) = authorization_value(settings) {
            headers.insert(AUTHORIZATION, header_value(&auth)?);
        }
        if !settings.csrf_token.is_empty() {
            headers.insert(X_CSRF_TOKEN, header_value(&settings.csrf_token)?);
        }
    }

    Ok(headers)
}

/// Overlay per-call headers on computed ones; per-call values win.
pub fn merge_headers(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
    base
}

fn header_value(value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ManomanError::Config(format!("Invalid header value: {}", e)))
}
