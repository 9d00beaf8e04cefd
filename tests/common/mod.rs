use manoman::client::{ApiClient, ClientEnvironment};
use manoman::config::ApplicationSettings;
use manoman::storage::SledStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Settings pointing directly at a mock server.
#[allow(dead_code)]
pub fn direct_settings(uri: &str) -> ApplicationSettings {
    ApplicationSettings {
        api_root_url: uri.to_string(),
        ..Default::default()
    }
}

/// Settings routing through a mock proxy at `proxy_uri`.
#[allow(dead_code)]
pub fn proxy_settings(api_root_url: &str, proxy_uri: &str) -> ApplicationSettings {
    ApplicationSettings {
        api_root_url: api_root_url.to_string(),
        use_proxy: true,
        proxy_url: proxy_uri.to_string(),
        ..Default::default()
    }
}

/// Client bound to `settings` with millisecond backoff.
#[allow(dead_code)]
pub fn fast_client(settings: ApplicationSettings) -> ApiClient {
    ApiClient::with_fixed_settings(settings, ClientEnvironment::default())
        .expect("failed to build client")
        .with_retry_base_delay(Duration::from_millis(1))
}

#[allow(dead_code)]
pub fn create_temp_store() -> (Arc<SledStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledStore::new(tmp.path().join("store")).expect("failed to open sled store");
    (Arc::new(store), tmp)
}

/// URL of a local port with nothing listening.
#[allow(dead_code)]
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
