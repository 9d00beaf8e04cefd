//! Settings store
//!
//! Single source of truth for [`ApplicationSettings`] and the live
//! [`ConnectionStatus`]. Settings are mirrored to the `man-o-man-settings`
//! slot after every change; the status is never persisted, so a stale
//! `connected` cannot survive a reload.
//!
//! Changes are published on `tokio::sync::watch` channels. The HTTP client
//! subscribes to settings and UI callers subscribe to either.
//!
//! Probing is an explicit side effect: [`SettingsStore::update_settings`]
//! returns an [`UpdateEffect`] that the caller performs, and
//! [`SettingsStore::apply_update`] does both steps in order.

use crate::config::{ApplicationSettings, SettingsPatch};
use crate::error::{ManomanError, Result};
use crate::probe::{ConnectionProbe, ConnectionStatus};
use crate::storage::{KeyValueStore, SETTINGS_KEY};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Side effect requested by a settings change
#[must_use = "a connection-relevant change asks for a probe"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEffect {
    /// Nothing further to do
    None,
    /// A connection-relevant field changed; re-probe
    ProbeConnection,
}

/// Outcome of reading the persisted settings slot
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsLoad {
    /// A stored blob was merged over the defaults
    Loaded {
        /// Whether an initial probe is warranted
        effect: UpdateEffect,
    },
    /// Nothing stored yet; defaults in effect
    Missing,
    /// The stored blob was unreadable; defaults in effect
    Defaulted(String),
}

/// Owner of the application settings and the connection status
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
    prober: Arc<dyn ConnectionProbe>,
    settings: watch::Sender<ApplicationSettings>,
    status: watch::Sender<ConnectionStatus>,
    probe_generation: AtomicU64,
}

impl SettingsStore {
    /// Create a store holding the defaults; call [`SettingsStore::load`] to
    /// read persisted settings.
    pub fn new(storage: Arc<dyn KeyValueStore>, prober: Arc<dyn ConnectionProbe>) -> Self {
        let (settings, _) = watch::channel(ApplicationSettings::default());
        let (status, _) = watch::channel(ConnectionStatus::disconnected());
        Self {
            storage,
            prober,
            settings,
            status,
            probe_generation: AtomicU64::new(0),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> ApplicationSettings {
        self.settings.borrow().clone()
    }

    /// Current connection status.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every committed settings change.
    pub fn subscribe_settings(&self) -> watch::Receiver<ApplicationSettings> {
        self.settings.subscribe()
    }

    /// Receiver that observes every status replacement.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Read the persisted settings slot
    ///
    /// A stored blob is merged over the defaults. Corrupt or out-of-range
    /// data leaves the defaults in place and is reported as [`SettingsLoad::Defaulted`]
    /// rather than as an error.
    pub fn load(&self) -> SettingsLoad {
        let stored = match self.storage.get(SETTINGS_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return SettingsLoad::Missing,
            Err(err) => return self.fall_back(format!("Failed to read settings: {}", err)),
        };

        let parsed = serde_json::from_str(&stored)
            .map_err(|e| ManomanError::Parse(e.to_string()))
            .and_then(ApplicationSettings::merge_over_defaults)
            .and_then(|settings| settings.validate().map(|_| settings));

        match parsed {
            Ok(settings) => {
                let effect = if settings.has_custom_api_root() {
                    UpdateEffect::ProbeConnection
                } else {
                    UpdateEffect::None
                };
                self.settings.send_replace(settings);
                debug!("Loaded persisted settings");
                SettingsLoad::Loaded { effect }
            }
            Err(err) => self.fall_back(format!("Failed to load settings: {}", err)),
        }
    }

    /// Load persisted settings and run the initial probe if one is due.
    pub async fn initialize(&self) -> SettingsLoad {
        let outcome = self.load();
        if let SettingsLoad::Loaded {
            effect: UpdateEffect::ProbeConnection,
        } = outcome
        {
            self.test_connection().await;
        }
        outcome
    }

    /// Shallow-merge `patch` into the settings and persist
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Config` if the merged settings fail
    /// validation; nothing is changed in that case.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<UpdateEffect> {
        let mut updated = self.settings();
        updated.apply(patch);
        updated.validate()?;

        self.settings.send_replace(updated);
        self.save_settings();

        Ok(if patch.touches_connection() {
            UpdateEffect::ProbeConnection
        } else {
            UpdateEffect::None
        })
    }

    /// Update the settings and, if the change requires it, probe.
    pub async fn apply_update(&self, patch: &SettingsPatch) -> Result<UpdateEffect> {
        let effect = self.update_settings(patch)?;
        self.perform(effect).await;
        Ok(effect)
    }

    /// Carry out an effect returned by an earlier call.
    pub async fn perform(&self, effect: UpdateEffect) {
        if effect == UpdateEffect::ProbeConnection {
            self.test_connection().await;
        }
    }

    /// Replace settings and status with the defaults and persist.
    pub fn reset_to_defaults(&self) {
        self.settings.send_replace(ApplicationSettings::default());
        self.status.send_modify(|status| {
            self.probe_generation.fetch_add(1, Ordering::SeqCst);
            *status = ConnectionStatus::disconnected();
        });
        self.save_settings();
        info!("Settings reset to defaults");
    }

    /// Serialize the settings (not the status) as pretty JSON.
    pub fn export_settings(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.settings.borrow())?)
    }

    /// Replace the settings with a pasted export
    ///
    /// Returns `false` without changing anything if the JSON is malformed,
    /// lacks `apiRootUrl`, or fails validation. On success the settings are
    /// persisted and a probe runs before returning `true`.
    pub async fn import_settings(&self, settings_json: &str) -> bool {
        let imported = match ApplicationSettings::from_import_json(settings_json)
            .and_then(|s| s.validate().map(|_| s))
        {
            Ok(imported) => imported,
            Err(err) => {
                warn!(error = %err, "Failed to import settings");
                return false;
            }
        };

        self.settings.send_replace(imported);
        self.save_settings();
        self.test_connection().await;
        true
    }

    /// Probe the backend and publish the result
    ///
    /// Publishes `connecting` first, then the outcome. When probes overlap,
    /// only the most recently started one may publish its outcome. The
    /// generation is bumped and compared under the status channel's lock.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let mut generation = 0;
        self.status.send_modify(|status| {
            generation = self.probe_generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = ConnectionStatus::connecting();
        });

        let settings = self.settings();
        let outcome = self.prober.probe(&settings).await;

        let published = self.status.send_if_modified(|status| {
            if self.probe_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *status = outcome.clone();
            true
        });
        if !published {
            debug!(generation, "Discarding result of superseded probe");
        }
        outcome
    }

    /// Persist the current settings; failures are logged, not raised.
    pub fn save_settings(&self) {
        let serialized = match serde_json::to_string(&*self.settings.borrow()) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(error = %err, "Failed to serialize settings");
                return;
            }
        };

        if let Err(err) = self.storage.set(SETTINGS_KEY, &serialized) {
            warn!(error = %err, "Failed to save settings");
        }
    }

    fn fall_back(&self, reason: String) -> SettingsLoad {
        warn!("{}; using defaults", reason);
        self.settings.send_replace(ApplicationSettings::default());
        SettingsLoad::Defaulted(reason)
    }
}
