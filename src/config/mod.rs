use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_RADIUS_KM, MAX_RADIUS_KM, MIN_RADIUS_KM};

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

fn default_true() -> bool {
    true
}

fn default_radius() -> f32 {
    DEFAULT_RADIUS_KM
}

/// Application configuration persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigData {
    /// Base URL of the provider data service. None means the bundled
    /// sample roster is used instead of the network.
    #[serde(default)]
    pub data_url: Option<String>,

    /// URL of the basemap manifest. None means built-in defaults.
    #[serde(default)]
    pub basemap_url: Option<String>,

    /// Whether the map view opens on launch
    #[serde(default = "default_true")]
    pub show_map_on_start: bool,

    /// Remembered "available now" filter state
    #[serde(default)]
    pub available_only: bool,

    /// Remembered search radius in kilometers
    #[serde(default = "default_radius")]
    pub radius_km: f32,
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            data_url: None,
            basemap_url: None,
            show_map_on_start: true,
            available_only: false,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl AppConfigData {
    /// Clamp loaded values into their valid ranges. Hand-edited config
    /// files can carry anything.
    fn sanitize(&mut self) {
        if !self.radius_km.is_finite() {
            self.radius_km = DEFAULT_RADIUS_KM;
        }
        self.radius_km = self.radius_km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM);
    }
}

/// Runtime configuration resource
#[derive(Resource)]
pub struct AppConfig {
    /// The persisted configuration data
    pub data: AppConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Whether config needs to be saved (dirty flag)
    pub dirty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: AppConfigData::default(),
            config_path: get_config_path(),
            dirty: false,
        }
    }
}

/// Resource to notify user when config was reset to defaults
#[derive(Resource, Default)]
pub struct ConfigResetNotification {
    /// Whether to show the notification dialog
    pub show: bool,
    /// The reason for the reset (parse error, read error, etc.)
    pub reason: Option<String>,
}

/// Message to trigger config save
#[derive(Message)]
pub struct SaveConfigRequest;

/// Message to remember whether the map view is shown
#[derive(Message)]
pub struct RememberMapShownRequest {
    pub shown: bool,
}

/// Message to remember the sidebar filter state
#[derive(Message)]
pub struct RememberFilterRequest {
    pub available_only: bool,
    pub radius_km: f32,
}

/// Get the path to the config file (platform-appropriate location)
fn get_config_path() -> PathBuf {
    crate::paths::config_file()
}

/// Result of loading config from disk
struct LoadConfigResult {
    config: AppConfig,
    /// Error message if config was reset to defaults due to an error
    reset_reason: Option<String>,
}

/// Load configuration from disk
fn load_config() -> LoadConfigResult {
    let config_path = get_config_path();

    let (data, reset_reason) = if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(json) => match serde_json::from_str::<AppConfigData>(&json) {
                Ok(mut data) => {
                    data.sanitize();
                    info!("Loaded config from {:?}", config_path);
                    (data, None)
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}", e);
                    (
                        AppConfigData::default(),
                        Some(format!("Configuration file was corrupted: {}", e)),
                    )
                }
            },
            Err(e) => {
                warn!("Failed to read config file: {}", e);
                (
                    AppConfigData::default(),
                    Some(format!("Could not read configuration file: {}", e)),
                )
            }
        }
    } else {
        info!("No config file found, using defaults");
        (AppConfigData::default(), None)
    };

    LoadConfigResult {
        config: AppConfig {
            data,
            config_path,
            dirty: false,
        },
        reset_reason,
    }
}

/// Save configuration to disk
fn save_config(config: &AppConfig) {
    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}

/// Startup system to load config from disk into the existing resource
fn load_config_system(
    mut config: ResMut<AppConfig>,
    mut reset_notification: ResMut<ConfigResetNotification>,
) {
    let result = load_config();
    config.data = result.config.data;
    config.config_path = result.config.config_path;
    config.dirty = result.config.dirty;

    // Set notification if config was reset due to an error
    if let Some(reason) = result.reset_reason {
        reset_notification.show = true;
        reset_notification.reason = Some(reason);
    }
}

/// System to save config when requested
fn save_config_system(
    mut events: MessageReader<SaveConfigRequest>,
    mut config: ResMut<AppConfig>,
) {
    for _ in events.read() {
        if config.dirty {
            save_config(&config);
            config.dirty = false;
        }
    }
}

/// System to remember the map view visibility
fn remember_map_shown_system(
    mut events: MessageReader<RememberMapShownRequest>,
    mut config: ResMut<AppConfig>,
    mut save_events: MessageWriter<SaveConfigRequest>,
) {
    for event in events.read() {
        if config.data.show_map_on_start != event.shown {
            config.data.show_map_on_start = event.shown;
            config.dirty = true;
            save_events.write(SaveConfigRequest);
        }
    }
}

/// System to remember the sidebar filter state
fn remember_filter_system(
    mut events: MessageReader<RememberFilterRequest>,
    mut config: ResMut<AppConfig>,
    mut save_events: MessageWriter<SaveConfigRequest>,
) {
    for event in events.read() {
        config.data.available_only = event.available_only;
        config.data.radius_km = event.radius_km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM);
        config.dirty = true;
        save_events.write(SaveConfigRequest);
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AppConfig>()
            .init_resource::<ConfigResetNotification>()
            .add_message::<SaveConfigRequest>()
            .add_message::<RememberMapShownRequest>()
            .add_message::<RememberFilterRequest>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded))
            .add_systems(
                Update,
                (
                    save_config_system.run_if(on_message::<SaveConfigRequest>),
                    remember_map_shown_system.run_if(on_message::<RememberMapShownRequest>),
                    remember_filter_system.run_if(on_message::<RememberFilterRequest>),
                ),
            );
    }
}
