use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy::window::PrimaryWindow;
use futures_lite::future;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::constants::{DEFAULT_ZOOM, HTTP_TIMEOUT_SECS};
use crate::geo::{GeoPoint, MapProjection};
use crate::map::scene::{ActivePopup, MarkerSprite, SceneWidget};
use crate::map::{MapInitRequest, MapTeardownRequest, MapUpdateRequest, ProviderMapSync};
use crate::mapsync::CameraPolicy;

fn default_graticule() -> f64 {
    0.01
}

fn default_zoom() -> f32 {
    DEFAULT_ZOOM
}

/// Basemap manifest fetched during map boot.
///
/// Example JSON:
/// ```json
/// {
///   "attribution": "Map data from OpenStreetMap contributors",
///   "center": { "lat": 44.9778, "lng": -93.265 },
///   "defaultZoom": 12.0,
///   "graticuleDegrees": 0.01
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasemapManifest {
    pub attribution: String,
    center: ManifestCenter,
    #[serde(default = "default_zoom")]
    pub default_zoom: f32,
    /// Graticule line spacing in degrees of latitude
    #[serde(default = "default_graticule")]
    pub graticule_degrees: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestCenter {
    lat: f64,
    lng: f64,
}

impl Default for BasemapManifest {
    fn default() -> Self {
        Self {
            attribution: "Map data from OpenStreetMap contributors".to_string(),
            center: ManifestCenter {
                lat: 44.9778,
                lng: -93.265,
            },
            default_zoom: DEFAULT_ZOOM,
            graticule_degrees: 0.01,
        }
    }
}

impl BasemapManifest {
    /// Validated map center. A remote manifest can carry anything.
    pub fn center_point(&self) -> Option<GeoPoint> {
        GeoPoint::checked(self.center.lat, self.center.lng)
    }
}

/// Basemap the scene renders against. `None` until boot completes.
#[derive(Resource, Default)]
pub struct Basemap(pub Option<BasemapData>);

pub struct BasemapData {
    pub manifest: BasemapManifest,
    pub projection: MapProjection,
}

impl Basemap {
    pub fn ready(&self) -> bool {
        self.0.is_some()
    }

    /// Center used for radius filtering, available before boot completes.
    pub fn search_center(&self) -> GeoPoint {
        self.0
            .as_ref()
            .and_then(|data| data.manifest.center_point())
            .or_else(|| BasemapManifest::default().center_point())
            .unwrap_or(GeoPoint { lat: 0.0, lng: 0.0 })
    }
}

/// Map boot lifecycle. Failed carries a user-facing message and is
/// retryable from the overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BootPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Resource, Default)]
pub struct BootState {
    pub phase: BootPhase,
}

/// Background task loading the basemap manifest
#[derive(Component)]
struct BootTask {
    task: Task<BootResult>,
    /// Set on teardown so a stale result is never applied
    abort: Arc<AtomicBool>,
}

struct BootResult {
    manifest: Option<BasemapManifest>,
    error: Option<String>,
}

impl BootResult {
    fn failure(message: String) -> Self {
        Self {
            manifest: None,
            error: Some(message),
        }
    }
}

/// Load the basemap manifest, from the configured URL or built-in defaults.
/// Blocking; run on a task pool.
fn load_manifest(url: Option<String>) -> BootResult {
    let manifest = match url {
        Some(url) => {
            let response = ureq::get(&url)
                .set("User-Agent", concat!("promap/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .call();
            match response {
                Ok(resp) => match resp.into_json::<BasemapManifest>() {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        return BootResult::failure(format!(
                            "Failed to parse basemap manifest: {}",
                            e
                        ));
                    }
                },
                Err(ureq::Error::Status(code, _)) => {
                    return BootResult::failure(format!(
                        "Basemap manifest request returned HTTP {}",
                        code
                    ));
                }
                Err(e) => {
                    return BootResult::failure(format!("Could not load basemap manifest: {}", e));
                }
            }
        }
        None => BasemapManifest::default(),
    };

    if manifest.center_point().is_none() {
        return BootResult::failure("Basemap manifest center is out of range".to_string());
    }

    BootResult {
        manifest: Some(manifest),
        error: None,
    }
}

/// System to start map boot when requested
pub fn begin_boot(
    mut events: MessageReader<MapInitRequest>,
    mut commands: Commands,
    config: Res<AppConfig>,
    mut boot: ResMut<BootState>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let requested = events.read().count() > 0;
    if !requested {
        return;
    }
    match boot.phase {
        BootPhase::Loading => {
            debug!("map boot already in progress; ignoring init request");
            return;
        }
        BootPhase::Ready => {
            debug!("map already booted; ignoring init request");
            return;
        }
        BootPhase::Idle | BootPhase::Failed(_) => {}
    }

    // A zero-area surface cannot host a map; fail retryably instead of
    // letting the projection divide by nothing later.
    if let Ok(window) = windows.single()
        && (window.width() <= 0.0 || window.height() <= 0.0)
    {
        warn!("map init refused: window has zero size");
        boot.phase = BootPhase::Failed("Map surface has zero size".to_string());
        return;
    }

    info!("Booting map view");
    boot.phase = BootPhase::Loading;

    let url = config.data.basemap_url.clone();
    let abort = Arc::new(AtomicBool::new(false));
    let task_abort = abort.clone();
    let task_pool = AsyncComputeTaskPool::get();
    let task = task_pool.spawn(async move {
        let result = load_manifest(url);
        if task_abort.load(Ordering::Relaxed) {
            BootResult::failure("aborted".to_string())
        } else {
            result
        }
    });
    commands.spawn(BootTask { task, abort });
}

/// System to poll the boot task and bring the map up on success
pub fn poll_boot(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut BootTask)>,
    mut boot: ResMut<BootState>,
    mut basemap: ResMut<Basemap>,
    mut sync: ResMut<ProviderMapSync>,
    mut updates: MessageWriter<MapUpdateRequest>,
) {
    for (entity, mut boot_task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut boot_task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        if boot_task.abort.load(Ordering::Relaxed) {
            debug!("discarding boot result after teardown");
            continue;
        }

        match result.manifest {
            Some(manifest) => {
                let Some(center) = manifest.center_point() else {
                    boot.phase =
                        BootPhase::Failed("Basemap manifest center is out of range".to_string());
                    continue;
                };
                info!("Map ready ({})", manifest.attribution);
                let widget = SceneWidget::with_initial_view(center, manifest.default_zoom);
                basemap.0 = Some(BasemapData {
                    projection: MapProjection::new(center),
                    manifest,
                });
                boot.phase = BootPhase::Ready;
                if let Some(summary) = sync.0.attach(widget) {
                    debug!("queued roster replayed on attach: {:?}", summary);
                }
                // Push the current roster through even if nothing was queued.
                updates.write(MapUpdateRequest {
                    policy: CameraPolicy::Preserve,
                });
            }
            None => {
                let message = result
                    .error
                    .unwrap_or_else(|| "Unknown boot failure".to_string());
                warn!("Map boot failed: {}", message);
                boot.phase = BootPhase::Failed(message);
            }
        }
    }
}

/// System to tear the map view down. Safe mid-boot: the in-flight task is
/// flagged so its result is discarded.
pub fn handle_teardown(
    mut events: MessageReader<MapTeardownRequest>,
    mut commands: Commands,
    tasks: Query<(Entity, &BootTask)>,
    mut boot: ResMut<BootState>,
    mut basemap: ResMut<Basemap>,
    mut sync: ResMut<ProviderMapSync>,
    mut popup: ResMut<ActivePopup>,
    markers: Query<Entity, With<MarkerSprite>>,
) {
    let requested = events.read().count() > 0;
    if !requested {
        return;
    }

    for (entity, task) in tasks.iter() {
        task.abort.store(true, Ordering::Relaxed);
        commands.entity(entity).despawn();
    }

    // Dispose runs the full protocol against the widget for bookkeeping,
    // then the scene entities are dropped wholesale.
    if sync.0.dispose().is_some() {
        debug!("sync controller disposed");
    }
    for entity in markers.iter() {
        commands.entity(entity).despawn();
    }
    popup.open = None;
    basemap.0 = None;
    boot.phase = BootPhase::Idle;
    info!("Map view torn down");
}
