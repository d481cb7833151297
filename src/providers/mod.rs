//! Provider roster: fetching, decoding, and filtering.
//!
//! The roster is fetched on a background task from the configured data
//! service (or the bundled sample when none is set), decoded tolerantly,
//! and filtered client-side into the visible subset the sidebar and map
//! share. A fetch failure keeps the previous roster on screen.
//!
//! ## Key Types
//!
//! - [`ProviderRecord`] / [`ProviderId`]: one provider and its identity
//! - [`ProviderDirectory`]: resource holding the full and visible rosters
//! - [`ProviderFilter`] / [`SearchState`]: sidebar filter state
//!
//! ## Messages
//!
//! - [`RefreshProvidersRequest`]: re-fetch the roster
//! - [`ApplyFilterRequest`]: recompute the visible subset

mod fetch;
mod filter;
mod record;

pub use fetch::{FetchResult, RosterSource};
pub use filter::{apply_filter, service_categories, ProviderFilter};
pub use record::{parse_roster, ParsedRoster, ProviderId, ProviderRecord};

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;

use crate::config::{AppConfig, ConfigLoaded};
use crate::geo::GeoPoint;
use crate::map::{Basemap, MapUpdateRequest};
use crate::mapsync::CameraPolicy;

/// Resource holding the fetched roster and its filtered, visible subset.
#[derive(Resource, Default)]
pub struct ProviderDirectory {
    /// Every record from the last successful fetch
    pub all: Vec<ProviderRecord>,
    /// Records passing the current filter, in roster order
    pub visible: Vec<ProviderRecord>,
    /// Distinct service tags for the category dropdown
    pub categories: Vec<String>,
    /// Whether a fetch task is in flight
    pub fetching: bool,
    /// Error from the last fetch, if it failed
    pub last_error: Option<String>,
    /// Where the current roster came from
    pub source: Option<RosterSource>,
    /// Whether any fetch has succeeded this session
    pub loaded_once: bool,
    /// Search center the visible subset was last filtered around
    pub filter_center: Option<GeoPoint>,
}

impl ProviderDirectory {
    pub fn provider(&self, id: &ProviderId) -> Option<&ProviderRecord> {
        self.all.iter().find(|record| &record.id == id)
    }
}

/// Resource holding the live sidebar filter.
#[derive(Resource, Default)]
pub struct SearchState {
    pub filter: ProviderFilter,
}

/// Message to re-fetch the roster from its source
#[derive(Message)]
pub struct RefreshProvidersRequest;

/// Message to recompute the visible subset after a filter change
#[derive(Message)]
pub struct ApplyFilterRequest {
    /// Reframe the camera around the surviving markers. Set for committed
    /// filter changes, not for keystroke-by-keystroke narrowing.
    pub refit: bool,
}

/// Background task for a roster fetch
#[derive(Component)]
struct FetchProvidersTask(Task<FetchResult>);

fn spawn_fetch(commands: &mut Commands, directory: &mut ProviderDirectory, data_url: Option<String>) {
    directory.fetching = true;
    let task_pool = AsyncComputeTaskPool::get();
    let task = task_pool.spawn(async move { fetch::fetch_roster(data_url) });
    commands.spawn(FetchProvidersTask(task));
}

fn recompute_visible(directory: &mut ProviderDirectory, search: &SearchState, basemap: &Basemap) {
    let center = basemap.search_center();
    directory.visible = apply_filter(&directory.all, &search.filter, center);
    directory.categories = service_categories(&directory.all);
    directory.filter_center = Some(center);
}

/// Startup system to seed the filter from remembered config values
fn init_search_from_config(config: Res<AppConfig>, mut search: ResMut<SearchState>) {
    search.filter.available_only = config.data.available_only;
    search.filter.radius_km = config.data.radius_km;
}

/// Startup system to kick off the first roster fetch
fn start_initial_fetch(
    mut commands: Commands,
    config: Res<AppConfig>,
    mut directory: ResMut<ProviderDirectory>,
) {
    info!(
        "Fetching provider roster from {}",
        config.data.data_url.as_deref().unwrap_or("bundled sample")
    );
    spawn_fetch(&mut commands, &mut directory, config.data.data_url.clone());
}

/// System to handle explicit refresh requests
fn handle_refresh_requests(
    mut events: MessageReader<RefreshProvidersRequest>,
    mut commands: Commands,
    config: Res<AppConfig>,
    mut directory: ResMut<ProviderDirectory>,
) {
    let requested = events.read().count() > 0;
    if !requested {
        return;
    }
    if directory.fetching {
        debug!("roster fetch already in flight; ignoring refresh request");
        return;
    }
    spawn_fetch(&mut commands, &mut directory, config.data.data_url.clone());
}

/// System to poll in-flight fetch tasks and fold results into the directory
fn poll_fetch_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut FetchProvidersTask)>,
    mut directory: ResMut<ProviderDirectory>,
    search: Res<SearchState>,
    basemap: Res<Basemap>,
    mut updates: MessageWriter<MapUpdateRequest>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.0)) else {
            continue;
        };
        commands.entity(entity).despawn();
        directory.fetching = false;

        match result.records {
            Some(records) => {
                info!(
                    "Provider roster loaded: {} records ({} skipped)",
                    records.len(),
                    result.skipped
                );
                directory.all = records;
                directory.source = Some(result.source);
                directory.last_error = None;
                directory.loaded_once = true;
                recompute_visible(&mut directory, &search, &basemap);
                updates.write(MapUpdateRequest {
                    policy: CameraPolicy::Preserve,
                });
            }
            None => {
                // Keep showing the previous roster; a background refresh
                // failing is not a reason to blank the screen.
                let message = result
                    .error
                    .unwrap_or_else(|| "Unknown fetch error".to_string());
                warn!("Provider fetch failed: {}", message);
                directory.last_error = Some(message);
            }
        }
    }
}

/// System to recompute the visible subset when the filter changes
fn apply_filter_requests(
    mut events: MessageReader<ApplyFilterRequest>,
    mut directory: ResMut<ProviderDirectory>,
    search: Res<SearchState>,
    basemap: Res<Basemap>,
    mut updates: MessageWriter<MapUpdateRequest>,
) {
    let mut refit = false;
    let mut any = false;
    for event in events.read() {
        any = true;
        refit |= event.refit;
    }
    if !any {
        return;
    }

    recompute_visible(&mut directory, &search, &basemap);
    updates.write(MapUpdateRequest {
        policy: if refit {
            CameraPolicy::Refit
        } else {
            CameraPolicy::Preserve
        },
    });
}

/// System to refilter when the search center moves out from under the roster.
///
/// The first filter pass can run against the fallback center before map boot
/// installs the manifest center, leaving the radius cut anchored to the wrong
/// place until the user happens to touch a filter.
fn refilter_on_center_change(
    directory: Res<ProviderDirectory>,
    basemap: Res<Basemap>,
    mut filters: MessageWriter<ApplyFilterRequest>,
) {
    if !directory.loaded_once {
        return;
    }
    if directory.filter_center != Some(basemap.search_center()) {
        filters.write(ApplyFilterRequest { refit: false });
    }
}

pub struct ProvidersPlugin;

impl Plugin for ProvidersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProviderDirectory>()
            .init_resource::<SearchState>()
            .add_message::<RefreshProvidersRequest>()
            .add_message::<ApplyFilterRequest>()
            .add_systems(
                Startup,
                (init_search_from_config, start_initial_fetch)
                    .chain()
                    .after(ConfigLoaded),
            )
            .add_systems(
                Update,
                (
                    poll_fetch_tasks,
                    refilter_on_center_change.before(apply_filter_requests),
                    handle_refresh_requests.run_if(on_message::<RefreshProvidersRequest>),
                    apply_filter_requests.run_if(on_message::<ApplyFilterRequest>),
                ),
            );
    }
}
