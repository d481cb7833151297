//! Map view: boot lifecycle, scene rendering, camera, and interaction.

mod bootstrap;
mod camera;
mod interact;
mod scene;

pub use bootstrap::{Basemap, BasemapData, BasemapManifest, BootPhase, BootState};
pub use camera::{is_cursor_over_ui, CameraParams, CameraZoom, MapCamera};
pub use scene::{ActivePopup, MarkerSprite, SceneWidget};

use bevy::prelude::*;

use crate::config::{AppConfig, ConfigLoaded};
use crate::mapsync::{
    ApplyOutcome, CameraPolicy, MapSync, PopupContent, SelectOutcome, SelectionOrigin,
};
use crate::providers::{ProviderDirectory, ProviderId};

/// The sync controller wrapped for ECS access.
#[derive(Resource, Default)]
pub struct ProviderMapSync(pub MapSync<SceneWidget>);

/// Whether the user wants the map view shown. Independent of boot state:
/// the view can be enabled and still loading, or failed.
#[derive(Resource, Default)]
pub struct MapViewState {
    pub enabled: bool,
}

/// Message to boot the map view
#[derive(Message)]
pub struct MapInitRequest;

/// Message to tear the map view down
#[derive(Message)]
pub struct MapTeardownRequest;

/// Message to push the current visible roster onto the map
#[derive(Message)]
pub struct MapUpdateRequest {
    pub policy: CameraPolicy,
}

/// Message to select a provider, from either the map or the sidebar
#[derive(Message)]
pub struct SelectProviderRequest {
    pub id: ProviderId,
    pub origin: SelectionOrigin,
}

/// Message to drop the current selection
#[derive(Message)]
pub struct ClearSelectionRequest;

/// Message to reframe the camera around the current markers
#[derive(Message)]
pub struct RecenterRequest;

/// Notification that the selection changed, for sidebar focus tracking
#[derive(Message)]
pub struct SelectionChanged {
    pub selected: Option<ProviderId>,
}

/// Run condition: the map is booted and showing
pub fn map_ready(boot: Res<BootState>) -> bool {
    boot.phase == BootPhase::Ready
}

/// Startup system applying the remembered map visibility
fn startup_show_map(
    config: Res<AppConfig>,
    mut state: ResMut<MapViewState>,
    mut inits: MessageWriter<MapInitRequest>,
) {
    state.enabled = config.data.show_map_on_start;
    if state.enabled {
        inits.write(MapInitRequest);
    }
}

/// System feeding roster updates to the sync controller. Multiple requests
/// in one frame collapse into a single reconcile; refit wins.
fn handle_map_updates(
    mut events: MessageReader<MapUpdateRequest>,
    directory: Res<ProviderDirectory>,
    mut sync: ResMut<ProviderMapSync>,
    mut changed: MessageWriter<SelectionChanged>,
) {
    let mut refit = false;
    let mut any = false;
    for event in events.read() {
        any = true;
        refit |= event.policy == CameraPolicy::Refit;
    }
    if !any {
        return;
    }

    let policy = if refit {
        CameraPolicy::Refit
    } else {
        CameraPolicy::Preserve
    };
    match sync.0.apply_update(&directory.visible, policy) {
        ApplyOutcome::Applied(summary) => {
            if !summary.is_noop() {
                info!(
                    "map reconciled: {} added, {} removed, {} moved, {} restyled{}",
                    summary.added,
                    summary.removed,
                    summary.moved,
                    summary.restyled,
                    if summary.camera_refit {
                        ", camera reframed"
                    } else {
                        ""
                    }
                );
            }
            if summary.selection_dropped {
                // The selected provider left the roster; tell the sidebar
                // the same way an explicit clear would.
                changed.write(SelectionChanged { selected: None });
            }
        }
        ApplyOutcome::Queued => {
            debug!("map not booted; roster queued for attach");
        }
    }
}

/// System running the selection protocol for marker and sidebar clicks
fn handle_select_requests(
    mut events: MessageReader<SelectProviderRequest>,
    directory: Res<ProviderDirectory>,
    mut sync: ResMut<ProviderMapSync>,
    mut changed: MessageWriter<SelectionChanged>,
) {
    for event in events.read() {
        let Some(record) = directory.provider(&event.id) else {
            warn!("selection request for unknown provider {}", event.id);
            continue;
        };
        let content = PopupContent::from_record(record);
        match sync.0.select(&event.id, content, event.origin) {
            SelectOutcome::Changed => {
                changed.write(SelectionChanged {
                    selected: Some(event.id.clone()),
                });
            }
            SelectOutcome::Reaffirmed | SelectOutcome::NoMarker | SelectOutcome::NotReady => {}
        }
    }
}

/// System dropping the selection
fn handle_clear_requests(
    mut events: MessageReader<ClearSelectionRequest>,
    mut sync: ResMut<ProviderMapSync>,
    mut changed: MessageWriter<SelectionChanged>,
) {
    let requested = events.read().count() > 0;
    if !requested {
        return;
    }
    if sync.0.clear_selection() {
        changed.write(SelectionChanged { selected: None });
    }
}

/// System reframing the camera around the current markers
fn handle_recenter(mut events: MessageReader<RecenterRequest>, mut sync: ResMut<ProviderMapSync>) {
    let requested = events.read().count() > 0;
    if !requested {
        return;
    }
    if !sync.0.refit() {
        debug!("recenter ignored; nothing to frame");
    }
}

pub struct MapViewPlugin;

impl Plugin for MapViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProviderMapSync>()
            .init_resource::<MapViewState>()
            .init_resource::<BootState>()
            .init_resource::<Basemap>()
            .init_resource::<ActivePopup>()
            .add_message::<MapInitRequest>()
            .add_message::<MapTeardownRequest>()
            .add_message::<MapUpdateRequest>()
            .add_message::<SelectProviderRequest>()
            .add_message::<ClearSelectionRequest>()
            .add_message::<RecenterRequest>()
            .add_message::<SelectionChanged>()
            .add_systems(
                Startup,
                (camera::spawn_camera, startup_show_map.after(ConfigLoaded)),
            )
            .add_systems(
                Update,
                (
                    bootstrap::begin_boot.run_if(on_message::<MapInitRequest>),
                    bootstrap::poll_boot,
                    bootstrap::handle_teardown.run_if(on_message::<MapTeardownRequest>),
                    camera::camera_pan.run_if(map_ready),
                    camera::camera_zoom.run_if(map_ready),
                    interact::handle_map_click.run_if(map_ready),
                    interact::handle_escape.run_if(map_ready),
                    handle_map_updates.run_if(on_message::<MapUpdateRequest>),
                    handle_select_requests.run_if(on_message::<SelectProviderRequest>),
                    handle_clear_requests.run_if(on_message::<ClearSelectionRequest>),
                    handle_recenter.run_if(on_message::<RecenterRequest>),
                    scene::apply_scene_ops,
                    interact::scale_markers_with_zoom,
                    camera::apply_camera_zoom,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (scene::draw_graticule, scene::draw_selection_ring).run_if(map_ready),
            );
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::geo::{GeoPoint, MapProjection};
    use crate::providers::ProviderRecord;

    fn provider(id: &str, lat: f64, lng: f64) -> ProviderRecord {
        ProviderRecord {
            id: ProviderId::new(id),
            coordinates: GeoPoint::checked(lat, lng),
            available_now: true,
            name: format!("Provider {id}"),
            rating: None,
            services: vec!["Cleaning".to_string()],
            price_label: None,
            profile_url: None,
        }
    }

    fn selection_notices(world: &World) -> Vec<Option<ProviderId>> {
        let messages = world.resource::<Messages<SelectionChanged>>();
        let mut cursor = messages.get_cursor();
        cursor.read(messages).map(|m| m.selected.clone()).collect()
    }

    #[test]
    fn test_reconcile_dropping_selection_notifies_sidebar() {
        let mut world = World::new();
        world.init_resource::<Messages<MapUpdateRequest>>();
        world.init_resource::<Messages<SelectionChanged>>();

        let mut sync = ProviderMapSync::default();
        sync.0.attach(SceneWidget::default());
        world.insert_resource(sync);

        let keep = provider("prv_1", 44.97, -93.26);
        let departing = provider("prv_2", 44.95, -93.30);
        world.insert_resource(ProviderDirectory {
            all: vec![keep.clone(), departing.clone()],
            visible: vec![keep.clone(), departing.clone()],
            ..Default::default()
        });

        world.write_message(MapUpdateRequest {
            policy: CameraPolicy::Preserve,
        });
        world
            .run_system_once(handle_map_updates)
            .expect("system runs");
        assert!(selection_notices(&world).is_empty());

        let outcome = world.resource_mut::<ProviderMapSync>().0.select(
            &departing.id,
            PopupContent::from_record(&departing),
            SelectionOrigin::Marker,
        );
        assert_eq!(outcome, SelectOutcome::Changed);

        // The selected provider drops out of the next roster.
        world.resource_mut::<ProviderDirectory>().visible = vec![keep];
        world.resource_mut::<Messages<MapUpdateRequest>>().clear();
        world.write_message(MapUpdateRequest {
            policy: CameraPolicy::Preserve,
        });
        world
            .run_system_once(handle_map_updates)
            .expect("system runs");

        assert_eq!(selection_notices(&world), vec![None]);
    }

    #[test]
    fn test_same_frame_departure_leaves_no_ghost_sprite() {
        let mut world = World::new();
        world.init_resource::<ActivePopup>();
        world.insert_resource(Basemap(Some(BasemapData {
            manifest: BasemapManifest::default(),
            projection: MapProjection::new(GeoPoint { lat: 44.9778, lng: -93.265 }),
        })));

        let keep = provider("prv_1", 44.97, -93.26);
        let departing = provider("prv_2", 44.95, -93.30);

        // Both updates land before the scene drains, so the departure is in
        // the same batch as the spawn it cancels.
        let mut sync = ProviderMapSync::default();
        sync.0.attach(SceneWidget::default());
        sync.0
            .apply_update(&[departing.clone(), keep.clone()], CameraPolicy::Preserve);
        sync.0.apply_update(&[keep.clone()], CameraPolicy::Preserve);
        world.insert_resource(sync);

        world
            .run_system_once(scene::apply_scene_ops)
            .expect("system runs");

        let expected = world
            .resource::<ProviderMapSync>()
            .0
            .marker_for(&keep.id);
        let mut query = world.query::<&MarkerSprite>();
        let markers: Vec<_> = query.iter(&world).map(|sprite| Some(sprite.marker)).collect();
        assert_eq!(markers, vec![expected]);
    }
}
