use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::constants::{MARKER_PICK_SLOP, MARKER_SIZE};
use crate::map::camera::{is_cursor_over_ui, CameraParams, CameraZoom, MapCamera};
use crate::map::scene::MarkerSprite;
use crate::map::{ClearSelectionRequest, ProviderMapSync, SelectProviderRequest};
use crate::mapsync::{MarkerRef, SelectionOrigin};

/// System handling left clicks on the map surface: select the nearest
/// marker within the pick radius, or clear the selection on empty ground.
pub fn handle_map_click(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut contexts: EguiContexts,
    camera: CameraParams,
    markers: Query<(&MarkerSprite, &Transform)>,
    sync: Res<ProviderMapSync>,
    mut selects: MessageWriter<SelectProviderRequest>,
    mut clears: MessageWriter<ClearSelectionRequest>,
) {
    if !mouse_button.just_pressed(MouseButton::Left) {
        return;
    }
    if is_cursor_over_ui(&mut contexts) {
        return;
    }
    let Some(cursor) = camera.cursor_world_pos() else {
        return;
    };

    // Pick radius scales with zoom so the click target stays finger-sized
    // on screen.
    let pick_radius = (MARKER_SIZE / 2.0 + MARKER_PICK_SLOP) * camera.zoom_scale();

    let mut nearest: Option<MarkerRef> = None;
    let mut best_distance = pick_radius;
    for (sprite, transform) in markers.iter() {
        let distance = cursor.distance(transform.translation.truncate());
        if distance <= best_distance {
            best_distance = distance;
            nearest = Some(sprite.marker);
        }
    }

    match nearest {
        Some(marker) => {
            if let Some(id) = sync.0.provider_for_marker(marker) {
                selects.write(SelectProviderRequest {
                    id: id.clone(),
                    origin: SelectionOrigin::Marker,
                });
            } else {
                warn!("clicked marker {:?} has no provider; scene out of step", marker);
            }
        }
        None => {
            clears.write(ClearSelectionRequest);
        }
    }
}

/// System clearing the selection on Escape
pub fn handle_escape(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    mut clears: MessageWriter<ClearSelectionRequest>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    // Let egui keep Escape while a text field has focus.
    if contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_keyboard_input())
        .unwrap_or(false)
    {
        return;
    }
    clears.write(ClearSelectionRequest);
}

/// System keeping marker sprites a constant on-screen size as the camera
/// zooms.
pub fn scale_markers_with_zoom(
    camera: Query<&CameraZoom, (With<MapCamera>, Changed<CameraZoom>)>,
    mut markers: Query<&mut Transform, With<MarkerSprite>>,
) {
    let Ok(zoom) = camera.single() else {
        return;
    };
    for mut transform in markers.iter_mut() {
        transform.scale = Vec3::splat(zoom.scale);
    }
}
