use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::constants::{
    DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, FIT_BOUNDS_PADDING, FOCUS_ZOOM, MARKER_SIZE,
    MAX_ZOOM, MIN_ZOOM,
};
use crate::geo::{camera_plan, CameraPlan, GeoPoint};
use crate::map::camera::{CameraZoom, MapCamera};
use crate::map::{Basemap, ProviderMapSync};
use crate::mapsync::{MapWidget, MarkerRef, MarkerStyle, PopupContent};
use crate::theme;

/// Z layer for marker sprites. The selected marker gets a small bump so it
/// draws above overlapping neighbors.
const MARKER_Z: f32 = 10.0;

/// Scene entity backing one marker.
#[derive(Component)]
pub struct MarkerSprite {
    pub marker: MarkerRef,
}

/// Popup state mirrored out of the widget for the UI layer to render.
#[derive(Resource, Default)]
pub struct ActivePopup {
    pub open: Option<(MarkerRef, PopupContent)>,
}

/// One queued widget mutation.
#[derive(Debug)]
enum WidgetOp {
    AddMarker {
        marker: MarkerRef,
        at: GeoPoint,
        style: MarkerStyle,
    },
    RemoveMarker {
        marker: MarkerRef,
    },
    SetStyle {
        marker: MarkerRef,
        style: MarkerStyle,
    },
    MoveMarker {
        marker: MarkerRef,
        at: GeoPoint,
    },
    OpenPopup {
        marker: MarkerRef,
        content: PopupContent,
    },
    CloseAllPopups,
    Camera(CameraPlan),
    Clear,
}

/// Widget backend rendered by the Bevy scene.
///
/// Trait calls queue ops; [`apply_scene_ops`] coalesces and drains the
/// queue into sprite entities and camera moves once per frame. The
/// indirection keeps the sync controller free of ECS access.
#[derive(Default)]
pub struct SceneWidget {
    ops: Vec<WidgetOp>,
    next_raw: u64,
    destroyed: bool,
}

impl SceneWidget {
    /// Fresh widget with the camera parked at the basemap center. The op is
    /// queued first, so reconcile-driven framing still wins if it happens.
    pub fn with_initial_view(at: GeoPoint, zoom: f32) -> Self {
        let mut widget = Self::default();
        widget.ops.push(WidgetOp::Camera(CameraPlan::Center { at, zoom }));
        widget
    }

    fn push(&mut self, op: WidgetOp) {
        if self.destroyed {
            warn!("scene widget op after destroy; dropped");
            return;
        }
        self.ops.push(op);
    }

    fn take_ops(&mut self) -> Vec<WidgetOp> {
        std::mem::take(&mut self.ops)
    }
}

impl MapWidget for SceneWidget {
    fn add_marker(&mut self, at: GeoPoint, style: MarkerStyle) -> MarkerRef {
        self.next_raw += 1;
        let marker = MarkerRef::new(self.next_raw);
        self.push(WidgetOp::AddMarker { marker, at, style });
        marker
    }

    fn remove_marker(&mut self, marker: MarkerRef) {
        self.push(WidgetOp::RemoveMarker { marker });
    }

    fn set_marker_style(&mut self, marker: MarkerRef, style: MarkerStyle) {
        self.push(WidgetOp::SetStyle { marker, style });
    }

    fn move_marker(&mut self, marker: MarkerRef, at: GeoPoint) {
        self.push(WidgetOp::MoveMarker { marker, at });
    }

    fn open_popup(&mut self, marker: MarkerRef, content: PopupContent) {
        self.push(WidgetOp::OpenPopup { marker, content });
    }

    fn close_all_popups(&mut self) {
        self.push(WidgetOp::CloseAllPopups);
    }

    fn pan_to(&mut self, at: GeoPoint, zoom: f32) {
        self.push(WidgetOp::Camera(CameraPlan::Center { at, zoom }));
    }

    fn fit_bounds(&mut self, points: &[GeoPoint]) {
        if let Some(plan) = camera_plan(points, FOCUS_ZOOM) {
            self.push(WidgetOp::Camera(plan));
        }
    }

    fn destroy(&mut self) {
        self.ops.push(WidgetOp::Clear);
        self.destroyed = true;
    }
}

fn marker_z(style: MarkerStyle) -> f32 {
    if style.selected {
        MARKER_Z + 1.0
    } else {
        MARKER_Z
    }
}

/// Folds a drained batch so it is self-contained.
///
/// Sprite spawns go through deferred commands, so a remove, restyle or move
/// that lands in the same batch as its add would miss the entity query and
/// get dropped. Those ops fold into the pending add instead: an add/remove
/// pair nets to nothing, restyles and moves update the add in place, and
/// `Clear` cancels every pending add. Surviving adds come out after the rest
/// of the batch, so they also spawn at the batch-final camera zoom.
fn coalesce_ops(ops: Vec<WidgetOp>) -> Vec<WidgetOp> {
    let mut passthrough: Vec<WidgetOp> = Vec::with_capacity(ops.len());
    let mut adds: Vec<(MarkerRef, GeoPoint, MarkerStyle)> = Vec::new();

    for op in ops {
        match op {
            WidgetOp::AddMarker { marker, at, style } => adds.push((marker, at, style)),
            WidgetOp::RemoveMarker { marker } => {
                if let Some(index) = adds.iter().position(|(m, _, _)| *m == marker) {
                    adds.remove(index);
                } else {
                    passthrough.push(WidgetOp::RemoveMarker { marker });
                }
            }
            WidgetOp::SetStyle { marker, style } => {
                if let Some((_, _, pending)) = adds.iter_mut().find(|(m, _, _)| *m == marker) {
                    *pending = style;
                } else {
                    passthrough.push(WidgetOp::SetStyle { marker, style });
                }
            }
            WidgetOp::MoveMarker { marker, at } => {
                if let Some((_, pending, _)) = adds.iter_mut().find(|(m, _, _)| *m == marker) {
                    *pending = at;
                } else {
                    passthrough.push(WidgetOp::MoveMarker { marker, at });
                }
            }
            WidgetOp::Clear => {
                adds.clear();
                passthrough.push(WidgetOp::Clear);
            }
            other => passthrough.push(other),
        }
    }

    passthrough.extend(
        adds.into_iter()
            .map(|(marker, at, style)| WidgetOp::AddMarker { marker, at, style }),
    );
    passthrough
}

/// System draining queued widget ops into the scene.
pub fn apply_scene_ops(
    mut commands: Commands,
    mut sync: ResMut<ProviderMapSync>,
    basemap: Res<Basemap>,
    mut popup: ResMut<ActivePopup>,
    mut markers: Query<(Entity, &MarkerSprite, &mut Transform, &mut Sprite)>,
    mut camera: Query<(&mut Transform, &mut CameraZoom), (With<MapCamera>, Without<MarkerSprite>)>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Some(widget) = sync.0.widget_mut() else {
        return;
    };
    let ops = widget.take_ops();
    if ops.is_empty() {
        return;
    }
    let Some(data) = basemap.0.as_ref() else {
        warn!("dropping {} widget ops; basemap not ready", ops.len());
        return;
    };

    // New markers are spawned at the camera scale so they keep a constant
    // on-screen size; camera ops in the same batch update this.
    let mut current_zoom = camera
        .single()
        .map(|(_, zoom)| zoom.scale)
        .unwrap_or(1.0);

    for op in coalesce_ops(ops) {
        match op {
            WidgetOp::AddMarker { marker, at, style } => {
                let world = data.projection.to_world(at);
                commands.spawn((
                    Sprite {
                        color: style.fill(),
                        custom_size: Some(Vec2::splat(MARKER_SIZE * style.size_factor())),
                        ..default()
                    },
                    Transform::from_translation(world.extend(marker_z(style)))
                        .with_scale(Vec3::splat(current_zoom)),
                    MarkerSprite { marker },
                ));
            }
            WidgetOp::RemoveMarker { marker } => {
                let mut found = false;
                for (entity, sprite_marker, _, _) in markers.iter() {
                    if sprite_marker.marker == marker {
                        commands.entity(entity).despawn();
                        found = true;
                        break;
                    }
                }
                if !found {
                    warn!("remove for unknown marker {:?}; ignored", marker);
                }
            }
            WidgetOp::SetStyle { marker, style } => {
                let mut found = false;
                for (_, sprite_marker, mut transform, mut sprite) in markers.iter_mut() {
                    if sprite_marker.marker == marker {
                        sprite.color = style.fill();
                        sprite.custom_size = Some(Vec2::splat(MARKER_SIZE * style.size_factor()));
                        transform.translation.z = marker_z(style);
                        found = true;
                        break;
                    }
                }
                if !found {
                    warn!("restyle for unknown marker {:?}; ignored", marker);
                }
            }
            WidgetOp::MoveMarker { marker, at } => {
                let world = data.projection.to_world(at);
                let mut found = false;
                for (_, sprite_marker, mut transform, _) in markers.iter_mut() {
                    if sprite_marker.marker == marker {
                        transform.translation.x = world.x;
                        transform.translation.y = world.y;
                        found = true;
                        break;
                    }
                }
                if !found {
                    warn!("move for unknown marker {:?}; ignored", marker);
                }
            }
            WidgetOp::OpenPopup { marker, content } => {
                popup.open = Some((marker, content));
            }
            WidgetOp::CloseAllPopups => {
                popup.open = None;
            }
            WidgetOp::Camera(plan) => {
                let Ok((mut cam_transform, mut zoom)) = camera.single_mut() else {
                    continue;
                };
                match plan {
                    CameraPlan::Center { at, zoom: level } => {
                        let world = data.projection.to_world(at);
                        cam_transform.translation.x = world.x;
                        cam_transform.translation.y = world.y;
                        zoom.scale = level.clamp(MIN_ZOOM, MAX_ZOOM);
                    }
                    CameraPlan::Frame(bounds) => {
                        let min = data.projection.to_world(bounds.min);
                        let max = data.projection.to_world(bounds.max);
                        let center = (min + max) / 2.0;
                        let size = max - min;
                        let (win_w, win_h) = windows
                            .single()
                            .map(|w| (w.width(), w.height()))
                            .unwrap_or((DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT));
                        let scale = ((size.x * FIT_BOUNDS_PADDING) / win_w)
                            .max((size.y * FIT_BOUNDS_PADDING) / win_h)
                            .clamp(MIN_ZOOM, MAX_ZOOM);
                        cam_transform.translation.x = center.x;
                        cam_transform.translation.y = center.y;
                        zoom.scale = scale;
                    }
                }
                current_zoom = zoom.scale;
            }
            WidgetOp::Clear => {
                for (entity, _, _, _) in markers.iter() {
                    commands.entity(entity).despawn();
                }
                popup.open = None;
            }
        }
    }
}

/// Draw an accent ring around the marker whose popup is open.
pub fn draw_selection_ring(
    mut gizmos: Gizmos,
    popup: Res<ActivePopup>,
    camera: Query<&CameraZoom, With<MapCamera>>,
    markers: Query<(&MarkerSprite, &Transform)>,
) {
    let Some((selected, _)) = &popup.open else {
        return;
    };
    let Ok(zoom) = camera.single() else {
        return;
    };

    for (sprite, transform) in markers.iter() {
        if sprite.marker == *selected {
            gizmos.circle_2d(
                Isometry2d::from_translation(transform.translation.truncate()),
                MARKER_SIZE * zoom.scale,
                theme::SELECTION_RING,
            );
            break;
        }
    }
}

/// Draw the graticule over the basemap at the manifest's line spacing.
pub fn draw_graticule(
    mut gizmos: Gizmos,
    basemap: Res<Basemap>,
    camera: Query<(&Transform, &CameraZoom), With<MapCamera>>,
) {
    let Some(data) = basemap.0.as_ref() else {
        return;
    };
    let Ok((camera_transform, zoom)) = camera.single() else {
        return;
    };

    let mut spacing = data
        .projection
        .graticule_spacing_world(data.manifest.graticule_degrees);
    if spacing <= 0.0 {
        return;
    }

    let view_width = DEFAULT_WINDOW_WIDTH * zoom.scale;
    let view_height = DEFAULT_WINDOW_HEIGHT * zoom.scale;

    // Coarsen when zoomed far out; the graticule is an orientation aid,
    // not survey data.
    while view_width / spacing > 80.0 {
        spacing *= 10.0;
    }

    let camera_pos = camera_transform.translation.truncate();

    let start_x = ((camera_pos.x - view_width / 2.0) / spacing).floor() as i32;
    let end_x = ((camera_pos.x + view_width / 2.0) / spacing).ceil() as i32;
    let start_y = ((camera_pos.y - view_height / 2.0) / spacing).floor() as i32;
    let end_y = ((camera_pos.y + view_height / 2.0) / spacing).ceil() as i32;

    for x in start_x..=end_x {
        let x_pos = x as f32 * spacing;
        let color = if x % 10 == 0 {
            theme::GRATICULE_MAJOR_COLOR
        } else {
            theme::GRATICULE_COLOR
        };
        gizmos.line_2d(
            Vec2::new(x_pos, start_y as f32 * spacing),
            Vec2::new(x_pos, end_y as f32 * spacing),
            color,
        );
    }

    for y in start_y..=end_y {
        let y_pos = y as f32 * spacing;
        let color = if y % 10 == 0 {
            theme::GRATICULE_MAJOR_COLOR
        } else {
            theme::GRATICULE_COLOR
        };
        gizmos.line_2d(
            Vec2::new(start_x as f32 * spacing, y_pos),
            Vec2::new(end_x as f32 * spacing, y_pos),
            color,
        );
    }
}
