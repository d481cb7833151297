use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::constants::MARKER_SIZE;
use crate::map::{ActivePopup, ClearSelectionRequest, MapCamera, MarkerSprite};
use crate::theme;

/// Renders the detail popup anchored above the selected marker.
///
/// The popup follows the marker on screen, so panning and zooming keep it
/// glued to the right spot without any extra bookkeeping.
pub fn popup_ui(
    mut contexts: EguiContexts,
    popup: Res<ActivePopup>,
    markers: Query<(&MarkerSprite, &Transform)>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MapCamera>>,
    mut clear_events: MessageWriter<ClearSelectionRequest>,
) {
    let Some((marker, content)) = &popup.open else {
        return;
    };

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    // The popup anchors to the sprite the scene spawned for this marker.
    let mut anchor_world = None;
    for (sprite, transform) in markers.iter() {
        if sprite.marker == *marker {
            anchor_world = Some(transform.translation.truncate());
            break;
        }
    }
    let Some(world_pos) = anchor_world else {
        return;
    };

    let Ok(screen_pos) = camera.world_to_viewport(camera_transform, world_pos.extend(0.0)) else {
        return;
    };

    let frame = egui::Frame::popup(&ctx.style());
    egui::Area::new(egui::Id::new("provider_popup"))
        .fixed_pos(egui::pos2(screen_pos.x, screen_pos.y - MARKER_SIZE))
        .pivot(egui::Align2::CENTER_BOTTOM)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            frame.show(ui, |ui| {
                ui.set_max_width(260.0);

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&content.title).size(14.0).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("x").clicked() {
                            clear_events.write(ClearSelectionRequest);
                        }
                    });
                });

                ui.horizontal(|ui| {
                    if let Some(rating) = content.rating {
                        ui.colored_label(
                            theme::ui::RATING_TEXT,
                            egui::RichText::new(format!("{:.1} / 5", rating)).size(12.0),
                        );
                    }
                    if content.available_now {
                        ui.colored_label(
                            theme::ui::AVAILABLE_BADGE,
                            egui::RichText::new("Available now").size(12.0),
                        );
                    } else {
                        ui.colored_label(
                            theme::ui::UNAVAILABLE_BADGE,
                            egui::RichText::new("Unavailable").size(12.0),
                        );
                    }
                });

                let services = content.services_line();
                if !services.is_empty() {
                    ui.label(egui::RichText::new(services).size(12.0).weak());
                }
                if let Some(price) = &content.price_label {
                    ui.label(egui::RichText::new(price).size(12.0));
                }

                if let Some(url) = &content.profile_url {
                    ui.add_space(4.0);
                    if ui.small_button("Open profile").clicked() {
                        let _ = open::that(url);
                    }
                }
            });
        });
}
