use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::RememberMapShownRequest;
use crate::map::{
    Basemap, BootPhase, BootState, MapInitRequest, MapTeardownRequest, MapViewState,
    RecenterRequest,
};
use crate::theme;

/// Top toolbar: map visibility toggle, recenter, and basemap status
#[allow(clippy::too_many_arguments)]
pub fn toolbar_ui(
    mut contexts: EguiContexts,
    mut view: ResMut<MapViewState>,
    boot: Res<BootState>,
    basemap: Res<Basemap>,
    mut init_events: MessageWriter<MapInitRequest>,
    mut teardown_events: MessageWriter<MapTeardownRequest>,
    mut recenter_events: MessageWriter<RecenterRequest>,
    mut remember_events: MessageWriter<RememberMapShownRequest>,
) -> Result {
    egui::TopBottomPanel::top("main_toolbar")
        .frame(
            egui::Frame::side_top_panel(&contexts.ctx_mut()?.style())
                .inner_margin(egui::Margin::symmetric(12, 8)),
        )
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 6.0;

                ui.label(egui::RichText::new("ProMap").size(16.0).strong());

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                if ui.checkbox(&mut view.enabled, "Show map").changed() {
                    if view.enabled {
                        init_events.write(MapInitRequest);
                    } else {
                        teardown_events.write(MapTeardownRequest);
                    }
                    remember_events.write(RememberMapShownRequest {
                        shown: view.enabled,
                    });
                }

                let map_ready = boot.phase == BootPhase::Ready;
                ui.add_enabled_ui(map_ready, |ui| {
                    if ui
                        .add(egui::Button::new("Recenter").min_size(egui::vec2(0.0, 24.0)))
                        .on_hover_text("Frame all visible providers")
                        .clicked()
                    {
                        recenter_events.write(RecenterRequest);
                    }
                });

                // Right-aligned boot status and attribution
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match &boot.phase {
                        BootPhase::Loading => {
                            ui.spinner();
                            ui.label(egui::RichText::new("Loading map...").size(12.0).weak());
                        }
                        BootPhase::Failed(_) => {
                            ui.colored_label(
                                theme::ui::ERROR_TEXT,
                                egui::RichText::new("Map unavailable").size(12.0),
                            );
                        }
                        BootPhase::Ready => {
                            if let Some(data) = &basemap.0 {
                                ui.label(
                                    egui::RichText::new(&data.manifest.attribution)
                                        .size(11.0)
                                        .weak(),
                                );
                            }
                        }
                        BootPhase::Idle => {}
                    }
                });
            });
        });
    Ok(())
}
