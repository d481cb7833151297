use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::{ConfigResetNotification, RememberMapShownRequest};
use crate::map::{BootPhase, BootState, MapInitRequest, MapViewState};
use crate::theme;

/// Renders the boot failure dialog with a retry option
pub fn boot_failed_ui(
    mut contexts: EguiContexts,
    boot: Res<BootState>,
    mut view: ResMut<MapViewState>,
    mut init_events: MessageWriter<MapInitRequest>,
    mut remember_events: MessageWriter<RememberMapShownRequest>,
) -> Result {
    let BootPhase::Failed(message) = &boot.phase else {
        return Ok(());
    };
    if !view.enabled {
        return Ok(());
    }

    egui::Window::new("Map Unavailable")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.label("The map could not be prepared:");
            ui.add_space(5.0);
            ui.colored_label(theme::ui::ERROR_TEXT, message);
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Retry").clicked() {
                    init_events.write(MapInitRequest);
                }
                if ui.button("Hide map").clicked() {
                    view.enabled = false;
                    remember_events.write(RememberMapShownRequest { shown: false });
                }
            });
        });

    Ok(())
}

/// Renders a hint in the map area while the map view is switched off
pub fn map_hidden_hint_ui(mut contexts: EguiContexts, view: Res<MapViewState>) -> Result {
    if view.enabled {
        return Ok(());
    }

    egui::Area::new(egui::Id::new("map_hidden_hint"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .interactable(false)
        .show(contexts.ctx_mut()?, |ui| {
            ui.label(
                egui::RichText::new("Map hidden. Use \"Show map\" in the toolbar to bring it back.")
                    .size(13.0)
                    .color(theme::ui::HINT_TEXT),
            );
        });

    Ok(())
}

/// Renders the notification shown when the settings file had to be reset
pub fn config_reset_notification_ui(
    mut contexts: EguiContexts,
    mut notification: ResMut<ConfigResetNotification>,
) -> Result {
    if !notification.show {
        return Ok(());
    }

    egui::Window::new("Settings Reset")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.label("Your settings file could not be read and was reset to defaults.");

            if let Some(reason) = &notification.reason {
                ui.add_space(5.0);
                ui.label(egui::RichText::new(reason).weak());
            }

            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                notification.show = false;
            }
        });

    Ok(())
}
