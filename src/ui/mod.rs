mod overlays;
mod popup;
mod sidebar;
mod toolbar;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<sidebar::SidebarState>()
            // Side panel renders first so the top panel fits beside it
            .add_systems(EguiPrimaryContextPass, sidebar::sidebar_ui)
            .add_systems(
                EguiPrimaryContextPass,
                toolbar::toolbar_ui.after(sidebar::sidebar_ui),
            )
            .add_systems(
                EguiPrimaryContextPass,
                (
                    // Last: floating popup and dialogs
                    popup::popup_ui,
                    overlays::boot_failed_ui,
                    overlays::map_hidden_hint_ui,
                    overlays::config_reset_notification_ui,
                )
                    .after(toolbar::toolbar_ui),
            )
            .add_systems(Update, sidebar::track_selection_focus);
    }
}
