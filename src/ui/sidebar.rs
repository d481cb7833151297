use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::RememberFilterRequest;
use crate::constants::{MAX_RADIUS_KM, MIN_RADIUS_KM};
use crate::map::{ProviderMapSync, SelectProviderRequest, SelectionChanged};
use crate::mapsync::SelectionOrigin;
use crate::providers::{
    ApplyFilterRequest, ProviderDirectory, ProviderId, ProviderRecord, RefreshProvidersRequest,
    RosterSource, SearchState,
};
use crate::theme;

/// Resource tracking which card the list should scroll to, set when the
/// selection changes from a marker click.
#[derive(Resource, Default)]
pub struct SidebarState {
    pub scroll_to: Option<ProviderId>,
}

#[allow(clippy::too_many_arguments)]
pub fn sidebar_ui(
    mut contexts: EguiContexts,
    directory: Res<ProviderDirectory>,
    mut search: ResMut<SearchState>,
    sync: Res<ProviderMapSync>,
    mut sidebar: ResMut<SidebarState>,
    mut filter_events: MessageWriter<ApplyFilterRequest>,
    mut remember_events: MessageWriter<RememberFilterRequest>,
    mut refresh_events: MessageWriter<RefreshProvidersRequest>,
    mut select_events: MessageWriter<SelectProviderRequest>,
) -> Result {
    egui::SidePanel::left("provider_sidebar")
        .default_width(320.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.add_space(4.0);
            ui.label(egui::RichText::new("Providers").heading().size(18.0));
            ui.add_space(4.0);
            ui.separator();
            ui.add_space(4.0);

            // =========================================
            // SEARCH AND FILTERS
            // =========================================
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Search:").size(14.0));
                let response = ui.add(
                    egui::TextEdit::singleline(&mut search.filter.query)
                        .hint_text("name or service"),
                );
                if response.changed() {
                    // Typing narrows the list without yanking the camera around.
                    filter_events.write(ApplyFilterRequest { refit: false });
                }
            });

            ui.add_space(4.0);

            if ui
                .checkbox(&mut search.filter.available_only, "Available now only")
                .changed()
            {
                filter_events.write(ApplyFilterRequest { refit: true });
                remember_events.write(RememberFilterRequest {
                    available_only: search.filter.available_only,
                    radius_km: search.filter.radius_km,
                });
            }

            ui.add_space(4.0);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Service:").size(14.0));
                let selected_text = search
                    .filter
                    .category
                    .clone()
                    .unwrap_or_else(|| "All services".to_string());
                egui::ComboBox::from_id_salt("service_category")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(search.filter.category.is_none(), "All services")
                            .clicked()
                            && search.filter.category.is_some()
                        {
                            search.filter.category = None;
                            filter_events.write(ApplyFilterRequest { refit: true });
                        }
                        for category in &directory.categories {
                            let is_selected =
                                search.filter.category.as_deref() == Some(category.as_str());
                            if ui.selectable_label(is_selected, category).clicked() && !is_selected
                            {
                                search.filter.category = Some(category.clone());
                                filter_events.write(ApplyFilterRequest { refit: true });
                            }
                        }
                    });
            });

            ui.add_space(4.0);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Radius:").size(14.0));
                let response = ui.add(
                    egui::Slider::new(&mut search.filter.radius_km, MIN_RADIUS_KM..=MAX_RADIUS_KM)
                        .suffix(" km"),
                );
                if response.changed() {
                    filter_events.write(ApplyFilterRequest { refit: false });
                }
                if response.drag_stopped() {
                    filter_events.write(ApplyFilterRequest { refit: true });
                    remember_events.write(RememberFilterRequest {
                        available_only: search.filter.available_only,
                        radius_km: search.filter.radius_km,
                    });
                }
            });

            ui.add_space(8.0);
            ui.separator();
            ui.add_space(4.0);

            // =========================================
            // PROVIDER LIST
            // =========================================
            let selected_id = sync.0.selection().cloned();
            let scroll_target = sidebar.scroll_to.take();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if directory.visible.is_empty() {
                        ui.add_space(12.0);
                        let message = if directory.loaded_once {
                            "No providers match the current filters."
                        } else {
                            "Loading providers..."
                        };
                        ui.vertical_centered(|ui| {
                            ui.label(egui::RichText::new(message).size(13.0).weak());
                        });
                        return;
                    }

                    for record in &directory.visible {
                        let is_selected = selected_id.as_ref() == Some(&record.id);
                        let response = provider_card(ui, record, is_selected);

                        if scroll_target.as_ref() == Some(&record.id) {
                            response.scroll_to_me(Some(egui::Align::Center));
                        }
                        if response.clicked() {
                            select_events.write(SelectProviderRequest {
                                id: record.id.clone(),
                                origin: SelectionOrigin::Sidebar,
                            });
                        }
                        ui.add_space(4.0);
                    }
                });

            // =========================================
            // STATUS FOOTER
            // =========================================
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                ui.add_space(4.0);

                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!(
                            "{} of {} providers",
                            directory.visible.len(),
                            directory.all.len()
                        ))
                        .size(12.0)
                        .weak(),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if directory.fetching {
                            ui.spinner();
                        } else if ui.small_button("Refresh").clicked() {
                            refresh_events.write(RefreshProvidersRequest);
                        }
                    });
                });

                if directory.source == Some(RosterSource::Sample) {
                    ui.label(
                        egui::RichText::new("Showing built-in sample data")
                            .size(11.0)
                            .weak()
                            .italics(),
                    );
                }
                if let Some(error) = &directory.last_error {
                    ui.colored_label(
                        theme::ui::ERROR_TEXT,
                        egui::RichText::new(error).size(11.0),
                    );
                }
                ui.separator();
            });
        });
    Ok(())
}

/// Renders one provider card and returns a click response for the whole card
fn provider_card(ui: &mut egui::Ui, record: &ProviderRecord, is_selected: bool) -> egui::Response {
    let fill = if is_selected {
        theme::ui::SELECTED_CARD_FILL
    } else {
        ui.visuals().faint_bg_color
    };

    let inner = egui::Frame::new()
        .fill(fill)
        .corner_radius(4)
        .inner_margin(egui::Margin::symmetric(8, 6))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&record.name).size(14.0).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if record.available_now {
                        ui.colored_label(
                            theme::ui::AVAILABLE_BADGE,
                            egui::RichText::new("Available").size(11.0),
                        );
                    } else {
                        ui.colored_label(
                            theme::ui::UNAVAILABLE_BADGE,
                            egui::RichText::new("Unavailable").size(11.0),
                        );
                    }
                });
            });

            ui.horizontal(|ui| {
                if let Some(rating) = record.rating {
                    ui.colored_label(
                        theme::ui::RATING_TEXT,
                        egui::RichText::new(format!("{:.1}", rating)).size(12.0),
                    );
                }
                if !record.services.is_empty() {
                    ui.label(egui::RichText::new(record.services.join(", ")).size(12.0).weak());
                }
            });

            ui.horizontal(|ui| {
                if let Some(price) = &record.price_label {
                    ui.label(egui::RichText::new(price).size(12.0));
                }
                if record.coordinates.is_none() {
                    ui.label(
                        egui::RichText::new("no location")
                            .size(11.0)
                            .weak()
                            .italics(),
                    );
                }
            });
        });

    inner.response.interact(egui::Sense::click())
}

/// Queues a scroll so the list reveals the provider selected on the map
pub fn track_selection_focus(
    mut events: MessageReader<SelectionChanged>,
    mut sidebar: ResMut<SidebarState>,
) {
    for event in events.read() {
        if let Some(id) = &event.selected {
            sidebar.scroll_to = Some(id.clone());
        }
    }
}
