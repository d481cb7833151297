//! Centralized color theme for the application.
//!
//! This module provides all colors used throughout the map view and UI.
//! Modify values here to change the application's color scheme.

use bevy::prelude::Color;
use bevy_egui::egui;

// ============================================================================
// Basemap Colors
// ============================================================================

/// Background clear color for the map scene (muted paper tone)
pub const BASEMAP_BACKGROUND: Color = Color::srgb(0.93, 0.92, 0.89);

/// Semi-transparent grey graticule lines
pub const GRATICULE_COLOR: Color = Color::srgba(0.45, 0.45, 0.5, 0.25);

/// Slightly stronger line for whole-degree graticules
pub const GRATICULE_MAJOR_COLOR: Color = Color::srgba(0.45, 0.45, 0.5, 0.45);

// ============================================================================
// Marker Colors
// ============================================================================

/// Marker fill for a provider that is available now
pub const MARKER_AVAILABLE: Color = Color::srgb(0.18, 0.62, 0.33);

/// Marker fill for a provider that is not currently available
pub const MARKER_UNAVAILABLE: Color = Color::srgb(0.55, 0.57, 0.62);

/// Marker fill for the selected provider (availability-independent accent)
pub const MARKER_SELECTED: Color = Color::srgb(0.93, 0.42, 0.13);

/// Ring drawn around the selected marker
pub const SELECTION_RING: Color = Color::srgba(0.93, 0.42, 0.13, 0.85);

// ============================================================================
// UI Colors (egui)
// ============================================================================

pub mod ui {
    use bevy_egui::egui;

    /// Green "available now" badge
    pub const AVAILABLE_BADGE: egui::Color32 = egui::Color32::from_rgb(60, 170, 90);

    /// Grey "unavailable" badge
    pub const UNAVAILABLE_BADGE: egui::Color32 = egui::Color32::from_rgb(140, 145, 155);

    /// Gold rating stars
    pub const RATING_TEXT: egui::Color32 = egui::Color32::from_rgb(235, 180, 50);

    /// Light grey for label text
    pub const LABEL_TEXT: egui::Color32 = egui::Color32::LIGHT_GRAY;

    /// Grey for help/hint text
    pub const HINT_TEXT: egui::Color32 = egui::Color32::GRAY;

    /// Red for error messages
    pub const ERROR_TEXT: egui::Color32 = egui::Color32::RED;

    /// Highlight fill behind the selected sidebar card
    pub const SELECTED_CARD_FILL: egui::Color32 = egui::Color32::from_rgb(55, 70, 90);

    /// Semi-transparent black overlay behind modal dialogs
    pub const MODAL_OVERLAY: egui::Color32 = egui::Color32::from_black_alpha(100);
}

// ============================================================================
// Color Conversion Utilities
// ============================================================================

/// Convert a Bevy Color to egui Color32 (fully opaque)
pub fn bevy_to_egui_opaque(color: Color) -> egui::Color32 {
    let srgba = color.to_srgba();
    egui::Color32::from_rgba_unmultiplied(
        (srgba.red * 255.0) as u8,
        (srgba.green * 255.0) as u8,
        (srgba.blue * 255.0) as u8,
        255,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bevy_to_egui_opaque_channels() {
        let converted = bevy_to_egui_opaque(Color::srgb(1.0, 0.0, 0.0));
        assert_eq!(converted, egui::Color32::from_rgb(255, 0, 0));
    }

    #[test]
    fn test_bevy_to_egui_opaque_discards_alpha() {
        let converted = bevy_to_egui_opaque(Color::srgba(0.0, 1.0, 0.0, 0.25));
        assert_eq!(converted.a(), 255);
    }
}
