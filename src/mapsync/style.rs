use bevy::prelude::*;

use crate::theme;

/// Visual state of one marker.
///
/// Recomputed wholesale from provider fields on every reconcile pass rather
/// than mutated piecemeal, so a marker can never be left half-styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    pub available: bool,
    pub selected: bool,
}

impl MarkerStyle {
    pub fn for_provider(available: bool, selected: bool) -> Self {
        Self {
            available,
            selected,
        }
    }

    /// Fill color for the marker dot. Selection wins over availability.
    pub fn fill(&self) -> Color {
        if self.selected {
            theme::MARKER_SELECTED
        } else if self.available {
            theme::MARKER_AVAILABLE
        } else {
            theme::MARKER_UNAVAILABLE
        }
    }

    /// On-screen size multiplier; the selected marker reads slightly larger.
    pub fn size_factor(&self) -> f32 {
        if self.selected {
            1.35
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_wins_over_availability() {
        let style = MarkerStyle::for_provider(true, true);
        assert_eq!(style.fill(), theme::MARKER_SELECTED);
    }

    #[test]
    fn test_unavailable_fill() {
        let style = MarkerStyle::for_provider(false, false);
        assert_eq!(style.fill(), theme::MARKER_UNAVAILABLE);
    }

    #[test]
    fn test_selected_marker_is_larger() {
        assert!(
            MarkerStyle::for_provider(true, true).size_factor()
                > MarkerStyle::for_provider(true, false).size_factor()
        );
    }
}
