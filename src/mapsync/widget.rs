use crate::geo::GeoPoint;
use crate::mapsync::content::PopupContent;
use crate::mapsync::style::MarkerStyle;

/// Opaque handle to one marker owned by a widget backend.
///
/// Handles are minted by [`MapWidget::add_marker`] and stay valid until the
/// marker is removed or the widget is destroyed. Nothing outside the backend
/// looks inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerRef(u64);

impl MarkerRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Everything the sync controller needs from a map backend.
///
/// Implementations are synchronous and single-threaded; the controller only
/// calls them between attach and dispose. Calls never fail: a backend asked
/// to touch a marker it no longer knows logs a warning and does nothing,
/// since the controller tracks liveness itself and a dead handle reaching
/// the backend means a bug upstream.
pub trait MapWidget {
    /// Create a marker at a location and return its handle.
    fn add_marker(&mut self, at: GeoPoint, style: MarkerStyle) -> MarkerRef;

    /// Remove a marker. The handle is dead afterwards.
    fn remove_marker(&mut self, marker: MarkerRef);

    /// Restyle a marker in place.
    fn set_marker_style(&mut self, marker: MarkerRef, style: MarkerStyle);

    /// Move a marker to a new location without recreating it.
    fn move_marker(&mut self, marker: MarkerRef, at: GeoPoint);

    /// Open the popup for a marker, replacing any popup already open.
    fn open_popup(&mut self, marker: MarkerRef, content: PopupContent);

    /// Close every open popup. Safe to call when none is open.
    fn close_all_popups(&mut self);

    /// Center the view on a location at the given zoom.
    fn pan_to(&mut self, at: GeoPoint, zoom: f32);

    /// Frame the given locations with some margin. A single location
    /// behaves like [`MapWidget::pan_to`] at the focus zoom; an empty
    /// slice is a no-op.
    fn fit_bounds(&mut self, points: &[GeoPoint]);

    /// Tear the backend down. The controller never touches the widget
    /// again after this.
    fn destroy(&mut self);
}
