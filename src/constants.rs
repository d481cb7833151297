//! Application-wide constants.

// Window defaults
pub const DEFAULT_WINDOW_WIDTH: f32 = 1440.0;
pub const DEFAULT_WINDOW_HEIGHT: f32 = 900.0;

// Marker rendering. Markers keep a constant on-screen size, so these are
// pixel values before the camera counter-scale is applied.
pub const MARKER_SIZE: f32 = 18.0;
/// Extra pick radius around a marker for click hit-testing, in pixels
pub const MARKER_PICK_SLOP: f32 = 6.0;

// Camera zoom. Zoom is orthographic scale: world meters per screen pixel,
// so larger values show a wider area.
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 50.0;
/// Fallback zoom when the basemap manifest does not carry one (~17 km across)
pub const DEFAULT_ZOOM: f32 = 12.0;
/// Zoom applied when panning to a selected provider (~1 km across)
pub const FOCUS_ZOOM: f32 = 0.7;
/// Margin factor applied when framing all markers
pub const FIT_BOUNDS_PADDING: f32 = 1.15;

// Search radius bounds (kilometers)
pub const MIN_RADIUS_KM: f32 = 1.0;
pub const MAX_RADIUS_KM: f32 = 50.0;
pub const DEFAULT_RADIUS_KM: f32 = 15.0;

// Network
pub const HTTP_TIMEOUT_SECS: u64 = 10;
