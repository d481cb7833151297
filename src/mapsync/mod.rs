//! Roster-to-map state synchronization.
//!
//! [`MapSync`] owns the mapping from provider ids to live marker handles
//! and is the only code that talks to a [`MapWidget`]. It is plain data
//! rather than an ECS citizen, so the whole reconciliation and selection
//! protocol runs in unit tests against a recording widget; the map module
//! wraps one instance in a resource and feeds it messages.
//!
//! ## Key Types
//!
//! - [`MapSync`]: diffing controller, one per map widget
//! - [`MapWidget`]: the backend trait the scene renderer implements
//! - [`MarkerStyle`]: marker presentation as a pure function of provider state
//! - [`PopupContent`]: typed popup body
//! - [`CameraPolicy`]: whether a roster update may move the camera

mod content;
mod controller;
mod style;
mod tests;
mod widget;

pub use content::PopupContent;
pub use controller::{
    ApplyOutcome, CameraPolicy, MapSync, ReconcileSummary, SelectOutcome, SelectionOrigin,
};
pub use style::MarkerStyle;
pub use widget::{MapWidget, MarkerRef};
