use bevy::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::constants::FOCUS_ZOOM;
use crate::geo::GeoPoint;
use crate::mapsync::content::PopupContent;
use crate::mapsync::style::MarkerStyle;
use crate::mapsync::widget::{MapWidget, MarkerRef};
use crate::providers::{ProviderId, ProviderRecord};

/// Camera behavior for one roster update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPolicy {
    /// Keep the current viewport. The default for background refreshes.
    Preserve,
    /// Reframe around the surviving markers, as after an explicit re-search.
    Refit,
}

/// Where a selection request came from. Both paths run the same protocol;
/// the origin only matters for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    Marker,
    Sidebar,
}

/// What [`MapSync::apply_update`] did with the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Reconciled against the live widget.
    Applied(ReconcileSummary),
    /// No widget attached; the roster was queued for the next attach.
    /// Only the newest queued roster survives.
    Queued,
}

/// Widget mutations issued by one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    pub moved: usize,
    pub restyled: usize,
    pub camera_refit: bool,
    /// The selected provider left the roster and the selection was dropped.
    pub selection_dropped: bool,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Selection moved to this provider.
    Changed,
    /// The provider was already selected; popup and pan re-ran.
    Reaffirmed,
    /// No marker for this provider (no valid location, or not in the
    /// current roster). Logged and ignored.
    NoMarker,
    /// No widget attached. Logged and ignored.
    NotReady,
}

struct MarkerHandle {
    marker: MarkerRef,
    at: GeoPoint,
    style: MarkerStyle,
}

/// Queued roster waiting for a widget to attach.
struct PendingUpdate {
    providers: Vec<ProviderRecord>,
    camera: CameraPolicy,
}

/// Diffing controller that keeps one map widget in step with the provider
/// roster.
///
/// Owns the id-to-marker table and the selection, and is the only code that
/// calls the widget. Updates arriving before a widget is attached are
/// queued (newest wins) and replayed on attach, so callers never have to
/// care whether the map has finished booting.
pub struct MapSync<W: MapWidget> {
    widget: Option<W>,
    markers: HashMap<ProviderId, MarkerHandle>,
    selection: Option<ProviderId>,
    pending: Option<PendingUpdate>,
    /// Whether any reconcile has left markers on the map. Cleared when the
    /// roster empties so the next population reframes the camera.
    populated: bool,
}

impl<W: MapWidget> Default for MapSync<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: MapWidget> MapSync<W> {
    pub fn new() -> Self {
        Self {
            widget: None,
            markers: HashMap::new(),
            selection: None,
            pending: None,
            populated: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.widget.is_some()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_marker(&self, id: &ProviderId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn selection(&self) -> Option<&ProviderId> {
        self.selection.as_ref()
    }

    pub fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    pub fn widget_mut(&mut self) -> Option<&mut W> {
        self.widget.as_mut()
    }

    pub fn marker_for(&self, id: &ProviderId) -> Option<MarkerRef> {
        self.markers.get(id).map(|handle| handle.marker)
    }

    /// Reverse lookup for hit-testing: which provider owns this marker.
    pub fn provider_for_marker(&self, marker: MarkerRef) -> Option<&ProviderId> {
        self.markers
            .iter()
            .find(|(_, handle)| handle.marker == marker)
            .map(|(id, _)| id)
    }

    /// Hand a freshly initialized widget to the controller. If a roster was
    /// queued while no widget was attached, it is reconciled immediately
    /// and the summary returned.
    pub fn attach(&mut self, widget: W) -> Option<ReconcileSummary> {
        if self.widget.is_some() {
            warn!("attach called while a widget is already attached; ignoring");
            return None;
        }
        self.widget = Some(widget);
        self.populated = false;
        if let Some(queued) = self.pending.take() {
            debug!(
                "replaying queued roster of {} providers onto fresh widget",
                queued.providers.len()
            );
            return Some(self.reconcile(&queued.providers, queued.camera));
        }
        None
    }

    /// Bring the markers in line with a new roster.
    ///
    /// Providers without a valid location are skipped silently; they stay
    /// in the directory but get no marker. Markers whose provider survives
    /// are kept and trued up in place, never recreated.
    pub fn apply_update(
        &mut self,
        providers: &[ProviderRecord],
        camera: CameraPolicy,
    ) -> ApplyOutcome {
        if self.widget.is_none() {
            debug!(
                "no widget attached; queued roster of {} providers",
                providers.len()
            );
            self.pending = Some(PendingUpdate {
                providers: providers.to_vec(),
                camera,
            });
            return ApplyOutcome::Queued;
        }
        ApplyOutcome::Applied(self.reconcile(providers, camera))
    }

    fn reconcile(&mut self, providers: &[ProviderRecord], camera: CameraPolicy) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let Some(widget) = self.widget.as_mut() else {
            return summary;
        };

        // Mappable subset of the roster, in list order. Duplicate ids keep
        // their first occurrence.
        let mut incoming: Vec<(&ProviderId, GeoPoint, bool)> = Vec::new();
        let mut seen: HashSet<&ProviderId> = HashSet::new();
        for record in providers {
            let Some(point) = record.coordinates else {
                continue;
            };
            if !seen.insert(&record.id) {
                warn!("duplicate provider id {} in roster, keeping the first", record.id);
                continue;
            }
            incoming.push((&record.id, point, record.available_now));
        }

        // Markers whose provider left the roster go first, so the widget
        // never holds two markers for reused screen territory.
        let stale: Vec<ProviderId> = self
            .markers
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            if let Some(handle) = self.markers.remove(id) {
                if self.selection.as_ref() == Some(id) {
                    debug!("selected provider {} left the roster; clearing selection", id);
                    widget.close_all_popups();
                    self.selection = None;
                    summary.selection_dropped = true;
                }
                widget.remove_marker(handle.marker);
                summary.removed += 1;
            }
        }

        // New providers get markers; retained ones are trued up in place.
        for &(id, point, available) in &incoming {
            let selected = self.selection.as_ref() == Some(id);
            let style = MarkerStyle::for_provider(available, selected);
            match self.markers.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    let marker = widget.add_marker(point, style);
                    slot.insert(MarkerHandle { marker, at: point, style });
                    summary.added += 1;
                }
                Entry::Occupied(mut slot) => {
                    let handle = slot.get_mut();
                    if handle.at != point {
                        widget.move_marker(handle.marker, point);
                        handle.at = point;
                        summary.moved += 1;
                    }
                    if handle.style != style {
                        widget.set_marker_style(handle.marker, style);
                        handle.style = style;
                        summary.restyled += 1;
                    }
                }
            }
        }

        // Camera moves only when the map first gains markers or the update
        // explicitly asks for a reframe. A refit that would frame nothing
        // leaves the camera alone.
        let needs_fit = !self.markers.is_empty()
            && (camera == CameraPolicy::Refit || !self.populated);
        if needs_fit {
            let points: Vec<GeoPoint> = incoming.iter().map(|&(_, point, _)| point).collect();
            widget.fit_bounds(&points);
            summary.camera_refit = true;
        }
        self.populated = !self.markers.is_empty();

        summary
    }

    /// Run the selection protocol for a provider, symmetric for marker
    /// clicks and sidebar clicks: close popups, open this provider's popup,
    /// pan to it, and restyle the markers that gained and lost selection.
    pub fn select(
        &mut self,
        id: &ProviderId,
        content: PopupContent,
        origin: SelectionOrigin,
    ) -> SelectOutcome {
        let Some(widget) = self.widget.as_mut() else {
            warn!("selection of {} ignored; map not ready", id);
            return SelectOutcome::NotReady;
        };
        if !self.markers.contains_key(id) {
            warn!("selection of {} ignored; provider has no marker", id);
            return SelectOutcome::NoMarker;
        }

        let previous = self.selection.take();
        let reaffirmed = previous.as_ref() == Some(id);
        self.selection = Some(id.clone());

        if let Some(handle) = self.markers.get_mut(id) {
            widget.close_all_popups();
            widget.open_popup(handle.marker, content);
            widget.pan_to(handle.at, FOCUS_ZOOM);
            let style = MarkerStyle::for_provider(handle.style.available, true);
            if style != handle.style {
                widget.set_marker_style(handle.marker, style);
                handle.style = style;
            }
        }

        // The marker losing selection reverts to its availability color.
        if let Some(prev) = &previous
            && prev != id
            && let Some(handle) = self.markers.get_mut(prev)
        {
            let style = MarkerStyle::for_provider(handle.style.available, false);
            if style != handle.style {
                widget.set_marker_style(handle.marker, style);
                handle.style = style;
            }
        }

        debug!("selected provider {} via {:?}", id, origin);
        if reaffirmed {
            SelectOutcome::Reaffirmed
        } else {
            SelectOutcome::Changed
        }
    }

    /// Drop the selection and close its popup. Returns whether anything
    /// was selected.
    pub fn clear_selection(&mut self) -> bool {
        let Some(widget) = self.widget.as_mut() else {
            return false;
        };
        let Some(previous) = self.selection.take() else {
            return false;
        };
        widget.close_all_popups();
        if let Some(handle) = self.markers.get_mut(&previous) {
            let style = MarkerStyle::for_provider(handle.style.available, false);
            if style != handle.style {
                widget.set_marker_style(handle.marker, style);
                handle.style = style;
            }
        }
        debug!("selection cleared");
        true
    }

    /// Reframe the camera around the current markers, as for a recenter
    /// button. Returns whether a reframe happened.
    pub fn refit(&mut self) -> bool {
        let Some(widget) = self.widget.as_mut() else {
            return false;
        };
        if self.markers.is_empty() {
            return false;
        }
        let points: Vec<GeoPoint> = self.markers.values().map(|handle| handle.at).collect();
        widget.fit_bounds(&points);
        true
    }

    /// Tear the widget down: close popups, remove every marker, destroy,
    /// and hand the widget back so the caller can flush its final state.
    /// Queued rosters are dropped. Calling this twice, or before any widget
    /// attached, is a safe no-op returning None.
    pub fn dispose(&mut self) -> Option<W> {
        self.pending = None;
        let mut widget = self.widget.take()?;
        if self.selection.take().is_some() {
            widget.close_all_popups();
        }
        for (_, handle) in self.markers.drain() {
            widget.remove_marker(handle.marker);
        }
        widget.destroy();
        self.populated = false;
        info!("map widget disposed");
        Some(widget)
    }
}
