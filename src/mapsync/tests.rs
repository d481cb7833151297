//! Unit tests for the sync controller, driven through a recording widget.

#![cfg(test)]

use std::collections::HashSet;

use crate::geo::GeoPoint;
use crate::mapsync::{
    ApplyOutcome, CameraPolicy, MapSync, MapWidget, MarkerRef, MarkerStyle, PopupContent,
    SelectOutcome, SelectionOrigin,
};
use crate::providers::{ProviderId, ProviderRecord};

/// Widget double that records every call and panics on contract violations
/// (dead handles, use after destroy), so sloppy call sequencing fails tests
/// instead of passing silently.
#[derive(Debug, Default)]
struct RecordingWidget {
    calls: Vec<Call>,
    live: HashSet<MarkerRef>,
    next_raw: u64,
    destroyed: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Add(MarkerRef, GeoPoint),
    Remove(MarkerRef),
    Restyle(MarkerRef, MarkerStyle),
    Move(MarkerRef, GeoPoint),
    OpenPopup(MarkerRef, String),
    CloseAllPopups,
    PanTo(GeoPoint),
    FitBounds(Vec<GeoPoint>),
    Destroy,
}

impl RecordingWidget {
    fn assert_alive(&self, marker: MarkerRef) {
        assert!(!self.destroyed, "widget call after destroy");
        assert!(
            self.live.contains(&marker),
            "operation on dead marker {:?}",
            marker
        );
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    fn adds(&self) -> usize {
        self.count(|c| matches!(c, Call::Add(..)))
    }

    fn removes(&self) -> usize {
        self.count(|c| matches!(c, Call::Remove(..)))
    }

    fn camera_moves(&self) -> usize {
        self.count(|c| matches!(c, Call::PanTo(_) | Call::FitBounds(_)))
    }

    fn position_of(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(|call| pred(call))
    }
}

impl MapWidget for RecordingWidget {
    fn add_marker(&mut self, at: GeoPoint, _style: MarkerStyle) -> MarkerRef {
        assert!(!self.destroyed, "add_marker after destroy");
        self.next_raw += 1;
        let marker = MarkerRef::new(self.next_raw);
        self.live.insert(marker);
        self.calls.push(Call::Add(marker, at));
        marker
    }

    fn remove_marker(&mut self, marker: MarkerRef) {
        self.assert_alive(marker);
        self.live.remove(&marker);
        self.calls.push(Call::Remove(marker));
    }

    fn set_marker_style(&mut self, marker: MarkerRef, style: MarkerStyle) {
        self.assert_alive(marker);
        self.calls.push(Call::Restyle(marker, style));
    }

    fn move_marker(&mut self, marker: MarkerRef, at: GeoPoint) {
        self.assert_alive(marker);
        self.calls.push(Call::Move(marker, at));
    }

    fn open_popup(&mut self, marker: MarkerRef, content: PopupContent) {
        self.assert_alive(marker);
        self.calls.push(Call::OpenPopup(marker, content.title));
    }

    fn close_all_popups(&mut self) {
        assert!(!self.destroyed, "close_all_popups after destroy");
        self.calls.push(Call::CloseAllPopups);
    }

    fn pan_to(&mut self, at: GeoPoint, _zoom: f32) {
        assert!(!self.destroyed, "pan_to after destroy");
        self.calls.push(Call::PanTo(at));
    }

    fn fit_bounds(&mut self, points: &[GeoPoint]) {
        assert!(!self.destroyed, "fit_bounds after destroy");
        self.calls.push(Call::FitBounds(points.to_vec()));
    }

    fn destroy(&mut self) {
        assert!(!self.destroyed, "destroy called twice");
        assert!(self.live.is_empty(), "destroy with markers still live");
        self.destroyed = true;
        self.calls.push(Call::Destroy);
    }
}

fn pid(id: &str) -> ProviderId {
    ProviderId::new(id)
}

fn provider(id: &str, coords: Option<(f64, f64)>) -> ProviderRecord {
    ProviderRecord {
        id: pid(id),
        coordinates: coords.and_then(|(lat, lng)| GeoPoint::checked(lat, lng)),
        available_now: true,
        name: format!("Provider {}", id),
        rating: Some(4.5),
        services: vec!["plumbing".to_string()],
        price_label: Some("$90/hr".to_string()),
        profile_url: None,
    }
}

fn unavailable(id: &str, coords: (f64, f64)) -> ProviderRecord {
    let mut record = provider(id, Some(coords));
    record.available_now = false;
    record
}

fn content_for(record: &ProviderRecord) -> PopupContent {
    PopupContent::from_record(record)
}

fn attached() -> MapSync<RecordingWidget> {
    let mut sync = MapSync::new();
    sync.attach(RecordingWidget::default());
    sync
}

fn calls(sync: &MapSync<RecordingWidget>) -> &RecordingWidget {
    sync.widget().unwrap()
}

// Reconciliation

#[test]
fn test_markers_match_mappable_providers() {
    let mut sync = attached();
    let roster = vec![
        provider("a", Some((44.97, -93.26))),
        provider("b", None),
        provider("c", Some((44.95, -93.30))),
        provider("d", Some((91.5, -93.2))), // latitude out of range
    ];
    sync.apply_update(&roster, CameraPolicy::Preserve);

    assert_eq!(sync.marker_count(), 2);
    assert!(sync.has_marker(&pid("a")));
    assert!(!sync.has_marker(&pid("b")));
    assert!(!sync.has_marker(&pid("d")));
    assert_eq!(calls(&sync).adds(), 2);
}

#[test]
fn test_unchanged_roster_is_a_noop() {
    let mut sync = attached();
    let roster = vec![
        provider("a", Some((44.97, -93.26))),
        provider("b", Some((44.95, -93.30))),
    ];
    sync.apply_update(&roster, CameraPolicy::Preserve);
    let before = calls(&sync).calls.len();

    let outcome = sync.apply_update(&roster, CameraPolicy::Preserve);
    assert_eq!(calls(&sync).calls.len(), before, "no widget calls expected");
    match outcome {
        ApplyOutcome::Applied(summary) => assert!(summary.is_noop()),
        ApplyOutcome::Queued => panic!("widget is attached"),
    }
}

#[test]
fn test_refresh_diffs_minimally() {
    let mut sync = attached();
    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("b", Some((44.95, -93.30))),
        ],
        CameraPolicy::Preserve,
    );

    let outcome = sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("c", Some((44.99, -93.20))),
        ],
        CameraPolicy::Preserve,
    );

    let ApplyOutcome::Applied(summary) = outcome else {
        panic!("widget is attached");
    };
    assert_eq!(summary.added, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.moved, 0);
    assert_eq!(summary.restyled, 0);
    assert_eq!(sync.marker_count(), 2);
}

#[test]
fn test_unmapped_provider_gets_no_marker_and_no_removal() {
    // The worked example: b never has coordinates, so it neither gains a
    // marker nor produces a removal when it later leaves the roster.
    let mut sync = attached();
    sync.apply_update(
        &[provider("a", Some((44.97, -93.26))), provider("b", None)],
        CameraPolicy::Preserve,
    );
    assert_eq!(calls(&sync).adds(), 1);

    let b = provider("b", None);
    let outcome = sync.select(&b.id, content_for(&b), SelectionOrigin::Sidebar);
    assert_eq!(outcome, SelectOutcome::NoMarker);

    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("c", Some((44.95, -93.30))),
        ],
        CameraPolicy::Preserve,
    );
    assert_eq!(calls(&sync).adds(), 2);
    assert_eq!(calls(&sync).removes(), 0);
}

#[test]
fn test_provider_position_change_moves_in_place() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    let marker = sync.marker_for(&pid("a")).unwrap();

    let outcome = sync.apply_update(&[provider("a", Some((44.98, -93.27)))], CameraPolicy::Preserve);

    let ApplyOutcome::Applied(summary) = outcome else {
        panic!("widget is attached");
    };
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.added, 0);
    assert_eq!(summary.removed, 0);
    // Same handle before and after; the marker was never recreated.
    assert_eq!(sync.marker_for(&pid("a")), Some(marker));
}

#[test]
fn test_availability_flip_restyles() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);

    let outcome = sync.apply_update(&[unavailable("a", (44.97, -93.26))], CameraPolicy::Preserve);

    let ApplyOutcome::Applied(summary) = outcome else {
        panic!("widget is attached");
    };
    assert_eq!(summary.restyled, 1);
    let restyle = calls(&sync)
        .calls
        .iter()
        .rev()
        .find_map(|call| match call {
            Call::Restyle(_, style) => Some(*style),
            _ => None,
        })
        .unwrap();
    assert!(!restyle.available);
}

#[test]
fn test_duplicate_ids_keep_first_occurrence() {
    let mut sync = attached();
    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("a", Some((10.0, 10.0))),
        ],
        CameraPolicy::Preserve,
    );

    assert_eq!(sync.marker_count(), 1);
    let added_at = calls(&sync)
        .calls
        .iter()
        .find_map(|call| match call {
            Call::Add(_, at) => Some(*at),
            _ => None,
        })
        .unwrap();
    assert_eq!(added_at, GeoPoint::checked(44.97, -93.26).unwrap());
}

#[test]
fn test_provider_coordinates_turning_invalid_removes_marker() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    assert_eq!(sync.marker_count(), 1);

    sync.apply_update(&[provider("a", None)], CameraPolicy::Preserve);
    assert_eq!(sync.marker_count(), 0);
    assert_eq!(calls(&sync).removes(), 1);
}

// Camera policy

#[test]
fn test_first_population_frames_markers() {
    let mut sync = attached();
    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("b", Some((44.95, -93.30))),
        ],
        CameraPolicy::Preserve,
    );

    let frames: Vec<_> = calls(&sync)
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::FitBounds(points) => Some(points.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), 2);
}

#[test]
fn test_background_refresh_preserves_camera() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    let moves_after_population = calls(&sync).camera_moves();

    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("b", Some((44.95, -93.30))),
        ],
        CameraPolicy::Preserve,
    );

    assert_eq!(calls(&sync).camera_moves(), moves_after_population);
}

#[test]
fn test_refit_policy_reframes() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    let before = calls(&sync).camera_moves();

    let outcome = sync.apply_update(
        &[provider("b", Some((44.95, -93.30)))],
        CameraPolicy::Refit,
    );

    let ApplyOutcome::Applied(summary) = outcome else {
        panic!("widget is attached");
    };
    assert!(summary.camera_refit);
    assert_eq!(calls(&sync).camera_moves(), before + 1);
}

#[test]
fn test_empty_roster_never_moves_camera() {
    let mut sync = attached();
    sync.apply_update(&[], CameraPolicy::Refit);
    assert_eq!(calls(&sync).camera_moves(), 0);

    // The next population is still treated as the first.
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    assert_eq!(calls(&sync).camera_moves(), 1);
}

#[test]
fn test_emptied_then_repopulated_roster_reframes() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    sync.apply_update(&[], CameraPolicy::Preserve);
    let before = calls(&sync).camera_moves();

    sync.apply_update(&[provider("b", Some((44.95, -93.30)))], CameraPolicy::Preserve);
    assert_eq!(calls(&sync).camera_moves(), before + 1);
}

#[test]
fn test_refit_over_current_markers() {
    let mut sync = attached();
    assert!(!sync.refit(), "nothing to frame yet");

    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    let before = calls(&sync).camera_moves();
    assert!(sync.refit());
    assert_eq!(calls(&sync).camera_moves(), before + 1);
}

// Selection

#[test]
fn test_selection_protocol_order() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    sync.apply_update(&[a.clone()], CameraPolicy::Preserve);

    let outcome = sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);
    assert_eq!(outcome, SelectOutcome::Changed);
    assert_eq!(sync.selection(), Some(&pid("a")));

    let widget = calls(&sync);
    let close = widget
        .position_of(|c| matches!(c, Call::CloseAllPopups))
        .unwrap();
    let open = widget
        .position_of(|c| matches!(c, Call::OpenPopup(..)))
        .unwrap();
    let pan = widget.position_of(|c| matches!(c, Call::PanTo(_))).unwrap();
    let restyle = widget
        .position_of(|c| matches!(c, Call::Restyle(_, s) if s.selected))
        .unwrap();
    assert!(close < open && open < pan && pan < restyle);
}

#[test]
fn test_selection_switch_restyles_both_markers() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    let b = provider("b", Some((44.95, -93.30)));
    sync.apply_update(&[a.clone(), b.clone()], CameraPolicy::Preserve);
    let marker_a = sync.marker_for(&a.id).unwrap();
    let marker_b = sync.marker_for(&b.id).unwrap();

    sync.select(&a.id, content_for(&a), SelectionOrigin::Sidebar);
    sync.select(&b.id, content_for(&b), SelectionOrigin::Marker);

    assert_eq!(sync.selection(), Some(&pid("b")));
    let widget = calls(&sync);
    assert!(widget.calls.contains(&Call::Restyle(
        marker_b,
        MarkerStyle::for_provider(true, true)
    )));
    assert!(widget.calls.contains(&Call::Restyle(
        marker_a,
        MarkerStyle::for_provider(true, false)
    )));
}

#[test]
fn test_reselecting_same_provider_reopens_popup() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    sync.apply_update(&[a.clone()], CameraPolicy::Preserve);

    sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);
    let restyles_before = calls(&sync).count(|c| matches!(c, Call::Restyle(..)));

    let outcome = sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);
    assert_eq!(outcome, SelectOutcome::Reaffirmed);
    // Popup re-ran, but the style was already selected.
    assert_eq!(
        calls(&sync).count(|c| matches!(c, Call::Restyle(..))),
        restyles_before
    );
    assert_eq!(calls(&sync).count(|c| matches!(c, Call::OpenPopup(..))), 2);
}

#[test]
fn test_select_before_attach_is_refused() {
    let mut sync: MapSync<RecordingWidget> = MapSync::new();
    let a = provider("a", Some((44.97, -93.26)));
    let outcome = sync.select(&a.id, content_for(&a), SelectionOrigin::Sidebar);
    assert_eq!(outcome, SelectOutcome::NotReady);
}

#[test]
fn test_selection_survives_background_refresh() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    sync.apply_update(&[a.clone()], CameraPolicy::Preserve);
    sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);
    let restyles_before = calls(&sync).count(|c| matches!(c, Call::Restyle(..)));

    sync.apply_update(
        &[a.clone(), provider("b", Some((44.95, -93.30)))],
        CameraPolicy::Preserve,
    );

    assert_eq!(sync.selection(), Some(&pid("a")));
    // The retained pass recomputed a's style as selected, so no restyle.
    assert_eq!(
        calls(&sync).count(|c| matches!(c, Call::Restyle(..))),
        restyles_before
    );
}

#[test]
fn test_removing_selected_provider_clears_selection() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    let b = provider("b", Some((44.95, -93.30)));
    sync.apply_update(&[a.clone(), b.clone()], CameraPolicy::Preserve);
    sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);

    let outcome = sync.apply_update(&[b.clone()], CameraPolicy::Preserve);

    let ApplyOutcome::Applied(summary) = outcome else {
        panic!("widget is attached");
    };
    assert!(summary.selection_dropped);
    assert_eq!(sync.selection(), None);
    let widget = calls(&sync);
    let close = widget
        .calls
        .iter()
        .rposition(|c| matches!(c, Call::CloseAllPopups))
        .unwrap();
    let remove = widget
        .calls
        .iter()
        .rposition(|c| matches!(c, Call::Remove(_)))
        .unwrap();
    assert!(close < remove, "popup closes before its marker is removed");
}

#[test]
fn test_clear_selection() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    sync.apply_update(&[a.clone()], CameraPolicy::Preserve);
    sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);

    assert!(sync.clear_selection());
    assert_eq!(sync.selection(), None);
    let restyle = calls(&sync)
        .calls
        .iter()
        .rev()
        .find_map(|call| match call {
            Call::Restyle(_, style) => Some(*style),
            _ => None,
        })
        .unwrap();
    assert!(!restyle.selected);

    let before = calls(&sync).calls.len();
    assert!(!sync.clear_selection());
    assert_eq!(calls(&sync).calls.len(), before);
}

// Lifecycle

#[test]
fn test_updates_before_attach_queue_and_coalesce() {
    let mut sync: MapSync<RecordingWidget> = MapSync::new();
    let outcome = sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    assert!(matches!(outcome, ApplyOutcome::Queued));
    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("b", Some((44.95, -93.30))),
            provider("c", Some((44.99, -93.20))),
        ],
        CameraPolicy::Preserve,
    );

    let summary = sync.attach(RecordingWidget::default()).unwrap();
    assert_eq!(summary.added, 3, "only the newest queued roster applies");
    assert_eq!(calls(&sync).adds(), 3);
}

#[test]
fn test_dispose_removes_markers_then_destroys() {
    let mut sync = attached();
    sync.apply_update(
        &[
            provider("a", Some((44.97, -93.26))),
            provider("b", Some((44.95, -93.30))),
        ],
        CameraPolicy::Preserve,
    );

    let widget = sync.dispose().unwrap();
    assert_eq!(widget.count(|c| matches!(c, Call::Remove(_))), 2);
    assert!(widget.destroyed);
    assert!(matches!(widget.calls.last(), Some(Call::Destroy)));

    assert!(sync.dispose().is_none(), "second dispose is a no-op");
    assert!(!sync.is_attached());
    assert_eq!(sync.marker_count(), 0);
}

#[test]
fn test_dispose_with_selection_closes_popup_first() {
    let mut sync = attached();
    let a = provider("a", Some((44.97, -93.26)));
    sync.apply_update(&[a.clone()], CameraPolicy::Preserve);
    sync.select(&a.id, content_for(&a), SelectionOrigin::Marker);

    let widget = sync.dispose().unwrap();
    let close = widget
        .calls
        .iter()
        .rposition(|c| matches!(c, Call::CloseAllPopups))
        .unwrap();
    let remove = widget
        .calls
        .iter()
        .rposition(|c| matches!(c, Call::Remove(_)))
        .unwrap();
    assert!(close < remove);
}

#[test]
fn test_dispose_drops_queued_roster() {
    let mut sync: MapSync<RecordingWidget> = MapSync::new();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);

    assert!(sync.dispose().is_none(), "nothing attached to tear down");
    assert!(
        sync.attach(RecordingWidget::default()).is_none(),
        "queued roster was dropped by dispose"
    );
    assert_eq!(calls(&sync).adds(), 0);
}

#[test]
fn test_attach_while_attached_is_ignored() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);

    assert!(sync.attach(RecordingWidget::default()).is_none());
    assert_eq!(sync.marker_count(), 1);
    // The original widget kept its markers.
    assert_eq!(calls(&sync).adds(), 1);
}

#[test]
fn test_reattach_after_dispose_starts_fresh() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    sync.dispose();

    sync.attach(RecordingWidget::default());
    assert!(sync.is_attached());
    assert_eq!(sync.marker_count(), 0);

    // First population on the fresh widget reframes again.
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);
    assert_eq!(calls(&sync).camera_moves(), 1);
}

#[test]
fn test_marker_lookup_round_trip() {
    let mut sync = attached();
    sync.apply_update(&[provider("a", Some((44.97, -93.26)))], CameraPolicy::Preserve);

    let marker = sync.marker_for(&pid("a")).unwrap();
    assert_eq!(sync.provider_for_marker(marker), Some(&pid("a")));
    assert_eq!(sync.provider_for_marker(MarkerRef::new(999)), None);
}
