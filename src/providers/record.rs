use bevy::prelude::*;
use serde::Deserialize;
use std::fmt;

use crate::geo::GeoPoint;

/// Stable provider identifier. Opaque everywhere outside this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One provider as the rest of the app sees it.
///
/// Coordinates are validated at parse time; `None` means the provider
/// cannot be placed on the map but still shows in the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub coordinates: Option<GeoPoint>,
    pub available_now: bool,
    pub name: String,
    pub rating: Option<f32>,
    pub services: Vec<String>,
    pub price_label: Option<String>,
    pub profile_url: Option<String>,
}

/// Wire shape of one provider entry.
///
/// Example JSON:
/// ```json
/// {
///   "id": "prv_0412",
///   "coordinates": [44.9778, -93.265],
///   "isAvailableNow": true,
///   "displayMeta": {
///     "name": "Lakeside Plumbing",
///     "rating": 4.8,
///     "services": ["plumbing", "heating"],
///     "price": "$95/hr",
///     "profileUrl": "https://providers.example.com/p/lakeside-plumbing"
///   }
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProvider {
    id: String,
    /// Kept as a raw value: the backend has shipped null, missing, string
    /// and short-array forms of this field over the years.
    #[serde(default)]
    coordinates: Option<serde_json::Value>,
    #[serde(default)]
    is_available_now: bool,
    #[serde(default)]
    display_meta: WireDisplayMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDisplayMeta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<f32>,
    #[serde(default)]
    services: Vec<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    profile_url: Option<String>,
}

impl WireProvider {
    fn into_record(self) -> ProviderRecord {
        let coordinates = lenient_point(self.coordinates.as_ref());
        let meta = self.display_meta;
        let name = meta
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Provider {}", self.id));
        let rating = meta.rating.filter(|r| (0.0..=5.0).contains(r));

        ProviderRecord {
            id: ProviderId::new(self.id),
            coordinates,
            available_now: self.is_available_now,
            name,
            rating,
            services: meta.services,
            price_label: meta.price,
            profile_url: meta.profile_url,
        }
    }
}

/// Interpret a wire coordinate value as `[lat, lng]`. Anything that does
/// not yield a valid point becomes `None`.
fn lenient_point(value: Option<&serde_json::Value>) -> Option<GeoPoint> {
    let array = value?.as_array()?;
    if array.len() != 2 {
        return None;
    }
    let lat = array[0].as_f64()?;
    let lng = array[1].as_f64()?;
    GeoPoint::checked(lat, lng)
}

/// Outcome of decoding a roster payload.
#[derive(Debug, Default)]
pub struct ParsedRoster {
    pub records: Vec<ProviderRecord>,
    /// Entries dropped because they could not be decoded at all
    pub skipped: usize,
}

/// Decode a roster payload entry by entry. A malformed entry is logged and
/// skipped rather than failing the whole list.
pub fn parse_roster(values: Vec<serde_json::Value>) -> ParsedRoster {
    let mut roster = ParsedRoster::default();
    for value in values {
        match serde_json::from_value::<WireProvider>(value) {
            Ok(wire) => roster.records.push(wire.into_record()),
            Err(e) => {
                warn!("Skipping undecodable provider entry: {}", e);
                roster.skipped += 1;
            }
        }
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(json: &str) -> ProviderRecord {
        let roster = parse_roster(vec![serde_json::from_str(json).unwrap()]);
        assert_eq!(roster.skipped, 0);
        roster.records.into_iter().next().unwrap()
    }

    #[test]
    fn test_parse_full_entry() {
        let record = parse_one(
            r#"{
                "id": "prv_1",
                "coordinates": [44.9778, -93.265],
                "isAvailableNow": true,
                "displayMeta": {
                    "name": "Lakeside Plumbing",
                    "rating": 4.8,
                    "services": ["plumbing", "heating"],
                    "price": "$95/hr",
                    "profileUrl": "https://example.com/p/1"
                }
            }"#,
        );

        assert_eq!(record.id.as_str(), "prv_1");
        assert_eq!(record.coordinates, GeoPoint::checked(44.9778, -93.265));
        assert!(record.available_now);
        assert_eq!(record.name, "Lakeside Plumbing");
        assert_eq!(record.rating, Some(4.8));
        assert_eq!(record.price_label.as_deref(), Some("$95/hr"));
    }

    #[test]
    fn test_null_coordinates_become_none() {
        let record = parse_one(r#"{"id": "prv_2", "coordinates": null}"#);
        assert_eq!(record.coordinates, None);
    }

    #[test]
    fn test_missing_coordinates_become_none() {
        let record = parse_one(r#"{"id": "prv_3"}"#);
        assert_eq!(record.coordinates, None);
        assert!(!record.available_now);
    }

    #[test]
    fn test_malformed_coordinates_become_none() {
        for coords in [
            r#""not an array""#,
            r#"[44.9]"#,
            r#"[44.9, -93.2, 7.0]"#,
            r#"["44.9", "-93.2"]"#,
            r#"[91.0, -93.2]"#,
            r#"[44.9, -181.0]"#,
        ] {
            let json = format!(r#"{{"id": "prv_4", "coordinates": {}}}"#, coords);
            let record = parse_one(&json);
            assert_eq!(record.coordinates, None, "coords {} should drop", coords);
        }
    }

    #[test]
    fn test_entry_without_id_is_skipped() {
        let roster = parse_roster(vec![
            serde_json::from_str(r#"{"coordinates": [44.9, -93.2]}"#).unwrap(),
            serde_json::from_str(r#"{"id": "prv_5"}"#).unwrap(),
        ]);
        assert_eq!(roster.skipped, 1);
        assert_eq!(roster.records.len(), 1);
        assert_eq!(roster.records[0].id.as_str(), "prv_5");
    }

    #[test]
    fn test_blank_name_falls_back_to_id() {
        let record = parse_one(r#"{"id": "prv_6", "displayMeta": {"name": "  "}}"#);
        assert_eq!(record.name, "Provider prv_6");
    }

    #[test]
    fn test_out_of_range_rating_dropped() {
        let record = parse_one(r#"{"id": "prv_7", "displayMeta": {"rating": 11.0}}"#);
        assert_eq!(record.rating, None);
    }
}
