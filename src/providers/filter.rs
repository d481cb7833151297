use std::collections::BTreeSet;

use crate::constants::DEFAULT_RADIUS_KM;
use crate::geo::GeoPoint;
use crate::providers::record::ProviderRecord;

/// Sidebar filter state.
///
/// Filtering is a pure function over the fetched roster, so changing a
/// filter never touches the network and the logic tests without an app.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFilter {
    /// Case-insensitive match against provider name and services
    pub query: String,
    pub available_only: bool,
    /// Service category restriction; None means all categories
    pub category: Option<String>,
    /// Maximum distance from the search center, in kilometers
    pub radius_km: f32,
}

impl Default for ProviderFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            available_only: false,
            category: None,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl ProviderFilter {
    pub fn matches(&self, record: &ProviderRecord, center: GeoPoint) -> bool {
        if self.available_only && !record.available_now {
            return false;
        }

        if let Some(category) = &self.category
            && !record
                .services
                .iter()
                .any(|service| service.eq_ignore_ascii_case(category))
        {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        if !query.is_empty() {
            let name_hit = record.name.to_lowercase().contains(&query);
            let service_hit = record
                .services
                .iter()
                .any(|service| service.to_lowercase().contains(&query));
            if !name_hit && !service_hit {
                return false;
            }
        }

        // Unmapped providers pass the radius check; they have no distance
        // to measure and hiding them would make them unreachable entirely.
        if let Some(point) = record.coordinates
            && point.distance_km(&center) > f64::from(self.radius_km)
        {
            return false;
        }

        true
    }
}

/// Filter the roster down to the providers the sidebar and map should show.
pub fn apply_filter(
    records: &[ProviderRecord],
    filter: &ProviderFilter,
    center: GeoPoint,
) -> Vec<ProviderRecord> {
    records
        .iter()
        .filter(|record| filter.matches(record, center))
        .cloned()
        .collect()
}

/// Distinct service tags across the roster, lowercased and sorted, for the
/// category dropdown.
pub fn service_categories(records: &[ProviderRecord]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for record in records {
        for service in &record.services {
            tags.insert(service.to_lowercase());
        }
    }
    tags.into_iter().collect()
}
