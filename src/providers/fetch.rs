use bevy::prelude::*;
use std::time::Duration;

use crate::constants::HTTP_TIMEOUT_SECS;
use crate::providers::record::{parse_roster, ProviderRecord};

/// Bundled sample roster used when no data service is configured.
const SAMPLE_ROSTER: &str = include_str!("sample_providers.json");

/// Where a roster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterSource {
    /// The configured provider data service
    Service,
    /// The roster bundled into the binary
    Sample,
}

/// Result of one roster fetch.
pub struct FetchResult {
    pub records: Option<Vec<ProviderRecord>>,
    /// Entries dropped during decode
    pub skipped: usize,
    pub source: RosterSource,
    pub error: Option<String>,
}

impl FetchResult {
    fn failure(source: RosterSource, message: String) -> Self {
        Self {
            records: None,
            skipped: 0,
            source,
            error: Some(message),
        }
    }
}

/// Fetch the provider roster, from the data service when one is configured
/// and from the bundled sample otherwise. Blocking; run on a task pool.
pub fn fetch_roster(data_url: Option<String>) -> FetchResult {
    match data_url {
        Some(base) => fetch_from_service(&base),
        None => load_sample(),
    }
}

fn providers_endpoint(base: &str) -> String {
    format!("{}/providers", base.trim_end_matches('/'))
}

fn fetch_from_service(base: &str) -> FetchResult {
    let url = providers_endpoint(base);
    let response = ureq::get(&url)
        .set("User-Agent", concat!("promap/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .call();

    match response {
        Ok(resp) => match resp.into_json::<Vec<serde_json::Value>>() {
            Ok(values) => {
                let roster = parse_roster(values);
                if roster.skipped > 0 {
                    warn!(
                        "{} provider entries could not be decoded and were skipped",
                        roster.skipped
                    );
                }
                FetchResult {
                    records: Some(roster.records),
                    skipped: roster.skipped,
                    source: RosterSource::Service,
                    error: None,
                }
            }
            Err(e) => FetchResult::failure(
                RosterSource::Service,
                format!("Failed to decode provider list: {}", e),
            ),
        },
        Err(ureq::Error::Status(code, _)) => FetchResult::failure(
            RosterSource::Service,
            format!("Provider service returned HTTP {}", code),
        ),
        Err(e) => FetchResult::failure(
            RosterSource::Service,
            format!("Could not reach provider service: {}", e),
        ),
    }
}

fn load_sample() -> FetchResult {
    match serde_json::from_str::<Vec<serde_json::Value>>(SAMPLE_ROSTER) {
        Ok(values) => {
            let roster = parse_roster(values);
            FetchResult {
                records: Some(roster.records),
                skipped: roster.skipped,
                source: RosterSource::Sample,
                error: None,
            }
        }
        Err(e) => FetchResult::failure(
            RosterSource::Sample,
            format!("Bundled sample roster is invalid: {}", e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            providers_endpoint("https://api.example.com"),
            "https://api.example.com/providers"
        );
        assert_eq!(
            providers_endpoint("https://api.example.com/"),
            "https://api.example.com/providers"
        );
    }

    #[test]
    fn test_sample_roster_decodes() {
        let result = load_sample();
        assert!(result.error.is_none());
        assert_eq!(result.skipped, 0);
        let records = result.records.unwrap();
        assert!(records.len() >= 10);
        // The sample deliberately carries unmapped providers.
        assert!(records.iter().any(|r| r.coordinates.is_none()));
        assert!(records.iter().any(|r| r.coordinates.is_some()));
        assert!(records.iter().any(|r| r.available_now));
        assert!(records.iter().any(|r| !r.available_now));
    }
}
