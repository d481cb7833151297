use crate::providers::ProviderRecord;

/// Typed popup body.
///
/// Popups carry structured fields, never markup strings. The rendering
/// layer decides how each field looks; pushing formatted text through the
/// widget is exactly the coupling this type exists to prevent.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub title: String,
    pub rating: Option<f32>,
    pub services: Vec<String>,
    pub price_label: Option<String>,
    pub available_now: bool,
    pub profile_url: Option<String>,
}

impl PopupContent {
    pub fn from_record(record: &ProviderRecord) -> Self {
        Self {
            title: record.name.clone(),
            rating: record.rating,
            services: record.services.clone(),
            price_label: record.price_label.clone(),
            available_now: record.available_now,
            profile_url: record.profile_url.clone(),
        }
    }

    /// One-line service summary for compact rendering.
    pub fn services_line(&self) -> String {
        self.services.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderId;

    #[test]
    fn test_from_record_copies_display_fields() {
        let record = ProviderRecord {
            id: ProviderId::new("p1"),
            coordinates: None,
            available_now: true,
            name: "Lakeside Plumbing".to_string(),
            rating: Some(4.8),
            services: vec!["plumbing".to_string(), "heating".to_string()],
            price_label: Some("$95/hr".to_string()),
            profile_url: Some("https://example.com/p/lakeside".to_string()),
        };

        let content = PopupContent::from_record(&record);
        assert_eq!(content.title, "Lakeside Plumbing");
        assert_eq!(content.rating, Some(4.8));
        assert_eq!(content.services_line(), "plumbing, heating");
        assert!(content.available_now);
    }
}
