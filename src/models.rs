use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lightweight company summary read off the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyPreview {
    pub slug: String,
    pub name: String,
    pub tagline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyRecord {
    pub name: String,
    pub slug: String,
    pub tagline: String,
    pub description: String,
    pub banner_url: String,
    pub logo_url: String,
    pub website_url: String,
    pub jobs_url: String,
    pub location: String,
    pub funding_stage: String,
    pub industry: String,
    pub work_type: String,
    pub team_size: String, // free text, e.g. "11-50"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_announcement: Option<String>,
    pub last_fetched: DateTime<Utc>,
    pub fully_scraped: bool,
}

impl CompanyRecord {
    /// Case-insensitive substring match over the fields a reader filters by.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &self.name,
            &self.tagline,
            &self.industry,
            &self.location,
            &self.funding_stage,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    #[allow(dead_code)]
    pub alt: String,
}

/// Everything read off a rendered detail page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDetailContent {
    pub title: String,
    pub body_text: String,
    pub anchors: Vec<Anchor>,
    pub images: Vec<Image>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CompanyRecord {
        CompanyRecord {
            name: "Acme Inc".to_string(),
            slug: "acme".to_string(),
            tagline: "We build widgets".to_string(),
            industry: "Robotics".to_string(),
            location: "Berlin".to_string(),
            funding_stage: "Seed".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_any_filter_field() {
        let r = record();
        assert!(r.matches("acme"));
        assert!(r.matches("WIDGETS"));
        assert!(r.matches("robot"));
        assert!(r.matches("berlin"));
        assert!(r.matches("seed"));
        assert!(!r.matches("series b"));
    }

    #[test]
    fn test_matches_blank_query_keeps_everything() {
        assert!(record().matches(""));
        assert!(record().matches("   "));
    }

    #[test]
    fn test_record_serializes_with_snake_case_keys() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["banner_url"], "");
        assert_eq!(json["funding_stage"], "Seed");
        assert_eq!(json["fully_scraped"], false);
        // absent announcement is omitted, not null
        assert!(json.get("funding_announcement").is_none());
    }
}
