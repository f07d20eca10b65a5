use serde::{Deserialize, Serialize};

use crate::api::MachineListing;

/// Search box plus category dropdown of the machines marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    pub search: String,
    /// Machine type id, or `"all"`
    pub category: String,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: "all".to_string(),
        }
    }
}

impl ListingFilter {
    pub fn new(search: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            category: category.into(),
        }
    }

    /// Case-insensitive match on name, location or type, plus exact category
    pub fn matches(&self, listing: &MachineListing) -> bool {
        let needle = self.search.trim().to_lowercase();

        let matches_search = needle.is_empty()
            || [
                &listing.machine_name,
                &listing.manufacturing_location,
                &listing.machine_type_id,
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));

        let matches_category = self.category.is_empty()
            || self.category == "all"
            || listing.machine_type_id.as_deref() == Some(self.category.as_str());

        matches_search && matches_category
    }

    pub fn apply<'a>(&self, listings: &'a [MachineListing]) -> Vec<&'a MachineListing> {
        listings.iter().filter(|l| self.matches(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, location: &str, type_id: &str) -> MachineListing {
        MachineListing {
            id: name.to_string(),
            machine_name: Some(name.to_string()),
            manufacturing_location: Some(location.to_string()),
            machine_type_id: Some(type_id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let listings = vec![
            listing("Bunching Machine", "Pune", "cable_making"),
            listing("Extruder 90mm", "Delhi", "extruder"),
        ];

        let by_location = ListingFilter::new("pUNe", "all");
        assert_eq!(by_location.apply(&listings).len(), 1);

        let by_type = ListingFilter::new("EXTRU", "all");
        assert_eq!(by_type.apply(&listings)[0].id, "Extruder 90mm");
    }

    #[test]
    fn category_narrows_results() {
        let listings = vec![
            listing("Bunching Machine", "Pune", "cable_making"),
            listing("Extruder 90mm", "Delhi", "extruder"),
        ];

        let filter = ListingFilter::new("", "extruder");
        let found = filter.apply(&listings);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].machine_type_id.as_deref(), Some("extruder"));
    }

    #[test]
    fn empty_search_matches_listing_without_fields() {
        let bare = MachineListing {
            id: "bare".to_string(),
            ..Default::default()
        };

        assert!(ListingFilter::default().matches(&bare));
        assert!(!ListingFilter::new("anything", "all").matches(&bare));
    }
}
