//! Policy listing and mutation wire types.

use agora_core::{FilterSpec, Policy};
use serde::{Deserialize, Serialize};

/// Request for one page of the policy feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPoliciesRequest {
    /// 1-based page number
    pub page: i64,
    /// Records per page
    pub limit: i64,
    /// Active filter/sort criteria
    pub filters: FilterSpec,
}

impl ListPoliciesRequest {
    /// Encode as URL query pairs.
    ///
    /// The server expects repeated `categories` and `year` keys rather than
    /// comma-joined lists.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortBy", self.filters.sort_by.as_query_value().to_string()),
        ];
        for category in &self.filters.categories {
            pairs.push(("categories", category.clone()));
        }
        for year in &self.filters.years {
            pairs.push(("year", year.clone()));
        }
        pairs
    }
}

/// One page of the policy feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyPage {
    pub policies: Vec<Policy>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    /// Authoritative collection size under the active filters.
    #[serde(rename = "totalPolicies")]
    pub total_policies: i64,
}

/// Server acknowledgement with no record payload (update/delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::SortKey;

    #[test]
    fn test_query_pairs_base_fields() {
        let request = ListPoliciesRequest {
            page: 2,
            limit: 10,
            filters: FilterSpec::new(),
        };
        let pairs = request.query_pairs();
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(pairs.contains(&("limit", "10".to_string())));
        assert!(pairs.contains(&("sortBy", "date".to_string())));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_query_pairs_repeat_categories_and_years() {
        let request = ListPoliciesRequest {
            page: 1,
            limit: 10,
            filters: FilterSpec::new()
                .with_category("Energy")
                .with_category("Health")
                .with_year("2024")
                .with_sort(SortKey::Votes),
        };
        let pairs = request.query_pairs();
        let categories: Vec<_> = pairs
            .iter()
            .filter(|(key, _)| *key == "categories")
            .collect();
        assert_eq!(categories.len(), 2);
        assert!(pairs.contains(&("year", "2024".to_string())));
        assert!(pairs.contains(&("sortBy", "votes".to_string())));
    }

    #[test]
    fn test_policy_page_deserializes_wire_shape() {
        let page: PolicyPage = serde_json::from_str(
            r#"{"policies": [], "hasMore": true, "totalPolicies": 25}"#,
        )
        .unwrap();
        assert!(page.has_more);
        assert_eq!(page.total_policies, 25);
        assert!(page.policies.is_empty());
    }
}
