use url::form_urlencoded;

use super::models::MonitorTarget;

pub const DEFAULT_MARKETPLACE_URL: &str = "https://www.facebook.com";

/// Title rule derived from a target's keywords.
///
/// Each whitespace-separated keyword is an alternative: a title matches when it
/// starts with any one of them, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPredicate {
    tokens: Vec<String>,
}

impl MatchPredicate {
    /// Returns `None` when the keywords contain no tokens at all.
    pub fn from_keywords(keywords: &str) -> Option<Self> {
        let tokens: Vec<String> = keywords.split_whitespace().map(str::to_lowercase).collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn matches(&self, title: &str) -> bool {
        let title = title.trim_start().to_lowercase();
        self.tokens.iter().any(|token| title.starts_with(token.as_str()))
    }
}

/// A ready-to-scan search: the page URL and the rule applied to its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub url: String,
    pub predicate: Option<MatchPredicate>,
}

/// Turns monitor targets into marketplace search URLs.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MARKETPLACE_URL)
    }
}

impl QueryBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build(&self, target: &MonitorTarget) -> SearchQuery {
        let keywords = target.keywords.as_deref().unwrap_or_default();
        SearchQuery {
            url: self.build_url(target),
            predicate: MatchPredicate::from_keywords(keywords),
        }
    }

    /// The optional filters are appended in the order the site's search API
    /// expects: minPrice, maxPrice, radius.
    pub fn build_url(&self, target: &MonitorTarget) -> String {
        let location_id = target.location_id.as_deref().unwrap_or_default();
        let keywords = target.keywords.as_deref().unwrap_or_default();
        let query: String = form_urlencoded::byte_serialize(keywords.as_bytes()).collect();

        let mut url = format!(
            "{}/marketplace/{location_id}/search?query={query}",
            self.base_url
        );
        if let Some(min_price) = target.min_price {
            url.push_str(&format!("&minPrice={min_price}"));
        }
        if let Some(max_price) = target.max_price {
            url.push_str(&format!("&maxPrice={max_price}"));
        }
        if let Some(radius) = target.radius {
            url.push_str(&format!("&radius={radius}"));
        }
        url
    }

    /// Absolute URL for a site-relative listing link.
    pub fn listing_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }
        format!("{}/{}", self.base_url, link.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_target() -> MonitorTarget {
        MonitorTarget {
            name: "bikes".to_string(),
            keywords: Some("a b".to_string()),
            location_id: Some("X".to_string()),
            postal_code: Some("1000".to_string()),
            country: Some("XX".to_string()),
            min_price: Some(10),
            max_price: Some(50),
            radius: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_url_with_all_filters() {
        let url = QueryBuilder::default().build_url(&full_target());
        assert_eq!(
            url,
            "https://www.facebook.com/marketplace/X/search?query=a+b&minPrice=10&maxPrice=50&radius=5"
        );
    }

    #[test]
    fn test_build_url_omits_missing_radius_only() {
        let mut target = full_target();
        target.radius = None;
        let url = QueryBuilder::default().build_url(&target);
        assert_eq!(
            url,
            "https://www.facebook.com/marketplace/X/search?query=a+b&minPrice=10&maxPrice=50"
        );
    }

    #[test]
    fn test_build_url_keeps_order_without_prices() {
        let mut target = full_target();
        target.min_price = None;
        target.max_price = None;
        let url = QueryBuilder::new("https://market.example/").build_url(&target);
        assert_eq!(url, "https://market.example/marketplace/X/search?query=a+b&radius=5");
    }

    #[test]
    fn test_keywords_are_percent_encoded() {
        let mut target = full_target();
        target.keywords = Some("sofa & chair/2".to_string());
        let url = QueryBuilder::default().build_url(&target);
        assert!(url.contains("query=sofa+%26+chair%2F2&minPrice=10"));
    }

    #[test]
    fn test_predicate_matches_any_token_as_prefix() {
        let predicate = MatchPredicate::from_keywords("red bike").unwrap();
        assert!(predicate.matches("Red mountain bike"));
        assert!(predicate.matches("BIKE rack"));
        assert!(!predicate.matches("A bike that is red"));
    }

    #[test]
    fn test_predicate_ignores_extra_whitespace() {
        let predicate = MatchPredicate::from_keywords("  lamp   desk ").unwrap();
        assert_eq!(predicate.tokens(), ["lamp", "desk"]);
        assert!(!predicate.matches("Chair"));
        assert!(MatchPredicate::from_keywords("   ").is_none());
    }

    #[test]
    fn test_build_carries_predicate() {
        let query = QueryBuilder::default().build(&full_target());
        let predicate = query.predicate.unwrap();
        assert_eq!(predicate.tokens(), ["a", "b"]);
    }

    #[test]
    fn test_listing_url_joins_relative_links() {
        let builder = QueryBuilder::default();
        assert_eq!(
            builder.listing_url("/marketplace/item/42/"),
            "https://www.facebook.com/marketplace/item/42/"
        );
        assert_eq!(
            builder.listing_url("marketplace/item/42/"),
            "https://www.facebook.com/marketplace/item/42/"
        );
        assert_eq!(
            builder.listing_url("https://other.example/x"),
            "https://other.example/x"
        );
    }
}
