use serde::{Deserialize, Serialize};

/// A named marketplace search configured through the command interface.
///
/// Targets start empty and are filled in field by field. Only targets with
/// both keywords and a resolved location are polled, see [`MonitorTarget::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorTarget {
    /// Assigned by the store on insertion; a re-created name gets a new id.
    #[serde(skip)]
    pub id: u64,
    pub name: String,
    pub keywords: Option<String>,
    pub location_id: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    /// Search radius in kilometers.
    pub radius: Option<u32>,
}

impl MonitorTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        let has_keywords = self
            .keywords
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        has_keywords && self.location_id.is_some()
    }
}

/// One listing as extracted from a marketplace search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub name: String,
    pub price: String,
    pub location: String,
    /// Site-relative link to the listing page.
    pub link: String,
}
