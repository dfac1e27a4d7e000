use crate::monitor::models::RawListing;

/// Renders the alert sent for one matched listing.
///
/// `listing_url` is the absolute form of `listing.link`. The layout is relied
/// upon by downstream chat filters, keep it stable.
pub fn format_listing_message(target_name: &str, listing: &RawListing, listing_url: &str) -> String {
    format!(
        "Found an hot deal for {target_name}\nname: {}\nprice: {}\nlocation: {}\nlink: {listing_url}\n",
        listing.name, listing.price, listing.location
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_message_layout() {
        let listing = RawListing {
            name: "Red mountain bike".to_string(),
            price: "€120".to_string(),
            location: "Ravenna, ER".to_string(),
            link: "/marketplace/item/42/".to_string(),
        };
        let text = format_listing_message(
            "bikes",
            &listing,
            "https://www.facebook.com/marketplace/item/42/",
        );
        assert_eq!(
            text,
            "Found an hot deal for bikes\n\
             name: Red mountain bike\n\
             price: €120\n\
             location: Ravenna, ER\n\
             link: https://www.facebook.com/marketplace/item/42/\n"
        );
    }
}
