//! Static mapping from postal codes to marketplace location identifiers.
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    // (postal_code, ISO country code) -> marketplace location id
    static ref LOCATION_IDS: HashMap<(String, String), &'static str> = {
        let entries: [((&str, &str), &str); 22] = [
            (("48013", "IT"), "103824622989212"),
            (("48015", "IT"), "105762946124194"),
            (("02020", "IT"), "103740509665061"),
            (("17464", "ES"), "104804759555744"),
            (("7950", "BE"), "112565218760518"),
            (("34290", "FR"), "105958486102381"),
            (("48017", "IT"), "109272745759400"),
            (("48033", "IT"), "108326449189280"),
            (("48018", "IT"), "103758862995533"),
            (("48034", "IT"), "107403715948727"),
            (("27004", "ES"), "109317799086039"),
            (("48022", "IT"), "110105015674078"),
            (("305500", "RO"), "110292358990034"),
            (("27611", "ES"), "108204459201292"),
            (("33420", "ES"), "106540879380410"),
            (("27460", "ES"), "106038869434965"),
            (("27320", "ES"), "112340842112389"),
            (("27836", "ES"), "113166662030293"),
            (("48121", "IT"), "115401551805737"),
            (("48122", "IT"), "112979228721001"),
            (("48125", "IT"), "112061362152513"),
            (("48027", "IT"), "111752902175169"),
        ];
        entries
            .into_iter()
            .map(|((postal_code, country), id)| ((postal_code.to_string(), country.to_string()), id))
            .collect()
    };
}

/// Resolves a postal code and country to a location id.
///
/// Country codes are matched case-insensitively. `None` means the pair is
/// unknown, which is not an error: the target simply stays unpollable.
pub fn lookup_location_id(postal_code: &str, country: &str) -> Option<String> {
    let key = (postal_code.trim().to_string(), country.trim().to_ascii_uppercase());
    LOCATION_IDS
        .get(&key)
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_location_resolves() {
        assert_eq!(
            lookup_location_id("48013", "IT").as_deref(),
            Some("103824622989212")
        );
        assert_eq!(
            lookup_location_id("7950", "be").as_deref(),
            Some("112565218760518")
        );
    }

    #[test]
    fn test_unknown_location_is_none() {
        assert_eq!(lookup_location_id("48013", "FR"), None);
        assert_eq!(lookup_location_id("00000", "IT"), None);
    }
}
