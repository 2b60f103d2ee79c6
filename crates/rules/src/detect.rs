//! AOI-identifier domain detection.

use tracing::debug;

/// Keyword sets checked in order; the first matching domain wins.
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("port", &["port", "harbor", "terminal", "dock", "wharf", "pier"]),
    ("farm", &["farm", "agri", "crop", "field", "ranch", "plantation"]),
    ("mine", &["mine", "mining", "quarry", "pit", "extraction"]),
    ("energy", &["energy", "power", "solar", "wind", "oil", "gas", "refinery"]),
];

/// Guess the domain of an opaque AOI identifier by case-insensitive
/// substring match. Returns `None` when nothing matches.
pub fn detect_domain(aoi_id: &str) -> Option<&'static str> {
    let id = aoi_id.to_lowercase();
    let found = DOMAIN_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| id.contains(k)))
        .map(|(domain, _)| *domain);
    if found.is_none() {
        debug!(aoi_id = %aoi_id, "no domain detected for AOI");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_domain() {
        assert_eq!(detect_domain("port-los-angeles"), Some("port"));
        assert_eq!(detect_domain("Iowa-Crop-Field-7"), Some("farm"));
        assert_eq!(detect_domain("open-pit-copper"), Some("mine"));
        assert_eq!(detect_domain("SOLAR_ARRAY_3"), Some("energy"));
    }

    #[test]
    fn first_match_wins() {
        // Contains both "port" and "oil".
        assert_eq!(detect_domain("oil-port-terminal"), Some("port"));
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(detect_domain("city-center"), None);
        assert_eq!(detect_domain(""), None);
    }
}
