//! Static lookup tables used to make city suggestions readable.
//!
//! Both lookups are total: an unknown country code comes back unchanged and an
//! unknown city simply has no state.

use std::collections::HashMap;
use std::sync::LazyLock;

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czech Republic"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KE", "Kenya"),
    ("KR", "South Korea"),
    ("MA", "Morocco"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NG", "Nigeria"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RU", "Russia"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

// Ambiguous or well-known names. Non-US namesakes ("Paris", "London", ...) map
// to their best-known US counterpart so a US result can be told apart.
const US_CITY_STATES: &[(&str, &str)] = &[
    ("albany", "NY"),
    ("arlington", "VA"),
    ("athens", "GA"),
    ("atlanta", "GA"),
    ("austin", "TX"),
    ("berlin", "NH"),
    ("boston", "MA"),
    ("cambridge", "MA"),
    ("charleston", "SC"),
    ("chicago", "IL"),
    ("cleveland", "OH"),
    ("columbia", "SC"),
    ("columbus", "OH"),
    ("dallas", "TX"),
    ("denver", "CO"),
    ("detroit", "MI"),
    ("dublin", "OH"),
    ("florence", "AL"),
    ("franklin", "TN"),
    ("greenville", "SC"),
    ("houston", "TX"),
    ("jackson", "MS"),
    ("kansas city", "MO"),
    ("las vegas", "NV"),
    ("lexington", "KY"),
    ("london", "KY"),
    ("los angeles", "CA"),
    ("madison", "WI"),
    ("manchester", "NH"),
    ("miami", "FL"),
    ("moscow", "ID"),
    ("new york", "NY"),
    ("paris", "TX"),
    ("philadelphia", "PA"),
    ("phoenix", "AZ"),
    ("portland", "OR"),
    ("richmond", "VA"),
    ("rome", "GA"),
    ("salem", "OR"),
    ("san francisco", "CA"),
    ("seattle", "WA"),
    ("springfield", "IL"),
    ("toledo", "OH"),
    ("washington", "DC"),
];

static COUNTRIES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| COUNTRY_NAMES.iter().copied().collect());

static US_STATES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| US_CITY_STATES.iter().copied().collect());

/// Full display name for an ISO 3166-1 alpha-2 code, or the code itself when
/// it is not in the table.
pub fn full_country_name(code: &str) -> String {
    let key = code.trim().to_ascii_uppercase();
    COUNTRIES
        .get(key.as_str())
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// US state abbreviation for a known city name.
pub fn us_state(city: &str) -> Option<&'static str> {
    US_STATES.get(city.trim().to_lowercase().as_str()).copied()
}
