// 🗺️ State lookup - FIPS code, USPS code and name resolve to one key
//
// HUD files carry 2-digit FIPS codes, Zillow carries USPS codes, Census
// carries names. The matcher compares states through state_key() so all
// three agree.

/// (FIPS, USPS, name)
static STATES: &[(&str, &str, &str)] = &[
    ("01", "AL", "Alabama"),
    ("02", "AK", "Alaska"),
    ("04", "AZ", "Arizona"),
    ("05", "AR", "Arkansas"),
    ("06", "CA", "California"),
    ("08", "CO", "Colorado"),
    ("09", "CT", "Connecticut"),
    ("10", "DE", "Delaware"),
    ("11", "DC", "District of Columbia"),
    ("12", "FL", "Florida"),
    ("13", "GA", "Georgia"),
    ("15", "HI", "Hawaii"),
    ("16", "ID", "Idaho"),
    ("17", "IL", "Illinois"),
    ("18", "IN", "Indiana"),
    ("19", "IA", "Iowa"),
    ("20", "KS", "Kansas"),
    ("21", "KY", "Kentucky"),
    ("22", "LA", "Louisiana"),
    ("23", "ME", "Maine"),
    ("24", "MD", "Maryland"),
    ("25", "MA", "Massachusetts"),
    ("26", "MI", "Michigan"),
    ("27", "MN", "Minnesota"),
    ("28", "MS", "Mississippi"),
    ("29", "MO", "Missouri"),
    ("30", "MT", "Montana"),
    ("31", "NE", "Nebraska"),
    ("32", "NV", "Nevada"),
    ("33", "NH", "New Hampshire"),
    ("34", "NJ", "New Jersey"),
    ("35", "NM", "New Mexico"),
    ("36", "NY", "New York"),
    ("37", "NC", "North Carolina"),
    ("38", "ND", "North Dakota"),
    ("39", "OH", "Ohio"),
    ("40", "OK", "Oklahoma"),
    ("41", "OR", "Oregon"),
    ("42", "PA", "Pennsylvania"),
    ("44", "RI", "Rhode Island"),
    ("45", "SC", "South Carolina"),
    ("46", "SD", "South Dakota"),
    ("47", "TN", "Tennessee"),
    ("48", "TX", "Texas"),
    ("49", "UT", "Utah"),
    ("50", "VT", "Vermont"),
    ("51", "VA", "Virginia"),
    ("53", "WA", "Washington"),
    ("54", "WV", "West Virginia"),
    ("55", "WI", "Wisconsin"),
    ("56", "WY", "Wyoming"),
    ("72", "PR", "Puerto Rico"),
];

/// Canonical comparison key for a state given as FIPS code, USPS code or name.
///
/// Known states map to their 2-digit FIPS code. Anything else comes back
/// trimmed and uppercased so two unknown spellings still compare equal.
///
/// Example: `state_key("MO") == state_key("29") == state_key("missouri") == "29"`
pub fn state_key(state: &str) -> String {
    let trimmed = state.trim();

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return format!("{:0>2}", trimmed);
    }

    STATES
        .iter()
        .find(|(_, usps, name)| {
            usps.eq_ignore_ascii_case(trimmed) || name.eq_ignore_ascii_case(trimmed)
        })
        .map(|(fips, _, _)| fips.to_string())
        .unwrap_or_else(|| trimmed.to_uppercase())
}

/// State name for a FIPS code (zero-padding applied)
pub fn state_name(fips: &str) -> Option<&'static str> {
    let key = state_key(fips);
    STATES
        .iter()
        .find(|(code, _, _)| *code == key)
        .map(|(_, _, name)| *name)
}

/// USPS code for any accepted state spelling
pub fn state_usps(state: &str) -> Option<&'static str> {
    let key = state_key(state);
    STATES
        .iter()
        .find(|(code, _, _)| *code == key)
        .map(|(_, usps, _)| *usps)
}
