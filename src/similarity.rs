// 🔤 String similarity - county name normalization + token sort ratio
//
// "St. Louis", "ST LOUIS COUNTY" and "Saint Louis County" need to land
// close together. Names are normalized first, then compared with an
// order-independent token score on a 0-100 scale.

/// Trailing words that name the county-equivalent type rather than the place.
/// Multi-word suffixes come first so "city and borough" is not cut to "city and".
const COUNTY_SUFFIXES: &[&str] = &[
    "city and borough",
    "census area",
    "county",
    "parish",
    "borough",
    "municipality",
    "municipio",
];

/// Apostrophes inside a word ("Prince George's", "O'Brien") are dropped
/// outright; a space there would split one token into two.
const APOSTROPHES: &[char] = &['\'', '\u{2019}', '\u{2018}', '`'];

/// Lowercase, drop apostrophes, turn other punctuation into spaces,
/// collapse whitespace
fn clean(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a county name for keyed comparison
///
/// Example:
/// - "Saint Louis County" → "saint louis"
/// - "St. Louis"          → "st louis"
/// - "Juneau City and Borough" → "juneau"
///
/// A suffix is only removed when something is left in front of it.
pub fn normalize_county_name(name: &str) -> String {
    let mut normalized = clean(name);

    for suffix in COUNTY_SUFFIXES {
        let with_space = format!(" {}", suffix);
        if normalized.ends_with(&with_space) {
            normalized.truncate(normalized.len() - with_space.len());
            break;
        }
    }

    normalized
}

/// Sort whitespace tokens and join them back with single spaces
fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Length of the longest common subsequence of two strings (in chars)
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Insert/delete edit distance (no substitutions)
pub fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_length(&a, &b)
}

/// Similarity ratio in 0..=100 based on indel distance
///
/// `100 × (1 − distance / (len_a + len_b))`, rounded. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let total = a.chars().count() + b.chars().count();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let distance = indel_distance(a, b);
    let score = 100.0 * (1.0 - distance as f64 / total as f64);
    score.round().clamp(0.0, 100.0) as u8
}

/// Token sort ratio: order-independent similarity in 0..=100
///
/// Both inputs are cleaned (lowercase, punctuation stripped), their tokens
/// sorted, and the sorted strings compared with [`ratio`].
///
/// Example: `token_sort_ratio("louis st", "St. Louis") == 100`
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(&clean(a)), &sorted_tokens(&clean(b)))
}
