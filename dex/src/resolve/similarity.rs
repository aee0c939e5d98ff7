//! Bounded 0-100 string similarity scores

/// Length of the longest common subsequence of two char slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized indel similarity: `100 * 2 * lcs / (len(a) + len(b))`
///
/// One insertion or deletion in a seven letter name still scores above 90.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    100.0 * (2 * lcs_len(&a, &b)) as f64 / total as f64
}

/// [`ratio`] after sorting the `-` separated tokens of both sides, so word
/// order does not matter ("ponyta galar" vs "galar ponyta")
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split('-').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join("-")
}

/// Best [`ratio`] of the shorter string against every equally long window
/// of the longer one; a prefix or infix match scores 100
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short: Vec<char> = short.chars().collect();
    let long: Vec<char> = long.chars().collect();

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let common = lcs_len(&short, window);
        best = best.max(100.0 * common as f64 / short.len() as f64);
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Score used by the resolver; both inputs must already be normalized
pub fn score(query: &str, candidate: &str) -> f64 {
    if query == candidate {
        return 100.0;
    }
    ratio(query, candidate).max(token_sort_ratio(query, candidate))
}
