//! Edit-distance similarity for misheard phrases.
//!
//! The classifier treats this as a pluggable pure function; any
//! implementation that keeps similarity in [0, 1] with 1.0 for equal strings
//! works with the 0.75/0.8 cutoffs used elsewhere.

/// Normalized similarity between two strings in [0, 1].
pub fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let dist = levenshtein(a, b);
    1.0 - (dist as f32 / longest as f32)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row DP keeps this allocation-light for the short phrases we see.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("probe", "probe"), 1.0);
    }

    #[test]
    fn close_misrecognitions_clear_the_cutoff() {
        assert!(similarity("moove", "move") >= 0.75);
        assert!(similarity("probe", "prove") >= 0.75);
    }

    #[test]
    fn unrelated_words_score_low() {
        assert!(similarity("jog", "workspace") < 0.4);
    }

    #[test]
    fn empty_against_nonempty() {
        assert_eq!(similarity("", ""), 1.0);
        assert!(similarity("", "stop") < 0.01);
    }
}
