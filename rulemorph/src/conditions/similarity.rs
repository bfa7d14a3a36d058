//! Fuzzy string similarity scores in the range 0..=100
//!
//! Scores follow the familiar fuzzy-matching family: a plain ratio derived
//! from the longest common subsequence, a partial ratio that slides the
//! shorter string over the longer one, and token-sorted / token-set variants
//! that ignore word order.

use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMethod {
    Ratio,
    #[default]
    PartialRatio,
    TokenSortRatio,
    TokenSortPartialRatio,
    TokenSetRatio,
}

impl SimilarityMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "ratio" => Some(Self::Ratio),
            "partialratio" => Some(Self::PartialRatio),
            "tokensortratio" => Some(Self::TokenSortRatio),
            "tokensortpartialratio" => Some(Self::TokenSortPartialRatio),
            "tokensetratio" => Some(Self::TokenSetRatio),
            _ => None,
        }
    }
}

/// Score how similar two strings are, 100 meaning identical
pub fn similarity(a: &str, b: &str, method: SimilarityMethod) -> u8 {
    match method {
        SimilarityMethod::Ratio => ratio(a, b),
        SimilarityMethod::PartialRatio => partial_ratio(a, b),
        SimilarityMethod::TokenSortRatio => ratio(&sorted_tokens(a), &sorted_tokens(b)),
        SimilarityMethod::TokenSortPartialRatio => {
            partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
        }
        SimilarityMethod::TokenSetRatio => token_set_ratio(a, b),
    }
}

fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let common = longest_common_subsequence(a, b);
    ((200 * common) as f64 / total as f64).round() as u8
}

/// Upper limit on LCS table cells spent scoring windows in [`partial_ratio`]
const PARTIAL_RATIO_BUDGET: usize = 4_000_000;

fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if shorter.is_empty() {
        return 0;
    }
    if shorter.len() == longer.len() {
        return ratio_chars(&shorter, &longer);
    }
    if longer.windows(shorter.len()).any(|window| window == shorter.as_slice()) {
        return 100;
    }

    // Score windows in order of their shared-character bound, which caps
    // the LCS, and stop once no window can win or the budget runs out
    let mut windows = window_bounds(&shorter, &longer);
    windows.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)));
    let scored = (PARTIAL_RATIO_BUDGET / (shorter.len() * shorter.len())).max(1);

    let mut best = 0;
    for (bound, start) in windows.into_iter().take(scored) {
        if score(bound, shorter.len()) <= best {
            break;
        }
        let window = &longer[start..start + shorter.len()];
        best = best.max(ratio_chars(&shorter, window));
    }
    best
}

fn score(common: usize, len: usize) -> u8 {
    ((100 * common) as f64 / len as f64).round() as u8
}

/// `(shared characters, start)` for every window of `longer` as wide as `shorter`
fn window_bounds(shorter: &[char], longer: &[char]) -> Vec<(usize, usize)> {
    let width = shorter.len();
    let mut needed: HashMap<char, usize> = HashMap::new();
    for &c in shorter {
        *needed.entry(c).or_default() += 1;
    }

    let mut seen: HashMap<char, usize> = HashMap::new();
    let mut shared = 0;
    let mut bounds = Vec::with_capacity(longer.len() - width + 1);
    for (end, &c) in longer.iter().enumerate() {
        let count = seen.entry(c).or_default();
        if *count < needed.get(&c).copied().unwrap_or(0) {
            shared += 1;
        }
        *count += 1;

        if end >= width {
            let gone = longer[end - width];
            let count = seen.entry(gone).or_default();
            *count -= 1;
            if *count < needed.get(&gone).copied().unwrap_or(0) {
                shared -= 1;
            }
        }
        if end + 1 >= width {
            bounds.push((shared, end + 1 - width));
        }
    }
    bounds
}

fn token_set_ratio(a: &str, b: &str) -> u8 {
    let left: BTreeSet<String> = tokens(a).into_iter().collect();
    let right: BTreeSet<String> = tokens(b).into_iter().collect();

    let shared = join(left.intersection(&right));
    let only_left = join(left.difference(&right));
    let only_right = join(right.difference(&left));

    let combined_left = format!("{} {}", shared, only_left).trim().to_string();
    let combined_right = format!("{} {}", shared, only_right).trim().to_string();

    ratio(&shared, &combined_left)
        .max(ratio(&shared, &combined_right))
        .max(ratio(&combined_left, &combined_right))
}

fn join<'a>(words: impl Iterator<Item = &'a String>) -> String {
    words.map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Lower-cased alphanumeric words
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn sorted_tokens(text: &str) -> String {
    let mut words = tokens(text);
    words.sort();
    words.join(" ")
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
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
