//! Surface-string helpers shared by the feature extractor and the gazetteer lookup.

use std::sync::LazyLock;

use regex::Regex;

static UPPER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Lu}+").unwrap());
static LOWER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Ll}+").unwrap());
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());
static PUNCT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[-,;:?!()\[\]{}"'&§$%/=]+"#).unwrap());
static ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Z]+|(?:[A-Z]\.)+)$").unwrap());
static DOTTED_ACRONYM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[A-Z]\.)+$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse a string into its case shape: upper runs → `A`, lower runs → `a`,
/// digit runs → `0`, punctuation runs → `-`.
///
/// `"Super!? 8 Zorro"` → `"Aa- 0 Aa"`.
pub fn case_signature(value: &str) -> String {
    let s = UPPER_RUN.replace_all(value, "A");
    let s = LOWER_RUN.replace_all(&s, "a");
    let s = DIGIT_RUN.replace_all(&s, "0");
    PUNCT_RUN.replace_all(&s, "-").into_owned()
}

/// `USA`, `U.S.A.`
pub fn is_acronym(value: &str) -> bool {
    ACRONYM.is_match(value)
}

pub fn token_count(value: &str) -> usize {
    value.split_whitespace().count()
}

/// Case-insensitive whole-word containment: the match may not continue into
/// a letter or digit on either side.
pub fn contains_word(word: &str, text: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let word = word.to_lowercase();
    let text = text.to_lowercase();
    text.match_indices(&word).any(|(idx, _)| {
        let left_ok = text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = text[idx + word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        left_ok && right_ok
    })
}

/// Canonical lookup form of a mention: trimmed, single-spaced, without
/// trademark signs, possessive suffix, or the dots of a dotted acronym.
pub fn normalize_name(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| !matches!(c, '©' | '®' | '™')).collect();
    let mut name = WHITESPACE.replace_all(cleaned.trim(), " ").into_owned();
    for suffix in ["'s", "’s"] {
        if name.len() > suffix.len() && name.ends_with(suffix) {
            name.truncate(name.len() - suffix.len());
            break;
        }
    }
    if DOTTED_ACRONYM.is_match(&name) {
        name = name.replace('.', "");
    }
    name
}
