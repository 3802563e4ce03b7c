//! Best-effort politician name matching.
//!
//! Disclosures spell names inconsistently ("Hon. Nancy P. Pelosi", "Pelosi,
//! Nancy"). Resolution tries an exact match on the normalised name first, then
//! the operator-maintained alias table, then a fuzzy match over every known
//! politician.

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

use crate::directory::Politician;

const HONORIFICS: &[&str] = &[
  "hon", "honorable", "rep", "representative", "sen", "senator", "mr", "mrs",
  "ms", "dr", "jr", "sr", "ii", "iii", "iv",
];

/// Minimum Skim score for a fuzzy candidate to be accepted.
pub const MIN_FUZZY_SCORE: i64 = 60;

/// Lower-case `name`, strip punctuation, drop honorifics and single-letter
/// initials, and collapse whitespace. "Last, First" is reordered to
/// "first last".
pub fn normalize_name(name: &str) -> String {
  let reordered = match name.split_once(',') {
    Some((last, first)) if !first.trim().is_empty() => format!("{} {}", first, last),
    _ => name.to_owned(),
  };

  let cleaned: String = reordered
    .chars()
    .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
    .collect::<String>()
    .to_lowercase();

  cleaned
    .split_whitespace()
    .filter(|tok| tok.chars().count() > 1 && !HONORIFICS.contains(tok))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Pick the politician whose normalised name best matches `name`, if any
/// candidate clears [`MIN_FUZZY_SCORE`]. Ties go to the earlier candidate.
pub fn best_fuzzy_match<'a>(name: &str, candidates: &'a [Politician]) -> Option<&'a Politician> {
  let needle = normalize_name(name);
  if needle.is_empty() {
    return None;
  }
  let matcher = SkimMatcherV2::default();

  let mut best: Option<(i64, &Politician)> = None;
  for candidate in candidates {
    let haystack = normalize_name(&candidate.full_name);
    // Score both directions so "pelosi" finds "nancy pelosi" and
    // "nancy patricia pelosi" finds "nancy pelosi".
    let score = matcher
      .fuzzy_match(&haystack, &needle)
      .into_iter()
      .chain(matcher.fuzzy_match(&needle, &haystack))
      .max();
    if let Some(score) = score
      && score >= MIN_FUZZY_SCORE
      && best.is_none_or(|(s, _)| score > s)
    {
      best = Some((score, candidate));
    }
  }
  best.map(|(_, p)| p)
}
