use std::cmp::Ordering;

use similar::{ChangeTag, TextDiff};
use tracing::trace;

use crate::suggestion::{MatchConfidence, TextRange};
use crate::text::{char_boundaries, char_len};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_PREFIX_LEN: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatorConfig {
    /// Minimum similarity a fuzzy candidate needs to be accepted.
    pub threshold: f64,
    /// Number of leading chars a fuzzy candidate must share with the
    /// original text before it is scored at all.
    pub prefix_len: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    pub range: TextRange,
    pub confidence: MatchConfidence,
}

/// Maps proposed original text onto a range of the live document.
#[derive(Clone, Debug, Default)]
pub struct Locator {
    config: LocatorConfig,
}

impl Locator {
    pub fn new(config: LocatorConfig) -> Self {
        let config = LocatorConfig {
            threshold: config.threshold.clamp(f64::EPSILON, 1.0),
            prefix_len: config.prefix_len.max(1),
        };
        Self { config }
    }

    pub fn config(&self) -> LocatorConfig {
        self.config
    }

    /// Finds `original_text` in `document_text`. `after` is the end of the
    /// previously resolved range of the same batch and only breaks ties.
    pub fn locate(&self, document_text: &str, original_text: &str, after: usize) -> Option<Located> {
        if original_text.is_empty() {
            return None;
        }
        let original_len = char_len(original_text);
        let boundaries = char_boundaries(document_text);
        let doc_len = boundaries.len() - 1;
        if original_len > doc_len {
            return None;
        }

        let starts = exact_occurrences(document_text, original_text, &boundaries);
        let chosen = starts
            .iter()
            .copied()
            .find(|start| *start >= after)
            .or_else(|| starts.first().copied());
        if let Some(start) = chosen {
            return Some(Located {
                range: TextRange::new(start, start + original_len),
                confidence: MatchConfidence::ExactMatch,
            });
        }

        self.fuzzy_match(document_text, original_text, original_len, &boundaries, after)
    }

    fn fuzzy_match(
        &self,
        document_text: &str,
        original_text: &str,
        original_len: usize,
        boundaries: &[usize],
        after: usize,
    ) -> Option<Located> {
        let threshold = self.config.threshold;
        let prefix: String = original_text.chars().take(self.config.prefix_len).collect();
        let prefix_chars = char_len(&prefix);
        let doc_len = boundaries.len() - 1;

        // Windows outside this band cannot reach the threshold.
        let min_window = ((original_len as f64 * threshold).ceil() as usize)
            .max(prefix_chars)
            .max(1);
        let max_window = ((original_len as f64 / threshold).floor() as usize).max(original_len);

        let mut best: Option<Candidate> = None;
        for start in 0..doc_len {
            let start_byte = boundaries[start];
            if !document_text[start_byte..].starts_with(&prefix) {
                continue;
            }
            for window in min_window..=max_window {
                let end = start + window;
                if end > doc_len {
                    break;
                }
                let text = &document_text[start_byte..boundaries[end]];
                let candidate = Candidate {
                    range: TextRange::new(start, end),
                    score: similarity(original_text, original_len, text, window),
                };
                let replace = match &best {
                    Some(current) => candidate.rank(current, after, original_len) == Ordering::Greater,
                    None => true,
                };
                if replace {
                    best = Some(candidate);
                }
            }
        }

        let best = best?;
        trace!(range = %best.range, score = best.score, "best fuzzy candidate");
        (best.score >= threshold).then_some(Located {
            range: best.range,
            confidence: MatchConfidence::FuzzyMatch,
        })
    }
}

struct Candidate {
    range: TextRange,
    score: f64,
}

impl Candidate {
    fn rank(&self, other: &Candidate, after: usize, original_len: usize) -> Ordering {
        const EPSILON: f64 = 1e-9;
        if (self.score - other.score).abs() > EPSILON {
            return self.score.total_cmp(&other.score);
        }
        let self_after = self.range.start >= after;
        let other_after = other.range.start >= after;
        if self_after != other_after {
            return self_after.cmp(&other_after);
        }
        if self.range.start != other.range.start {
            return other.range.start.cmp(&self.range.start);
        }
        let self_gap = self.range.len().abs_diff(original_len);
        let other_gap = other.range.len().abs_diff(original_len);
        other_gap.cmp(&self_gap)
    }
}

fn exact_occurrences(document_text: &str, original_text: &str, boundaries: &[usize]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut from = 0;
    while from <= document_text.len() {
        let Some(pos) = document_text[from..].find(original_text) else {
            break;
        };
        let byte = from + pos;
        if let Ok(char_idx) = boundaries.binary_search(&byte) {
            starts.push(char_idx);
        }
        let step = document_text[byte..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        from = byte + step;
    }
    starts
}

/// Share of aligned equal chars, relative to the longer of the two strings.
fn similarity(original: &str, original_len: usize, candidate: &str, candidate_len: usize) -> f64 {
    let denominator = original_len.max(candidate_len);
    if denominator == 0 {
        return 0.0;
    }
    let diff = TextDiff::from_chars(original, candidate);
    let matches: usize = diff
        .iter_all_changes()
        .filter(|change| change.tag() == ChangeTag::Equal)
        .map(|change| change.value().chars().count())
        .sum();
    matches as f64 / denominator as f64
}
