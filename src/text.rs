//! Char-offset helpers shared by the document adapters and the renderer.

use crate::suggestion::TextRange;

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn split_text(text: &str, offset: usize) -> (String, String) {
    let byte_idx = char_to_byte_idx(text, offset);
    (text[..byte_idx].to_string(), text[byte_idx..].to_string())
}

/// Returns the text covered by `range`, or `None` when it runs past the end.
pub fn slice_chars(text: &str, range: TextRange) -> Option<&str> {
    if range.end > char_len(text) {
        return None;
    }
    let start = char_to_byte_idx(text, range.start);
    let end = char_to_byte_idx(text, range.end);
    Some(&text[start..end])
}

/// Replaces the chars in `range` with `replacement`. Returns false when the
/// range does not fit the text.
pub fn splice_chars(text: &mut String, range: TextRange, replacement: &str) -> bool {
    if range.end > char_len(text) {
        return false;
    }
    let start = char_to_byte_idx(text, range.start);
    let end = char_to_byte_idx(text, range.end);
    text.replace_range(start..end, replacement);
    true
}

/// Byte offset of every char boundary, including the end of the text.
pub(crate) fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    boundaries.push(text.len());
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_counts_chars_not_bytes() {
        let text = "naïve café";
        assert_eq!(slice_chars(text, TextRange::new(6, 10)), Some("café"));
        assert_eq!(slice_chars(text, TextRange::new(6, 11)), None);
    }

    #[test]
    fn splicing_multibyte_text() {
        let mut text = String::from("über alles");
        assert!(splice_chars(&mut text, TextRange::new(0, 4), "unter"));
        assert_eq!(text, "unter alles");
        assert!(!splice_chars(&mut text, TextRange::new(5, 40), "x"));
    }

    #[test]
    fn boundaries_end_with_text_length() {
        assert_eq!(char_boundaries("aé"), vec![0, 1, 3]);
        assert_eq!(char_boundaries(""), vec![0]);
    }
}
