//! Scanner for the tagged oracle variant, where corrections arrive inline as
//! `<grammar suggestion=".." explanation="..">original</grammar>` and
//! `<wordchoice ..>..</wordchoice>` pairs.

use tracing::trace;

use crate::suggestion::{ProposedEdit, SuggestionKind};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaggedMarkup {
    /// The markup with every recognised annotation pair reduced to its body.
    pub plain_text: String,
    pub edits: Vec<ProposedEdit>,
}

struct OpenTag {
    kind: SuggestionKind,
    attributes: Vec<(String, String)>,
    /// Byte offset just past the closing `>`.
    end: usize,
}

impl OpenTag {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Extracts the proposed edits from tagged markup. Pairs that are
/// unbalanced, self-closing, lack a `suggestion` attribute or wrap another
/// annotation stay in the output as plain text.
pub fn parse_tagged(markup: &str) -> TaggedMarkup {
    let body = strip_code_fence(markup);
    let mut plain_text = String::with_capacity(body.len());
    let mut edits = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        let Some(rel) = body[pos..].find('<') else {
            plain_text.push_str(&decode_entities(&body[pos..]));
            break;
        };
        let lt = pos + rel;
        plain_text.push_str(&decode_entities(&body[pos..lt]));

        if let Some((edit, inner, close_end)) = parse_pair(body, lt) {
            plain_text.push_str(&inner);
            edits.push(edit);
            pos = close_end;
        } else {
            plain_text.push('<');
            pos = lt + 1;
        }
    }

    TaggedMarkup { plain_text, edits }
}

fn parse_pair(src: &str, lt: usize) -> Option<(ProposedEdit, String, usize)> {
    let open = parse_open_tag(src, lt)?;
    let Some(replacement) = open.attribute("suggestion") else {
        trace!(offset = lt, "annotation tag without suggestion attribute");
        return None;
    };
    let Some((inner_end, close_end)) = find_closing_tag(src, open.end, open.kind) else {
        trace!(offset = lt, "unbalanced annotation tag");
        return None;
    };
    let inner = &src[open.end..inner_end];
    if contains_annotation_open_tag(inner) {
        trace!(offset = lt, "annotation tag wraps another annotation");
        return None;
    }

    let original = decode_entities(inner);
    let edit = ProposedEdit {
        kind: open.kind,
        original_text: original.clone(),
        replacement_text: decode_entities(replacement),
        explanation: decode_entities(open.attribute("explanation").unwrap_or_default()),
    };
    Some((edit, original, close_end))
}

/// Removes every annotation open and close tag from `text`, balanced or
/// not, keeping the text between them.
pub fn strip_annotation_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        let Some(rel) = text[pos..].find('<') else {
            result.push_str(&text[pos..]);
            break;
        };
        let lt = pos + rel;
        result.push_str(&text[pos..lt]);
        if let Some(open) = parse_open_tag(text, lt) {
            pos = open.end;
        } else if let Some(end) = closing_tag_end(text, lt) {
            pos = end;
        } else {
            result.push('<');
            pos = lt + 1;
        }
    }
    result
}

fn strip_code_fence(markup: &str) -> &str {
    let trimmed = markup.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return markup;
    };
    let Some(newline) = rest.find('\n') else {
        return markup;
    };
    let body = &rest[newline + 1..];
    let body = body.strip_suffix("```").unwrap_or(body);
    body.strip_suffix('\n').unwrap_or(body)
}

fn tag_name_at(src: &str, start: usize) -> Option<(SuggestionKind, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }
    let kind = SuggestionKind::from_tag_name(&src[start..end])?;
    match bytes.get(end) {
        Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => Some((kind, end)),
        _ => None,
    }
}

fn parse_open_tag(src: &str, lt: usize) -> Option<OpenTag> {
    let bytes = src.as_bytes();
    if bytes.get(lt) != Some(&b'<') {
        return None;
    }
    let (kind, mut pos) = tag_name_at(src, lt + 1)?;
    let mut attributes = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => break,
            b'/' => return None,
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/' | b'"' | b'\'')
        {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name = src[name_start..pos].to_string();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attributes.push((name, String::new()));
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let value_start = pos + 1;
                let rel = src[value_start..].find(*quote as char)?;
                pos = value_start + rel + 1;
                &src[value_start..value_start + rel]
            }
            _ => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                &src[value_start..pos]
            }
        };
        attributes.push((name, value.to_string()));
    }

    Some(OpenTag {
        kind,
        attributes,
        end: pos + 1,
    })
}

/// End offset of a `</grammar>` or `</wordchoice>` tag starting at `lt`.
fn closing_tag_end(src: &str, lt: usize) -> Option<usize> {
    closing_tag_kind(src, lt).map(|(_, end)| end)
}

fn closing_tag_kind(src: &str, lt: usize) -> Option<(SuggestionKind, usize)> {
    if !src[lt..].starts_with("</") {
        return None;
    }
    let (kind, mut pos) = tag_name_at(src, lt + 2)?;
    let bytes = src.as_bytes();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    (bytes.get(pos) == Some(&b'>')).then_some((kind, pos + 1))
}

/// Returns `(body_end, tag_end)` of the first closing tag of `kind`.
fn find_closing_tag(src: &str, from: usize, kind: SuggestionKind) -> Option<(usize, usize)> {
    let mut pos = from;
    while let Some(rel) = src[pos..].find("</") {
        let lt = pos + rel;
        if let Some((found, end)) = closing_tag_kind(src, lt)
            && found == kind
        {
            return Some((lt, end));
        }
        pos = lt + 2;
    }
    None
}

fn contains_annotation_open_tag(text: &str) -> bool {
    text.match_indices('<')
        .any(|(idx, _)| tag_name_at(text, idx + 1).is_some())
}

/// Decodes the named entities the oracle emits plus numeric references.
/// Anything else is left untouched.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|semi| *semi <= 10) {
            Some(semi) => match decode_entity(&tail[1..semi]) {
                Some(ch) => {
                    result.push(ch);
                    rest = &tail[semi + 1..];
                }
                None => {
                    result.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                result.push('&');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_grammar_and_word_choice_pairs() {
        let markup = concat!(
            "The cat <grammar suggestion=\"goes\" explanation=\"Double verb.\">is goes</grammar> ",
            "to the <wordchoice suggestion=\"shop\" explanation=\"Simpler.\">store</wordchoice>."
        );
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.plain_text, "The cat is goes to the store.");
        assert_eq!(
            parsed.edits,
            vec![
                ProposedEdit::grammar("is goes", "goes", "Double verb."),
                ProposedEdit::word_choice("store", "shop", "Simpler."),
            ]
        );
    }

    #[test]
    fn decodes_escaped_attribute_values() {
        let markup = "<grammar suggestion=\"don&apos;t\" explanation=\"Use &quot;don&#39;t&quot; &amp; contract &lt;it&gt;\">dont</grammar>";
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.edits[0].replacement_text, "don't");
        assert_eq!(
            parsed.edits[0].explanation,
            "Use \"don't\" & contract <it>"
        );
    }

    #[test]
    fn quoted_values_may_contain_angle_brackets() {
        let markup = "<grammar suggestion=\"a > b\" explanation='x < y'>a>b</grammar>";
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.edits.len(), 1);
        assert_eq!(parsed.edits[0].replacement_text, "a > b");
        assert_eq!(parsed.edits[0].explanation, "x < y");
        assert_eq!(parsed.edits[0].original_text, "a>b");
    }

    #[test]
    fn unbalanced_tag_is_plain_text_and_later_pairs_survive() {
        let markup = concat!(
            "Start <grammar suggestion=\"x\" explanation=\"y\">never closed. ",
            "Then <wordchoice suggestion=\"big\" explanation=\"z\">huge</wordchoice> end."
        );
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.edits, vec![ProposedEdit::word_choice("huge", "big", "z")]);
        assert!(parsed.plain_text.starts_with("Start <grammar suggestion=\"x\""));
        assert!(parsed.plain_text.ends_with("Then huge end."));
    }

    #[test]
    fn tag_without_suggestion_is_plain_text() {
        let parsed = parse_tagged("<grammar explanation=\"y\">text</grammar>");
        assert!(parsed.edits.is_empty());
        assert_eq!(parsed.plain_text, "<grammar explanation=\"y\">text</grammar>");
    }

    #[test]
    fn nested_annotation_keeps_inner_pair() {
        let markup = "<grammar suggestion=\"a\"><wordchoice suggestion=\"b\">c</wordchoice></grammar>";
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.edits, vec![ProposedEdit::word_choice("c", "b", "")]);
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        let parsed = parse_tagged("<GRAMMAR suggestion='were'>was</Grammar >");
        assert_eq!(parsed.edits, vec![ProposedEdit::grammar("was", "were", "")]);
        assert_eq!(parsed.plain_text, "was");
    }

    #[test]
    fn strips_html_code_fence() {
        let markup = "```html\nHi <grammar suggestion=\"there\" explanation=\"e\">their</grammar>\n```";
        let parsed = parse_tagged(markup);
        assert_eq!(parsed.plain_text, "Hi their");
        assert_eq!(parsed.edits.len(), 1);
    }

    #[test]
    fn plain_text_decodes_entities() {
        assert_eq!(parse_tagged("fish &amp; chips &bogus; &").plain_text, "fish & chips &bogus; &");
    }

    #[test]
    fn strip_removes_unbalanced_annotation_tags() {
        assert_eq!(
            strip_annotation_tags("<grammar suggestion=\"x\">goes</grammar> and </wordchoice> <b>"),
            "goes and  <b>"
        );
    }

    #[test]
    fn other_markup_is_left_alone() {
        let parsed = parse_tagged("<p>Hello <em>world</em></p>");
        assert_eq!(parsed.plain_text, "<p>Hello <em>world</em></p>");
        assert!(parsed.edits.is_empty());
    }
}
