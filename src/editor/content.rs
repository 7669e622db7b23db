use tdoc::{InlineStyle, Span};

use super::SpanPath;
use crate::suggestion::TextRange;
use crate::text::{splice_chars, split_text};

pub(crate) fn span_at_mut<'a>(spans: &'a mut [Span], path: &SpanPath) -> Option<&'a mut Span> {
    let mut iter = path.indices().iter();
    let first = iter.next()?;
    let mut span = spans.get_mut(*first)?;
    for idx in iter {
        span = span.children.get_mut(*idx)?;
    }
    Some(span)
}

/// Replaces the given span-local ranges of one leaf. The replacement text
/// lands in the first range; the others are cleared.
pub(crate) fn replace_in_spans(
    spans: &mut Vec<Span>,
    ranges: &[(SpanPath, TextRange)],
    replacement: &str,
) -> bool {
    if ranges.is_empty() {
        if !replacement.is_empty() {
            spans.push(Span::new_text(replacement));
        }
        return true;
    }
    for (idx, (path, range)) in ranges.iter().enumerate().rev() {
        let Some(span) = span_at_mut(spans, path) else {
            return false;
        };
        let inserted = if idx == 0 { replacement } else { "" };
        if !splice_chars(&mut span.text, *range, inserted) {
            return false;
        }
    }
    true
}

pub(crate) fn apply_style_to_span_path(
    spans: &mut Vec<Span>,
    path: &[usize],
    start: usize,
    end: usize,
    style: InlineStyle,
) -> bool {
    let Some((&idx, rest)) = path.split_first() else {
        return false;
    };
    if idx >= spans.len() {
        return false;
    }
    if rest.is_empty() {
        apply_style_to_leaf_span(spans, idx, start, end, style)
    } else {
        apply_style_to_span_path(&mut spans[idx].children, rest, start, end, style)
    }
}

fn apply_style_to_leaf_span(
    spans: &mut Vec<Span>,
    idx: usize,
    start: usize,
    end: usize,
    style: InlineStyle,
) -> bool {
    let original = spans[idx].clone();
    let len = original.text.chars().count();
    let clamped_end = end.min(len);
    let clamped_start = start.min(clamped_end);
    if clamped_start >= clamped_end {
        return false;
    }

    let (before_end, right_text) = split_text(&original.text, clamped_end);
    let (left_text, mid_text) = split_text(&before_end, clamped_start);

    let mut replacements = Vec::with_capacity(3);
    if !left_text.is_empty() {
        let mut left = original.clone();
        left.text = left_text;
        left.children.clear();
        replacements.push(left);
    }

    let mut mid = original.clone();
    mid.text = mid_text;
    mid.children.clear();
    mid.style = style;
    mid.link_target = None;
    replacements.push(mid);

    // Children follow the parent's own text, so they stay with the last piece.
    if !right_text.is_empty() || !original.children.is_empty() {
        let mut right = original;
        right.text = right_text;
        replacements.push(right);
    }

    spans.splice(idx..=idx, replacements);
    true
}

pub(crate) fn prune_and_merge_spans(spans: &mut Vec<Span>) {
    let mut idx = 0;
    while idx < spans.len() {
        prune_and_merge_spans(&mut spans[idx].children);
        if spans[idx].text.is_empty() && spans[idx].children.is_empty() {
            spans.remove(idx);
        } else {
            idx += 1;
        }
    }

    let mut i = 0;
    while i + 1 < spans.len() {
        if can_merge_spans(&spans[i], &spans[i + 1]) {
            let right = spans.remove(i + 1);
            spans[i].text.push_str(&right.text);
        } else {
            i += 1;
        }
    }
}

fn can_merge_spans(left: &Span, right: &Span) -> bool {
    left.style == right.style
        && left.link_target == right.link_target
        && left.children.is_empty()
        && right.children.is_empty()
}
