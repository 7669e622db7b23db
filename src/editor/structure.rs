use tdoc::{ChecklistItem, Document, Paragraph, Span};

use super::{ParagraphPath, PathStep};

pub(crate) fn ensure_document_initialized(document: &mut Document) {
    if document.paragraphs.is_empty() {
        document
            .paragraphs
            .push(Paragraph::new_text().with_content(vec![Span::new_text("")]));
    }
}

pub(crate) fn paragraph_mut<'a>(
    document: &'a mut Document,
    path: &ParagraphPath,
) -> Option<&'a mut Paragraph> {
    let mut iter = path.steps().iter();
    let mut paragraph = match iter.next()? {
        PathStep::Root(idx) => document.paragraphs.get_mut(*idx)?,
        _ => return None,
    };
    for step in iter {
        paragraph = match step {
            PathStep::Child(idx) => {
                let Paragraph::Quote { children } = paragraph else {
                    return None;
                };
                children.get_mut(*idx)?
            }
            PathStep::Entry {
                entry_index,
                paragraph_index,
            } => match paragraph {
                Paragraph::OrderedList { entries } | Paragraph::UnorderedList { entries } => {
                    entries.get_mut(*entry_index)?.get_mut(*paragraph_index)?
                }
                _ => return None,
            },
            PathStep::ChecklistItem { .. } | PathStep::Root(_) => return None,
        };
    }
    Some(paragraph)
}

pub(crate) fn checklist_item_mut<'a>(
    document: &'a mut Document,
    path: &ParagraphPath,
) -> Option<&'a mut ChecklistItem> {
    let steps = path.steps();
    let (step_idx, PathStep::ChecklistItem { indices }) = steps
        .iter()
        .enumerate()
        .find(|(_, step)| matches!(step, PathStep::ChecklistItem { .. }))?
    else {
        return None;
    };

    let paragraph_path = ParagraphPath::from_steps(steps[..step_idx].to_vec());
    let Paragraph::Checklist { items } = paragraph_mut(document, &paragraph_path)? else {
        return None;
    };

    let (first, rest) = indices.split_first()?;
    let mut item = items.get_mut(*first)?;
    for &idx in rest {
        item = item.children.get_mut(idx)?;
    }
    Some(item)
}

/// Inline content of the leaf at `path`: a checklist item's content when
/// the path ends in one, otherwise the paragraph's own spans.
pub(crate) fn leaf_spans_mut<'a>(
    document: &'a mut Document,
    path: &ParagraphPath,
) -> Option<&'a mut Vec<Span>> {
    let is_item = path
        .steps()
        .iter()
        .any(|step| matches!(step, PathStep::ChecklistItem { .. }));
    if is_item {
        return checklist_item_mut(document, path).map(|item| &mut item.content);
    }
    let paragraph = paragraph_mut(document, path)?;
    if !paragraph.paragraph_type().is_leaf() {
        return None;
    }
    Some(paragraph.content_mut())
}
