use std::borrow::Cow;

/// Longest quote, in characters, carried into an explanation.
pub const QUOTE_LIMIT: usize = 80;
const ELLIPSIS: &str = "...";
const UNTITLED_CLIP: &str = "untitled clip";

/// Human readable reason for an insertion, shown next to each plan item.
pub fn explain(segment_text: &str, broll_metadata: Option<&str>, score: f32) -> String {
    let spoken = truncate(segment_text, QUOTE_LIMIT);
    let shown = truncate(broll_metadata.unwrap_or(UNTITLED_CLIP), QUOTE_LIMIT);

    format!(
        "The speaker says \"{}\", so the B-roll \"{}\" is inserted to illustrate it ({:.1}% match).",
        spoken,
        shown,
        f64::from(score) * 100.0
    )
}

/// Cut `text` to `limit` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], ELLIPSIS)),
        None => Cow::Borrowed(text),
    }
}
