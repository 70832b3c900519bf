const DATED_PREVIEW: usize = 50;
const UNDATED_PREVIEW: usize = 70;

/// Short display label: `<date> - <preview>` for dated events, the preview
/// alone otherwise. Previews are cut on characters and end in `...` when cut.
///
/// An undated event with no description is labelled with its date sentinel.
pub fn generate(event_date: &str, description: &str, dated: bool) -> String {
    if dated {
        format!("{} - {}", event_date, preview(description, DATED_PREVIEW))
    } else if description.is_empty() {
        event_date.to_string()
    } else {
        preview(description, UNDATED_PREVIEW)
    }
}

fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
