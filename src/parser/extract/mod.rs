pub mod category;
pub mod date;
pub mod leaders;
pub mod location;
pub mod numeral;
pub mod outcome;
pub mod participants;
pub mod significance;
pub mod title;

use serde::Serialize;

use super::lexicon::Lexicon;
pub use date::SortYear;
pub use significance::Significance;

/// Structured form of one candidate fragment.
///
/// Field order is the column order of the exported files. `sort_year` is
/// only used for ordering and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub location: String,
    pub category: String,
    pub significance: Significance,
    pub leader: String,
    pub participants: String,
    pub results: String,
    pub source: String,
    #[serde(skip)]
    pub sort_year: SortYear,
}

/// Human-readable topic name: the page identifier with spaces.
pub fn source_name(topic: &str) -> String {
    topic.replace('_', " ")
}

/// Build the record for one fragment of `topic`'s page. Never fails.
pub fn extract_event(fragment: &str, topic: &str, lex: &Lexicon) -> EventRecord {
    let date = date::extract(fragment, &lex.undated_label);
    let description = date.remainder;
    let dated = date.sort_year != SortYear::Undated;

    let title = title::generate(&date.event_date, &description, dated);
    let location = location::resolve(&description, topic, &lex.location);
    let category = category::classify(&description, lex).to_string();
    let significance = significance::score(&description, &category, &lex.significance);
    let leader = leaders::extract(&description, &lex.leaders);
    let participants = participants::extract(&description, &lex.participants);
    let results = outcome::extract(&description, &lex.outcomes);

    EventRecord {
        title,
        description,
        event_date: date.event_date,
        location,
        category,
        significance,
        leader,
        participants,
        results,
        source: source_name(topic),
        sort_year: date.sort_year,
    }
}

/// One record per fragment, in fragment order.
pub fn extract_events<'a, I>(fragments: I, topic: &str, lex: &Lexicon) -> Vec<EventRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    fragments
        .into_iter()
        .map(|fragment| extract_event(fragment, topic, lex))
        .collect()
}

// ── Tests ──
