pub mod extract;
pub mod fragments;
pub mod lexicon;

use crate::db::FetchedPage;
use extract::EventRecord;
use lexicon::Lexicon;

/// Two-pass pipeline: markup → candidate fragments → event records.
pub fn process_page(page: &FetchedPage, lex: &Lexicon) -> Vec<EventRecord> {
    let fragments = fragments::candidate_fragments(&page.html);
    extract::extract_events(fragments.iter().map(String::as_str), &page.topic, lex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_page_to_records() {
        let page = FetchedPage {
            topic: "Априлско_въстание".to_string(),
            html: std::fs::read_to_string("tests/fixtures/april_uprising.html").unwrap(),
        };
        let events = process_page(&page, Lexicon::builtin());
        assert_eq!(events.len(), 5);

        let first = &events[0];
        assert_eq!(first.event_date, "20 април 1876 г.");
        assert_eq!(first.sort_year, extract::SortYear::Year(1876));
        assert_eq!(first.location, "Копривщица");
        assert_eq!(first.source, "Априлско въстание");

        // paragraphs come after list items and carry no leading date
        assert!(events[3..].iter().all(|e| e.sort_year == extract::SortYear::Undated));
        assert_eq!(events[3].category, "Въстание");
        assert_eq!(events[4].category, "Война/Битка");
    }
}
