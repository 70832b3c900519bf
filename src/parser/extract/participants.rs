use std::collections::BTreeSet;

use crate::parser::lexicon::{first_match, ParticipantLexicon};

/// Comma-joined set of the parties involved, or a fallback phrase.
///
/// The result carries no meaningful order; duplicates are removed.
pub fn extract(description: &str, lex: &ParticipantLexicon) -> String {
    let mut found: BTreeSet<&str> = lex
        .compiled
        .iter()
        .flat_map(|re| re.find_iter(description).map(|m| m.as_str()))
        .collect();
    found.extend(
        lex.entities
            .iter()
            .map(String::as_str)
            .filter(|entity| description.contains(entity)),
    );

    if !found.is_empty() {
        return found.into_iter().collect::<Vec<_>>().join(", ");
    }

    let lowered = description.to_lowercase();
    first_match(&lex.fallbacks, &lowered)
        .unwrap_or(&lex.default)
        .to_string()
}
