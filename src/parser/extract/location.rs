use std::sync::LazyLock;

use regex::Regex;

use crate::parser::lexicon::LocationLexicon;

static PLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:при|край|близо до|в района на|в околностите на|в|във|на)\s+([А-Я][а-я]+(?:\s+[А-Я][а-я]+)*)",
    )
    .unwrap()
});

static WAR_TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"България_(?:в|във)_(.+?)(?:_война|$)").unwrap());

/// Infer where an event happened.
///
/// Tries, in order: a preposition followed by a capitalised place, the first
/// gazetteer entry found in the text, then a label derived from the topic.
pub fn resolve(description: &str, topic: &str, lex: &LocationLexicon) -> String {
    if let Some(caps) = PLACE_RE.captures(description) {
        return caps[1].to_string();
    }

    if let Some(place) = lex
        .gazetteer
        .iter()
        .find(|place| description.contains(place.as_str()))
    {
        return place.clone();
    }

    from_topic(topic, lex)
}

/// Needles are tested against the identifier as given, so a needle written
/// with spaces never hits an underscore identifier.
fn from_topic(topic: &str, lex: &LocationLexicon) -> String {
    if let Some(entry) = lex
        .topic_labels
        .iter()
        .find(|entry| topic.contains(entry.needle.as_str()))
    {
        return entry.label.clone();
    }

    if topic.contains(lex.war_marker.as_str()) {
        return match WAR_TOPIC_RE.captures(topic) {
            Some(caps) => format!("{} {}", lex.war_prefix, caps[1].replace('_', " ")),
            None => lex.war_fallback.clone(),
        };
    }

    lex.default.clone()
}
