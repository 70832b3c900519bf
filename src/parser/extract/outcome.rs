use crate::parser::lexicon::{first_match, OutcomeLexicon, OutcomeRule};

fn render(rule: &OutcomeRule, lowered: &str) -> String {
    rule.subject
        .as_ref()
        .and_then(|subject| {
            let caps = subject.regex.as_ref()?.captures(lowered)?;
            Some(format!("{} {}", subject.prefix, caps[1].trim()))
        })
        .unwrap_or_else(|| rule.label.clone())
}

/// One-line summary of what the event led to.
///
/// An explicit consequence phrase is returned verbatim (original casing).
/// Otherwise the first keyword rule that applies produces a label, falling
/// back to a topic-level label and finally the generic one.
pub fn extract(description: &str, lex: &OutcomeLexicon) -> String {
    for re in &lex.phrase_patterns {
        if let Some(m) = re.find(description) {
            return m.as_str().trim().to_string();
        }
    }

    let lowered = description.to_lowercase();
    if let Some(rule) = lex.keyword_rules.iter().find(|rule| rule.applies(&lowered)) {
        return render(rule, &lowered);
    }

    first_match(&lex.fallbacks, &lowered)
        .unwrap_or(&lex.default)
        .to_string()
}
