use crate::parser::lexicon::{first_match, Lexicon};

/// Pick exactly one category label for `description`.
///
/// Primary categories are checked in table order, then the fallback
/// keyword rules, then the generic default label.
pub fn classify<'a>(description: &str, lex: &'a Lexicon) -> &'a str {
    let lowered = description.to_lowercase();
    first_match(&lex.categories, &lowered)
        .or_else(|| first_match(&lex.category_fallbacks, &lowered))
        .unwrap_or(&lex.category_default)
}
