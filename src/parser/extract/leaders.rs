use crate::parser::lexicon::LeaderLexicon;

/// Comma-joined leader names mentioned in `description`, or a fallback phrase.
///
/// Known names come first in list order, then titled names, then generic
/// capitalised names when the text talks about leading or commanding.
pub fn extract(description: &str, lex: &LeaderLexicon) -> String {
    let mut found: Vec<String> = lex
        .known
        .iter()
        .filter(|name| description.contains(name.as_str()))
        .cloned()
        .collect();

    for re in &lex.title_patterns {
        for m in re.find_iter(description) {
            push_new(&mut found, m.as_str());
        }
    }

    let lowered = description.to_lowercase();
    if lex
        .context_keywords
        .iter()
        .any(|kw| lowered.contains(kw.as_str()))
    {
        for name in capitalized_names(description) {
            push_new(&mut found, name);
        }
    }

    if !found.is_empty() {
        return found.join(", ");
    }

    match lex
        .countries
        .iter()
        .find(|country| description.contains(country.as_str()))
    {
        Some(country) => format!("{} {}", lex.country_prefix, country),
        None => lex.unspecified.clone(),
    }
}

fn push_new(found: &mut Vec<String>, name: &str) {
    if !found.iter().any(|f| f == name) {
        found.push(name.to_string());
    }
}

fn is_upper(c: char) -> bool {
    ('А'..='Я').contains(&c)
}

fn is_lower(c: char) -> bool {
    ('а'..='я').contains(&c)
}

/// Two- or three-word capitalised sequences that are not glued to another
/// capitalised word on either side.
///
/// Matches what a backtracking engine does with
/// `(?<![А-Я])[А-Я][а-я]+(?:\s+[А-Я][а-я]+){1,2}(?!\s+[А-Я])`: when the
/// sequence is followed by yet another capitalised word, the last word is
/// shortened by one letter rather than the match being dropped.
pub fn capitalized_names(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |idx: usize| chars.get(idx).map_or(text.len(), |&(b, _)| b);

    let mut names = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match name_at(&chars, i) {
            Some(end) => {
                names.push(&text[byte_at(i)..byte_at(end)]);
                i = end;
            }
            None => i += 1,
        }
    }
    names
}

/// End (exclusive char index) of a name starting at `start`, if any.
fn name_at(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let ch = |idx: usize| chars.get(idx).map(|&(_, c)| c);

    if !ch(start).is_some_and(is_upper) {
        return None;
    }
    if start > 0 && ch(start - 1).is_some_and(is_upper) {
        return None;
    }
    let first_end = lower_run_end(chars, start + 1);
    if first_end == start + 1 {
        return None;
    }

    // (start of lowercase run, end of word) for each extra word
    let mut extra_words: Vec<(usize, usize)> = Vec::with_capacity(2);
    let mut pos = first_end;
    while extra_words.len() < 2 {
        let mut ws = pos;
        while ch(ws).is_some_and(char::is_whitespace) {
            ws += 1;
        }
        if ws == pos || !ch(ws).is_some_and(is_upper) {
            break;
        }
        let end = lower_run_end(chars, ws + 1);
        if end == ws + 1 {
            break;
        }
        extra_words.push((ws + 1, end));
        pos = end;
    }

    for &(lower_start, word_end) in extra_words.iter().rev() {
        // full word first, then one letter shorter: the next char is then a
        // lowercase letter, so the look-ahead cannot fail again
        if !followed_by_capital(chars, word_end) {
            return Some(word_end);
        }
        if word_end - lower_start >= 2 {
            return Some(word_end - 1);
        }
    }
    None
}

fn lower_run_end(chars: &[(usize, char)], from: usize) -> usize {
    let mut end = from;
    while chars.get(end).is_some_and(|&(_, c)| is_lower(c)) {
        end += 1;
    }
    end
}

fn followed_by_capital(chars: &[(usize, char)], at: usize) -> bool {
    let mut k = at;
    while chars.get(k).is_some_and(|&(_, c)| c.is_whitespace()) {
        k += 1;
    }
    k > at && chars.get(k).is_some_and(|&(_, c)| is_upper(c))
}
