use std::sync::LazyLock;

use regex::Regex;

use super::numeral::roman_to_int;

/// Leading date shapes, in priority order. The first one that matches wins.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // 15 март 1876 г.
        r"^(\d{1,2}\s+(?:януари|февруари|март|април|май|юни|юли|август|септември|октомври|ноември|декември)\s+\d{4}(?:\s+г\.)?)",
        // 681 г. / 1018 година / 46 пр.н.е. followed by a separator
        r"^(\d{1,4}(?:\s?(?:г\.|година|пр\.н\.е\.|пр\. н\. е\.|н\.е\.|н\. е\.))?)[\s:–\-]",
        // XIV век / IX в. / 12 столетие
        r"^((?:[IVX]+|[0-9]+)[\s-](?:век|в\.|столетие))",
        r"^(\d{3,4})[\s:–\-]",
        // 1912–1913 г.
        r"^(\d{3,4}\s*[-–]\s*\d{3,4}(?:\s+г\.)?)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{3,4}").unwrap());
static CENTURY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([IVX]+|[0-9]+)[\s-](?:век|в\.|столетие)").unwrap());
static ROMAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[IVX]+$").unwrap());

const BEFORE_ERA_MARKERS: &[&str] = &["пр.н.е.", "пр. н. е."];

/// Chronological ordering key of an event.
///
/// Variant order is the sort order: every resolved year comes first, then
/// fragments without a date, then dates whose year could not be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortYear {
    Year(i64),
    /// No date pattern matched; sorts like positive infinity.
    Undated,
    /// A date matched but carries no recognisable year or century.
    Unresolved,
}

impl SortYear {
    pub fn year(self) -> Option<i64> {
        match self {
            SortYear::Year(y) => Some(y),
            _ => None,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            SortYear::Year(_) => "year",
            SortYear::Undated => "undated",
            SortYear::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDate {
    pub event_date: String,
    pub remainder: String,
    pub sort_year: SortYear,
}

/// Split a leading date expression off `text`.
///
/// Without a match the date is `undated_label`, the remainder is `text`
/// unchanged and the key is [`SortYear::Undated`].
pub fn extract(text: &str, undated_label: &str) -> ExtractedDate {
    for re in DATE_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            let date = caps[1].trim();
            let end = caps.get(0).map_or(0, |m| m.end());
            return ExtractedDate {
                event_date: date.to_string(),
                remainder: text[end..].trim().to_string(),
                sort_year: sort_year(date),
            };
        }
    }

    ExtractedDate {
        event_date: undated_label.to_string(),
        remainder: text.to_string(),
        sort_year: SortYear::Undated,
    }
}

/// Derive the ordering key from a matched date string.
pub fn sort_year(date: &str) -> SortYear {
    if let Some(m) = YEAR_RE.find(date) {
        return match m.as_str().parse::<i64>() {
            Ok(year) if BEFORE_ERA_MARKERS.iter().any(|mk| date.contains(mk)) => {
                SortYear::Year(-year)
            }
            Ok(year) => SortYear::Year(year),
            // non-ASCII digits
            Err(_) => SortYear::Unresolved,
        };
    }

    let Some(caps) = CENTURY_RE.captures(date) else {
        return SortYear::Unresolved;
    };
    let century = &caps[1];
    if ROMAN_RE.is_match(century) {
        SortYear::Year(roman_to_int(century) * 100)
    } else {
        century
            .parse::<i64>()
            .map(|c| SortYear::Year(c * 100))
            .unwrap_or(SortYear::Unresolved)
    }
}
