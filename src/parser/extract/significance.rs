use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::lexicon::SignificanceLexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Significance {
    #[serde(rename = "Висока")]
    High,
    #[serde(rename = "Средна")]
    Medium,
    #[serde(rename = "Ниска")]
    Low,
}

impl Significance {
    pub fn label(self) -> &'static str {
        match self {
            Significance::High => "Висока",
            Significance::Medium => "Средна",
            Significance::Low => "Ниска",
        }
    }

    /// Accepts the Bulgarian label or the English variant name, any case.
    pub fn parse(s: &str) -> Option<Significance> {
        match s.trim().to_lowercase().as_str() {
            "висока" | "high" => Some(Significance::High),
            "средна" | "medium" => Some(Significance::Medium),
            "ниска" | "low" => Some(Significance::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Indicator phrases decide first, then the category lists, then the
/// lexicon default.
pub fn score(description: &str, category: &str, lex: &SignificanceLexicon) -> Significance {
    let lowered = description.to_lowercase();
    let has_any = |phrases: &[String]| phrases.iter().any(|p| lowered.contains(p.as_str()));

    if has_any(&lex.high_indicators) {
        Significance::High
    } else if has_any(&lex.low_indicators) {
        Significance::Low
    } else if lex.high_categories.iter().any(|c| c == category) {
        Significance::High
    } else if lex.medium_categories.iter().any(|c| c == category) {
        Significance::Medium
    } else {
        lex.default
    }
}
