use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::parser::extract::Significance;

const BUILTIN_PATH: &str = "data/lexicon.json";
const BUILTIN_JSON: &str = include_str!("../../data/lexicon.json");

static BUILTIN: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::from_json(BUILTIN_JSON, Path::new(BUILTIN_PATH))
        .expect("embedded data/lexicon.json must be valid")
});

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lexicon {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid pattern {pattern:?} in lexicon: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Keyword dictionaries, name lists and fallback labels used by the extractors.
///
/// Every list is ordered; the position of an entry is its priority.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    pub undated_label: String,
    pub location: LocationLexicon,
    pub categories: Vec<KeywordRule>,
    pub category_fallbacks: Vec<KeywordRule>,
    pub category_default: String,
    pub significance: SignificanceLexicon,
    pub leaders: LeaderLexicon,
    pub participants: ParticipantLexicon,
    pub outcomes: OutcomeLexicon,
}

/// A label that applies when any of its keywords occurs in lowercased text.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    /// `lowered` must already be lowercased.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|kw| lowered.contains(kw.as_str()))
    }
}

/// First rule (in order) whose keywords hit `lowered`.
pub fn first_match<'a>(rules: &'a [KeywordRule], lowered: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| rule.matches(lowered))
        .map(|rule| rule.label.as_str())
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicLabel {
    pub needle: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationLexicon {
    pub gazetteer: Vec<String>,
    pub topic_labels: Vec<TopicLabel>,
    pub war_marker: String,
    pub war_prefix: String,
    pub war_fallback: String,
    pub default: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignificanceLexicon {
    pub high_indicators: Vec<String>,
    pub low_indicators: Vec<String>,
    pub high_categories: Vec<String>,
    pub medium_categories: Vec<String>,
    /// Level for categories in neither list.
    pub default: Significance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderLexicon {
    pub known: Vec<String>,
    /// Title words (regex fragments), each followed by a one- or two-word name.
    pub titles: Vec<String>,
    pub context_keywords: Vec<String>,
    pub countries: Vec<String>,
    pub country_prefix: String,
    pub unspecified: String,
    #[serde(skip)]
    pub title_patterns: Vec<Regex>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantLexicon {
    pub patterns: Vec<String>,
    pub entities: Vec<String>,
    pub fallbacks: Vec<KeywordRule>,
    pub default: String,
    #[serde(skip)]
    pub compiled: Vec<Regex>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeLexicon {
    /// Consequence phrases, each captured up to the next period.
    pub phrases: Vec<String>,
    pub keyword_rules: Vec<OutcomeRule>,
    pub fallbacks: Vec<KeywordRule>,
    pub default: String,
    #[serde(skip)]
    pub phrase_patterns: Vec<Regex>,
}

/// Applies when any of `any_of` occurs and, if given, any of `also_any_of`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeRule {
    pub any_of: Vec<String>,
    #[serde(default)]
    pub also_any_of: Vec<String>,
    #[serde(default)]
    pub subject: Option<SubjectCapture>,
    pub label: String,
}

impl OutcomeRule {
    pub fn applies(&self, lowered: &str) -> bool {
        self.any_of.iter().any(|kw| lowered.contains(kw.as_str()))
            && (self.also_any_of.is_empty()
                || self.also_any_of.iter().any(|kw| lowered.contains(kw.as_str())))
    }
}

/// Pattern whose first group names the subject, rendered as `<prefix> <subject>`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectCapture {
    pub pattern: String,
    pub prefix: String,
    #[serde(skip)]
    pub regex: Option<Regex>,
}

fn compile(pattern: &str) -> Result<Regex, LexiconError> {
    Regex::new(pattern).map_err(|source| LexiconError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl Lexicon {
    /// The dictionaries shipped in `data/lexicon.json`.
    pub fn builtin() -> &'static Lexicon {
        &BUILTIN
    }

    /// Load a replacement lexicon with the same shape as `data/lexicon.json`.
    pub fn load(path: &Path) -> Result<Lexicon, LexiconError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, path)
    }

    fn from_json(raw: &str, path: &Path) -> Result<Lexicon, LexiconError> {
        let lex: Lexicon = serde_json::from_str(raw).map_err(|source| LexiconError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        lex.compile()
    }

    /// Build the regexes behind the pattern lists.
    fn compile(mut self) -> Result<Lexicon, LexiconError> {
        self.leaders.title_patterns = self
            .leaders
            .titles
            .iter()
            .map(|title| compile(&format!(r"{title}\s+[А-Я][а-я]+(?:\s+[А-Я][а-я]+)?")))
            .collect::<Result<_, _>>()?;
        self.participants.compiled = self
            .participants
            .patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<_, _>>()?;
        self.outcomes.phrase_patterns = self
            .outcomes
            .phrases
            .iter()
            .map(|p| compile(p))
            .collect::<Result<_, _>>()?;
        for rule in &mut self.outcomes.keyword_rules {
            if let Some(subject) = &mut rule.subject {
                subject.regex = Some(compile(&subject.pattern)?);
            }
        }
        Ok(self)
    }
}
