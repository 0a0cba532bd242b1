use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phrases sharing one core (see `Lexicon::core_phrase`) allowed in the output.
pub const MAX_VARIANTS_PER_CORE: usize = 1;
pub const DEFAULT_MAX_KEYWORDS: usize = 10;
/// Longest phrase, in words, that survives the safety filter.
pub const MAX_PHRASE_WORDS: usize = 6;
/// Number of "купить ..." phrases refinement tries to guarantee.
pub const MIN_BUY_PHRASES: usize = 2;

/// Base scores per producer and pattern. Transactional variants always sit
/// above the bare phrase of the same source.
pub mod base_score {
    pub const SERVICE: f64 = 120.0;
    pub const SERVICE_ORDER: f64 = 124.0;
    pub const PRODUCT: f64 = 118.0;
    pub const PRODUCT_SALE: f64 = 121.0;
    pub const PRODUCT_BUY: f64 = 127.0;
    pub const REPEATED_HEAD_SHORT: f64 = 112.0;
    pub const REPEATED_HEAD_FOUR: f64 = 110.0;
    pub const REPEATED_HEAD_LONG: f64 = 109.0;
    pub const PARENTHETICAL: [f64; 3] = [109.0, 107.0, 106.0];
    pub const ACTIVITY: [f64; 4] = [84.0, 83.0, 82.0, 81.0];
    pub const RUBRIC: f64 = 58.0;
    pub const CATEGORY: f64 = 54.0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    Service,
    Product,
    AuxText,
    Rubric,
    Category,
}

impl KeywordSource {
    /// Tie-break rank used by the selector; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            KeywordSource::Service => 5,
            KeywordSource::Product => 4,
            KeywordSource::AuxText => 3,
            KeywordSource::Rubric => 2,
            KeywordSource::Category => 1,
        }
    }

    pub fn is_taxonomy(self) -> bool {
        matches!(self, KeywordSource::Rubric | KeywordSource::Category)
    }
}

/// Extractor output before the safety filter and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub phrase: String,
    pub source: KeywordSource,
    pub base_score: f64,
}

impl RawCandidate {
    pub fn new(phrase: impl Into<String>, source: KeywordSource, base_score: f64) -> Self {
        Self {
            phrase: phrase.into(),
            source,
            base_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCandidate {
    pub phrase: String,
    pub source: KeywordSource,
    pub score: f64,
    pub volume: u64,
}

impl KeywordCandidate {
    pub fn word_count(&self) -> usize {
        self.phrase.split_whitespace().count()
    }
}

/// What the selector may use once extracted phrases run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackMode {
    #[default]
    Rubrics,
    None,
}

impl FromStr for FallbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rubrics" => Ok(FallbackMode::Rubrics),
            "none" => Ok(FallbackMode::None),
            other => Err(format!("unknown fallback mode '{}'", other)),
        }
    }
}

impl fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackMode::Rubrics => f.write_str("rubrics"),
            FallbackMode::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveOptions {
    pub max_keywords: usize,
    /// Only phrases with observed volume are eligible.
    pub strict_stats: bool,
    pub fallback: FallbackMode,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            max_keywords: DEFAULT_MAX_KEYWORDS,
            strict_stats: false,
            fallback: FallbackMode::Rubrics,
        }
    }
}
