//! Per-token matching for service/product queries.
//!
//! Without a morphological analyzer, inflected Russian forms are recovered
//! with prefix matching in both directions. A few short stems are ambiguous
//! under that rule ("сыр" vs "сырье"); each has an explicit predicate in
//! [`STEM_EXCEPTIONS`] listing the field words it must not reach.

/// Query tokens this short (in chars) only match exactly.
const EXACT_ONLY_MAX_CHARS: usize = 2;
/// A field token must be at least this long to match as a prefix of the query.
const REVERSE_PREFIX_MIN_CHARS: usize = 4;
/// An exception covers the bare stem plus this many trailing chars.
const EXCEPTION_SLACK_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TokenMatch {
    /// Field token is a prefix of the query token.
    Reverse,
    /// Query token is a prefix of the field token.
    Prefix,
    Exact,
}

impl TokenMatch {
    pub fn weight(self) -> u32 {
        match self {
            TokenMatch::Exact => 3,
            TokenMatch::Prefix => 2,
            TokenMatch::Reverse => 1,
        }
    }
}

pub struct StemException {
    pub stem: &'static str,
    /// True when a word must not be reached from this stem.
    pub rejects: fn(&str) -> bool,
}

/// "сыр" (cheese) must not reach raw material, dampness or raw-state words.
fn rejects_cheese(word: &str) -> bool {
    ["сырь", "сырост", "сырц"].iter().any(|p| word.starts_with(p))
}

/// "газ" (gas) must not reach newspaper, lawn, minivan or soda words.
fn rejects_gas(word: &str) -> bool {
    ["газет", "газон", "газел", "газир"].iter().any(|p| word.starts_with(p))
}

/// "лес" (forest, timber) must not reach staircase words.
fn rejects_forest(word: &str) -> bool {
    word.starts_with("лест")
}

pub const STEM_EXCEPTIONS: &[StemException] = &[
    StemException {
        stem: "сыр",
        rejects: rejects_cheese,
    },
    StemException {
        stem: "газ",
        rejects: rejects_gas,
    },
    StemException {
        stem: "лес",
        rejects: rejects_forest,
    },
];

/// True when a curated exception forbids `query` from reaching `field`.
pub fn exception_blocks(query: &str, field: &str) -> bool {
    let query_len = query.chars().count();
    STEM_EXCEPTIONS.iter().any(|exception| {
        query.starts_with(exception.stem)
            && query_len <= exception.stem.chars().count() + EXCEPTION_SLACK_CHARS
            && !(exception.rejects)(query)
            && (exception.rejects)(field)
    })
}

pub fn match_token(query: &str, field: &str) -> Option<TokenMatch> {
    if query == field {
        return Some(TokenMatch::Exact);
    }
    if query.chars().count() <= EXACT_ONLY_MAX_CHARS {
        return None;
    }
    if exception_blocks(query, field) {
        return None;
    }
    if field.starts_with(query) {
        return Some(TokenMatch::Prefix);
    }
    if field.chars().count() >= REVERSE_PREFIX_MIN_CHARS && query.starts_with(field) {
        return Some(TokenMatch::Reverse);
    }
    None
}

/// Strongest match of `query` against any field token.
pub fn best_match<'a, I>(query: &str, fields: I) -> Option<TokenMatch>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut best = None;
    for field in fields {
        match match_token(query, field) {
            Some(TokenMatch::Exact) => return Some(TokenMatch::Exact),
            Some(found) if Some(found) > best => best = Some(found),
            _ => {}
        }
    }
    best
}
