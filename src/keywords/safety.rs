use super::types::{KeywordSource, MAX_PHRASE_WORDS};
use crate::text::lexicon::Lexicon;
use std::collections::HashSet;

/// Company name words shorter than this are too weak to count as a repeat.
const NAME_TOKEN_MIN_CHARS: usize = 3;

/// Per-company state the safety filter needs besides the phrase itself.
pub struct SafetyFilter<'a> {
    lexicon: &'a Lexicon,
    name_tokens: HashSet<String>,
}

impl<'a> SafetyFilter<'a> {
    pub fn new(lexicon: &'a Lexicon, company_name: &str) -> Self {
        let name_tokens = crate::text::tokenize(company_name)
            .into_iter()
            .filter(|t| t.chars().count() >= NAME_TOKEN_MIN_CHARS && !lexicon.is_legal_form(t))
            .collect();
        Self {
            lexicon,
            name_tokens,
        }
    }

    /// Phrases are expected in normalized form.
    pub fn accepts(&self, phrase: &str, source: KeywordSource) -> bool {
        let lexicon = self.lexicon;
        let tokens: Vec<&str> = phrase.split_whitespace().collect();

        if tokens.is_empty() || tokens.len() > MAX_PHRASE_WORDS {
            return false;
        }
        if !phrase.chars().any(char::is_alphabetic) {
            return false;
        }
        if tokens.iter().any(|t| lexicon.is_price(t)) {
            return false;
        }
        if tokens.iter().any(|t| is_year(t) || is_code(t)) {
            return false;
        }
        if tokens.iter().any(|t| lexicon.is_geo(t)) {
            return false;
        }
        if tokens.iter().all(|t| lexicon.is_stop_word(t)) {
            return false;
        }
        if tokens.len() == 1 && lexicon.is_generic(tokens[0]) {
            return false;
        }
        if source == KeywordSource::AuxText {
            if tokens.iter().any(|t| lexicon.is_editorial(t)) {
                return false;
            }
            if tokens.iter().any(|t| self.name_tokens.contains(*t)) {
                return false;
            }
        }
        if !source.is_taxonomy() && !tokens.iter().any(|t| is_specific(t, lexicon)) {
            return false;
        }
        true
    }
}

fn is_specific(token: &str, lexicon: &Lexicon) -> bool {
    !lexicon.is_stop_word(token) && !lexicon.is_generic(token) && !lexicon.is_transactional(token)
}

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && (token.starts_with("19") || token.starts_with("20"))
}

/// Article numbers and model codes mix letters with digits ("a4", "мтз82").
fn is_code(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && token.chars().any(|c| c.is_numeric())
}
