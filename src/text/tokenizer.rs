use super::lexicon::Lexicon;
use super::normalizer::normalize;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?;\n\r]+").expect("invalid RE_SENTENCE"));

pub fn tokenize(raw: &str) -> Vec<String> {
    normalize(raw)
        .split_whitespace()
        .map(|word| word.to_string())
        .collect()
}

/// Drops stop words from both ends, keeping interior ones ("ремонт и сервис").
pub fn trim_edge_words<'a>(tokens: &'a [String], lexicon: &Lexicon) -> &'a [String] {
    let start = tokens
        .iter()
        .position(|t| !lexicon.is_stop_word(t))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| !lexicon.is_stop_word(t))
        .map(|i| i + 1)
        .unwrap_or(start);
    &tokens[start..end.max(start)]
}

/// Query-side tokens: stop words removed, synonyms canonicalized, duplicates dropped.
pub fn tokenize_query(raw: &str, lexicon: &Lexicon) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in tokenize(raw) {
        if lexicon.is_stop_word(&token) {
            continue;
        }
        let token = match lexicon.canonical(&token) {
            Some(canonical) => canonical.to_string(),
            None => token,
        };
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

pub fn split_sentences(raw: &str) -> Vec<&str> {
    RE_SENTENCE
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
