//! Candidate Producers
//!
//! Five independent producers turn one company record into raw
//! `(phrase, source, base score)` candidates:
//!
//! 1. structured service/product lists, with transactional variants
//! 2. repeated-head enumerations in free text (only without structured lists)
//! 3. activity-trigger windows in free text (strict statistics mode only)
//! 4. parenthetical product lists (food-domain companies only)
//! 5. rubric and category names, the low-priority fallback pool
//!
//! Producers never fail. Whatever they emit is judged later by the safety filter.

use super::types::{KeywordSource, RawCandidate, base_score};
use crate::catalog::types::CompanyRecord;
use crate::text::lexicon::Lexicon;
use crate::text::normalizer::normalize;
use crate::text::tokenizer::{split_sentences, tokenize, trim_edge_words};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

const QUOTE_CHARS: &[char] = &['«', '»', '"', '“', '”', '„', '\'', '`'];
const BRACKET_CHARS: &[char] = &['(', ')', '[', ']', '{', '}'];
const ITEM_DELIMITERS: &[char] = &[',', ';', '|', '\n', '/', '•', '·'];

/// Shortest word allowed on either side of a splittable conjunction.
const CONJUNCTION_SIDE_MIN_CHARS: usize = 3;
const ACTIVITY_WINDOW: usize = 6;
const HEAD_STEM_CHARS: usize = 3;
const HEAD_GROUP_MIN: usize = 3;
const HEAD_ITEM_MAX_WORDS: usize = 6;
/// How far before a parenthesis a list-introducing word may appear.
const LIST_INTRO_LOOKBACK_CHARS: usize = 90;
const PARENTHETICAL_ITEM_MAX_WORDS: usize = 4;

static RE_PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]{2,400})\)").expect("invalid RE_PARENTHETICAL"));

/// Runs every producer the record qualifies for.
pub fn extract(record: &CompanyRecord, lexicon: &Lexicon, strict_stats: bool) -> Vec<RawCandidate> {
    let mut out = structured_items(record, lexicon);
    if record.services_list.is_empty() && record.products_list.is_empty() {
        out.extend(repeated_heads(record, lexicon));
    }
    if strict_stats {
        out.extend(activity_windows(record, lexicon));
    }
    out.extend(parenthetical_lists(record, lexicon));
    out.extend(taxonomy(record, lexicon));
    out
}

// ============================================================
// STRUCTURED ITEMS
// ============================================================

pub fn structured_items(record: &CompanyRecord, lexicon: &Lexicon) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    for item in &record.services_list {
        for phrase in split_items(&item.name, lexicon) {
            service_variants(&phrase, lexicon, &mut out);
        }
    }
    for item in &record.products_list {
        for phrase in split_items(&item.name, lexicon) {
            product_variants(&phrase, lexicon, &mut out);
        }
    }
    out
}

fn service_variants(phrase: &str, lexicon: &Lexicon, out: &mut Vec<RawCandidate>) {
    out.push(RawCandidate::new(phrase, KeywordSource::Service, base_score::SERVICE));
    let first = phrase.split_whitespace().next().unwrap_or_default();
    if !lexicon.is_transactional(first) {
        out.push(RawCandidate::new(
            format!("{} {}", lexicon.order_word, phrase),
            KeywordSource::Service,
            base_score::SERVICE_ORDER,
        ));
    }
}

fn product_variants(phrase: &str, lexicon: &Lexicon, out: &mut Vec<RawCandidate>) {
    let (first, rest) = phrase.split_once(' ').unwrap_or((phrase, ""));

    if first == lexicon.buy_word {
        out.push(RawCandidate::new(phrase, KeywordSource::Product, base_score::PRODUCT_BUY));
        return;
    }
    if lexicon.is_sale_word(first) {
        out.push(RawCandidate::new(phrase, KeywordSource::Product, base_score::PRODUCT_SALE));
        if !rest.is_empty() {
            out.push(RawCandidate::new(
                format!("{} {}", lexicon.buy_word, rest),
                KeywordSource::Product,
                base_score::PRODUCT_BUY,
            ));
        }
        return;
    }

    out.push(RawCandidate::new(phrase, KeywordSource::Product, base_score::PRODUCT));
    if lexicon.is_transactional(first) {
        return;
    }
    out.push(RawCandidate::new(
        format!("{} {}", lexicon.buy_word, phrase),
        KeywordSource::Product,
        base_score::PRODUCT_BUY,
    ));
    if let Some(sale) = lexicon.sale_words.first() {
        out.push(RawCandidate::new(
            format!("{} {}", sale, phrase),
            KeywordSource::Product,
            base_score::PRODUCT_SALE,
        ));
    }
}

/// Strips decorations, splits an item name on list delimiters and splits
/// simple conjunction pairs. Returns normalized phrases.
pub fn split_items(raw: &str, lexicon: &Lexicon) -> Vec<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .map(|c| if BRACKET_CHARS.contains(&c) { ',' } else { c })
        .collect();

    let mut phrases: Vec<String> = Vec::new();
    for part in cleaned.split(ITEM_DELIMITERS) {
        let tokens = tokenize(part);
        let trimmed = trim_edge_words(&tokens, lexicon);
        if trimmed.is_empty() {
            continue;
        }
        for side in split_conjunction(trimmed, lexicon) {
            let side = trim_edge_words(&side, lexicon);
            if side.is_empty() {
                continue;
            }
            let phrase = side.join(" ");
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }
    }
    phrases
}

/// "ремонт и обслуживание холодильников" becomes "ремонт холодильников" and
/// "обслуживание холодильников": a one-word side borrows the other side's
/// tail (or head) so both halves stay meaningful. Anything other than exactly
/// one qualifying conjunction is returned unchanged.
pub fn split_conjunction(tokens: &[String], lexicon: &Lexicon) -> Vec<Vec<String>> {
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| lexicon.is_conjunction(t))
        .map(|(i, _)| i)
        .collect();

    let unchanged = || vec![tokens.to_vec()];
    let [pos] = positions[..] else {
        return unchanged();
    };
    if pos == 0 || pos + 1 >= tokens.len() {
        return unchanged();
    }
    let short_side = |t: &String| t.chars().count() < CONJUNCTION_SIDE_MIN_CHARS;
    if short_side(&tokens[pos - 1]) || short_side(&tokens[pos + 1]) {
        return unchanged();
    }

    let left = &tokens[..pos];
    let right = &tokens[pos + 1..];
    if left == right {
        return unchanged();
    }

    if left.len() == 1 && right.len() > 1 {
        let mut borrowed = left.to_vec();
        borrowed.extend_from_slice(&right[1..]);
        vec![borrowed, right.to_vec()]
    } else if right.len() == 1 && left.len() > 1 {
        let mut borrowed = left[..left.len() - 1].to_vec();
        borrowed.extend_from_slice(right);
        vec![left.to_vec(), borrowed]
    } else {
        vec![left.to_vec(), right.to_vec()]
    }
}

// ============================================================
// FREE TEXT
// ============================================================

fn free_text(record: &CompanyRecord) -> impl Iterator<Item = &str> {
    [record.description.as_str(), record.about.as_str()]
        .into_iter()
        .filter(|text| !text.trim().is_empty())
}

/// Emits enumerations such as "кефир, кефирный напиток, кефир детский" where
/// at least three parts share a three-letter head.
pub fn repeated_heads(record: &CompanyRecord, lexicon: &Lexicon) -> Vec<RawCandidate> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for text in free_text(record) {
        for part in text.split([',', ';', '\n']) {
            let tokens = tokenize(part);
            let trimmed = trim_edge_words(&tokens, lexicon);
            if trimmed.is_empty() || trimmed.len() > HEAD_ITEM_MAX_WORDS {
                continue;
            }
            let head: String = trimmed[0].chars().take(HEAD_STEM_CHARS).collect();
            if head.chars().count() < HEAD_STEM_CHARS {
                continue;
            }
            let phrase = trimmed.join(" ");
            let members = groups.entry(head).or_default();
            if !members.contains(&phrase) {
                members.push(phrase);
            }
        }
    }

    groups
        .into_values()
        .filter(|members| members.len() >= HEAD_GROUP_MIN)
        .flatten()
        .map(|phrase| {
            let base = match phrase.split_whitespace().count() {
                0..=3 => base_score::REPEATED_HEAD_SHORT,
                4 => base_score::REPEATED_HEAD_FOUR,
                _ => base_score::REPEATED_HEAD_LONG,
            };
            RawCandidate::new(phrase, KeywordSource::AuxText, base)
        })
        .collect()
}

/// Windows of up to six words starting at an activity stem ("производство
/// мебели из массива"), emitted at every length from two words up.
pub fn activity_windows(record: &CompanyRecord, lexicon: &Lexicon) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    for text in free_text(record) {
        for sentence in split_sentences(text) {
            let tokens = tokenize(sentence);
            for (i, token) in tokens.iter().enumerate() {
                if !lexicon.is_activity(token) {
                    continue;
                }
                let window = &tokens[i..(i + ACTIVITY_WINDOW).min(tokens.len())];
                for len in 2..=window.len() {
                    let trimmed = trim_edge_words(&window[..len], lexicon);
                    if trimmed.len() < 2 || trimmed.len() != len {
                        continue;
                    }
                    let base = base_score::ACTIVITY[(len - 2).min(base_score::ACTIVITY.len() - 1)];
                    out.push(RawCandidate::new(trimmed.join(" "), KeywordSource::AuxText, base));
                }
            }
        }
    }
    out
}

// ============================================================
// PARENTHETICAL LISTS
// ============================================================

fn is_food_domain(record: &CompanyRecord, lexicon: &Lexicon) -> bool {
    let rubric_names = record.rubrics.iter().map(|r| r.name.as_str());
    let category_names = record.categories.iter().map(|c| c.name.as_str());
    rubric_names
        .chain(category_names)
        .flat_map(tokenize)
        .any(|token| lexicon.is_food_domain(&token))
}

/// "Выпускаем молочную продукцию (молоко, кефир и сметана)" yields the items
/// inside the parentheses that look like product names.
pub fn parenthetical_lists(record: &CompanyRecord, lexicon: &Lexicon) -> Vec<RawCandidate> {
    if !is_food_domain(record, lexicon) {
        return Vec::new();
    }

    let mut out = Vec::new();
    for text in free_text(record) {
        for caps in RE_PARENTHETICAL.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let before = &text[..whole.start()];
            let skip = before.chars().count().saturating_sub(LIST_INTRO_LOOKBACK_CHARS);
            let lookback: String = before.chars().skip(skip).collect();
            if !tokenize(&lookback).iter().any(|t| lexicon.is_list_intro(t)) {
                continue;
            }

            for part in inner.as_str().split([';', ',', '/']) {
                let tokens = tokenize(part);
                for item in tokens.split(|t| lexicon.is_conjunction(t)) {
                    let item = trim_edge_words(item, lexicon);
                    if item.is_empty() || item.len() > PARENTHETICAL_ITEM_MAX_WORDS {
                        continue;
                    }
                    if !item.iter().any(|t| lexicon.is_product_hint(t)) {
                        continue;
                    }
                    let base = base_score::PARENTHETICAL[item.len().saturating_sub(2).min(2)];
                    out.push(RawCandidate::new(item.join(" "), KeywordSource::Product, base));
                }
            }
        }
    }
    out
}

// ============================================================
// TAXONOMY
// ============================================================

pub fn taxonomy(record: &CompanyRecord, lexicon: &Lexicon) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    for rubric in &record.rubrics {
        for phrase in split_items(&rubric.name, lexicon) {
            out.push(RawCandidate::new(phrase, KeywordSource::Rubric, base_score::RUBRIC));
        }
    }
    for category in &record.categories {
        for phrase in split_items(&category.name, lexicon) {
            out.push(RawCandidate::new(phrase, KeywordSource::Category, base_score::CATEGORY));
        }
    }
    out
}

/// Normalized description, about and list text, used for company-level signals.
pub fn company_text(record: &CompanyRecord) -> String {
    let lists = record
        .services_list
        .iter()
        .chain(&record.products_list)
        .map(|item| item.name.as_str());
    let fields = [
        record.name.as_str(),
        record.description.as_str(),
        record.about.as_str(),
    ];
    let parts: Vec<String> = fields
        .into_iter()
        .chain(lists)
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(" ")
}
