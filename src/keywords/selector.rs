use super::types::{DeriveOptions, FallbackMode, KeywordCandidate, MAX_VARIANTS_PER_CORE};
use crate::text::lexicon::Lexicon;
use std::collections::{HashMap, HashSet};

/// Token prefix length used to compare taxonomy phrases with selected ones.
const BLOCK_STEM_CHARS: usize = 5;

/// Greedy pick over a ranked pool (see `scorer::rank_order`).
///
/// The first pass takes extracted phrases only. Taxonomy phrases are admitted
/// in a second pass when the output is still short and the fallback mode
/// allows it, unless a longer selected phrase already covers them.
pub fn select(
    pool: &[KeywordCandidate],
    lexicon: &Lexicon,
    options: &DeriveOptions,
) -> Vec<KeywordCandidate> {
    let mut picker = Picker {
        lexicon,
        options,
        selected: Vec::new(),
        cores: HashMap::new(),
    };

    for candidate in pool.iter().filter(|c| !c.source.is_taxonomy()) {
        if picker.is_full() {
            break;
        }
        picker.offer(candidate);
    }

    if options.fallback == FallbackMode::Rubrics {
        for candidate in pool.iter().filter(|c| c.source.is_taxonomy()) {
            if picker.is_full() {
                break;
            }
            if picker.is_blocked(candidate) {
                continue;
            }
            picker.offer(candidate);
        }
    }

    picker.selected
}

struct Picker<'a> {
    lexicon: &'a Lexicon,
    options: &'a DeriveOptions,
    selected: Vec<KeywordCandidate>,
    cores: HashMap<String, usize>,
}

impl Picker<'_> {
    fn is_full(&self) -> bool {
        self.selected.len() >= self.options.max_keywords
    }

    fn offer(&mut self, candidate: &KeywordCandidate) {
        if self.options.strict_stats && candidate.volume == 0 {
            return;
        }
        if self.selected.iter().any(|s| s.phrase == candidate.phrase) {
            return;
        }
        let core = self.lexicon.core_phrase(&candidate.phrase).to_string();
        let used = self.cores.entry(core).or_insert(0);
        if *used >= MAX_VARIANTS_PER_CORE {
            return;
        }
        *used += 1;
        self.selected.push(candidate.clone());
    }

    /// "транспорт" is blocked once "транспортные услуги" is in.
    fn is_blocked(&self, candidate: &KeywordCandidate) -> bool {
        let stems = phrase_stems(&candidate.phrase);
        let words = candidate.word_count();
        self.selected.iter().any(|picked| {
            picked.word_count() > words && stems.is_subset(&phrase_stems(&picked.phrase))
        })
    }
}

fn phrase_stems(phrase: &str) -> HashSet<String> {
    phrase
        .split_whitespace()
        .map(|token| token.chars().take(BLOCK_STEM_CHARS).collect())
        .collect()
}
