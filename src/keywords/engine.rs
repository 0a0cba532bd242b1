use super::extractor::{company_text, extract};
use super::refine::Refiner;
use super::safety::SafetyFilter;
use super::scorer::score_candidates;
use super::selector::select;
use super::types::{DeriveOptions, KeywordCandidate};
use super::volume::VolumeTable;
use crate::catalog::types::CompanyRecord;
use crate::text::lexicon::Lexicon;
use std::sync::Arc;

/// Keyword derivation for one configuration of lexicon, statistics and mode.
///
/// Derivation is a pure function of the record, so one engine is shared by
/// every snapshot built with the same configuration.
#[derive(Debug, Clone)]
pub struct KeywordEngine {
    lexicon: Arc<Lexicon>,
    volumes: Arc<VolumeTable>,
    options: DeriveOptions,
}

impl Default for KeywordEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(Lexicon::default()),
            Arc::new(VolumeTable::new()),
            DeriveOptions::default(),
        )
    }
}

impl KeywordEngine {
    pub fn new(lexicon: Arc<Lexicon>, volumes: Arc<VolumeTable>, options: DeriveOptions) -> Self {
        Self {
            lexicon,
            volumes,
            options,
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn lexicon_handle(&self) -> Arc<Lexicon> {
        self.lexicon.clone()
    }

    pub fn volumes(&self) -> &VolumeTable {
        &self.volumes
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Every candidate that passed the safety filter, ranked.
    pub fn candidates(&self, record: &CompanyRecord) -> Vec<KeywordCandidate> {
        let raw = extract(record, &self.lexicon, self.options.strict_stats);
        let filter = SafetyFilter::new(&self.lexicon, &record.name);
        score_candidates(raw, &self.volumes, &filter)
    }

    pub fn derive_scored(&self, record: &CompanyRecord) -> Vec<KeywordCandidate> {
        let pool = self.candidates(record);
        let selected = select(&pool, &self.lexicon, &self.options);
        let text = company_text(record);
        let refiner = Refiner {
            lexicon: &self.lexicon,
            volumes: &self.volumes,
            strict_stats: self.options.strict_stats,
            company_text: &text,
        };
        let mut refined = refiner.refine(selected, &pool);
        refined.truncate(self.options.max_keywords);
        refined
    }

    pub fn derive_keywords(&self, record: &CompanyRecord) -> Vec<String> {
        self.derive_scored(record)
            .into_iter()
            .map(|c| c.phrase)
            .collect()
    }

    /// Search tokens for a phrase list: each whole phrase followed by its
    /// content words, then the canonical synonym tokens those words map to.
    pub fn derive_tokens(&self, phrases: &[String]) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut canonical: Vec<String> = Vec::new();
        for phrase in phrases {
            if !phrase.is_empty() && !tokens.contains(phrase) {
                tokens.push(phrase.clone());
            }
            for word in phrase.split_whitespace() {
                if self.lexicon.is_stop_word(word) {
                    continue;
                }
                if !tokens.iter().any(|t| t == word) {
                    tokens.push(word.to_string());
                }
                if let Some(synonym) = self.lexicon.canonical(word)
                    && !canonical.iter().any(|c| c == synonym)
                {
                    canonical.push(synonym.to_string());
                }
            }
        }
        for synonym in canonical {
            if !tokens.contains(&synonym) {
                tokens.push(synonym);
            }
        }
        tokens
    }
}
