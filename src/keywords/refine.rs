use super::types::{KeywordCandidate, MIN_BUY_PHRASES};
use super::volume::VolumeTable;
use crate::text::lexicon::{Lexicon, has_stem};

pub struct Refiner<'a> {
    pub lexicon: &'a Lexicon,
    pub volumes: &'a VolumeTable,
    pub strict_stats: bool,
    /// Normalized company text; freight stems are looked up here.
    pub company_text: &'a str,
}

impl Refiner<'_> {
    /// Applies the rewrite rules in order, then re-applies the cheap ones
    /// because buy-intent conversion can reintroduce redundancy.
    pub fn refine(
        &self,
        selected: Vec<KeywordCandidate>,
        pool: &[KeywordCandidate],
    ) -> Vec<KeywordCandidate> {
        let mut phrases = self.cleanup(selected);
        self.ensure_buy_intent(&mut phrases, pool);
        self.cleanup(phrases)
    }

    fn cleanup(&self, phrases: Vec<KeywordCandidate>) -> Vec<KeywordCandidate> {
        let phrases = self.prefer_cargo(phrases);
        let phrases = self.drop_bare_transport(phrases);
        dedup(phrases)
    }

    fn eligible(&self, phrase: &str) -> bool {
        !self.strict_stats || self.volumes.get(phrase) > 0
    }

    /// "перевозки" becomes "перевозка грузов" for companies that move freight.
    fn prefer_cargo(&self, mut phrases: Vec<KeywordCandidate>) -> Vec<KeywordCandidate> {
        let rules = &self.lexicon.refine;
        let freight = self
            .company_text
            .split_whitespace()
            .any(|token| has_stem(token, &rules.freight_stems));
        if !freight
            || phrases.iter().any(|c| c.phrase == rules.cargo_transportation)
            || !self.eligible(&rules.cargo_transportation)
        {
            return phrases;
        }
        if let Some(bare) = phrases
            .iter_mut()
            .find(|c| rules.bare_transportation.contains(&c.phrase))
        {
            bare.phrase = rules.cargo_transportation.clone();
            bare.volume = self.volumes.get(&rules.cargo_transportation);
        }
        phrases
    }

    fn drop_bare_transport(&self, mut phrases: Vec<KeywordCandidate>) -> Vec<KeywordCandidate> {
        let rules = &self.lexicon.refine;
        if phrases.iter().any(|c| c.phrase == rules.transport_services) {
            phrases.retain(|c| c.phrase != rules.bare_transport);
        }
        phrases
    }

    /// Converts the weakest "продажа X" phrases into "купить X" until at least
    /// two phrases carry purchase intent, using only candidates that exist in
    /// the pool (and have volume in strict mode).
    fn ensure_buy_intent(&self, phrases: &mut [KeywordCandidate], pool: &[KeywordCandidate]) {
        let lexicon = self.lexicon;
        let buy_prefix = format!("{} ", lexicon.buy_word);
        let mut buy_count = phrases
            .iter()
            .filter(|c| c.phrase.starts_with(&buy_prefix))
            .count();
        if buy_count >= MIN_BUY_PHRASES {
            return;
        }

        let mut sales: Vec<(usize, String)> = phrases
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let (first, rest) = c.phrase.split_once(' ')?;
                lexicon
                    .is_sale_word(first)
                    .then(|| (i, format!("{}{}", buy_prefix, rest)))
            })
            .collect();
        sales.sort_by(|(a, _), (b, _)| {
            phrases[*a]
                .score
                .total_cmp(&phrases[*b].score)
                .then_with(|| phrases[*a].phrase.cmp(&phrases[*b].phrase))
        });

        for (idx, buy_phrase) in sales {
            if buy_count >= MIN_BUY_PHRASES {
                break;
            }
            if phrases.iter().any(|c| c.phrase == buy_phrase) {
                continue;
            }
            let Some(replacement) = pool.iter().find(|c| c.phrase == buy_phrase) else {
                continue;
            };
            if !self.eligible(&replacement.phrase) {
                continue;
            }
            phrases[idx] = replacement.clone();
            buy_count += 1;
        }
    }
}

/// Exact-phrase dedup, first occurrence wins.
fn dedup(phrases: Vec<KeywordCandidate>) -> Vec<KeywordCandidate> {
    let mut out: Vec<KeywordCandidate> = Vec::with_capacity(phrases.len());
    for candidate in phrases {
        if !out.iter().any(|c| c.phrase == candidate.phrase) {
            out.push(candidate);
        }
    }
    out
}
