use super::safety::SafetyFilter;
use super::types::{KeywordCandidate, RawCandidate};
use super::volume::VolumeTable;
use std::cmp::Ordering;
use std::collections::HashMap;

const VOLUME_WEIGHT: f64 = 8.0;
const LENGTH_PENALTY: f64 = 0.4;
/// Phrases up to this many words carry no length penalty.
const PENALTY_FREE_WORDS: usize = 3;

pub fn score(base: f64, volume: u64, word_count: usize) -> f64 {
    let volume_bonus = if volume > 0 {
        ((volume + 1) as f64).log10() * VOLUME_WEIGHT
    } else {
        0.0
    };
    let penalty = word_count.saturating_sub(PENALTY_FREE_WORDS) as f64 * LENGTH_PENALTY;
    base + volume_bonus - penalty
}

/// Filters, scores and merges raw candidates into one ranked pool.
///
/// A phrase produced more than once keeps its best-scoring entry; on equal
/// scores the larger volume wins. The pool comes back in selection order.
pub fn score_candidates(
    raw: Vec<RawCandidate>,
    volumes: &VolumeTable,
    filter: &SafetyFilter<'_>,
) -> Vec<KeywordCandidate> {
    let mut merged: HashMap<String, KeywordCandidate> = HashMap::new();
    for candidate in raw {
        if !filter.accepts(&candidate.phrase, candidate.source) {
            continue;
        }
        let volume = volumes.get(&candidate.phrase);
        let words = candidate.phrase.split_whitespace().count();
        let scored = KeywordCandidate {
            score: score(candidate.base_score, volume, words),
            phrase: candidate.phrase,
            source: candidate.source,
            volume,
        };

        match merged.get_mut(&scored.phrase) {
            Some(existing) => {
                let volume = existing.volume.max(scored.volume);
                if scored.score > existing.score
                    || (scored.score == existing.score && scored.volume > existing.volume)
                    || (scored.score == existing.score
                        && scored.source.priority() > existing.source.priority())
                {
                    *existing = scored;
                }
                existing.volume = volume;
            }
            None => {
                merged.insert(scored.phrase.clone(), scored);
            }
        }
    }

    let mut pool: Vec<KeywordCandidate> = merged.into_values().collect();
    pool.sort_by(rank_order);
    pool
}

/// Score desc, volume desc, source priority desc, shorter first, then lexicographic.
pub fn rank_order(a: &KeywordCandidate, b: &KeywordCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.volume.cmp(&a.volume))
        .then_with(|| b.source.priority().cmp(&a.source.priority()))
        .then_with(|| a.phrase.chars().count().cmp(&b.phrase.chars().count()))
        .then_with(|| a.phrase.cmp(&b.phrase))
}
