use super::matching::best_match;
use super::types::{SearchBackend, SearchQuery, SearchResponse, SearchResultItem};
use crate::catalog::snapshot::{CatalogSnapshot, CompanyProfile};
use crate::text::lexicon::Lexicon;
use crate::text::normalizer::{compact, normalize};
use crate::text::tokenizer::{tokenize, tokenize_query};
use tracing::debug;

pub const DEFAULT_LIMIT: usize = 20;

/// Name-match strength bonuses.
const NAME_PREFIX_BONUS: u32 = 30;
const NAME_SUBSTRING_BONUS: u32 = 20;
const NAME_FALLBACK_BONUS: u32 = 10;
/// Bonus when the whole service query appears inside one whole-phrase token.
const PHRASE_BONUS: u32 = 2;
/// Compacted name queries of this length may match the name's initialism.
const INITIALISM_CHARS: std::ops::RangeInclusive<usize> = 2..=6;

/// True when the query carries a name or at least one service token.
/// City and region narrow results but are not a signal on their own.
pub fn has_signal(query: &SearchQuery, lexicon: &Lexicon) -> bool {
    !normalize(&query.name).is_empty() || !tokenize_query(&query.service, lexicon).is_empty()
}

enum CityFilter {
    Any,
    Exact(String),
    Tokens(Vec<String>),
}

impl CityFilter {
    fn new(raw: &str, lexicon: &Lexicon) -> Self {
        let tokens: Vec<String> = tokenize(raw)
            .into_iter()
            .filter(|t| !lexicon.settlement_markers.contains(t))
            .collect();
        if tokens.is_empty() {
            return CityFilter::Any;
        }
        let address_like = raw.contains(',')
            || raw.chars().any(|c| c.is_ascii_digit())
            || tokens.iter().any(|t| lexicon.address_markers.contains(t));
        if address_like {
            let tokens = tokens
                .into_iter()
                .filter(|t| !lexicon.address_markers.contains(t))
                .collect();
            CityFilter::Tokens(tokens)
        } else {
            CityFilter::Exact(tokens.join(" "))
        }
    }

    fn accepts(&self, profile: &CompanyProfile) -> bool {
        match self {
            CityFilter::Any => true,
            CityFilter::Exact(city) => profile.city_norm == *city,
            CityFilter::Tokens(tokens) => tokens
                .iter()
                .all(|t| profile.location_text.contains(t.as_str())),
        }
    }
}

struct NameQuery {
    normalized: String,
    compacted: String,
}

impl NameQuery {
    fn strength(&self, profile: &CompanyProfile) -> Option<u32> {
        let q = &self.normalized;
        if profile.name_core.starts_with(q.as_str()) || profile.name_norm.starts_with(q.as_str()) {
            return Some(NAME_PREFIX_BONUS);
        }
        if profile.search_text.contains(q.as_str()) {
            return Some(NAME_SUBSTRING_BONUS);
        }
        let c = &self.compacted;
        if c.is_empty() {
            return None;
        }
        let initialism_hit = INITIALISM_CHARS.contains(&c.chars().count())
            && profile.initialism.contains(c.as_str());
        if profile.name_compact.contains(c.as_str())
            || profile.id_compact.contains(c.as_str())
            || initialism_hit
        {
            return Some(NAME_FALLBACK_BONUS);
        }
        None
    }
}

/// In-process ranking over one snapshot.
///
/// Every service token must match a derived keyword token of the company,
/// and a name query must match the name by prefix, substring or compacted
/// fallback. Results are ordered by score, then real logo, then name.
pub fn rank(snapshot: &CatalogSnapshot, query: &SearchQuery, max_limit: usize) -> SearchResponse {
    let lexicon = snapshot.lexicon();
    if !has_signal(query, lexicon) {
        debug!("Search without name or service signal, returning nothing");
        return SearchResponse::empty(query, SearchBackend::Ranking);
    }

    let name = NameQuery {
        normalized: normalize(&query.name),
        compacted: compact(&query.name),
    };
    let service_tokens = tokenize_query(&query.service, lexicon);
    let service_phrase = normalize(&query.service);
    let city = CityFilter::new(&query.city, lexicon);

    let mut scored: Vec<(&str, u32)> = Vec::new();
    for id in snapshot.ids() {
        let (Some(record), Some(profile)) = (snapshot.company(id), snapshot.profile(id)) else {
            continue;
        };
        if query.region.is_some() && snapshot.region_of(id) != query.region {
            continue;
        }
        if let Some(rubric) = &query.rubric
            && !record.rubrics.iter().any(|r| &r.slug == rubric)
        {
            continue;
        }
        if let Some(category) = &query.category
            && !record.category_slugs().contains(&category.as_str())
        {
            continue;
        }
        if !city.accepts(profile) {
            continue;
        }

        let mut score = 0;
        if !name.normalized.is_empty() {
            let Some(bonus) = name.strength(profile) else {
                continue;
            };
            score += bonus;
        }
        if !service_tokens.is_empty() {
            let Some(service_score) =
                service_score(snapshot, id, &service_tokens, &service_phrase)
            else {
                continue;
            };
            score += service_score;
        }
        scored.push((id, score));
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| snapshot.listing_order(a.0, b.0)));

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(max_limit);
    let total_count = scored.len();
    let results: Vec<SearchResultItem> = scored
        .into_iter()
        .skip(query.offset)
        .take(limit)
        .filter_map(|(id, score)| {
            snapshot.summary(id).map(|summary| SearchResultItem {
                company: summary.clone(),
                score,
            })
        })
        .collect();
    debug!(
        "Ranked search name={:?} service={:?}: {} matches",
        query.name, query.service, total_count
    );

    SearchResponse {
        name: query.name.clone(),
        service: query.service.clone(),
        filters: query.filters(),
        backend: SearchBackend::Ranking,
        total_count,
        count: results.len(),
        offset: query.offset,
        results,
    }
}

/// Sum of per-token match weights over the company's derived keyword tokens,
/// or `None` when any token finds no match.
fn service_score(
    snapshot: &CatalogSnapshot,
    id: &str,
    tokens: &[String],
    phrase: &str,
) -> Option<u32> {
    let keyword_tokens = snapshot.keyword_tokens(id).unwrap_or_default();

    let mut score = 0;
    for token in tokens {
        score += best_match(token, keyword_tokens.iter())?.weight();
    }
    let in_whole_phrase = keyword_tokens
        .iter()
        .any(|t| t.contains(' ') && t.contains(phrase));
    if !phrase.is_empty() && in_whole_phrase {
        score += PHRASE_BONUS;
    }
    Some(score)
}
