//! Immutable Catalog Snapshot
//!
//! One snapshot is built from one version of the catalog file and never
//! changes afterwards. The only interior mutability is the per-company keyword
//! memo: it is filled on first access, and because derivation is a pure
//! function of the record, racing fills are harmless (last writer wins).

use super::exclusion::ExclusionRegistry;
use super::overrides::FieldOverrides;
use super::region::classify_region;
use super::types::{
    CatalogOverview, CategoryEntry, CategoryRef, CompanyRecord, CompanySummary, RegionCount,
    RegionSlug, RubricEntry, RubricPage, RubricRef, SuggestResponse,
};
use crate::error::{CatalogError, Result};
use crate::keywords::engine::KeywordEngine;
use crate::text::lexicon::Lexicon;
use crate::text::normalizer::{compact, normalize};
use crate::text::tokenizer::tokenize;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Shortest normalized query `suggest` answers.
pub const SUGGEST_MIN_CHARS: usize = 2;

/// Precomputed search fields of one company.
#[derive(Debug, Clone, Default)]
pub struct CompanyProfile {
    pub name_norm: String,
    /// Normalized name without legal-form words.
    pub name_core: String,
    pub name_compact: String,
    pub id_compact: String,
    pub initialism: String,
    /// Normalized city with settlement-type markers ("г", "аг") removed.
    pub city_norm: String,
    /// Normalized city and address, for location-token filtering.
    pub location_text: String,
    /// Name, UNP and id, for the combined-field name match.
    pub search_text: String,
    pub has_real_logo: bool,
}

impl CompanyProfile {
    fn build(record: &CompanyRecord, lexicon: &Lexicon) -> Self {
        let name_tokens = tokenize(&record.name);
        let core_tokens: Vec<&str> = name_tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !lexicon.is_legal_form(t))
            .collect();
        let name_norm = name_tokens.join(" ");

        let city_norm = tokenize(&record.city)
            .into_iter()
            .filter(|t| !lexicon.settlement_markers.contains(t))
            .collect::<Vec<_>>()
            .join(" ");
        let location_text = format!("{} {}", city_norm, normalize(&record.address))
            .trim()
            .to_string();
        let id_norm = normalize(&record.source_id);
        let search_text = [name_norm.as_str(), record.unp.trim(), id_norm.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        let logo = record.logo_url.trim();
        Self {
            name_core: core_tokens.join(" "),
            name_compact: compact(&record.name),
            id_compact: compact(&record.source_id),
            initialism: initialism(&core_tokens),
            city_norm,
            location_text,
            search_text,
            has_real_logo: !logo.is_empty() && !lexicon.is_logo_placeholder(logo),
            name_norm,
        }
    }
}

/// First letter of each word, numbers kept whole ("завод 21 век" -> "з21в").
pub fn initialism(tokens: &[&str]) -> String {
    tokens
        .iter()
        .filter_map(|token| {
            if token.chars().all(|c| c.is_numeric()) {
                Some(token.to_string())
            } else {
                token.chars().next().map(String::from)
            }
        })
        .collect()
}

/// Company counts for one scope (whole catalog or one region).
#[derive(Debug, Clone, Default)]
pub struct Counts {
    pub total: usize,
    pub by_category: HashMap<String, usize>,
    pub by_rubric: HashMap<String, usize>,
}

impl Counts {
    fn add(&mut self, record: &CompanyRecord) {
        self.total += 1;
        for slug in record.category_slugs() {
            *self.by_category.entry(slug.to_string()).or_insert(0) += 1;
        }
        let mut seen: Vec<&str> = Vec::new();
        for rubric in &record.rubrics {
            if rubric.slug.is_empty() || seen.contains(&rubric.slug.as_str()) {
                continue;
            }
            seen.push(&rubric.slug);
            *self.by_rubric.entry(rubric.slug.clone()).or_insert(0) += 1;
        }
    }
}

#[derive(Debug)]
pub struct CatalogSnapshot {
    source_path: PathBuf,
    modified: Option<SystemTime>,
    companies: HashMap<String, CompanyRecord>,
    /// Ids in file order.
    order: Vec<String>,
    summaries: HashMap<String, CompanySummary>,
    profiles: HashMap<String, CompanyProfile>,
    regions: HashMap<String, RegionSlug>,
    categories: HashMap<String, CategoryRef>,
    rubrics: HashMap<String, RubricRef>,
    rubrics_by_category: HashMap<String, Vec<String>>,
    companies_by_rubric: HashMap<String, Vec<String>>,
    counts: Counts,
    region_counts: HashMap<RegionSlug, Counts>,
    skipped_lines: usize,
    excluded: usize,
    engine: Arc<KeywordEngine>,
    phrase_memo: DashMap<String, Arc<Vec<String>>>,
    token_memo: DashMap<String, Arc<Vec<String>>>,
}

impl CatalogSnapshot {
    /// Streams an NDJSON catalog into a snapshot. Blank, unparseable and
    /// id-less lines are skipped; excluded companies never enter the indices.
    pub async fn load(
        path: &Path,
        modified: Option<SystemTime>,
        engine: Arc<KeywordEngine>,
        overrides: &FieldOverrides,
        exclusions: &dyn ExclusionRegistry,
    ) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let mut segments = BufReader::new(file).split(b'\n');
        let mut builder = SnapshotBuilder::new(engine);
        let mut line_no = 0usize;

        while let Some(bytes) = segments.next_segment().await? {
            line_no += 1;
            let Ok(line) = std::str::from_utf8(&bytes) else {
                debug!("Line {}: not valid UTF-8, skipping", line_no);
                builder.skipped_lines += 1;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut record: CompanyRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Line {}: unparseable record ({}), skipping", line_no, e);
                    builder.skipped_lines += 1;
                    continue;
                }
            };
            record.source_id = record.source_id.trim().to_string();
            if record.source_id.is_empty() {
                debug!("Line {}: record without id, skipping", line_no);
                builder.skipped_lines += 1;
                continue;
            }
            if exclusions.is_excluded(&record.source_id, &record.unp).await {
                builder.excluded += 1;
                continue;
            }
            overrides.apply(&mut record);
            builder.add(record);
        }

        let snapshot = builder.finish(path.to_path_buf(), modified);
        info!(
            "Catalog snapshot built from {}: {} companies, {} skipped lines, {} excluded",
            path.display(),
            snapshot.len(),
            snapshot.skipped_lines,
            snapshot.excluded
        );
        Ok(snapshot)
    }

    pub fn from_records(records: Vec<CompanyRecord>, engine: Arc<KeywordEngine>) -> Self {
        let mut builder = SnapshotBuilder::new(engine);
        for record in records {
            builder.add(record);
        }
        builder.finish(PathBuf::new(), None)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn excluded(&self) -> usize {
        self.excluded
    }

    pub fn engine(&self) -> &KeywordEngine {
        &self.engine
    }

    pub fn lexicon(&self) -> &Lexicon {
        self.engine.lexicon()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn company(&self, id: &str) -> Option<&CompanyRecord> {
        self.companies.get(id)
    }

    pub fn summary(&self, id: &str) -> Option<&CompanySummary> {
        self.summaries.get(id)
    }

    pub fn profile(&self, id: &str) -> Option<&CompanyProfile> {
        self.profiles.get(id)
    }

    pub fn region_of(&self, id: &str) -> Option<RegionSlug> {
        self.regions.get(id).copied()
    }

    pub fn rubric(&self, slug: &str) -> Option<&RubricRef> {
        self.rubrics.get(slug)
    }

    pub fn category(&self, slug: &str) -> Option<&CategoryRef> {
        self.categories.get(slug)
    }

    pub fn counts(&self, region: Option<RegionSlug>) -> Option<&Counts> {
        match region {
            None => Some(&self.counts),
            Some(region) => self.region_counts.get(&region),
        }
    }

    pub fn company_ids_in_rubric(&self, slug: &str) -> &[String] {
        self.companies_by_rubric
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    // ============================================================
    // KEYWORD MEMO
    // ============================================================

    pub fn keyword_phrases(&self, id: &str) -> Option<Arc<Vec<String>>> {
        if let Some(hit) = self.phrase_memo.get(id) {
            return Some(hit.clone());
        }
        let record = self.companies.get(id)?;
        let phrases = Arc::new(self.engine.derive_keywords(record));
        self.phrase_memo.insert(id.to_string(), phrases.clone());
        Some(phrases)
    }

    pub fn keyword_tokens(&self, id: &str) -> Option<Arc<Vec<String>>> {
        if let Some(hit) = self.token_memo.get(id) {
            return Some(hit.clone());
        }
        let phrases = self.keyword_phrases(id)?;
        let tokens = Arc::new(self.engine.derive_tokens(&phrases));
        self.token_memo.insert(id.to_string(), tokens.clone());
        Some(tokens)
    }

    // ============================================================
    // READ OPERATIONS
    // ============================================================

    pub fn catalog(&self, region: Option<RegionSlug>) -> CatalogOverview {
        let empty = Counts::default();
        let scope = self.counts(region).unwrap_or(&empty);

        let regions = RegionSlug::ALL
            .into_iter()
            .filter_map(|region| {
                let count = self.region_counts.get(&region).map(|c| c.total)?;
                Some(RegionCount { region, count })
            })
            .collect();

        let mut categories: Vec<CategoryEntry> = self
            .categories
            .values()
            .filter_map(|category| {
                let count = scope.by_category.get(&category.slug).copied().unwrap_or(0);
                if count == 0 {
                    return None;
                }
                let rubrics = self
                    .rubrics_by_category
                    .get(&category.slug)
                    .into_iter()
                    .flatten()
                    .filter_map(|slug| {
                        let rubric = self.rubrics.get(slug)?;
                        let count = scope.by_rubric.get(slug).copied().unwrap_or(0);
                        (count > 0).then(|| RubricEntry {
                            slug: rubric.slug.clone(),
                            name: rubric.name.clone(),
                            count,
                        })
                    })
                    .collect();
                Some(CategoryEntry {
                    slug: category.slug.clone(),
                    name: category.name.clone(),
                    count,
                    rubrics,
                })
            })
            .collect();
        categories.sort_by(|a, b| by_localized_name(&a.name, &a.slug, &b.name, &b.slug));

        CatalogOverview {
            region,
            total: scope.total,
            regions,
            categories,
        }
    }

    pub fn rubric_companies(
        &self,
        slug: &str,
        region: Option<RegionSlug>,
        offset: usize,
        limit: usize,
    ) -> Result<RubricPage> {
        let rubric = self
            .rubrics
            .get(slug)
            .ok_or_else(|| CatalogError::RubricNotFound {
                slug: slug.to_string(),
            })?;

        let matching: Vec<&str> = self
            .company_ids_in_rubric(slug)
            .iter()
            .map(String::as_str)
            .filter(|id| region.is_none() || self.region_of(id) == region)
            .collect();
        let items = matching
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| self.summaries.get(*id).cloned())
            .collect();

        Ok(RubricPage {
            rubric: rubric.clone(),
            region,
            total: matching.len(),
            offset,
            limit,
            items,
        })
    }

    /// Name-prefix matches first, then name-substring matches; rubrics whose
    /// name contains the query, most populated first.
    pub fn suggest(&self, query: &str, limit: usize) -> SuggestResponse {
        let q = normalize(query);
        if q.chars().count() < SUGGEST_MIN_CHARS {
            return SuggestResponse {
                query: q,
                companies: Vec::new(),
                rubrics: Vec::new(),
            };
        }

        let mut prefixed: Vec<&str> = Vec::new();
        let mut contained: Vec<&str> = Vec::new();
        for id in self.ids() {
            let Some(profile) = self.profiles.get(id) else {
                continue;
            };
            if profile.name_core.starts_with(&q) || profile.name_norm.starts_with(&q) {
                prefixed.push(id);
            } else if profile.name_norm.contains(&q) {
                contained.push(id);
            }
        }
        prefixed.sort_by(|a, b| self.listing_order(a, b));
        contained.sort_by(|a, b| self.listing_order(a, b));
        let companies = prefixed
            .into_iter()
            .chain(contained)
            .take(limit)
            .filter_map(|id| self.summaries.get(id).cloned())
            .collect();

        let mut rubrics: Vec<RubricEntry> = self
            .rubrics
            .values()
            .filter(|rubric| normalize(&rubric.name).contains(&q))
            .map(|rubric| RubricEntry {
                slug: rubric.slug.clone(),
                name: rubric.name.clone(),
                count: self.counts.by_rubric.get(&rubric.slug).copied().unwrap_or(0),
            })
            .collect();
        rubrics.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| by_localized_name(&a.name, &a.slug, &b.name, &b.slug))
        });
        rubrics.truncate(limit);

        SuggestResponse {
            query: q,
            companies,
            rubrics,
        }
    }

    pub fn listing_order(&self, a: &str, b: &str) -> Ordering {
        listing_cmp(&self.profiles, a, b)
    }
}

/// Real logo first, then normalized name, then id.
fn listing_cmp(profiles: &HashMap<String, CompanyProfile>, a: &str, b: &str) -> Ordering {
    match (profiles.get(a), profiles.get(b)) {
        (Some(pa), Some(pb)) => pb
            .has_real_logo
            .cmp(&pa.has_real_logo)
            .then_with(|| pa.name_norm.cmp(&pb.name_norm))
            .then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

fn by_localized_name(a_name: &str, a_slug: &str, b_name: &str, b_slug: &str) -> Ordering {
    normalize(a_name)
        .cmp(&normalize(b_name))
        .then_with(|| a_slug.cmp(b_slug))
}

/// Accumulates records into the snapshot indices in one pass.
struct SnapshotBuilder {
    engine: Arc<KeywordEngine>,
    companies: HashMap<String, CompanyRecord>,
    order: Vec<String>,
    summaries: HashMap<String, CompanySummary>,
    profiles: HashMap<String, CompanyProfile>,
    regions: HashMap<String, RegionSlug>,
    categories: HashMap<String, CategoryRef>,
    rubrics: HashMap<String, RubricRef>,
    companies_by_rubric: HashMap<String, Vec<String>>,
    counts: Counts,
    region_counts: HashMap<RegionSlug, Counts>,
    skipped_lines: usize,
    excluded: usize,
}

impl SnapshotBuilder {
    fn new(engine: Arc<KeywordEngine>) -> Self {
        Self {
            engine,
            companies: HashMap::new(),
            order: Vec::new(),
            summaries: HashMap::new(),
            profiles: HashMap::new(),
            regions: HashMap::new(),
            categories: HashMap::new(),
            rubrics: HashMap::new(),
            companies_by_rubric: HashMap::new(),
            counts: Counts::default(),
            region_counts: HashMap::new(),
            skipped_lines: 0,
            excluded: 0,
        }
    }

    /// First occurrence of an id wins.
    fn add(&mut self, record: CompanyRecord) {
        let id = record.source_id.clone();
        if id.is_empty() || self.companies.contains_key(&id) {
            debug!("Duplicate or empty company id '{}', skipping", id);
            self.skipped_lines += 1;
            return;
        }

        let region = classify_region(&record.city, &record.region, &record.address);
        let profile = CompanyProfile::build(&record, self.engine.lexicon());

        for category in &record.categories {
            if !category.slug.is_empty() {
                self.categories
                    .entry(category.slug.clone())
                    .or_insert_with(|| category.clone());
            }
        }
        for rubric in &record.rubrics {
            if rubric.slug.is_empty() {
                continue;
            }
            self.rubrics
                .entry(rubric.slug.clone())
                .or_insert_with(|| rubric.clone());
            if !rubric.category_slug.is_empty() {
                self.categories
                    .entry(rubric.category_slug.clone())
                    .or_insert_with(|| CategoryRef {
                        slug: rubric.category_slug.clone(),
                        name: rubric.category_name.clone(),
                    });
            }
            let members = self.companies_by_rubric.entry(rubric.slug.clone()).or_default();
            if members.last() != Some(&id) {
                members.push(id.clone());
            }
        }

        self.counts.add(&record);
        if let Some(region) = region {
            self.region_counts.entry(region).or_default().add(&record);
            self.regions.insert(id.clone(), region);
        }

        self.summaries.insert(id.clone(), summarize(&record, region, &profile));
        self.profiles.insert(id.clone(), profile);
        self.order.push(id.clone());
        self.companies.insert(id, record);
    }

    fn finish(mut self, source_path: PathBuf, modified: Option<SystemTime>) -> CatalogSnapshot {
        let mut rubrics_by_category: HashMap<String, Vec<String>> = HashMap::new();
        for rubric in self.rubrics.values() {
            if !rubric.category_slug.is_empty() {
                rubrics_by_category
                    .entry(rubric.category_slug.clone())
                    .or_default()
                    .push(rubric.slug.clone());
            }
        }
        for slugs in rubrics_by_category.values_mut() {
            slugs.sort_by(|a, b| {
                let name = |slug: &String| self.rubrics.get(slug).map(|r| r.name.as_str()).unwrap_or("");
                by_localized_name(name(a), a, name(b), b)
            });
        }

        let profiles = &self.profiles;
        for members in self.companies_by_rubric.values_mut() {
            members.sort_by(|a, b| listing_cmp(profiles, a, b));
        }

        CatalogSnapshot {
            source_path,
            modified,
            companies: self.companies,
            order: self.order,
            summaries: self.summaries,
            profiles: self.profiles,
            regions: self.regions,
            categories: self.categories,
            rubrics: self.rubrics,
            rubrics_by_category,
            companies_by_rubric: self.companies_by_rubric,
            counts: self.counts,
            region_counts: self.region_counts,
            skipped_lines: self.skipped_lines,
            excluded: self.excluded,
            engine: self.engine,
            phrase_memo: DashMap::new(),
            token_memo: DashMap::new(),
        }
    }
}

fn summarize(
    record: &CompanyRecord,
    region: Option<RegionSlug>,
    profile: &CompanyProfile,
) -> CompanySummary {
    CompanySummary {
        id: record.source_id.clone(),
        unp: record.unp.clone(),
        name: record.name.clone(),
        address: record.address.clone(),
        city: record.city.clone(),
        region,
        logo_url: record.logo_url.clone(),
        has_logo: profile.has_real_logo,
        phones: record.phones.clone(),
        websites: record.websites.clone(),
        work_hours: record.work_hours.clone(),
        primary_rubric: record.primary_rubric().cloned(),
        primary_category: record.primary_category().cloned(),
    }
}
