//! Search-Volume Statistics
//!
//! Observed query volumes keyed by normalized phrase. Statistics come from
//! keyword-tool exports in CSV or JSON; the layouts vary between tools, so the
//! loader detects delimiters and matches header names against synonym sets
//! instead of expecting one fixed schema. Malformed rows are skipped.

use crate::error::{CatalogError, Result};
use crate::text::normalizer::normalize;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const PHRASE_HEADERS: &[&str] = &[
    "phrase", "query", "keyword", "keywords", "key phrase", "search term", "запрос", "запросы",
    "фраза", "ключевая фраза", "ключевое слово", "ключевые слова",
];
const VOLUME_HEADERS: &[&str] = &[
    "volume", "search volume", "avg monthly searches", "frequency", "freq", "частота",
    "частотность", "базовая частота", "объем",
];
const IMPRESSION_HEADERS: &[&str] = &["impressions", "shows", "показы", "показов"];
const CLICK_HEADERS: &[&str] = &["clicks", "клики", "кликов"];
const SESSION_HEADERS: &[&str] = &["sessions", "visits", "визиты", "сеансы", "сессии"];
const MONTH_PREFIXES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec", "янв",
    "фев", "мар", "апр", "май", "мая", "июн", "июл", "авг", "сен", "окт", "ноя", "дек", "month",
    "месяц",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeTable {
    volumes: HashMap<String, u64>,
}

impl VolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges every file into one table; a phrase seen twice keeps its larger volume.
    pub fn load(paths: &[PathBuf], skip_missing: bool) -> Result<Self> {
        let mut table = VolumeTable::new();
        for path in paths {
            if !path.exists() {
                if skip_missing {
                    warn!("Stats file {} not found, skipping", path.display());
                    continue;
                }
                return Err(CatalogError::StatsFileMissing { path: path.clone() });
            }
            let content = std::fs::read_to_string(path)?;
            let before = table.len();
            table.merge_content(path, &content)?;
            info!(
                "Loaded stats file {} ({} new phrases)",
                path.display(),
                table.len() - before
            );
        }
        Ok(table)
    }

    fn merge_content(&mut self, path: &Path, content: &str) -> Result<()> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            || content.trim_start().starts_with(['[', '{']);
        if is_json {
            let value: Value =
                serde_json::from_str(content).map_err(|e| CatalogError::StatsFormat {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            self.merge_json(&value);
        } else {
            self.merge_csv(content);
        }
        Ok(())
    }

    pub fn from_csv_str(content: &str) -> Self {
        let mut table = VolumeTable::new();
        table.merge_csv(content);
        table
    }

    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(content)?;
        let mut table = VolumeTable::new();
        table.merge_json(&value);
        Ok(table)
    }

    pub fn insert(&mut self, phrase: &str, volume: u64) {
        let phrase = normalize(phrase);
        if phrase.is_empty() {
            return;
        }
        let entry = self.volumes.entry(phrase).or_insert(0);
        *entry = (*entry).max(volume);
    }

    /// Zero for unseen phrases.
    pub fn get(&self, phrase: &str) -> u64 {
        self.volumes.get(phrase).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    fn merge_csv(&mut self, content: &str) {
        let Some(header_line) = content.lines().find(|line| !line.trim().is_empty()) else {
            return;
        };
        let delimiter = detect_delimiter(header_line);
        let mut rows = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
            .into_records()
            .filter_map(|row| row.ok())
            .filter(|row| row.iter().any(|cell| !cell.is_empty()));

        let Some(first) = rows.next() else {
            return;
        };
        let Some(columns) = ColumnMap::from_header(&first) else {
            debug!("Stats CSV has no recognizable header, reading phrase;volume pairs");
            for row in std::iter::once(first).chain(rows) {
                if let (Some(phrase), Some(volume)) =
                    (row.get(0), row.get(1).and_then(parse_number))
                {
                    self.insert(phrase, to_volume(volume));
                }
            }
            return;
        };

        for row in rows {
            let Some(phrase) = row.get(columns.phrase) else {
                continue;
            };
            if let Some(volume) = columns.volume_of(&row) {
                self.insert(phrase, to_volume(volume));
            }
        }
    }

    fn merge_json(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(fields) => {
                            let mut phrase = None;
                            let mut ranked: Vec<(usize, f64)> = Vec::new();
                            for (key, field) in fields {
                                let key = normalize(key);
                                if matches_header(&key, PHRASE_HEADERS) {
                                    phrase = field.as_str();
                                } else if let Some(rank) = volume_rank(&key)
                                    && let Some(number) = json_number(field)
                                {
                                    ranked.push((rank, number));
                                }
                            }
                            ranked.sort_by_key(|(rank, _)| *rank);
                            if let (Some(phrase), Some((_, volume))) = (phrase, ranked.first()) {
                                self.insert(phrase, to_volume(*volume));
                            }
                        }
                        Value::Array(pair) => {
                            if let (Some(phrase), Some(volume)) = (
                                pair.first().and_then(Value::as_str),
                                pair.get(1).and_then(json_number),
                            ) {
                                self.insert(phrase, to_volume(volume));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Object(map) => {
                for (phrase, volume) in map {
                    if let Some(volume) = json_number(volume) {
                        self.insert(phrase, to_volume(volume));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Column positions resolved from a header row.
struct ColumnMap {
    phrase: usize,
    volume: Option<usize>,
    months: Vec<usize>,
    impressions: Option<usize>,
    clicks: Option<usize>,
    sessions: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &csv::StringRecord) -> Option<Self> {
        let names: Vec<String> = header.iter().map(normalize).collect();
        let find = |set: &[&str]| names.iter().position(|name| matches_header(name, set));

        let phrase = find(PHRASE_HEADERS)?;
        let months = names
            .iter()
            .enumerate()
            .filter(|(i, name)| *i != phrase && is_month_header(name))
            .map(|(i, _)| i)
            .collect();
        Some(Self {
            phrase,
            volume: find(VOLUME_HEADERS),
            months,
            impressions: find(IMPRESSION_HEADERS),
            clicks: find(CLICK_HEADERS),
            sessions: find(SESSION_HEADERS),
        })
    }

    /// Volume, then monthly average, then impressions, clicks, sessions.
    fn volume_of(&self, row: &csv::StringRecord) -> Option<f64> {
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(parse_number);

        if let Some(volume) = cell(self.volume) {
            return Some(volume);
        }
        let monthly: Vec<f64> = self
            .months
            .iter()
            .filter_map(|i| row.get(*i).and_then(parse_number))
            .collect();
        if !monthly.is_empty() {
            return Some(monthly.iter().sum::<f64>() / monthly.len() as f64);
        }
        cell(self.impressions)
            .or_else(|| cell(self.clicks))
            .or_else(|| cell(self.sessions))
    }
}

fn matches_header(name: &str, set: &[&str]) -> bool {
    set.iter().any(|candidate| name == *candidate)
}

fn is_month_header(name: &str) -> bool {
    let Some(first) = name.split_whitespace().next() else {
        return false;
    };
    MONTH_PREFIXES.iter().any(|month| first.starts_with(month))
        || name
            .split_whitespace()
            .all(|part| part.chars().all(|c| c.is_ascii_digit()))
            && name.split_whitespace().count() == 2
}

fn volume_rank(key: &str) -> Option<usize> {
    if matches_header(key, VOLUME_HEADERS) {
        Some(0)
    } else if matches_header(key, IMPRESSION_HEADERS) {
        Some(1)
    } else if matches_header(key, CLICK_HEADERS) {
        Some(2)
    } else if matches_header(key, SESSION_HEADERS) {
        Some(3)
    } else {
        None
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn to_volume(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Picks the delimiter that splits the header row into the most columns.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = (DELIMITERS[0], 1);
    for delimiter in DELIMITERS {
        let columns = header_line.split(delimiter as char).count();
        if columns > best.1 {
            best = (delimiter, columns);
        }
    }
    best.0
}

/// Parses counts written with either thousands convention ("12 500", "12,500",
/// "12.500", "1.234,5", "1,234.5").
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\'' | '_' | '\u{00A0}' | '\u{202F}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) => resolve_single_separator(&cleaned, ','),
        (None, Some(_)) => resolve_single_separator(&cleaned, '.'),
        (None, None) => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// With only one kind of separator, a single occurrence followed by exactly
/// three digits is a thousands separator; anything else is a decimal mark.
fn resolve_single_separator(cleaned: &str, separator: char) -> String {
    let occurrences = cleaned.matches(separator).count();
    let tail_len = cleaned
        .rsplit(separator)
        .next()
        .map(|tail| tail.len())
        .unwrap_or(0);
    if occurrences > 1 || tail_len == 3 {
        cleaned.replace(separator, "")
    } else {
        cleaned.replace(separator, ".")
    }
}

/// Process-wide table cache keyed by the files' identity, so restarting the
/// store with the same statistics does not re-parse them.
#[derive(Default)]
pub struct VolumeTableCache {
    tables: DashMap<String, Arc<VolumeTable>>,
}

impl VolumeTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, paths: &[PathBuf], skip_missing: bool) -> Result<Arc<VolumeTable>> {
        let key = signature(paths, skip_missing);
        if let Some(table) = self.tables.get(&key) {
            debug!("Volume table cache hit");
            return Ok(table.clone());
        }
        let table = Arc::new(VolumeTable::load(paths, skip_missing)?);
        self.tables.insert(key, table.clone());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Path, size and mtime of every file plus the missing-file policy.
fn signature(paths: &[PathBuf], skip_missing: bool) -> String {
    let mut parts: Vec<String> = paths
        .iter()
        .map(|path| match std::fs::metadata(path) {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or(0);
                format!("{}:{}:{}", path.display(), meta.len(), modified)
            }
            Err(_) => format!("{}:missing", path.display()),
        })
        .collect();
    parts.push(format!("skip_missing={}", skip_missing));
    parts.join("|")
}
