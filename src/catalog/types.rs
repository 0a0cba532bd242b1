//! Catalog Data Types
//!
//! `CompanyRecord` is one line of the NDJSON catalog. Exports are noisy, so
//! every field defaults and string fields accept `null`. The remaining types
//! are the DTOs returned by the store's read operations.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubricRef {
    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category_slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category_name: String,
}

/// One entry of `services_list` / `products_list`; exports carry either
/// `{"name": ...}` objects or bare strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ListItemRepr")]
pub struct ListItem {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListItemRepr {
    Plain(String),
    Named {
        #[serde(default, deserialize_with = "nullable")]
        name: String,
    },
}

impl From<ListItemRepr> for ListItem {
    fn from(repr: ListItemRepr) -> Self {
        match repr {
            ListItemRepr::Plain(name) | ListItemRepr::Named { name } => ListItem { name },
        }
    }
}

impl ListItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(default, alias = "id", deserialize_with = "nullable")]
    pub source_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub unp: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub about: String,
    #[serde(default, deserialize_with = "nullable")]
    pub address: String,
    #[serde(default, deserialize_with = "nullable")]
    pub city: String,
    #[serde(default, deserialize_with = "nullable")]
    pub region: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phones: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub emails: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub websites: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub logo_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub work_hours: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Authoring order; the first entry is the primary category.
    #[serde(default, deserialize_with = "nullable")]
    pub categories: Vec<CategoryRef>,
    /// Authoring order; the first entry is the primary rubric.
    #[serde(default, deserialize_with = "nullable")]
    pub rubrics: Vec<RubricRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub services_list: Vec<ListItem>,
    #[serde(default, deserialize_with = "nullable")]
    pub products_list: Vec<ListItem>,
}

impl CompanyRecord {
    pub fn primary_rubric(&self) -> Option<&RubricRef> {
        self.rubrics.first()
    }

    pub fn primary_category(&self) -> Option<&CategoryRef> {
        self.categories.first()
    }

    /// Every category slug the company belongs to, directly or through a rubric.
    pub fn category_slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = Vec::new();
        let direct = self.categories.iter().map(|c| c.slug.as_str());
        let via_rubric = self.rubrics.iter().map(|r| r.category_slug.as_str());
        for slug in direct.chain(via_rubric) {
            if !slug.is_empty() && !slugs.contains(&slug) {
                slugs.push(slug);
            }
        }
        slugs
    }
}

/// Canonical administrative regions: Minsk city plus the six oblasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionSlug {
    Minsk,
    MinskRegion,
    Brest,
    Vitebsk,
    Gomel,
    Grodno,
    Mogilev,
}

impl RegionSlug {
    pub const ALL: [RegionSlug; 7] = [
        RegionSlug::Minsk,
        RegionSlug::MinskRegion,
        RegionSlug::Brest,
        RegionSlug::Vitebsk,
        RegionSlug::Gomel,
        RegionSlug::Grodno,
        RegionSlug::Mogilev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionSlug::Minsk => "minsk",
            RegionSlug::MinskRegion => "minsk-region",
            RegionSlug::Brest => "brest",
            RegionSlug::Vitebsk => "vitebsk",
            RegionSlug::Gomel => "gomel",
            RegionSlug::Grodno => "grodno",
            RegionSlug::Mogilev => "mogilev",
        }
    }
}

impl fmt::Display for RegionSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionSlug::ALL
            .into_iter()
            .find(|region| region.as_str() == s.trim())
            .ok_or_else(|| format!("unknown region '{}'", s))
    }
}

/// Compact company card returned by every listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: String,
    pub unp: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: Option<RegionSlug>,
    pub logo_url: String,
    pub has_logo: bool,
    pub phones: Vec<String>,
    pub websites: Vec<String>,
    pub work_hours: String,
    pub primary_rubric: Option<RubricRef>,
    pub primary_category: Option<CategoryRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionCount {
    pub region: RegionSlug,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricEntry {
    pub slug: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub slug: String,
    pub name: String,
    pub count: usize,
    pub rubrics: Vec<RubricEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOverview {
    pub region: Option<RegionSlug>,
    pub total: usize,
    pub regions: Vec<RegionCount>,
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricPage {
    pub rubric: RubricRef,
    pub region: Option<RegionSlug>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub items: Vec<CompanySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub query: String,
    pub companies: Vec<CompanySummary>,
    pub rubrics: Vec<RubricEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyKeywords {
    pub id: String,
    pub phrases: Vec<String>,
    pub tokens: Vec<String>,
}

/// Full record plus the fields the catalog derives from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDetails {
    #[serde(flatten)]
    pub record: CompanyRecord,
    pub region_slug: Option<RegionSlug>,
    pub has_logo: bool,
}
