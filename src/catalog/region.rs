//! Region Classification
//!
//! Maps free-text `(city, region, address)` to one of the canonical region
//! slugs. Rules run in a fixed order and the first match wins:
//!
//! 1. region field names an oblast
//! 2. city field names an oblast centre
//! 3. "Минский район / Минская обл." anywhere in city, region or address
//! 4. postal code prefix from the address
//! 5. bare "минск" in city or region
//!
//! A record no rule recognizes gets `None`; it stays searchable but is left
//! out of region aggregates.

use super::types::RegionSlug;
use crate::text::normalizer::normalize;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_MINSK_DISTRICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"минск(ий|ая|ого|ой)\s+(район|р\s*н|обл)").expect("invalid RE_MINSK_DISTRICT")
});

static RE_POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{5,6})\b").expect("invalid RE_POSTAL_CODE"));

/// Oblast stems checked against the region field.
const REGION_FIELD_STEMS: &[(&str, RegionSlug)] = &[
    ("брест", RegionSlug::Brest),
    ("витеб", RegionSlug::Vitebsk),
    ("гомел", RegionSlug::Gomel),
    ("гродн", RegionSlug::Grodno),
    ("могил", RegionSlug::Mogilev),
    ("минская", RegionSlug::MinskRegion),
];

/// Oblast centres checked against the city field. Minsk is resolved last so
/// "Минский район" is not mistaken for the city.
const CITY_FIELD_STEMS: &[(&str, RegionSlug)] = &[
    ("брест", RegionSlug::Brest),
    ("витеб", RegionSlug::Vitebsk),
    ("гомел", RegionSlug::Gomel),
    ("гродн", RegionSlug::Grodno),
    ("могил", RegionSlug::Mogilev),
];

/// First three digits of a six-digit postal code.
const POSTAL_PREFIXES: &[(&str, RegionSlug)] = &[
    ("220", RegionSlug::Minsk),
    ("221", RegionSlug::MinskRegion),
    ("222", RegionSlug::MinskRegion),
    ("223", RegionSlug::MinskRegion),
    ("224", RegionSlug::Brest),
    ("225", RegionSlug::Brest),
    ("210", RegionSlug::Vitebsk),
    ("211", RegionSlug::Vitebsk),
    ("246", RegionSlug::Gomel),
    ("247", RegionSlug::Gomel),
    ("230", RegionSlug::Grodno),
    ("231", RegionSlug::Grodno),
    ("212", RegionSlug::Mogilev),
    ("213", RegionSlug::Mogilev),
];

/// Five-digit codes seen in exports where a leading digit was lost
/// ("22003" for "220030") or the code was keyed with a dropped zero.
const CORRUPTED_PREFIXES: &[(&str, RegionSlug)] = &[
    ("2200", RegionSlug::Minsk),
    ("2201", RegionSlug::Minsk),
    ("2221", RegionSlug::MinskRegion),
    ("2231", RegionSlug::MinskRegion),
    ("2240", RegionSlug::Brest),
    ("2250", RegionSlug::Brest),
    ("2100", RegionSlug::Vitebsk),
    ("2110", RegionSlug::Vitebsk),
    ("2460", RegionSlug::Gomel),
    ("2470", RegionSlug::Gomel),
    ("2300", RegionSlug::Grodno),
    ("2310", RegionSlug::Grodno),
    ("2120", RegionSlug::Mogilev),
    ("2130", RegionSlug::Mogilev),
];

pub fn classify_region(city: &str, region: &str, address: &str) -> Option<RegionSlug> {
    let city = normalize(city);
    let region = normalize(region);
    let address = normalize(address);

    if let Some(slug) = find_stem(&region, REGION_FIELD_STEMS) {
        return Some(slug);
    }
    if let Some(slug) = find_stem(&city, CITY_FIELD_STEMS) {
        return Some(slug);
    }
    if [&city, &region, &address]
        .iter()
        .any(|field| RE_MINSK_DISTRICT.is_match(field))
    {
        return Some(RegionSlug::MinskRegion);
    }
    if let Some(slug) = postal_region(&address) {
        return Some(slug);
    }
    if city.contains("минск") || region.contains("минск") {
        return Some(RegionSlug::Minsk);
    }
    None
}

fn find_stem(field: &str, table: &[(&str, RegionSlug)]) -> Option<RegionSlug> {
    table
        .iter()
        .find(|(stem, _)| field.contains(stem))
        .map(|(_, slug)| *slug)
}

/// Region of the first postal code in the address that maps to one.
pub fn postal_region(address: &str) -> Option<RegionSlug> {
    RE_POSTAL_CODE
        .captures_iter(address)
        .filter_map(|caps| caps.get(1))
        .find_map(|code| {
            let code = code.as_str();
            match code.len() {
                6 => lookup_prefix(&code[..3], POSTAL_PREFIXES),
                5 => lookup_prefix(&code[..4], CORRUPTED_PREFIXES),
                _ => None,
            }
        })
}

fn lookup_prefix(prefix: &str, table: &[(&str, RegionSlug)]) -> Option<RegionSlug> {
    table
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|(_, slug)| *slug)
}
