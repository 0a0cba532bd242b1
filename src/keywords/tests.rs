//! Keyword Module Tests
//!
//! ## Test Scopes
//! - **Extraction**: item splitting, conjunction rule, free-text producers.
//! - **Safety**: every rejection rule.
//! - **Volumes**: CSV/JSON layouts, locale numbers, missing-file policy, cache.
//! - **Engine**: end-to-end derivation and its output invariants.

#[cfg(test)]
mod tests {
    use crate::catalog::types::{CategoryRef, CompanyRecord, ListItem, RubricRef};
    use crate::error::CatalogError;
    use crate::keywords::engine::KeywordEngine;
    use crate::keywords::extractor::{
        activity_windows, parenthetical_lists, repeated_heads, split_items,
    };
    use crate::keywords::refine::Refiner;
    use crate::keywords::safety::SafetyFilter;
    use crate::keywords::scorer::{score, score_candidates};
    use crate::keywords::types::{
        DeriveOptions, FallbackMode, KeywordCandidate, KeywordSource, MAX_PHRASE_WORDS,
        RawCandidate,
    };
    use crate::keywords::volume::{VolumeTable, VolumeTableCache, detect_delimiter, parse_number};
    use crate::text::lexicon::Lexicon;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn services(items: &[&str]) -> CompanyRecord {
        CompanyRecord {
            source_id: "c1".to_string(),
            services_list: items.iter().map(|s| ListItem::new(*s)).collect(),
            ..Default::default()
        }
    }

    fn products(items: &[&str]) -> CompanyRecord {
        CompanyRecord {
            source_id: "c1".to_string(),
            products_list: items.iter().map(|s| ListItem::new(*s)).collect(),
            ..Default::default()
        }
    }

    fn rubric(name: &str) -> RubricRef {
        RubricRef {
            slug: "r".to_string(),
            name: name.to_string(),
            category_slug: "c".to_string(),
            category_name: String::new(),
        }
    }

    fn engine(volumes: VolumeTable, options: DeriveOptions) -> KeywordEngine {
        KeywordEngine::new(Arc::new(Lexicon::default()), Arc::new(volumes), options)
    }

    fn strict() -> DeriveOptions {
        DeriveOptions {
            strict_stats: true,
            ..Default::default()
        }
    }

    fn phrases(candidates: Vec<RawCandidate>) -> Vec<String> {
        candidates.into_iter().map(|c| c.phrase).collect()
    }

    // ============================================================
    // EXTRACTION TESTS
    // ============================================================

    #[test]
    fn test_split_items_conjunction_borrows_tail() {
        let lexicon = Lexicon::default();
        assert_eq!(
            split_items("Ремонт и обслуживание холодильников", &lexicon),
            vec!["ремонт холодильников", "обслуживание холодильников"]
        );
    }

    #[test]
    fn test_split_items_conjunction_borrows_head() {
        let lexicon = Lexicon::default();
        assert_eq!(
            split_items("пошив штор и покрывал", &lexicon),
            vec!["пошив штор", "пошив покрывал"]
        );
    }

    #[test]
    fn test_split_items_conjunction_guards() {
        let lexicon = Lexicon::default();
        // short word next to the conjunction
        assert_eq!(split_items("ус и кабели", &lexicon), vec!["ус и кабели"]);
        // more than one conjunction
        assert_eq!(
            split_items("окна и двери и ворота", &lexicon),
            vec!["окна и двери и ворота"]
        );
        // identical halves
        assert_eq!(split_items("шины и шины", &lexicon), vec!["шины и шины"]);
    }

    #[test]
    fn test_split_items_strips_decorations_and_delimiters() {
        let lexicon = Lexicon::default();
        assert_eq!(
            split_items("«Шины» (летние), диски / аккумуляторы • масла", &lexicon),
            vec!["шины", "летние", "диски", "аккумуляторы", "масла"]
        );
    }

    #[test]
    fn test_repeated_heads_needs_three_members() {
        let lexicon = Lexicon::default();
        let record = CompanyRecord {
            description: "Молоко, молочные коктейли, молочная сыворотка, хлеб".to_string(),
            ..Default::default()
        };
        let found = repeated_heads(&record, &lexicon);
        assert!(found.iter().all(|c| c.source == KeywordSource::AuxText));
        assert_eq!(
            phrases(found),
            vec!["молоко", "молочные коктейли", "молочная сыворотка"]
        );

        let sparse = CompanyRecord {
            description: "Молоко, молочные коктейли, хлеб".to_string(),
            ..Default::default()
        };
        assert!(repeated_heads(&sparse, &lexicon).is_empty());
    }

    #[test]
    fn test_activity_windows_forward_from_trigger() {
        let lexicon = Lexicon::default();
        let record = CompanyRecord {
            description: "Осуществляем производство мебели из массива.".to_string(),
            ..Default::default()
        };
        assert_eq!(
            phrases(activity_windows(&record, &lexicon)),
            vec!["производство мебели", "производство мебели из массива"]
        );
    }

    #[test]
    fn test_parenthetical_lists_food_domain_only() {
        let lexicon = Lexicon::default();
        let mut record = CompanyRecord {
            description: "Ассортимент продукции (молоко, кефир и сметана, упаковка)".to_string(),
            rubrics: vec![rubric("Молочная промышленность")],
            ..Default::default()
        };
        let found = parenthetical_lists(&record, &lexicon);
        assert!(found.iter().all(|c| c.source == KeywordSource::Product));
        assert_eq!(phrases(found), vec!["молоко", "кефир", "сметана"]);

        record.rubrics = vec![rubric("Автосервис")];
        assert!(parenthetical_lists(&record, &lexicon).is_empty());
    }

    #[test]
    fn test_parenthetical_lists_requires_intro_word() {
        let lexicon = Lexicon::default();
        let record = CompanyRecord {
            description: "Работаем с 9 до 18 (молоко, кефир)".to_string(),
            rubrics: vec![rubric("Молочная промышленность")],
            ..Default::default()
        };
        assert!(parenthetical_lists(&record, &lexicon).is_empty());
    }

    // ============================================================
    // SAFETY TESTS
    // ============================================================

    #[test]
    fn test_safety_rejections() {
        let lexicon = Lexicon::default();
        let filter = SafetyFilter::new(&lexicon, "ООО Шинторг");
        let service = KeywordSource::Service;

        assert!(filter.accepts("шины летние", service));
        assert!(!filter.accepts("шины недорого", service));
        assert!(!filter.accepts("шины 2023", service));
        assert!(!filter.accepts("шины r16", service));
        assert!(!filter.accepts("шины минск", service));
        assert!(!filter.accepts("услуги", service));
        assert!(!filter.accepts("и для", service));
        assert!(!filter.accepts("123", service));
        assert!(!filter.accepts("купить услуги", service));
        assert!(!filter.accepts("один два три четыре пять шесть семь", service));
    }

    #[test]
    fn test_safety_free_text_rules() {
        let lexicon = Lexicon::default();
        let filter = SafetyFilter::new(&lexicon, "ООО Шинторг");

        assert!(filter.accepts("шинторг шины", KeywordSource::Service));
        assert!(!filter.accepts("шинторг шины", KeywordSource::AuxText));
        assert!(!filter.accepts("история предприятия", KeywordSource::AuxText));
        // legal forms are not name tokens
        assert!(filter.accepts("ооо шины", KeywordSource::AuxText));
    }

    #[test]
    fn test_safety_taxonomy_skips_specific_token_rule() {
        let lexicon = Lexicon::default();
        let filter = SafetyFilter::new(&lexicon, "");
        assert!(filter.accepts("бренды товары", KeywordSource::Rubric));
        assert!(!filter.accepts("бренды товары", KeywordSource::Product));
    }

    // ============================================================
    // SCORER TESTS
    // ============================================================

    #[test]
    fn test_score_formula() {
        assert!((score(120.0, 0, 2) - 120.0).abs() < 1e-9);
        assert!((score(100.0, 99, 3) - 116.0).abs() < 1e-9);
        assert!((score(100.0, 0, 5) - 99.2).abs() < 1e-9);
    }

    #[test]
    fn test_score_candidates_merges_duplicates() {
        let lexicon = Lexicon::default();
        let filter = SafetyFilter::new(&lexicon, "");
        let raw = vec![
            RawCandidate::new("шины", KeywordSource::Rubric, 58.0),
            RawCandidate::new("шины", KeywordSource::Product, 118.0),
            RawCandidate::new("шины недорого", KeywordSource::Product, 118.0),
        ];
        let pool = score_candidates(raw, &VolumeTable::new(), &filter);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].source, KeywordSource::Product);
        assert!((pool[0].score - 118.0).abs() < 1e-9);
    }

    // ============================================================
    // VOLUME TESTS
    // ============================================================

    #[test]
    fn test_parse_number_locales() {
        assert_eq!(parse_number("12 500"), Some(12500.0));
        assert_eq!(parse_number("12,500"), Some(12500.0));
        assert_eq!(parse_number("12.500"), Some(12500.0));
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("2,5"), Some(2.5));
        assert_eq!(parse_number("2.5"), Some(2.5));
        assert_eq!(parse_number("1 000 000"), Some(1_000_000.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("phrase\tvolume\tclicks"), b'\t');
        assert_eq!(detect_delimiter("phrase;volume"), b';');
        assert_eq!(detect_delimiter("phrase|volume|clicks"), b'|');
        assert_eq!(detect_delimiter("phrase"), b',');
    }

    #[test]
    fn test_csv_with_volume_header() {
        let table = VolumeTable::from_csv_str("Фраза;Частота\nКупить шины;1 200\nшины;\n");
        assert_eq!(table.get("купить шины"), 1200);
        assert_eq!(table.get("шины"), 0);
    }

    #[test]
    fn test_csv_monthly_average() {
        let table = VolumeTable::from_csv_str("Запрос,Январь,Февраль\nкупить шины,100,300\n");
        assert_eq!(table.get("купить шины"), 200);
    }

    #[test]
    fn test_csv_falls_back_to_impressions() {
        let table = VolumeTable::from_csv_str("keyword|Impressions|Clicks\nшины|1 000|50\nдиски||7\n");
        assert_eq!(table.get("шины"), 1000);
        assert_eq!(table.get("диски"), 7);
    }

    #[test]
    fn test_csv_headerless_pairs() {
        let table = VolumeTable::from_csv_str("шины;150\nдиски;20\n");
        assert_eq!(table.get("шины"), 150);
        assert_eq!(table.get("диски"), 20);
    }

    #[test]
    fn test_csv_duplicates_keep_max() {
        let table = VolumeTable::from_csv_str("phrase,volume\nшины,10\nШины,30\nшины,20\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("шины"), 30);
    }

    #[test]
    fn test_json_layouts() {
        let table =
            VolumeTable::from_json_str(r#"[{"query": "Купить шины", "frequency": "1 200"}]"#)
                .expect("valid json");
        assert_eq!(table.get("купить шины"), 1200);

        let table = VolumeTable::from_json_str(r#"{"шины": 5, "диски": "7"}"#).expect("valid json");
        assert_eq!(table.get("шины"), 5);
        assert_eq!(table.get("диски"), 7);
    }

    #[test]
    fn test_load_missing_file_policy() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");

        let table = VolumeTable::load(std::slice::from_ref(&missing), true).unwrap();
        assert!(table.is_empty());

        let err = VolumeTable::load(&[missing], false).unwrap_err();
        assert!(matches!(err, CatalogError::StatsFileMissing { .. }));
    }

    #[test]
    fn test_load_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("a.csv");
        let json = dir.path().join("b.json");
        std::fs::write(&csv, "phrase,volume\nшины,10\n").unwrap();
        std::fs::write(&json, r#"{"шины": 40, "диски": 3}"#).unwrap();

        let table = VolumeTable::load(&[csv, json], false).unwrap();
        assert_eq!(table.get("шины"), 40);
        assert_eq!(table.get("диски"), 3);
    }

    #[test]
    fn test_load_invalid_json_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{broken").unwrap();
        let err = VolumeTable::load(&[path], false).unwrap_err();
        assert!(matches!(err, CatalogError::StatsFormat { .. }));
    }

    #[test]
    fn test_volume_cache_reuses_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        std::fs::write(&path, "phrase,volume\nшины,10\n").unwrap();
        let paths = vec![path];

        let cache = VolumeTableCache::new();
        let first = cache.get_or_load(&paths, false).unwrap();
        let second = cache.get_or_load(&paths, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        // a different missing-file policy is a different configuration
        cache.get_or_load(&paths, true).unwrap();
        assert_eq!(cache.len(), 2);
    }

    // ============================================================
    // ENGINE TESTS
    // ============================================================

    #[test]
    fn test_scenario_service_conjunction_split() {
        let engine = KeywordEngine::default();
        let record = services(&["ремонт и обслуживание холодильников"]);
        let keywords = engine.derive_keywords(&record);

        assert!(keywords.contains(&"ремонт холодильников".to_string()));
        assert!(keywords.contains(&"обслуживание холодильников".to_string()));
        assert!(keywords.iter().any(|k| k.starts_with("заказать ")));
        assert!(!keywords.contains(&"ремонт и обслуживание холодильников".to_string()));
    }

    #[test]
    fn test_transactional_variant_outranks_bare_phrase() {
        let engine = KeywordEngine::default();
        assert_eq!(engine.derive_keywords(&products(&["шины"])), vec!["купить шины"]);

        let pool = engine.candidates(&products(&["шины"]));
        let order: Vec<&str> = pool.iter().map(|c| c.phrase.as_str()).collect();
        assert_eq!(order, vec!["купить шины", "продажа шины", "шины"]);
    }

    #[test]
    fn test_output_is_bounded() {
        let engine = KeywordEngine::default();
        let items: Vec<String> = (0..15).map(|i| format!("изделие номер{} из стали", "а".repeat(i + 1))).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let record = CompanyRecord {
            rubrics: vec![rubric("Металлоконструкции")],
            ..products(&refs)
        };

        let keywords = engine.derive_keywords(&record);
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= DeriveOptions::default().max_keywords);

        let lexicon = Lexicon::default();
        let filter = SafetyFilter::new(&lexicon, &record.name);
        for keyword in &keywords {
            assert!(keyword.split_whitespace().count() <= MAX_PHRASE_WORDS);
            let source = if keyword == "металлоконструкции" {
                KeywordSource::Rubric
            } else {
                KeywordSource::Product
            };
            assert!(filter.accepts(keyword, source), "unsafe phrase {:?}", keyword);
        }
    }

    #[test]
    fn test_diversity_one_phrase_per_core() {
        let engine = KeywordEngine::default();
        let record = products(&["шины", "диски", "продажа шины", "купить диски", "аккумуляторы"]);
        let keywords = engine.derive_keywords(&record);

        let lexicon = Lexicon::default();
        let mut cores = HashSet::new();
        for keyword in &keywords {
            assert!(
                cores.insert(lexicon.core_phrase(keyword).to_string()),
                "core repeated in {:?}",
                keywords
            );
        }
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let record = CompanyRecord {
            description: "Производство мебели. Продажа кухонь, шкафов и столов".to_string(),
            rubrics: vec![rubric("Мебель")],
            categories: vec![CategoryRef {
                slug: "home".to_string(),
                name: "Дом и интерьер".to_string(),
            }],
            ..services(&["сборка мебели", "доставка и монтаж"])
        };
        let volumes = VolumeTable::from_csv_str("phrase,volume\nсборка мебели,50\nмонтаж,5\n");

        let first = engine(volumes.clone(), DeriveOptions::default()).derive_keywords(&record);
        for _ in 0..5 {
            let again = engine(volumes.clone(), DeriveOptions::default()).derive_keywords(&record);
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_strict_mode_requires_volume() {
        let record = services(&["ремонт холодильников"]);
        assert!(engine(VolumeTable::new(), strict()).derive_keywords(&record).is_empty());

        let volumes = VolumeTable::from_csv_str("phrase,volume\nремонт холодильников,90\n");
        assert_eq!(
            engine(volumes, strict()).derive_keywords(&record),
            vec!["ремонт холодильников"]
        );
    }

    #[test]
    fn test_buy_intent_converts_sale_phrases() {
        let volumes = VolumeTable::from_csv_str(
            "phrase;volume\nпродажа шин;100000\nпродажа дисков;50000\nкупить шин;10\nкупить дисков;5\n",
        );
        let record = products(&["продажа шин", "продажа дисков"]);
        let keywords = engine(volumes, strict()).derive_keywords(&record);

        assert_eq!(keywords, vec!["купить шин", "купить дисков"]);
    }

    #[test]
    fn test_buy_intent_skips_buy_phrase_without_volume() {
        let volumes = VolumeTable::from_csv_str(
            "phrase;volume\nпродажа шин;100000\nпродажа дисков;50000\nкупить шин;10\n",
        );
        let record = products(&["продажа шин", "продажа дисков"]);
        let keywords = engine(volumes, strict()).derive_keywords(&record);

        assert_eq!(keywords, vec!["купить шин", "продажа дисков"]);
    }

    #[test]
    fn test_rubric_fallback_and_generic_block() {
        let record = CompanyRecord {
            rubrics: vec![rubric("Транспортные услуги")],
            categories: vec![CategoryRef {
                slug: "transport".to_string(),
                name: "Транспорт".to_string(),
            }],
            ..Default::default()
        };

        let keywords = KeywordEngine::default().derive_keywords(&record);
        assert_eq!(keywords, vec!["транспортные услуги"]);

        let no_fallback = DeriveOptions {
            fallback: FallbackMode::None,
            ..Default::default()
        };
        assert!(engine(VolumeTable::new(), no_fallback).derive_keywords(&record).is_empty());
    }

    #[test]
    fn test_freight_company_prefers_cargo_phrase() {
        let record = CompanyRecord {
            description: "Доставка грузов по стране".to_string(),
            ..services(&["перевозки"])
        };
        let keywords = KeywordEngine::default().derive_keywords(&record);

        assert!(keywords.contains(&"перевозка грузов".to_string()));
        assert!(!keywords.contains(&"перевозки".to_string()));
    }

    #[test]
    fn test_transport_services_drops_bare_transport() {
        let lexicon = Lexicon::default();
        let volumes = VolumeTable::new();
        let refiner = Refiner {
            lexicon: &lexicon,
            volumes: &volumes,
            strict_stats: false,
            company_text: "транспортные услуги транспорт",
        };
        let selected: Vec<KeywordCandidate> = ["транспорт", "транспортные услуги"]
            .iter()
            .map(|phrase| KeywordCandidate {
                phrase: phrase.to_string(),
                source: KeywordSource::Service,
                score: 1.0,
                volume: 0,
            })
            .collect();

        let phrases: Vec<String> = refiner
            .refine(selected.clone(), &selected)
            .into_iter()
            .map(|c| c.phrase)
            .collect();
        assert_eq!(phrases, vec!["транспортные услуги"]);
    }

    #[test]
    fn test_derive_tokens_adds_canonical_synonyms() {
        let engine = KeywordEngine::default();
        let tokens = engine.derive_tokens(&[
            "купить молоко".to_string(),
            "молочные продукты для детей".to_string(),
        ]);
        assert_eq!(
            tokens,
            vec![
                "купить молоко",
                "купить",
                "молоко",
                "молочные продукты для детей",
                "молочные",
                "продукты",
                "детей",
                "молочная"
            ]
        );
    }

    #[test]
    fn test_fallback_mode_from_str() {
        assert_eq!("rubrics".parse::<FallbackMode>(), Ok(FallbackMode::Rubrics));
        assert_eq!("NONE".parse::<FallbackMode>(), Ok(FallbackMode::None));
        assert!("other".parse::<FallbackMode>().is_err());
    }
}
