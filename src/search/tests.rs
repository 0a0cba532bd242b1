//! Search Module Tests
//!
//! ## Test Scopes
//! - **Matching**: exact, prefix and reverse token rules, stem exceptions.
//! - **Ranking**: signal detection, service and name matching, filters,
//!   ordering and pagination.
//! - **Service**: accelerated engine hydration and every fallback path.

#[cfg(test)]
mod tests {
    use crate::catalog::exclusion::NoExclusions;
    use crate::catalog::snapshot::CatalogSnapshot;
    use crate::catalog::store::{CatalogStore, StoreConfig};
    use crate::catalog::types::{CompanyRecord, RegionSlug};
    use crate::error::{CatalogError, Result};
    use crate::keywords::engine::KeywordEngine;
    use crate::keywords::types::{DeriveOptions, FallbackMode};
    use crate::keywords::volume::VolumeTable;
    use crate::search::accelerated::{AcceleratedHits, AcceleratedSearch, SearchService};
    use crate::search::engine::{has_signal, rank};
    use crate::search::matching::{TokenMatch, best_match, exception_blocks, match_token};
    use crate::search::types::{SearchBackend, SearchQuery, SearchResponse};
    use crate::text::lexicon::Lexicon;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    fn company(id: &str, name: &str) -> Value {
        json!({ "source_id": id, "name": name })
    }

    fn snapshot(values: Vec<Value>) -> CatalogSnapshot {
        let records: Vec<CompanyRecord> = values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        CatalogSnapshot::from_records(records, Arc::new(KeywordEngine::default()))
    }

    fn by_name(name: &str) -> SearchQuery {
        SearchQuery {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn by_service(service: &str) -> SearchQuery {
        SearchQuery {
            service: service.to_string(),
            ..Default::default()
        }
    }

    fn ids(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|r| r.company.id.as_str()).collect()
    }

    fn dairy_catalog() -> CatalogSnapshot {
        let mut dairy = company("dairy", "Заречье");
        dairy["products_list"] = json!(["молоко", "кефир"]);
        let mut tools = company("tools", "Мастер");
        tools["products_list"] = json!(["молотки"]);
        let mut shoes = company("shoes", "Каблучок");
        shoes["services_list"] = json!(["ремонт обуви"]);
        snapshot(vec![dairy, tools, shoes])
    }

    // ============================================================
    // MATCHING TESTS - match_token
    // ============================================================

    #[test]
    fn test_match_exact_and_prefix() {
        assert_eq!(match_token("сыр", "сыр"), Some(TokenMatch::Exact));
        assert_eq!(match_token("сыр", "сыры"), Some(TokenMatch::Prefix));
        assert_eq!(match_token("кирпич", "кирпичный"), Some(TokenMatch::Prefix));
        assert_eq!(match_token("кирпич", "бетон"), None);
    }

    #[test]
    fn test_match_reverse_needs_four_char_field() {
        assert_eq!(
            match_token("холодильников", "холодильник"),
            Some(TokenMatch::Reverse)
        );
        assert_eq!(match_token("холодильников", "хол"), None);
    }

    #[test]
    fn test_match_short_query_exact_only() {
        assert_eq!(match_token("ус", "услуги"), None);
        assert_eq!(match_token("ус", "ус"), Some(TokenMatch::Exact));
    }

    #[test]
    fn test_stem_exceptions() {
        assert_eq!(match_token("сыр", "сырье"), None);
        assert_eq!(match_token("сыры", "сырость"), None);
        assert_eq!(match_token("газ", "газета"), None);
        assert_eq!(match_token("газ", "газоны"), None);
        assert_eq!(match_token("газ", "газовое"), Some(TokenMatch::Prefix));
        assert_eq!(match_token("лес", "лестницы"), None);
        assert_eq!(match_token("лес", "лесоматериалы"), Some(TokenMatch::Prefix));
    }

    #[test]
    fn test_stem_exception_does_not_block_its_own_words() {
        // a query that is itself an excluded word matches normally
        assert!(!exception_blocks("сырь", "сырье"));
        assert_eq!(match_token("сырь", "сырье"), Some(TokenMatch::Prefix));
        assert_eq!(match_token("газет", "газеты"), Some(TokenMatch::Prefix));
        // long queries are past the exception slack
        assert!(!exception_blocks("сырьевой", "сырье"));
    }

    #[test]
    fn test_best_match_prefers_exact() {
        let fields = vec!["молочные".to_string(), "молоко".to_string()];
        assert_eq!(best_match("молоко", &fields), Some(TokenMatch::Exact));
        assert_eq!(best_match("молок", &fields), Some(TokenMatch::Prefix));
        assert_eq!(best_match("хлеб", &fields), None);
        assert!(TokenMatch::Exact.weight() > TokenMatch::Prefix.weight());
        assert!(TokenMatch::Prefix.weight() > TokenMatch::Reverse.weight());
    }

    // ============================================================
    // RANKING TESTS - signal and service matching
    // ============================================================

    #[test]
    fn test_no_signal_returns_empty() {
        let snapshot = snapshot(vec![company("a", "Альфа")]);
        let lexicon = snapshot.lexicon();

        let city_only = SearchQuery {
            city: "Минск".to_string(),
            region: Some(RegionSlug::Minsk),
            ..Default::default()
        };
        assert!(!has_signal(&city_only, lexicon));
        let response = rank(&snapshot, &city_only, 200);
        assert_eq!(response.total_count, 0);
        assert!(response.results.is_empty());
        assert_eq!(response.filters.get("city").map(String::as_str), Some("Минск"));

        assert!(!has_signal(&by_service("и для"), lexicon));
        assert!(has_signal(&by_name("альфа"), lexicon));
        assert!(has_signal(&by_service("молоко"), lexicon));
    }

    #[test]
    fn test_service_query_uses_canonical_synonyms() {
        let catalog = dairy_catalog();
        let response = rank(&catalog, &by_service("молоко"), 200);
        assert_eq!(ids(&response), vec!["dairy"]);
        // exact canonical token plus the whole-phrase bonus
        assert_eq!(response.results[0].score, 5);

        assert_eq!(ids(&rank(&catalog, &by_service("кефира"), 200)), vec!["dairy"]);
        assert_eq!(ids(&rank(&catalog, &by_service("молотки"), 200)), vec!["tools"]);
    }

    #[test]
    fn test_service_query_requires_every_token() {
        let catalog = dairy_catalog();
        assert_eq!(ids(&rank(&catalog, &by_service("ремонт обуви"), 200)), vec!["shoes"]);
        assert!(rank(&catalog, &by_service("ремонт телефонов"), 200)
            .results
            .is_empty());
    }

    #[test]
    fn test_service_matches_only_derived_tokens() {
        let mut cheese = company("a", "Сырзавод");
        cheese["rubrics"] = json!([{"slug": "cheese", "name": "Сыры"}]);
        let mut raw = company("b", "Сырьевая база");
        raw["rubrics"] = json!([{"slug": "raw", "name": "Сырье и материалы"}]);

        // the rubric reaches the tokens through the selector's rubric fallback
        let catalog = snapshot(vec![cheese.clone(), raw]);
        assert_eq!(ids(&rank(&catalog, &by_service("сыр"), 200)), vec!["a"]);

        // without the fallback nothing is derived, and the rubric alone never matches
        let options = DeriveOptions {
            fallback: FallbackMode::None,
            ..Default::default()
        };
        let engine = KeywordEngine::new(
            Arc::new(Lexicon::default()),
            Arc::new(VolumeTable::new()),
            options,
        );
        let record: CompanyRecord = serde_json::from_value(cheese).unwrap();
        let catalog = CatalogSnapshot::from_records(vec![record], Arc::new(engine));
        assert!(catalog.keyword_tokens("a").unwrap().is_empty());
        assert!(rank(&catalog, &by_service("сыр"), 200).results.is_empty());
    }

    // ============================================================
    // RANKING TESTS - name matching
    // ============================================================

    #[test]
    fn test_name_prefix_beats_substring() {
        let snapshot = snapshot(vec![
            company("a", "Мир молочный"),
            company("b", "Молочный мир"),
            company("c", "Хлебозавод"),
        ]);
        let response = rank(&snapshot, &by_name("Молочный"), 200);
        assert_eq!(ids(&response), vec!["b", "a"]);
        assert_eq!(response.results[0].score, 30);
        assert_eq!(response.results[1].score, 20);
    }

    #[test]
    fn test_name_prefix_ignores_legal_form() {
        let snapshot = snapshot(vec![company("a", "ООО Молочный мир")]);
        let response = rank(&snapshot, &by_name("молочный"), 200);
        assert_eq!(response.results[0].score, 30);
    }

    #[test]
    fn test_name_initialism_and_compact_fallback() {
        let snapshot = snapshot(vec![
            company("mtz", "Минский тракторный завод"),
            company("ats", "АгроТехСервис"),
        ]);

        let response = rank(&snapshot, &by_name("МТЗ"), 200);
        assert_eq!(ids(&response), vec!["mtz"]);
        assert_eq!(response.results[0].score, 10);

        let response = rank(&snapshot, &by_name("Агро-Тех Сервис"), 200);
        assert_eq!(ids(&response), vec!["ats"]);
        assert_eq!(response.results[0].score, 10);
    }

    #[test]
    fn test_name_matches_unp() {
        let mut value = company("a", "Альфа");
        value["unp"] = json!("190123456");
        let snapshot = snapshot(vec![value, company("b", "Бета")]);
        assert_eq!(ids(&rank(&snapshot, &by_name("190123456"), 200)), vec!["a"]);
    }

    // ============================================================
    // RANKING TESTS - filters, ordering, pagination
    // ============================================================

    fn located(id: &str, city: &str, address: &str) -> Value {
        let mut value = company(id, &format!("Альфа {}", id));
        value["city"] = json!(city);
        value["address"] = json!(address);
        value
    }

    #[test]
    fn test_city_filter_exact_or_address_tokens() {
        let snapshot = snapshot(vec![
            located("a", "г. Минск", "ул. Ленина 5"),
            located("b", "Минский район", "аг. Ждановичи, ул. Ленина 5"),
            located("c", "Гомель", "ул. Советская 1"),
        ]);
        let query = |city: &str| SearchQuery {
            name: "альфа".to_string(),
            city: city.to_string(),
            ..Default::default()
        };

        assert_eq!(ids(&rank(&snapshot, &query("Минск"), 200)), vec!["a"]);
        assert_eq!(ids(&rank(&snapshot, &query("ул. Ленина"), 200)), vec!["a", "b"]);
        assert_eq!(ids(&rank(&snapshot, &query("Ждановичи, Ленина"), 200)), vec!["b"]);
    }

    #[test]
    fn test_region_rubric_and_category_filters() {
        let mut a = located("a", "Гомель", "");
        a["rubrics"] = json!([{"slug": "bread", "name": "Хлеб", "category_slug": "food"}]);
        let mut b = located("b", "Брест", "");
        b["rubrics"] = json!([{"slug": "bread", "name": "Хлеб", "category_slug": "food"}]);
        let mut c = located("c", "Гомель", "");
        c["categories"] = json!([{"slug": "build", "name": "Строительство"}]);
        let snapshot = snapshot(vec![a, b, c]);

        let mut query = by_name("альфа");
        query.region = Some(RegionSlug::Gomel);
        assert_eq!(ids(&rank(&snapshot, &query, 200)), vec!["a", "c"]);

        query.rubric = Some("bread".to_string());
        assert_eq!(ids(&rank(&snapshot, &query, 200)), vec!["a"]);

        let mut query = by_name("альфа");
        query.category = Some("build".to_string());
        let response = rank(&snapshot, &query, 200);
        assert_eq!(ids(&response), vec!["c"]);
        assert_eq!(response.filters.get("category").map(String::as_str), Some("build"));
    }

    #[test]
    fn test_equal_scores_order_by_logo_then_name() {
        let mut with_logo = company("z", "Альфа Янтарь");
        with_logo["logo_url"] = json!("https://cdn.by/z.png");
        let snapshot = snapshot(vec![
            company("b", "Альфа Бета"),
            company("a", "Альфа Авангард"),
            with_logo,
        ]);
        let response = rank(&snapshot, &by_name("альфа"), 200);
        assert_eq!(ids(&response), vec!["z", "a", "b"]);
        assert!(response.results[0].company.has_logo);
    }

    #[test]
    fn test_pagination_and_limit_clamp() {
        let snapshot = snapshot(
            (0..5)
                .map(|i| company(&format!("c{}", i), &format!("Альфа {}", i)))
                .collect(),
        );

        let mut query = by_name("альфа");
        query.offset = 1;
        query.limit = Some(2);
        let response = rank(&snapshot, &query, 200);
        assert_eq!(response.total_count, 5);
        assert_eq!(response.count, 2);
        assert_eq!(response.offset, 1);
        assert_eq!(ids(&response), vec!["c1", "c2"]);

        query.offset = 0;
        query.limit = Some(1_000);
        let response = rank(&snapshot, &query, 3);
        assert_eq!(response.count, 3);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let catalog = dairy_catalog();
        let first = rank(&catalog, &by_service("ремонт"), 200);
        let second = rank(&catalog, &by_service("ремонт"), 200);
        assert_eq!(ids(&first), ids(&second));
    }

    // ============================================================
    // SERIALIZATION TESTS
    // ============================================================

    #[test]
    fn test_query_deserialization() {
        let query: SearchQuery = serde_json::from_value(json!({
            "service": "молоко",
            "region": "minsk-region",
            "limit": 5
        }))
        .unwrap();
        assert_eq!(query.region, Some(RegionSlug::MinskRegion));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 0);
        assert!(query.name.is_empty());

        let bad = serde_json::from_value::<SearchQuery>(json!({"region": "atlantis"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_response_serialization_flattens_company() {
        let catalog = dairy_catalog();
        let response = rank(&catalog, &by_service("молоко"), 200);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["backend"], "ranking");
        assert_eq!(value["total_count"], 1);
        assert_eq!(value["results"][0]["id"], "dairy");
        assert_eq!(value["results"][0]["score"], 5);
        assert!(value["results"][0].get("company").is_none());
    }

    // ============================================================
    // SERVICE TESTS - accelerated engine and fallback
    // ============================================================

    #[derive(Debug)]
    enum Canned {
        Ids(Vec<&'static str>),
        /// Honors the requested limit and optionally reports a match total.
        Paged {
            ids: Vec<&'static str>,
            total: Option<usize>,
        },
        Fail,
        Stall,
    }

    #[derive(Debug)]
    struct CannedEngine(Canned);

    #[async_trait]
    impl AcceleratedSearch for CannedEngine {
        async fn search(&self, _query: &SearchQuery, limit: usize) -> Result<AcceleratedHits> {
            match &self.0 {
                Canned::Ids(ids) => Ok(AcceleratedHits {
                    ids: ids.iter().map(|id| id.to_string()).collect(),
                    total: None,
                }),
                Canned::Paged { ids, total } => Ok(AcceleratedHits {
                    ids: ids.iter().take(limit).map(|id| id.to_string()).collect(),
                    total: *total,
                }),
                Canned::Fail => Err(CatalogError::AcceleratedSearch(
                    "connection refused".to_string(),
                )),
                Canned::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(AcceleratedHits::default())
                }
            }
        }
    }

    async fn service_with(dir: &tempfile::TempDir, canned: Option<Canned>) -> SearchService {
        let path = dir.path().join("catalog.ndjson");
        let lines = [
            company("a", "Альфа Авангард"),
            company("b", "Альфа Бета"),
            company("c", "Гамма"),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");
        std::fs::write(&path, lines).unwrap();

        let store = CatalogStore::init(
            StoreConfig::new(path),
            Arc::new(KeywordEngine::default()),
            Arc::new(NoExclusions),
        )
        .await
        .unwrap();
        let service = SearchService::new(store);
        match canned {
            Some(canned) => {
                service.with_accelerated(Arc::new(CannedEngine(canned)), Duration::from_millis(50))
            }
            None => service,
        }
    }

    #[tokio::test]
    async fn test_service_without_accelerated_engine_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, None).await;
        let response = service.search(&by_name("альфа")).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert_eq!(ids(&response), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_service_hydrates_accelerated_ids() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Ids(vec!["c", "ghost", "a"]))).await;

        let response = service.search(&by_name("альфа")).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Accelerated);
        // engine order is kept and unknown ids are dropped
        assert_eq!(ids(&response), vec!["c", "a"]);
        assert_eq!(response.total_count, 2);
        assert!(response.results[0].score > response.results[1].score);
    }

    #[tokio::test]
    async fn test_service_falls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Fail)).await;
        let response = service.search(&by_name("альфа")).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert_eq!(ids(&response), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_service_falls_back_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Stall)).await;
        let response = service.search(&by_name("альфа")).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert_eq!(response.total_count, 2);
    }

    #[tokio::test]
    async fn test_service_falls_back_on_unknown_ids_only() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Ids(vec!["ghost"]))).await;
        let response = service.search(&by_name("альфа")).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert_eq!(ids(&response), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_service_skips_engine_without_signal() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Ids(vec!["a"]))).await;
        let query = SearchQuery {
            city: "Минск".to_string(),
            ..Default::default()
        };
        let response = service.search(&query).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_service_tolerates_huge_offset() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, Some(Canned::Ids(vec!["a"]))).await;
        let mut query = by_name("альфа");
        query.offset = usize::MAX;

        let response = service.search(&query).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Accelerated);
        assert_eq!(response.total_count, 1);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_service_uses_engine_total_for_paging() {
        let dir = tempfile::tempdir().unwrap();
        let canned = Canned::Paged {
            ids: vec!["a", "b", "c"],
            total: Some(3),
        };
        let service = service_with(&dir, Some(canned)).await;
        let mut query = by_name("альфа");
        query.limit = Some(1);

        let response = service.search(&query).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Accelerated);
        assert_eq!(response.total_count, 3);
        assert_eq!(ids(&response), vec!["a"]);
    }

    #[tokio::test]
    async fn test_service_ranks_when_full_page_has_no_total() {
        let dir = tempfile::tempdir().unwrap();
        let canned = Canned::Paged {
            ids: vec!["a", "b", "c"],
            total: None,
        };
        let service = service_with(&dir, Some(canned)).await;
        let mut query = by_name("альфа");
        query.limit = Some(1);

        let response = service.search(&query).await.unwrap();
        assert_eq!(response.backend, SearchBackend::Ranking);
        assert_eq!(response.total_count, 2);
        assert_eq!(ids(&response), vec!["a"]);
    }
}
