//! Heuristic Word Tables
//!
//! Every curated list the keyword and search pipelines consult lives here as
//! plain data. The defaults are the production tables; a JSON file can replace
//! any subset of them (missing keys keep their default), which is how tests and
//! deployments swap lexicons without touching extraction logic.
//!
//! All entries are stored in normalized form (see [`normalize`]).

use crate::error::{CatalogError, Result};
use crate::text::normalizer::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Minimum length at which a geographic entry also matches inflected forms.
const GEO_PREFIX_MIN_CHARS: usize = 5;

/// Maps every token starting with `prefix` to one canonical search token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymRule {
    pub prefix: String,
    pub canonical: String,
}

/// Literal phrases used by the refinement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineRules {
    /// Token prefixes that mark a company as doing freight work.
    pub freight_stems: Vec<String>,
    /// Bare "transportation" phrases replaced by the cargo form.
    pub bare_transportation: Vec<String>,
    pub cargo_transportation: String,
    pub transport_services: String,
    /// Single-word form made redundant by `transport_services`.
    pub bare_transport: String,
}

impl Default for RefineRules {
    fn default() -> Self {
        Self {
            freight_stems: strings(&["груз"]),
            bare_transportation: strings(&["перевозки", "перевозка"]),
            cargo_transportation: "перевозка грузов".to_string(),
            transport_services: "транспортные услуги".to_string(),
            bare_transport: "транспорт".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Conjunctions, prepositions, pronouns, generic business nouns and filler verbs.
    pub stop_words: HashSet<String>,
    /// Legal-form abbreviations (ООО, ЧУП, ...).
    pub legal_forms: HashSet<String>,
    /// Subject words too vague to be a keyword on their own.
    pub generic_words: HashSet<String>,
    pub conjunctions: HashSet<String>,
    /// Purchase imperative ("купить").
    pub buy_word: String,
    /// Sale nouns ("продажа").
    pub sale_words: Vec<String>,
    /// Service imperative ("заказать").
    pub order_word: String,
    /// Prefixes stripped when computing a phrase's core.
    pub core_prefixes: Vec<String>,
    pub activity_stems: Vec<String>,
    pub list_intro_stems: Vec<String>,
    /// Taxonomy stems that enable the parenthetical product-list scan.
    pub food_domain_stems: Vec<String>,
    pub product_hint_stems: Vec<String>,
    pub geo_tokens: HashSet<String>,
    pub editorial_stems: Vec<String>,
    pub price_stems: Vec<String>,
    pub synonyms: Vec<SynonymRule>,
    /// Street and settlement markers that make a location query address-like.
    pub address_markers: HashSet<String>,
    /// Settlement-type prefixes stripped from city values ("г", "аг", ...).
    pub settlement_markers: HashSet<String>,
    /// Logo URL fragments that denote a placeholder image.
    pub logo_placeholders: Vec<String>,
    pub refine: RefineRules,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            stop_words: set(&[
                "и", "или", "а", "но", "да", "в", "во", "на", "по", "для", "с", "со", "от", "до",
                "из", "к", "ко", "о", "об", "обо", "у", "за", "под", "над", "при", "без", "через",
                "про", "не", "ни", "же", "ли", "бы", "то", "что", "как", "так", "также", "тоже",
                "это", "этот", "эта", "эти", "все", "весь", "вся", "всех", "мы", "вы", "они",
                "он", "она", "оно", "наш", "наша", "наше", "наши", "нашей", "наших", "ваш",
                "ваша", "ваше", "ваши", "свой", "своих", "его", "ее", "их", "который", "которая",
                "которые", "компания", "компании", "предприятие", "предприятия", "организация",
                "организации", "фирма", "фирмы", "осуществляет", "осуществляем", "предлагает",
                "предлагаем", "является", "занимается", "занимаемся", "выполняет", "выполняем",
                "оказывает", "оказываем", "предоставляет", "предоставляем", "работаем", "любых",
                "любой", "различных", "широкий", "широкого", "высокого", "качества", "лучшие",
            ]),
            legal_forms: set(&[
                "ооо", "оао", "зао", "одо", "чуп", "уп", "ип", "чтуп", "пуп", "руп", "ао", "пао",
                "сооо", "иооо", "куп", "тд", "гп", "филиал", "ltd", "llc", "inc",
            ]),
            generic_words: set(&[
                "услуги", "услуга", "продукция", "продукт", "продукты", "товары", "товар", "работы",
                "изделия", "бренд", "бренды", "марка", "марки", "ассортимент", "производство",
                "компания", "продажа", "деятельность",
            ]),
            conjunctions: set(&["и", "или"]),
            buy_word: "купить".to_string(),
            sale_words: strings(&["продажа"]),
            order_word: "заказать".to_string(),
            core_prefixes: strings(&["купить", "продажа", "покупка", "продать", "приобрести"]),
            activity_stems: strings(&[
                "производ", "изготовл", "изготавлива", "продаж", "реализац", "ремонт", "монтаж",
                "установк", "обслуживан", "поставк", "пошив", "печат", "строительств",
                "перевозк", "аренд", "выпуск", "разработк", "проектирован", "доставк",
            ]),
            list_intro_stems: strings(&[
                "ассортимент", "производ", "выпуск", "линейк", "продукци", "изготавлива",
                "изделия", "включает",
            ]),
            food_domain_stems: strings(&[
                "пищев", "продукт", "молоч", "мяс", "хлеб", "кондитер", "напит", "рыб",
                "продовольств", "кулинар", "бакале", "колбас",
            ]),
            product_hint_stems: strings(&[
                "молок", "молоч", "сыр", "масл", "кефир", "творог", "йогурт", "сметан", "ряжен",
                "мяс", "колбас", "сосис", "сардел", "ветчин", "хлеб", "батон", "булоч", "торт",
                "пирож", "конфет", "печень", "вафл", "шоколад", "сок", "напит", "пельмен",
                "вареник", "рыб", "круп", "мук", "макарон", "морожен", "консерв", "полуфабрикат",
            ]),
            geo_tokens: set(&[
                "рб", "рф", "орша", "лида", "горки", "беларус", "белорус", "росси", "москв",
                "минск", "брест", "гомел", "гродн", "витебск", "могилев", "бобруйск",
                "баранович", "борисов", "пинск", "мозыр", "солигорск", "новополоцк", "молодечн",
                "полоцк", "жлобин", "светлогорск", "речиц", "слуцк", "жодин", "кобрин", "слоним",
                "волковыск", "калинкович", "сморгон", "рогачев", "осипович", "новогрудок",
                "добруш", "киев", "вильнюс", "варшав",
            ]),
            editorial_stems: strings(&[
                "истори", "основан", "году", "года", "годы", "лет", "отдел", "департамент",
                "сотрудник", "коллектив", "директор", "руководител", "миссия", "юбиле", "награ",
            ]),
            price_stems: strings(&[
                "цена", "цены", "цене", "ценам", "ценой", "дешев", "недорог", "скидк",
                "распродаж", "бесплатн", "прайс", "стоимост", "акция", "акции", "выгодн",
            ]),
            synonyms: vec![
                synonym("молок", "молочная"),
                synonym("молоч", "молочная"),
                synonym("мяс", "мясная"),
            ],
            address_markers: set(&[
                "ул", "улица", "пр", "проспект", "пер", "переулок", "пл", "площадь", "д",
                "дом", "тракт", "бульвар", "шоссе", "мкр", "микрорайон", "корп", "корпус", "оф",
                "офис",
            ]),
            settlement_markers: set(&["г", "город", "гп", "аг", "агрогородок", "д", "деревня", "п", "пос", "поселок"]),
            logo_placeholders: strings(&[
                "placeholder", "no-logo", "nologo", "no_logo", "noimage", "no-image", "no_image",
                "default",
            ]),
            refine: RefineRules::default(),
        }
    }
}

impl Lexicon {
    /// Loads a JSON override file on top of the production defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!("cannot read lexicon {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| {
            CatalogError::Configuration(format!("invalid lexicon {}: {}", path.display(), e))
        })
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let lexicon: Lexicon = serde_json::from_str(content)?;
        Ok(lexicon.normalized())
    }

    /// Brings hand-written override entries into normalized form.
    fn normalized(mut self) -> Self {
        let norm_set =
            |items: HashSet<String>| -> HashSet<String> { items.iter().map(|s| normalize(s)).collect() };
        let norm_vec = |items: Vec<String>| -> Vec<String> { items.iter().map(|s| normalize(s)).collect() };

        self.stop_words = norm_set(self.stop_words);
        self.legal_forms = norm_set(self.legal_forms);
        self.generic_words = norm_set(self.generic_words);
        self.conjunctions = norm_set(self.conjunctions);
        self.geo_tokens = norm_set(self.geo_tokens);
        self.address_markers = norm_set(self.address_markers);
        self.settlement_markers = norm_set(self.settlement_markers);
        self.buy_word = normalize(&self.buy_word);
        self.order_word = normalize(&self.order_word);
        self.sale_words = norm_vec(self.sale_words);
        self.core_prefixes = norm_vec(self.core_prefixes);
        self.activity_stems = norm_vec(self.activity_stems);
        self.list_intro_stems = norm_vec(self.list_intro_stems);
        self.food_domain_stems = norm_vec(self.food_domain_stems);
        self.product_hint_stems = norm_vec(self.product_hint_stems);
        self.editorial_stems = norm_vec(self.editorial_stems);
        self.price_stems = norm_vec(self.price_stems);
        for rule in &mut self.synonyms {
            rule.prefix = normalize(&rule.prefix);
            rule.canonical = normalize(&rule.canonical);
        }
        self.refine.freight_stems = norm_vec(self.refine.freight_stems);
        self.refine.bare_transportation = norm_vec(self.refine.bare_transportation);
        self.refine.cargo_transportation = normalize(&self.refine.cargo_transportation);
        self.refine.transport_services = normalize(&self.refine.transport_services);
        self.refine.bare_transport = normalize(&self.refine.bare_transport);
        self
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    pub fn is_legal_form(&self, token: &str) -> bool {
        self.legal_forms.contains(token)
    }

    pub fn is_generic(&self, token: &str) -> bool {
        self.generic_words.contains(token)
    }

    pub fn is_conjunction(&self, token: &str) -> bool {
        self.conjunctions.contains(token)
    }

    pub fn is_sale_word(&self, token: &str) -> bool {
        self.sale_words.iter().any(|w| w == token)
    }

    /// Words that turn a phrase into a transaction (buy/sell/order).
    pub fn is_transactional(&self, token: &str) -> bool {
        token == self.buy_word
            || token == self.order_word
            || self.is_sale_word(token)
            || self.core_prefixes.iter().any(|w| w == token)
    }

    pub fn is_activity(&self, token: &str) -> bool {
        has_stem(token, &self.activity_stems)
    }

    pub fn is_list_intro(&self, token: &str) -> bool {
        has_stem(token, &self.list_intro_stems)
    }

    pub fn is_food_domain(&self, token: &str) -> bool {
        has_stem(token, &self.food_domain_stems)
    }

    pub fn is_product_hint(&self, token: &str) -> bool {
        has_stem(token, &self.product_hint_stems)
    }

    pub fn is_editorial(&self, token: &str) -> bool {
        has_stem(token, &self.editorial_stems)
    }

    pub fn is_price(&self, token: &str) -> bool {
        has_stem(token, &self.price_stems)
    }

    /// Short entries match exactly; longer ones also cover inflected forms.
    pub fn is_geo(&self, token: &str) -> bool {
        if self.geo_tokens.contains(token) {
            return true;
        }
        self.geo_tokens
            .iter()
            .any(|geo| geo.chars().count() >= GEO_PREFIX_MIN_CHARS && token.starts_with(geo.as_str()))
    }

    pub fn canonical(&self, token: &str) -> Option<&str> {
        self.synonyms
            .iter()
            .find(|rule| token.starts_with(rule.prefix.as_str()))
            .map(|rule| rule.canonical.as_str())
    }

    /// Strips one leading core prefix ("купить шины" -> "шины").
    pub fn core_phrase<'a>(&self, phrase: &'a str) -> &'a str {
        for prefix in &self.core_prefixes {
            if let Some(rest) = phrase.strip_prefix(prefix.as_str())
                && let Some(rest) = rest.strip_prefix(' ')
                && !rest.is_empty()
            {
                return rest;
            }
        }
        phrase
    }

    pub fn is_logo_placeholder(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.logo_placeholders
            .iter()
            .any(|marker| lower.contains(marker.as_str()))
    }
}

pub fn has_stem(token: &str, stems: &[String]) -> bool {
    stems.iter().any(|stem| token.starts_with(stem.as_str()))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn synonym(prefix: &str, canonical: &str) -> SynonymRule {
    SynonymRule {
        prefix: prefix.to_string(),
        canonical: canonical.to_string(),
    }
}
