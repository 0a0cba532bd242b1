use once_cell::sync::Lazy;
use regex::Regex;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("invalid RE_TAGS"));

static RE_NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:x([0-9a-f]+)|([0-9]+));").expect("invalid RE_NUMERIC_ENTITY")
});

/// Named entities not in `HTML_ENTITIES`; they become separators.
static RE_NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&[a-z][a-z0-9]*;").expect("invalid RE_NAMED_ENTITY"));

/// Named entities seen in catalog exports. All of them decode to separators
/// except the soft hyphen, which joins the word it splits.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", " "),
    ("&quot;", " "),
    ("&apos;", " "),
    ("&laquo;", " "),
    ("&raquo;", " "),
    ("&ldquo;", " "),
    ("&rdquo;", " "),
    ("&bdquo;", " "),
    ("&mdash;", " "),
    ("&ndash;", " "),
    ("&hellip;", " "),
    ("&lt;", " "),
    ("&gt;", " "),
    ("&shy;", ""),
];

/// Invisible characters removed outright instead of becoming separators.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// Decodes `&#NNN;` and `&#xHH;` to their characters, then the named table.
/// Unknown named entities and invalid code points become separators.
fn decode_entities(text: &str) -> String {
    let mut text = RE_NUMERIC_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.and_then(char::from_u32)
                .map(|c| c.to_lowercase().collect::<String>())
                .unwrap_or_else(|| " ".to_string())
        })
        .into_owned();
    for (entity, replacement) in HTML_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    if text.contains('&') {
        text = RE_NAMED_ENTITY.replace_all(&text, " ").into_owned();
    }
    text
}

/// Canonical form used for every comparison in the crate.
///
/// Lower-cases, folds `ё` to `е`, decodes entities, drops markup and turns
/// everything that is not a letter or digit into a single space. The output
/// only ever contains lowercase alphanumerics separated by single spaces, so
/// applying it twice is a no-op.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = raw.to_lowercase();
    if text.contains('&') {
        text = decode_entities(&text);
    }
    if text.contains('<') {
        text = RE_TAGS.replace_all(&text, " ").into_owned();
    }

    let mapped: String = text
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| match c {
            'ё' => 'е',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Letters and digits only, used for fuzzy name and id lookups.
pub fn compact(raw: &str) -> String {
    normalize(raw).chars().filter(|c| !c.is_whitespace()).collect()
}
